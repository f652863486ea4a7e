use std::sync::Arc;

use anyhow::{ensure, Result};
use geo::Point;
use rayon::prelude::*;
use rstar::{primitives::GeomWithData, RTree};
use tracing::{info, warn};

use super::graph::SpatialWeights;

/// Centroids closer than this are treated as this far apart for inverse distance.
const MIN_DISTANCE_M: f64 = 1.0;

type CentroidEntry = GeomWithData<[f64; 2], usize>;

/// Builds inverse-distance, row-standardized neighbor graphs over segment centroids.
#[derive(Debug, Clone, Copy)]
pub struct SpatialWeightsBuilder {
    threshold_m: f64,
}

impl SpatialWeightsBuilder {
    pub fn new(threshold_m: f64) -> Result<Self> {
        ensure!(threshold_m.is_finite() && threshold_m > 0.0,
            "[graph::weights] distance threshold must be > 0 (got {threshold_m})");
        Ok(Self { threshold_m })
    }

    #[inline] pub fn threshold_m(&self) -> f64 { self.threshold_m }

    /// Neighbors are centroids within the threshold (inclusive), weighted by
    /// inverse distance and standardized so each non-empty row sums to 1.
    pub fn build(&self, ids: Vec<Arc<str>>, centroids: &[Point<f64>]) -> Result<SpatialWeights> {
        ensure!(ids.len() == centroids.len(),
            "[graph::weights] {} ids for {} centroids", ids.len(), centroids.len());

        let tree = RTree::bulk_load(
            centroids.iter().enumerate()
                .map(|(i, c)| CentroidEntry::new([c.x(), c.y()], i))
                .collect()
        );
        let threshold_sq = self.threshold_m * self.threshold_m;

        let rows = centroids.par_iter().enumerate()
            .map(|(i, centroid)| {
                let mut row = tree.locate_within_distance([centroid.x(), centroid.y()], threshold_sq)
                    .filter(|entry| entry.data != i)
                    .map(|entry| {
                        let [x, y] = *entry.geom();
                        let dist = (x - centroid.x()).hypot(y - centroid.y());
                        (entry.data as u32, 1.0 / dist.max(MIN_DISTANCE_M))
                    })
                    .collect::<Vec<_>>();
                row.sort_unstable_by_key(|&(j, _)| j);

                let total = row.iter().map(|(_, w)| w).sum::<f64>();
                row.iter_mut().for_each(|(_, w)| *w /= total);
                row.into_iter().unzip::<_, _, Vec<u32>, Vec<f64>>()
            })
            .collect::<Vec<_>>();

        let (edges, edge_weights): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let graph = SpatialWeights::new(ids, &edges, &edge_weights);

        let islands = graph.islands().count();
        if islands > 0 {
            warn!(islands, threshold_m = self.threshold_m, "segments without neighbors");
        }
        info!(
            segments = graph.node_count(),
            mean_neighbors = graph.mean_degree(),
            threshold_m = self.threshold_m,
            "built spatial weights"
        );

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Arc<str>> {
        (0..n).map(|i| Arc::from(i.to_string())).collect()
    }

    fn line(n: usize, spacing: f64) -> Vec<Point<f64>> {
        (0..n).map(|i| Point::new(i as f64 * spacing, 0.0)).collect()
    }

    #[test]
    fn threshold_is_inclusive_and_self_excluded() {
        let builder = SpatialWeightsBuilder::new(100.0).unwrap();
        let graph = builder.build(ids(3), &line(3, 100.0)).unwrap();

        assert_eq!(graph.edges(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(graph.edges(1).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(graph.edges(2).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn weights_are_inverse_distance_row_standardized() {
        let builder = SpatialWeightsBuilder::new(300.0).unwrap();
        let graph = builder.build(ids(5), &line(5, 50.0)).unwrap();

        // Row 0 sees distances 50, 100, 150, 200 -> raw 1/50, 1/100, 1/150, 1/200.
        let raw = [1.0 / 50.0, 1.0 / 100.0, 1.0 / 150.0, 1.0 / 200.0];
        let total: f64 = raw.iter().sum();
        let row = graph.edges_with_weights(0).collect::<Vec<_>>();
        assert_eq!(row.len(), 4);
        for ((j, w), expected) in row.iter().zip(raw) {
            assert!(*j >= 1);
            assert!((w - expected / total).abs() < 1e-12);
        }

        for node in 0..5 {
            assert!((graph.row_sum(node) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn graph_is_not_symmetric_after_standardization() {
        let builder = SpatialWeightsBuilder::new(300.0).unwrap();
        let graph = builder.build(ids(3), &[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(200.0, 0.0)]).unwrap();

        let w01 = graph.edges_with_weights(0).find(|&(j, _)| j == 1).unwrap().1;
        let w10 = graph.edges_with_weights(1).find(|&(j, _)| j == 0).unwrap().1;
        assert!((w01 - w10).abs() > 1e-6);
    }

    #[test]
    fn isolated_segment_has_empty_row() {
        let builder = SpatialWeightsBuilder::new(300.0).unwrap();
        let graph = builder.build(ids(3), &[Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(5000.0, 0.0)]).unwrap();

        assert_eq!(graph.islands().collect::<Vec<_>>(), vec![2]);
        assert_eq!(graph.degree(2), 0);
    }

    #[test]
    fn coincident_centroids_use_distance_floor() {
        let builder = SpatialWeightsBuilder::new(300.0).unwrap();
        let graph = builder.build(ids(3), &[Point::new(0.0, 0.0), Point::new(0.0, 0.0), Point::new(2.0, 0.0)]).unwrap();

        // Raw weights from row 0: 1/1 (floored) and 1/2.
        let row = graph.edges_with_weights(0).collect::<Vec<_>>();
        assert!((row[0].1 - 2.0 / 3.0).abs() < 1e-12);
        assert!((row[1].1 - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_threshold() {
        assert!(SpatialWeightsBuilder::new(0.0).is_err());
        assert!(SpatialWeightsBuilder::new(f64::NAN).is_err());
    }
}
