use std::sync::Arc;

use ahash::AHashMap;
use anyhow::{bail, Result};
use geo::{BoundingRect, Coord, MultiLineString, Point, Rect};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ProjectionConfig;
use crate::geom::Projector;
use super::attributes::Stage;
use super::segment::RoadSegment;

/// A feature of the base network as ingested, before projection.
#[derive(Debug, Clone)]
pub struct SourceFeature {
    pub id: Arc<str>,
    pub properties: Map<String, Value>,
    /// Polyline in lon/lat, or `None` when the source feature had no usable geometry.
    pub geometry: Option<MultiLineString<f64>>,
}

/// The ordered set of road segments plus the projection used to build them.
#[derive(Debug)]
pub struct RoadNetwork {
    segments: Vec<RoadSegment>,
    index: AHashMap<Arc<str>, u32>, // Map between segment ids and contiguous indices.
    projector: Projector,
    dropped: usize,
}

impl RoadNetwork {
    /// Project source features and build the network. Features without geometry
    /// are dropped (and counted); duplicate ids are an error.
    pub fn from_features(features: Vec<SourceFeature>, config: &ProjectionConfig) -> Result<Self> {
        let bounds = lonlat_bounds(features.iter().filter_map(|f| f.geometry.as_ref()));
        let projector = Projector::for_config(config, bounds)?;
        debug!(crs = projector.definition(), "projecting road network");

        let mut segments = Vec::with_capacity(features.len());
        let mut dropped = 0;
        for feature in features {
            let Some(source) = feature.geometry else { dropped += 1; continue };
            let projected = projector.forward_lines(&source)?;
            let segment = RoadSegment::new(
                feature.id,
                feature.properties,
                source,
                projected,
                |centroid| projector.inverse_point(centroid),
            )?;
            match segment {
                Some(segment) => segments.push(segment),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(dropped, "dropped road features without usable geometry");
        }

        let mut network = Self::new(segments, projector)?;
        network.dropped = dropped;
        Ok(network)
    }

    /// Build a network from already-constructed segments.
    pub fn new(segments: Vec<RoadSegment>, projector: Projector) -> Result<Self> {
        let mut index = AHashMap::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            if index.insert(segment.id.clone(), i as u32).is_some() {
                bail!("[network] duplicate segment id: {}", segment.id);
            }
        }
        Ok(Self { segments, index, projector, dropped: 0 })
    }

    #[inline] pub fn len(&self) -> usize { self.segments.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.segments.is_empty() }

    #[inline] pub fn segments(&self) -> &[RoadSegment] { &self.segments }

    #[inline] pub(crate) fn segments_mut(&mut self) -> &mut [RoadSegment] { &mut self.segments }

    #[inline] pub fn projector(&self) -> &Projector { &self.projector }

    /// Number of source features dropped at ingestion.
    #[inline] pub fn dropped(&self) -> usize { self.dropped }

    /// Contiguous index of a segment id.
    #[inline]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).map(|&i| i as usize)
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&RoadSegment> {
        self.index_of(id).map(|i| &self.segments[i])
    }

    /// Projected centroids, in segment order.
    pub fn centroids(&self) -> Vec<Point<f64>> {
        self.segments.iter().map(RoadSegment::centroid).collect()
    }

    /// Projected polylines, in segment order.
    pub fn geometries(&self) -> Vec<&MultiLineString<f64>> {
        self.segments.iter().map(RoadSegment::geometry).collect()
    }

    /// True when every segment carries the attributes of `stage`.
    pub fn has_stage(&self, stage: Stage) -> bool {
        self.segments.iter().all(|s| s.has_stage(stage))
    }

    /// Last stage whose attributes are present on every segment.
    pub fn completed_stage(&self) -> Option<Stage> {
        Stage::ALL.iter().copied()
            .take_while(|&stage| !self.is_empty() && self.has_stage(stage))
            .last()
    }

    /// Discard the attributes of `stage` and every later stage so it can be rerun.
    pub fn clear_from(&mut self, stage: Stage) {
        self.segments.iter_mut().for_each(|s| s.clear_from(stage));
    }
}

/// Combined bounding rectangle of a set of polylines.
fn lonlat_bounds<'a>(lines: impl Iterator<Item = &'a MultiLineString<f64>>) -> Option<Rect<f64>> {
    lines
        .filter_map(|line| line.bounding_rect())
        .reduce(|a, b| Rect::new(
            Coord {
                x: a.min().x.min(b.min().x),
                y: a.min().y.min(b.min().y),
            },
            Coord {
                x: a.max().x.max(b.max().x),
                y: a.max().y.max(b.max().y),
            }
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    fn projected() -> ProjectionConfig {
        ProjectionConfig { proj4: None, assume_projected: true }
    }

    fn feature(id: &str, geometry: Option<MultiLineString<f64>>) -> SourceFeature {
        SourceFeature { id: id.into(), properties: Map::new(), geometry }
    }

    fn line(x: f64) -> MultiLineString<f64> {
        MultiLineString::new(vec![line_string![(x: x, y: 0.0), (x: x, y: 10.0)]])
    }

    #[test]
    fn null_geometry_is_dropped_not_kept() {
        let network = RoadNetwork::from_features(
            vec![feature("a", Some(line(0.0))), feature("b", None), feature("c", Some(line(50.0)))],
            &projected(),
        ).unwrap();

        assert_eq!(network.len(), 2);
        assert_eq!(network.dropped(), 1);
        assert_eq!(network.index_of("c"), Some(1));
        assert!(network.get("b").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = RoadNetwork::from_features(
            vec![feature("a", Some(line(0.0))), feature("a", Some(line(5.0)))],
            &projected(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn bounds_cover_all_lines() {
        let lines = [line(-5.0), line(20.0)];
        let rect = lonlat_bounds(lines.iter()).unwrap();
        assert_eq!(rect.min(), Coord { x: -5.0, y: 0.0 });
        assert_eq!(rect.max(), Coord { x: 20.0, y: 10.0 });
    }

    #[test]
    fn fresh_network_has_no_completed_stage() {
        let network = RoadNetwork::from_features(vec![feature("a", Some(line(0.0)))], &projected()).unwrap();
        assert_eq!(network.completed_stage(), None);
        assert_eq!(network.centroids(), vec![Point::new(0.0, 5.0)]);
    }
}
