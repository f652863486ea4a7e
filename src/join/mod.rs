//! Fusing external risk layers onto road segments.
//!
//! Distress rows join by exact segment id. Complexity and accident points join
//! to the nearest segment polyline within a radius. Segments no record reached
//! are filled according to the layer's [`FillPolicy`].

mod exact;
mod impute;
mod nearest;

use anyhow::{ensure, Result};
use geo::Point;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::JoinConfig;
use crate::geom::SegmentIndex;
use crate::layers::{LayerTag, RiskLayer};
use crate::network::{AccidentAttributes, ComplexityAttributes, DistressAttributes, RoadNetwork};

pub use exact::DistressClass;
pub use impute::FillPolicy;

/// What one layer join did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinReport {
    pub layer: LayerTag,
    /// Search radius in meters; `None` for the exact-key join.
    pub radius_m: Option<f64>,
    pub records: usize,
    pub matched_records: usize,
    /// Records with no segment in reach (or an unknown key). Not an error.
    pub unmatched_records: usize,
    /// Records skipped for a non-finite value or an unprojectable location.
    pub invalid_records: usize,
    pub covered_segments: usize,
    pub filled_segments: usize,
    pub fill_policy: FillPolicy,
    pub fill_value: f64,
    /// The median fill fell back to zero because nothing was observed.
    pub fill_fallback: bool,
}

impl JoinReport {
    /// Fraction of segments that received at least one record.
    pub fn coverage(&self) -> f64 {
        let total = self.covered_segments + self.filled_segments;
        if total == 0 { 0.0 } else { self.covered_segments as f64 / total as f64 }
    }
}

/// Attaches risk-layer attributes to every segment of a network.
#[derive(Debug, Clone)]
pub struct SpatialJoinEngine {
    config: JoinConfig,
}

/// Matched record indices per segment plus the records left over.
struct Located {
    per_segment: Vec<Vec<usize>>,
    unmatched: usize,
    invalid: usize,
}

impl SpatialJoinEngine {
    pub fn new(config: &JoinConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Exact-key join of surface distress, with median imputation.
    pub fn join_distress(&self, network: &mut RoadNetwork, layer: &RiskLayer) -> Result<JoinReport> {
        ensure!(layer.tag() == LayerTag::Distress, "[join] expected the distress layer, got {}", layer.tag());

        let (groups, invalid) = exact::aggregate_by_key(layer.records());
        let matched_keys = groups.keys().filter(|key| network.index_of(key).is_some()).count();
        let matched_records = layer.records().iter()
            .filter(|r| r.value.is_finite())
            .filter(|r| r.segment_key().is_some_and(|key| network.index_of(key).is_some()))
            .count();
        let unmatched_records = layer.len() - invalid - matched_records;

        let observed = network.segments().iter()
            .filter_map(|s| groups.get(&*s.id).map(|g| g.mean))
            .collect::<Vec<_>>();
        let policy = FillPolicy::Median;
        let (fill, fill_fallback) = policy.fill_value(&observed);

        for segment in network.segments_mut() {
            let attributes = match groups.get(&*segment.id) {
                Some(group) => DistressAttributes {
                    avg_distress: group.mean,
                    max_distress: Some(group.max),
                    std_distress: group.std,
                    sample_count: group.sample_count,
                    reliable: group.sample_count >= 2,
                    distress_imputed: false,
                    distress_class: DistressClass::from_distress(group.mean),
                },
                None => DistressAttributes {
                    avg_distress: fill,
                    max_distress: None,
                    std_distress: None,
                    sample_count: 0,
                    reliable: false,
                    distress_imputed: true,
                    distress_class: None,
                },
            };
            segment.set_distress(attributes)?;
        }

        let report = JoinReport {
            layer: LayerTag::Distress,
            radius_m: None,
            records: layer.len(),
            matched_records,
            unmatched_records,
            invalid_records: invalid,
            covered_segments: matched_keys,
            filled_segments: network.len() - matched_keys,
            fill_policy: policy,
            fill_value: fill,
            fill_fallback,
        };
        log_report(&report);
        Ok(report)
    }

    /// Nearest-segment join of behavioral complexity, with median imputation.
    pub fn join_complexity(&self, network: &mut RoadNetwork, layer: &RiskLayer) -> Result<JoinReport> {
        ensure!(layer.tag() == LayerTag::Complexity, "[join] expected the complexity layer, got {}", layer.tag());

        let radius = self.config.complexity_radius_m;
        let located = locate(network, layer, radius, true);
        let records = layer.records();

        let summaries = located.per_segment.iter()
            .map(|matched| {
                if matched.is_empty() { return None }
                let values = matched.iter().map(|&r| records[r].value);
                let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
                let mean = values.sum::<f64>() / matched.len() as f64;
                Some((mean, max, matched.len() as u32))
            })
            .collect::<Vec<_>>();

        let observed = summaries.iter().flatten().map(|(mean, _, _)| *mean).collect::<Vec<_>>();
        let policy = FillPolicy::Median;
        let (fill, fill_fallback) = policy.fill_value(&observed);

        for (segment, summary) in network.segments_mut().iter_mut().zip(&summaries) {
            let attributes = match *summary {
                Some((mean, max, count)) => ComplexityAttributes {
                    avg_complexity: mean,
                    max_complexity: Some(max),
                    scenario_count: count,
                    complexity_imputed: false,
                },
                None => ComplexityAttributes {
                    avg_complexity: fill,
                    max_complexity: None,
                    scenario_count: 0,
                    complexity_imputed: true,
                },
            };
            segment.set_complexity(attributes)?;
        }

        let report = nearest_report(LayerTag::Complexity, radius, layer, &located, policy, fill, fill_fallback);
        log_report(&report);
        Ok(report)
    }

    /// Nearest-segment join of accident history. Unreached segments get zero.
    pub fn join_accidents(&self, network: &mut RoadNetwork, layer: &RiskLayer) -> Result<JoinReport> {
        ensure!(layer.tag() == LayerTag::Accident, "[join] expected the accident layer, got {}", layer.tag());

        let radius = self.config.accident_radius_m;
        let located = locate(network, layer, radius, false);
        let records = layer.records();

        for (segment, matched) in network.segments_mut().iter_mut().zip(&located.per_segment) {
            let severity_score = matched.iter()
                .map(|&r| records[r].weight.filter(|w| w.is_finite()).map_or(1.0, |w| w.max(0.0)))
                .sum::<f64>();
            segment.set_accidents(AccidentAttributes {
                accident_count: matched.len() as u32,
                severity_score,
            })?;
        }

        let report = nearest_report(LayerTag::Accident, radius, layer, &located, FillPolicy::Zero, 0.0, false);
        log_report(&report);
        Ok(report)
    }
}

/// Match every point record of `layer` to its nearest segment within `radius`.
fn locate(network: &RoadNetwork, layer: &RiskLayer, radius: f64, needs_value: bool) -> Located {
    let projector = network.projector();
    let mut invalid = 0;
    let mut points: Vec<Point<f64>> = Vec::with_capacity(layer.len());
    let mut origin = Vec::with_capacity(layer.len());

    for (r, record) in layer.records().iter().enumerate() {
        let projected = record.point()
            .filter(|p| p.x().is_finite() && p.y().is_finite())
            .filter(|_| !needs_value || record.value.is_finite())
            .and_then(|p| projector.forward_point(p).ok())
            .filter(|p| p.x().is_finite() && p.y().is_finite());
        match projected {
            Some(point) => { points.push(point); origin.push(r); }
            None => invalid += 1,
        }
    }

    let index = SegmentIndex::new(network.geometries());
    let ids = network.segments().iter().map(|s| &*s.id).collect::<Vec<_>>();
    let hits = nearest::nearest_within(&index, &ids, &points, radius);
    debug!(layer = %layer.tag(), points = points.len(), radius_m = radius, "nearest-segment lookups done");

    let mut per_segment = vec![Vec::new(); network.len()];
    let mut unmatched = 0;
    for (hit, &r) in hits.into_iter().zip(&origin) {
        match hit {
            Some(segment) => per_segment[segment].push(r),
            None => unmatched += 1,
        }
    }

    Located { per_segment, unmatched, invalid }
}

fn nearest_report(
    layer_tag: LayerTag,
    radius: f64,
    layer: &RiskLayer,
    located: &Located,
    fill_policy: FillPolicy,
    fill_value: f64,
    fill_fallback: bool,
) -> JoinReport {
    let covered = located.per_segment.iter().filter(|m| !m.is_empty()).count();
    JoinReport {
        layer: layer_tag,
        radius_m: Some(radius),
        records: layer.len(),
        matched_records: located.per_segment.iter().map(Vec::len).sum(),
        unmatched_records: located.unmatched,
        invalid_records: located.invalid,
        covered_segments: covered,
        filled_segments: located.per_segment.len() - covered,
        fill_policy,
        fill_value,
        fill_fallback,
    }
}

fn log_report(report: &JoinReport) {
    info!(
        layer = %report.layer,
        records = report.records,
        matched = report.matched_records,
        unmatched = report.unmatched_records,
        coverage = report.coverage(),
        fill = report.fill_value,
        "joined risk layer"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, MultiLineString};
    use serde_json::Map;

    use crate::config::ProjectionConfig;
    use crate::layers::RiskLayerRecord;
    use crate::network::SourceFeature;

    /// Three horizontal 100 m segments at y = 0, 100, 200 in a metric CRS.
    fn network() -> RoadNetwork {
        let features = ["a", "b", "c"].iter().enumerate()
            .map(|(i, id)| SourceFeature {
                id: (*id).into(),
                properties: Map::new(),
                geometry: Some(MultiLineString::new(vec![
                    line_string![(x: 0.0, y: 100.0 * i as f64), (x: 100.0, y: 100.0 * i as f64)]
                ])),
            })
            .collect();
        RoadNetwork::from_features(features, &ProjectionConfig { proj4: None, assume_projected: true }).unwrap()
    }

    fn engine() -> SpatialJoinEngine {
        SpatialJoinEngine::new(&JoinConfig::default())
    }

    #[test]
    fn distress_joins_by_key_and_imputes_median() {
        let mut network = network();
        let layer = RiskLayer::new(LayerTag::Distress, vec![
            RiskLayerRecord::distress("a", 0.10, None),
            RiskLayerRecord::distress("a", 0.30, None),
            RiskLayerRecord::distress("b", 0.40, None),
            RiskLayerRecord::distress("zzz", 0.90, None),
        ]).unwrap();

        let report = engine().join_distress(&mut network, &layer).unwrap();
        assert_eq!(report.matched_records, 3);
        assert_eq!(report.unmatched_records, 1);
        assert_eq!(report.covered_segments, 2);

        let a = network.get("a").unwrap().distress().unwrap();
        assert!((a.avg_distress - 0.2).abs() < 1e-12);
        assert!(a.reliable);
        assert!(!a.distress_imputed);

        let c = network.get("c").unwrap().distress().unwrap();
        assert!((c.avg_distress - 0.3).abs() < 1e-12); // median of 0.2 and 0.4
        assert!(c.distress_imputed);
        assert_eq!(c.sample_count, 0);
    }

    #[test]
    fn complexity_joins_nearest_within_radius() {
        let mut network = network();
        let layer = RiskLayer::new(LayerTag::Complexity, vec![
            RiskLayerRecord::complexity(Point::new(50.0, 10.0), 0.4, None),
            RiskLayerRecord::complexity(Point::new(50.0, 20.0), 0.8, None),
            RiskLayerRecord::complexity(Point::new(50.0, 5000.0), 1.0, None),
        ]).unwrap();

        let report = engine().join_complexity(&mut network, &layer).unwrap();
        assert_eq!(report.matched_records, 2);
        assert_eq!(report.unmatched_records, 1);

        let a = network.get("a").unwrap().complexity().unwrap();
        assert!((a.avg_complexity - 0.6).abs() < 1e-12);
        assert_eq!(a.max_complexity, Some(0.8));
        assert_eq!(a.scenario_count, 2);

        let b = network.get("b").unwrap().complexity().unwrap();
        assert!(b.complexity_imputed);
        assert!((b.avg_complexity - 0.6).abs() < 1e-12);
    }

    #[test]
    fn accidents_default_to_zero_not_median() {
        let mut network = network();
        let layer = RiskLayer::new(LayerTag::Accident, vec![
            RiskLayerRecord::accident(Point::new(10.0, 29.9), Some(3.0)),
            RiskLayerRecord::accident(Point::new(10.0, 1.0), None),
            RiskLayerRecord::accident(Point::new(10.0, 135.0), None), // 35 m from both b and c
        ]).unwrap();

        let report = engine().join_accidents(&mut network, &layer).unwrap();
        assert_eq!(report.unmatched_records, 1);

        let a = network.get("a").unwrap().accidents().unwrap();
        assert_eq!(a.accident_count, 2);
        assert_eq!(a.severity_score, 4.0);

        for id in ["b", "c"] {
            assert_eq!(network.get(id).unwrap().accidents(), Some(&AccidentAttributes::default()));
        }
    }

    #[test]
    fn missing_layer_degrades_to_defaults() {
        let mut network = network();
        let report = engine().join_distress(&mut network, &RiskLayer::empty(LayerTag::Distress)).unwrap();
        assert!(report.fill_fallback);
        assert_eq!(report.coverage(), 0.0);
        assert!(network.segments().iter().all(|s| s.distress().unwrap().avg_distress == 0.0));
    }

    #[test]
    fn wrong_layer_is_rejected() {
        let mut network = network();
        assert!(engine().join_accidents(&mut network, &RiskLayer::empty(LayerTag::Distress)).is_err());
    }
}
