//! Normalization, composite scoring, tiering and factor attribution.

mod factor;
pub mod stats;
mod tier;

use anyhow::{bail, ensure, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ScoringConfig;
use crate::network::{RiskAttributes, RoadNetwork, Stage};

pub use factor::RiskFactor;
pub use stats::MinMaxScaler;
pub use tier::{RiskTier, TierBreaks};

/// Fitted parameters of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringReport {
    /// Accident count after which values are clipped.
    pub accident_cap: f64,
    pub surface_range: (f64, f64),
    pub behavior_range: (f64, f64),
    pub accident_range: (f64, f64),
    pub tiers: TierBreaks,
    /// Attributes whose observed values were all identical.
    pub constant_attributes: Vec<&'static str>,
}

/// Rescales fused layers to [0, 1] and derives the composite score.
#[derive(Debug, Clone)]
pub struct RiskNormalizer {
    config: ScoringConfig,
}

impl RiskNormalizer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Score every segment. Requires the fused attributes on all segments.
    pub fn score(&self, network: &mut RoadNetwork) -> Result<ScoringReport> {
        ensure!(!network.is_empty(), "[score] cannot score an empty network");
        ensure!(network.has_stage(Stage::Fuse),
            "[score] fused layer attributes are missing; run the fuse stage first");

        let mut surface = Vec::with_capacity(network.len());
        let mut behavior = Vec::with_capacity(network.len());
        let mut accidents = Vec::with_capacity(network.len());
        for segment in network.segments() {
            let (Some(d), Some(c), Some(a)) = (segment.distress(), segment.complexity(), segment.accidents())
            else { bail!("[score] segment {} is missing fused attributes", segment.id) };
            surface.push(d.avg_distress);
            behavior.push(c.avg_complexity);
            accidents.push(a.accident_count as f64);
        }

        // Clip extreme accident counts before fitting the scaler.
        let cap = stats::quantile(&accidents, self.config.accident_cap_quantile)
            .context("[score] no accident counts to cap")?;
        accidents.iter_mut().for_each(|count| *count = count.min(cap));

        let scalers = [&surface, &behavior, &accidents]
            .map(|values| MinMaxScaler::fit(values));
        let [Some(surface_scaler), Some(behavior_scaler), Some(accident_scaler)] = scalers else {
            bail!("[score] fused attributes contain no finite values");
        };

        let mut constant_attributes = Vec::new();
        for (name, scaler) in [("avg_distress", &surface_scaler), ("avg_complexity", &behavior_scaler), ("accident_count", &accident_scaler)] {
            if scaler.is_constant() {
                warn!(attribute = name, value = scaler.min(), "constant distribution; normalized to 0");
                constant_attributes.push(name);
            }
        }

        let weights = self.config.weights.as_array();
        let components = (0..surface.len())
            .map(|i| [
                surface_scaler.transform(surface[i]),
                behavior_scaler.transform(behavior[i]),
                accident_scaler.transform(accidents[i]),
            ])
            .collect::<Vec<_>>();
        let scores = components.iter()
            .map(|norm| {
                let score = norm.iter().zip(weights).map(|(n, w)| n * w).sum::<f64>();
                score.clamp(0.0, 1.0)
            })
            .collect::<Vec<_>>();

        let tiers = TierBreaks::fit(&scores, self.config.tier_cutoffs)
            .context("[score] no risk scores to tier")?;
        if tiers.is_degenerate() {
            warn!(attribute = "risk_score", value = tiers.min, "constant distribution; every segment is Low");
            constant_attributes.push("risk_score");
        }

        for ((segment, norm), score) in network.segments_mut().iter_mut().zip(&components).zip(&scores) {
            let contributions = [norm[0] * weights[0], norm[1] * weights[1], norm[2] * weights[2]];
            segment.set_risk(RiskAttributes {
                norm_surface: norm[0],
                norm_behavior: norm[1],
                norm_accidents: norm[2],
                risk_score: *score,
                risk_tier: tiers.classify(*score),
                dominant_factor: RiskFactor::dominant(contributions),
            })?;
        }

        info!(
            segments = scores.len(),
            accident_cap = cap,
            breaks = ?tiers.breaks,
            "scored segments"
        );

        Ok(ScoringReport {
            accident_cap: cap,
            surface_range: (surface_scaler.min(), surface_scaler.max()),
            behavior_range: (behavior_scaler.min(), behavior_scaler.max()),
            accident_range: (accident_scaler.min(), accident_scaler.max()),
            tiers,
            constant_attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, MultiLineString};
    use serde_json::Map;

    use crate::config::ProjectionConfig;
    use crate::network::{AccidentAttributes, ComplexityAttributes, DistressAttributes, SourceFeature};

    /// A fused network with the given (distress, complexity, accident count) per segment.
    fn fused(values: &[(f64, f64, u32)]) -> RoadNetwork {
        let features = (0..values.len())
            .map(|i| SourceFeature {
                id: i.to_string().into(),
                properties: Map::new(),
                geometry: Some(MultiLineString::new(vec![
                    line_string![(x: 50.0 * i as f64, y: 0.0), (x: 50.0 * i as f64 + 10.0, y: 0.0)]
                ])),
            })
            .collect();
        let mut network = RoadNetwork::from_features(features, &ProjectionConfig { proj4: None, assume_projected: true }).unwrap();

        for (segment, &(d, c, a)) in network.segments_mut().iter_mut().zip(values) {
            segment.set_distress(DistressAttributes {
                avg_distress: d, max_distress: Some(d), std_distress: None, sample_count: 1,
                reliable: false, distress_imputed: false, distress_class: None,
            }).unwrap();
            segment.set_complexity(ComplexityAttributes {
                avg_complexity: c, max_complexity: Some(c), scenario_count: 1, complexity_imputed: false,
            }).unwrap();
            segment.set_accidents(AccidentAttributes { accident_count: a, severity_score: a as f64 }).unwrap();
        }
        network
    }

    #[test]
    fn accident_outlier_is_capped_before_scaling() {
        let mut network = fused(&[(0.1, 0.1, 0), (0.2, 0.2, 1), (0.3, 0.3, 2), (0.4, 0.4, 3), (0.5, 0.5, 100)]);
        let report = RiskNormalizer::new(&ScoringConfig::default()).score(&mut network).unwrap();

        assert!((report.accident_cap - 80.6).abs() < 1e-9);
        assert_eq!(report.accident_range, (0.0, report.accident_cap));

        let outlier = network.segments()[4].risk().unwrap();
        assert_eq!(outlier.norm_accidents, 1.0);
        let three = network.segments()[3].risk().unwrap();
        assert!((three.norm_accidents - 3.0 / 80.6).abs() < 1e-9);
    }

    #[test]
    fn scores_and_components_stay_in_unit_interval() {
        let mut network = fused(&[(0.0, 0.9, 4), (0.3, 0.1, 0), (0.8, 0.5, 1), (0.2, 0.2, 9), (0.6, 0.7, 2)]);
        RiskNormalizer::new(&ScoringConfig::default()).score(&mut network).unwrap();

        for segment in network.segments() {
            let risk = segment.risk().unwrap();
            for v in [risk.norm_surface, risk.norm_behavior, risk.norm_accidents, risk.risk_score] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn composite_uses_configured_weights() {
        let mut network = fused(&[(0.0, 0.0, 0), (1.0, 1.0, 10)]);
        RiskNormalizer::new(&ScoringConfig::default()).score(&mut network).unwrap();
        let top = network.segments()[1].risk().unwrap();
        assert!((top.risk_score - 1.0).abs() < 1e-12);
        assert_eq!(top.risk_tier, RiskTier::Critical);
        assert_eq!(network.segments()[0].risk().unwrap().risk_tier, RiskTier::Low);
    }

    #[test]
    fn dominant_factor_tie_prefers_surface() {
        // Weights 0.4/0.4/0.2 and equal normalized surface and behavior: exact tie.
        let mut config = ScoringConfig::default();
        config.weights.surface = 0.4;
        config.weights.behavior = 0.4;
        config.weights.accidents = 0.2;
        let mut network = fused(&[(0.0, 0.0, 0), (1.0, 1.0, 0), (0.5, 0.5, 0)]);
        RiskNormalizer::new(&config).score(&mut network).unwrap();

        for segment in network.segments() {
            assert_eq!(segment.risk().unwrap().dominant_factor, RiskFactor::Surface);
        }
    }

    #[test]
    fn constant_inputs_collapse_to_low_tier() {
        let mut network = fused(&[(0.2, 0.5, 1); 4]);
        let report = RiskNormalizer::new(&ScoringConfig::default()).score(&mut network).unwrap();

        assert!(report.constant_attributes.contains(&"risk_score"));
        assert!(network.segments().iter().all(|s| {
            let risk = s.risk().unwrap();
            risk.risk_score == 0.0 && risk.risk_tier == RiskTier::Low
        }));
    }

    #[test]
    fn refuses_unfused_network() {
        let mut network = fused(&[(0.1, 0.1, 0)]);
        network.clear_from(Stage::Fuse);
        assert!(RiskNormalizer::new(&ScoringConfig::default()).score(&mut network).is_err());
    }
}
