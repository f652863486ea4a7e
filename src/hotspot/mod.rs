//! Local spatial autocorrelation (Getis-Ord Gi*) and hotspot classification.

mod classify;
mod getis;
mod permutation;

use std::sync::Arc;

use anyhow::{ensure, Result};
use serde::Serialize;

use crate::config::HotspotConfig;
use crate::graph::SpatialWeightsBuilder;
use crate::network::{HotspotAttributes, RoadNetwork, Stage};

pub use classify::{normal_cdf, normal_pvalue, HotspotClass, HotspotClassifier};
pub use getis::{GiStar, GiStarField, LocalAutocorrelationEngine};

/// Summary of a hotspot run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotReport {
    pub seed: u64,
    pub permutations: usize,
    pub distance_threshold_m: f64,
    pub mean_neighbors: f64,
    /// Segments without neighbors, carried through as Not Significant.
    pub islands: Vec<Arc<str>>,
    /// Every `risk_score` was identical.
    pub constant: bool,
}

/// Runs the hotspot stage: weights, Gi*, classification.
pub fn analyze(network: &mut RoadNetwork, config: &HotspotConfig) -> Result<HotspotReport> {
    ensure!(network.has_stage(Stage::Score),
        "[hotspot] risk scores are missing; run the score stage first");

    let values = network.segments().iter()
        .map(|s| s.risk().map_or(f64::NAN, |r| r.risk_score))
        .collect::<Vec<_>>();
    let ids = network.segments().iter().map(|s| s.id.clone()).collect::<Vec<_>>();

    let weights = SpatialWeightsBuilder::new(config.distance_threshold_m)?
        .build(ids, &network.centroids())?;
    let field = LocalAutocorrelationEngine::new(config.permutations, config.seed)?
        .compute(&values, &weights)?;
    let classifier = HotspotClassifier::new(config.confidence_levels);

    for (segment, stat) in network.segments_mut().iter_mut().zip(&field.stats) {
        segment.set_hotspot(HotspotAttributes {
            gi_zscore: stat.z,
            gi_pvalue: stat.p_sim,
            gi_pvalue_norm: stat.p_norm,
            neighbor_count: stat.neighbor_count,
            hotspot_class: classifier.classify(stat.z, stat.p_sim),
        })?;
    }

    Ok(HotspotReport {
        seed: field.seed,
        permutations: field.permutations,
        distance_threshold_m: config.distance_threshold_m,
        mean_neighbors: weights.mean_degree(),
        islands: weights.islands().map(|i| Arc::from(weights.id(i))).collect(),
        constant: field.constant,
    })
}
