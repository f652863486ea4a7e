use std::{fs::File, io::BufReader, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Weights may drift from 1.0 by at most this much after JSON round trips.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Complete configuration surface of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub join: JoinConfig,
    pub scoring: ScoringConfig,
    pub hotspot: HotspotConfig,
    pub projection: ProjectionConfig,
    pub proxy: ProxyConfig,
}

/// Search radii for the nearest-neighbor joins, in projected meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    pub complexity_radius_m: f64,
    pub accident_radius_m: f64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self { complexity_radius_m: 100.0, accident_radius_m: 30.0 }
    }
}

/// Composite weights. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerWeights {
    pub surface: f64,
    pub behavior: f64,
    pub accidents: f64,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self { surface: 0.35, behavior: 0.40, accidents: 0.25 }
    }
}

impl LayerWeights {
    #[inline] pub fn sum(&self) -> f64 { self.surface + self.behavior + self.accidents }

    /// Weights in the fixed factor priority order (surface, behavior, accidents).
    #[inline] pub fn as_array(&self) -> [f64; 3] { [self.surface, self.behavior, self.accidents] }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Quantile at which accident counts are capped before scaling.
    pub accident_cap_quantile: f64,
    pub weights: LayerWeights,
    /// Lower bounds of the Moderate, High and Critical tiers, as quantiles of `risk_score`.
    pub tier_cutoffs: [f64; 3],
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            accident_cap_quantile: 0.95,
            weights: LayerWeights::default(),
            tier_cutoffs: [0.40, 0.70, 0.90],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    /// Centroid distance (meters) within which two segments are neighbors.
    pub distance_threshold_m: f64,
    pub permutations: usize,
    /// Significance levels for the 99%, 95% and 90% classes, ascending.
    pub confidence_levels: [f64; 3],
    /// Permutation seed; `None` draws a fresh one from OS entropy.
    pub seed: Option<u64>,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            distance_threshold_m: 300.0,
            permutations: 999,
            confidence_levels: [0.01, 0.05, 0.10],
            seed: Some(42),
        }
    }
}

/// Projected CRS used for all distance work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// PROJ.4 definition of a metric CRS. When absent, the UTM zone
    /// containing the network's center is used.
    pub proj4: Option<String>,
    /// Inputs are already in a metric CRS; coordinates pass through unchanged.
    pub assume_projected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub jitter_sigma: f64,
    pub seed: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { jitter_sigma: 0.02, seed: 42 }
    }
}

impl RiskConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("[config] Failed to open config file: {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[config] Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Check every invariant once, before any stage runs.
    pub fn validate(&self) -> Result<()> {
        let join = &self.join;
        ensure!(join.complexity_radius_m.is_finite() && join.complexity_radius_m > 0.0,
            "[config] join.complexity_radius_m must be > 0 (got {})", join.complexity_radius_m);
        ensure!(join.accident_radius_m.is_finite() && join.accident_radius_m > 0.0,
            "[config] join.accident_radius_m must be > 0 (got {})", join.accident_radius_m);

        let scoring = &self.scoring;
        ensure!(scoring.accident_cap_quantile > 0.0 && scoring.accident_cap_quantile <= 1.0,
            "[config] scoring.accident_cap_quantile must lie in (0, 1] (got {})", scoring.accident_cap_quantile);

        let weights = scoring.weights.as_array();
        ensure!(weights.iter().all(|w| w.is_finite() && *w >= 0.0),
            "[config] scoring.weights must be finite and non-negative (got {:?})", weights);
        ensure!((scoring.weights.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
            "[config] scoring.weights must sum to 1.0 (got {})", scoring.weights.sum());

        ensure!(strictly_increasing_in_unit_interval(&scoring.tier_cutoffs),
            "[config] scoring.tier_cutoffs must be strictly increasing inside (0, 1) (got {:?})", scoring.tier_cutoffs);

        let hotspot = &self.hotspot;
        ensure!(hotspot.distance_threshold_m.is_finite() && hotspot.distance_threshold_m > 0.0,
            "[config] hotspot.distance_threshold_m must be > 0 (got {})", hotspot.distance_threshold_m);
        ensure!(hotspot.permutations >= 1, "[config] hotspot.permutations must be at least 1");
        ensure!(strictly_increasing_in_unit_interval(&hotspot.confidence_levels),
            "[config] hotspot.confidence_levels must be strictly increasing inside (0, 1) (got {:?})", hotspot.confidence_levels);

        ensure!(self.proxy.jitter_sigma.is_finite() && self.proxy.jitter_sigma >= 0.0,
            "[config] proxy.jitter_sigma must be >= 0 (got {})", self.proxy.jitter_sigma);

        Ok(())
    }
}

fn strictly_increasing_in_unit_interval(values: &[f64]) -> bool {
    values.iter().all(|v| *v > 0.0 && *v < 1.0)
        && values.windows(2).all(|pair| pair[0] < pair[1])
}
