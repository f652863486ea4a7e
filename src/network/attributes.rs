use serde::{Deserialize, Serialize};

use crate::hotspot::HotspotClass;
use crate::join::DistressClass;
use crate::score::{RiskFactor, RiskTier};

/// Surface distress fused by exact segment key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistressAttributes {
    /// Sample-weighted mean distress, or the layer median when unsampled.
    pub avg_distress: f64,
    #[serde(default)]
    pub max_distress: Option<f64>,
    #[serde(default)]
    pub std_distress: Option<f64>,
    pub sample_count: u32,
    pub reliable: bool,
    pub distress_imputed: bool,
    #[serde(default)]
    pub distress_class: Option<DistressClass>,
}

/// Behavioral complexity fused by nearest segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityAttributes {
    /// Mean complexity of matched scenarios, or the layer median when unmatched.
    pub avg_complexity: f64,
    #[serde(default)]
    pub max_complexity: Option<f64>,
    pub scenario_count: u32,
    pub complexity_imputed: bool,
}

/// Accident history fused by nearest segment. Zero is an observation, not a gap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccidentAttributes {
    pub accident_count: u32,
    pub severity_score: f64,
}

/// Normalized components and composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAttributes {
    pub norm_surface: f64,
    pub norm_behavior: f64,
    pub norm_accidents: f64,
    pub risk_score: f64,
    pub risk_tier: RiskTier,
    pub dominant_factor: RiskFactor,
}

/// Local Getis-Ord Gi* result. Statistics are `None` for segments without neighbors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotAttributes {
    #[serde(default)]
    pub gi_zscore: Option<f64>,
    #[serde(default)]
    pub gi_pvalue: Option<f64>,
    #[serde(default)]
    pub gi_pvalue_norm: Option<f64>,
    pub neighbor_count: u32,
    pub hotspot_class: HotspotClass,
}

/// Pipeline stages, in the order they append attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fuse,
    Score,
    Hotspot,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Fuse, Stage::Score, Stage::Hotspot];

    /// File name of the artifact this stage writes.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Stage::Fuse => "roads_with_features.geojson",
            Stage::Score => "roads_risk_scored.geojson",
            Stage::Hotspot => "roads_hotspot_final.geojson",
        }
    }

    /// The stage whose artifact this stage reads, if any.
    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::Fuse => None,
            Stage::Score => Some(Stage::Fuse),
            Stage::Hotspot => Some(Stage::Score),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fuse => "fuse",
            Stage::Score => "score",
            Stage::Hotspot => "hotspot",
        }
    }
}
