use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use serde::Serialize;
use tracing::warn;

use crate::hotspot::{HotspotClass, HotspotReport};
use crate::join::JoinReport;
use crate::layers::LayerTag;
use crate::network::RoadNetwork;
use crate::score::{RiskFactor, RiskTier, ScoringReport};

/// A non-fatal condition met during a run. Recorded, logged, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Condition {
    /// An input table is absent; the layer degrades to its defaults.
    MissingInputArtifact { layer: LayerTag, path: PathBuf },
    /// An input table lacks required columns; the layer degrades to its defaults.
    SchemaMismatch { layer: LayerTag, missing_columns: Vec<String> },
    /// Records with no segment within reach (or with an unknown key).
    UnmatchedRecords { layer: LayerTag, count: usize, radius_m: Option<f64> },
    /// Segments with no neighbor within the weights threshold.
    DegenerateNeighborhood { segment_ids: Vec<Arc<str>> },
    /// Every value of an attribute was identical.
    ConstantDistribution { attribute: String },
    /// Features or rows excluded from a stage.
    DroppedFeatures { reason: String, count: usize },
}

impl Condition {
    pub(crate) fn log(&self) {
        match self {
            Condition::MissingInputArtifact { layer, path } =>
                warn!(%layer, path = %path.display(), "input table missing; layer uses defaults"),
            Condition::SchemaMismatch { layer, missing_columns } =>
                warn!(%layer, ?missing_columns, "input table is missing columns; layer uses defaults"),
            Condition::UnmatchedRecords { layer, count, radius_m } =>
                warn!(%layer, count, ?radius_m, "records matched no segment"),
            Condition::DegenerateNeighborhood { segment_ids } =>
                warn!(count = segment_ids.len(), "segments without spatial neighbors"),
            Condition::ConstantDistribution { attribute } =>
                warn!(attribute = attribute.as_str(), "constant distribution"),
            Condition::DroppedFeatures { reason, count } =>
                warn!(reason = reason.as_str(), count, "dropped features"),
        }
    }
}

/// Per-tier, per-class and per-factor segment counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub risk_tiers: BTreeMap<&'static str, usize>,
    pub dominant_factors: BTreeMap<&'static str, usize>,
    pub hotspot_classes: BTreeMap<&'static str, usize>,
}

impl Distribution {
    /// Tally the attributes currently present on the network.
    pub fn of(network: &RoadNetwork) -> Self {
        let mut dist = Self::default();
        for segment in network.segments() {
            if let Some(risk) = segment.risk() {
                *dist.risk_tiers.entry(risk.risk_tier.as_str()).or_default() += 1;
                *dist.dominant_factors.entry(risk.dominant_factor.as_str()).or_default() += 1;
            }
            if let Some(hotspot) = segment.hotspot() {
                *dist.hotspot_classes.entry(hotspot.hotspot_class.as_str()).or_default() += 1;
            }
        }
        dist
    }

    pub fn tier(&self, tier: RiskTier) -> usize {
        self.risk_tiers.get(tier.as_str()).copied().unwrap_or(0)
    }

    pub fn factor(&self, factor: RiskFactor) -> usize {
        self.dominant_factors.get(factor.as_str()).copied().unwrap_or(0)
    }

    pub fn class(&self, class: HotspotClass) -> usize {
        self.hotspot_classes.get(class.as_str()).copied().unwrap_or(0)
    }
}

/// Everything a run observed, written as `diagnostics.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunDiagnostics {
    pub segments: usize,
    pub conditions: Vec<Condition>,
    pub joins: Vec<JoinReport>,
    pub scoring: Option<ScoringReport>,
    pub hotspots: Option<HotspotReport>,
    pub distribution: Distribution,
}

impl RunDiagnostics {
    /// Record and log a condition.
    pub fn record(&mut self, condition: Condition) {
        condition.log();
        self.conditions.push(condition);
    }

    /// Fraction of segments covered by each joined layer.
    pub fn coverage(&self) -> BTreeMap<&'static str, f64> {
        self.joins.iter().map(|j| (j.layer.as_str(), j.coverage())).collect()
    }

    /// Permutation seed of the hotspot stage, if it ran.
    pub fn seed(&self) -> Option<u64> {
        self.hotspots.as_ref().map(|h| h.seed)
    }

    pub fn has_condition(&self, predicate: impl Fn(&Condition) -> bool) -> bool {
        self.conditions.iter().any(predicate)
    }
}
