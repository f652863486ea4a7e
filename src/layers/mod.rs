//! External risk layers, as records ready to be fused onto the network.

use std::{fmt, sync::Arc};

use geo::Point;
use serde::{Deserialize, Serialize};

/// The three risk layers the pipeline fuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerTag {
    Distress,
    Complexity,
    Accident,
}

impl LayerTag {
    pub const ALL: [LayerTag; 3] = [LayerTag::Distress, LayerTag::Complexity, LayerTag::Accident];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerTag::Distress => "distress",
            LayerTag::Complexity => "complexity",
            LayerTag::Accident => "accident",
        }
    }
}

impl fmt::Display for LayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a record finds its segment.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordLocator {
    /// Direct segment id.
    Key(Arc<str>),
    /// Location in lon/lat.
    Point(Point<f64>),
}

/// One row of an external risk layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskLayerRecord {
    pub layer: LayerTag,
    pub locator: RecordLocator,
    /// Primary value: distress or complexity score in [0, 1]; unused for accidents.
    pub value: f64,
    /// Per-sample count for distress rows, severity for accident rows.
    pub weight: Option<f64>,
    /// Identifying key of the record itself (scenario id), when the source has one.
    pub key: Option<Arc<str>>,
}

impl RiskLayerRecord {
    /// A segment-keyed distress row.
    pub fn distress(segment_id: impl Into<Arc<str>>, value: f64, sample_count: Option<f64>) -> Self {
        Self {
            layer: LayerTag::Distress,
            locator: RecordLocator::Key(segment_id.into()),
            value,
            weight: sample_count,
            key: None,
        }
    }

    /// A point-located complexity scenario.
    pub fn complexity(location: Point<f64>, value: f64, scenario_id: Option<Arc<str>>) -> Self {
        Self {
            layer: LayerTag::Complexity,
            locator: RecordLocator::Point(location),
            value,
            weight: None,
            key: scenario_id,
        }
    }

    /// A point-located accident.
    pub fn accident(location: Point<f64>, severity: Option<f64>) -> Self {
        Self {
            layer: LayerTag::Accident,
            locator: RecordLocator::Point(location),
            value: 1.0,
            weight: severity,
            key: None,
        }
    }

    #[inline]
    pub fn point(&self) -> Option<Point<f64>> {
        match self.locator {
            RecordLocator::Point(point) => Some(point),
            RecordLocator::Key(_) => None,
        }
    }

    #[inline]
    pub fn segment_key(&self) -> Option<&str> {
        match &self.locator {
            RecordLocator::Key(key) => Some(key),
            RecordLocator::Point(_) => None,
        }
    }
}

/// A loaded layer table.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskLayer {
    tag: LayerTag,
    records: Vec<RiskLayerRecord>,
}

impl RiskLayer {
    /// Build a layer; records tagged with another layer are rejected.
    pub fn new(tag: LayerTag, records: Vec<RiskLayerRecord>) -> anyhow::Result<Self> {
        anyhow::ensure!(records.iter().all(|r| r.layer == tag),
            "[layers] every record of the {tag} layer must carry the {tag} tag");
        Ok(Self { tag, records })
    }

    pub fn empty(tag: LayerTag) -> Self {
        Self { tag, records: Vec::new() }
    }

    #[inline] pub fn tag(&self) -> LayerTag { self.tag }

    #[inline] pub fn records(&self) -> &[RiskLayerRecord] { &self.records }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }
}
