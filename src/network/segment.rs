use std::sync::Arc;

use anyhow::{bail, Result};
use geo::{Centroid, MultiLineString, Point};
use serde_json::{Map, Value};

use super::attributes::{
    AccidentAttributes, ComplexityAttributes, DistressAttributes, HotspotAttributes, RiskAttributes, Stage,
};
use super::highway::{HighwayClass, HighwayKind};

/// One edge of the base road network.
///
/// Geometry is fixed at construction. Each pipeline stage appends its own
/// attribute group exactly once; an earlier stage never rewrites a later one.
#[derive(Debug, Clone)]
pub struct RoadSegment {
    pub id: Arc<str>,
    pub name: Option<Arc<str>>,
    highway: Option<HighwayKind>,
    properties: Map<String, Value>, // Source attributes passed through untouched
    source_geometry: MultiLineString<f64>, // As ingested (lon, lat)
    geometry: MultiLineString<f64>, // Projected, meters
    centroid: Point<f64>, // Projected, meters
    centroid_lonlat: Point<f64>,

    distress: Option<DistressAttributes>,
    complexity: Option<ComplexityAttributes>,
    accidents: Option<AccidentAttributes>,
    risk: Option<RiskAttributes>,
    hotspot: Option<HotspotAttributes>,
}

impl RoadSegment {
    /// Build a segment from its source geometry and its projected counterpart.
    /// Returns `None` when the projected geometry has no centroid (no coordinates).
    pub(crate) fn new(
        id: Arc<str>,
        properties: Map<String, Value>,
        source_geometry: MultiLineString<f64>,
        geometry: MultiLineString<f64>,
        centroid_lonlat: impl FnOnce(Point<f64>) -> Result<Point<f64>>,
    ) -> Result<Option<Self>> {
        let Some(centroid) = geometry.centroid() else { return Ok(None) };
        let centroid_lonlat = centroid_lonlat(centroid)?;

        let name = properties.get("name")
            .and_then(Value::as_str)
            .map(Arc::from);
        let highway = properties.get("highway")
            .and_then(HighwayClass::from_value)
            .map(|class| class.effective());

        Ok(Some(Self {
            id,
            name,
            highway,
            properties,
            source_geometry,
            geometry,
            centroid,
            centroid_lonlat,
            distress: None,
            complexity: None,
            accidents: None,
            risk: None,
            hotspot: None,
        }))
    }

    /// Effective highway classification, resolved once at ingestion.
    #[inline] pub fn highway(&self) -> Option<HighwayKind> { self.highway }

    /// Source attribute by name (`lanes`, `oneway`, `maxspeed`, ...).
    #[inline] pub fn property(&self, key: &str) -> Option<&Value> { self.properties.get(key) }

    #[inline] pub fn properties(&self) -> &Map<String, Value> { &self.properties }

    #[inline] pub fn source_geometry(&self) -> &MultiLineString<f64> { &self.source_geometry }

    #[inline] pub fn geometry(&self) -> &MultiLineString<f64> { &self.geometry }

    #[inline] pub fn centroid(&self) -> Point<f64> { self.centroid }

    #[inline] pub fn centroid_lonlat(&self) -> Point<f64> { self.centroid_lonlat }

    #[inline] pub fn distress(&self) -> Option<&DistressAttributes> { self.distress.as_ref() }

    #[inline] pub fn complexity(&self) -> Option<&ComplexityAttributes> { self.complexity.as_ref() }

    #[inline] pub fn accidents(&self) -> Option<&AccidentAttributes> { self.accidents.as_ref() }

    #[inline] pub fn risk(&self) -> Option<&RiskAttributes> { self.risk.as_ref() }

    #[inline] pub fn hotspot(&self) -> Option<&HotspotAttributes> { self.hotspot.as_ref() }

    pub(crate) fn set_distress(&mut self, attributes: DistressAttributes) -> Result<()> {
        write_once(&mut self.distress, attributes, &self.id, "distress")
    }

    pub(crate) fn set_complexity(&mut self, attributes: ComplexityAttributes) -> Result<()> {
        write_once(&mut self.complexity, attributes, &self.id, "complexity")
    }

    pub(crate) fn set_accidents(&mut self, attributes: AccidentAttributes) -> Result<()> {
        write_once(&mut self.accidents, attributes, &self.id, "accident")
    }

    pub(crate) fn set_risk(&mut self, attributes: RiskAttributes) -> Result<()> {
        write_once(&mut self.risk, attributes, &self.id, "risk")
    }

    pub(crate) fn set_hotspot(&mut self, attributes: HotspotAttributes) -> Result<()> {
        write_once(&mut self.hotspot, attributes, &self.id, "hotspot")
    }

    /// Drop every attribute group written by `stage` or any later stage.
    pub(crate) fn clear_from(&mut self, stage: Stage) {
        if stage <= Stage::Fuse {
            self.distress = None;
            self.complexity = None;
            self.accidents = None;
        }
        if stage <= Stage::Score { self.risk = None; }
        self.hotspot = None;
    }

    /// True once every attribute group of `stage` is present.
    pub fn has_stage(&self, stage: Stage) -> bool {
        match stage {
            Stage::Fuse => self.distress.is_some() && self.complexity.is_some() && self.accidents.is_some(),
            Stage::Score => self.risk.is_some(),
            Stage::Hotspot => self.hotspot.is_some(),
        }
    }
}

fn write_once<T>(slot: &mut Option<T>, value: T, id: &str, group: &str) -> Result<()> {
    if slot.is_some() {
        bail!("[network::segment] {group} attributes of segment {id} were already written");
    }
    *slot = Some(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, MultiLineString};
    use serde_json::json;

    fn segment() -> RoadSegment {
        let line = MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)]]);
        let mut properties = Map::new();
        properties.insert("name".into(), json!("Main St"));
        properties.insert("highway".into(), json!(["residential", "secondary"]));
        RoadSegment::new("a".into(), properties, line.clone(), line, Ok).unwrap().unwrap()
    }

    #[test]
    fn centroid_is_computed_in_projected_space() {
        let seg = segment();
        assert_eq!(seg.centroid(), Point::new(50.0, 0.0));
        assert_eq!(seg.name.as_deref(), Some("Main St"));
        assert_eq!(seg.highway(), Some(HighwayKind::Secondary));
    }

    #[test]
    fn empty_geometry_yields_no_segment() {
        let empty = MultiLineString::<f64>::new(vec![]);
        let seg = RoadSegment::new("x".into(), Map::new(), empty.clone(), empty, Ok).unwrap();
        assert!(seg.is_none());
    }

    #[test]
    fn attribute_groups_are_write_once() {
        let mut seg = segment();
        seg.set_accidents(AccidentAttributes::default()).unwrap();
        assert!(seg.set_accidents(AccidentAttributes::default()).is_err());
    }

    #[test]
    fn clear_from_drops_later_stages_only() {
        let mut seg = segment();
        seg.set_accidents(AccidentAttributes::default()).unwrap();
        seg.clear_from(Stage::Score);
        assert!(seg.accidents().is_some());
        seg.clear_from(Stage::Fuse);
        assert!(seg.accidents().is_none());
    }
}
