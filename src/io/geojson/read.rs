use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiLineString};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::ProjectionConfig;
use crate::network::{
    AccidentAttributes, ComplexityAttributes, DistressAttributes, HotspotAttributes, RiskAttributes,
    RoadNetwork, RoadSegment, SourceFeature,
};
use super::ATTRIBUTE_KEYS;

/// Read a road network (or a stage artifact) from a GeoJSON FeatureCollection.
///
/// Features without a LineString/MultiLineString geometry are dropped and
/// counted. Attribute groups found in the properties are restored.
pub fn read_network(path: &Path, projection: &ProjectionConfig) -> Result<RoadNetwork> {
    let file = File::open(path)
        .with_context(|| format!("[io::geojson::read] Failed to open {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("[io::geojson::read] Failed to parse GeoJSON from {}", path.display()))?;

    let (features, attributes) = parse_features(&value)?;
    let mut network = RoadNetwork::from_features(features, projection)?;

    let mut restored = 0;
    for (id, attributes) in attributes {
        let Some(i) = network.index_of(&id) else { continue };
        if restore(&mut network.segments_mut()[i], &attributes)? { restored += 1; }
    }

    info!(path = %path.display(), segments = network.len(), dropped = network.dropped(), "read road network");
    if restored > 0 {
        debug!(restored, stage = ?network.completed_stage(), "restored stage attributes");
    }
    Ok(network)
}

/// Split a FeatureCollection into source features and their pipeline attributes.
pub(crate) fn parse_features(value: &Value) -> Result<(Vec<SourceFeature>, Vec<(Arc<str>, Map<String, Value>)>)> {
    if value["type"].as_str() != Some("FeatureCollection") {
        bail!("[io::geojson::read] expected a FeatureCollection");
    }
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("[io::geojson::read] FeatureCollection has no features array"))?;

    let mut sources = Vec::with_capacity(features.len());
    let mut attributes = Vec::new();
    for (index, feature) in features.iter().enumerate() {
        let mut properties = feature["properties"].as_object().cloned().unwrap_or_default();
        let id = feature_id(&properties, &feature["id"], index);

        let carried = ATTRIBUTE_KEYS.iter()
            .filter_map(|&key| properties.remove(key).map(|v| (key.to_string(), v)))
            .collect::<Map<_, _>>();
        if !carried.is_empty() {
            attributes.push((id.clone(), carried));
        }

        let geometry = parse_geometry(&feature["geometry"])
            .with_context(|| format!("[io::geojson::read] feature {index} ({id}) has malformed coordinates"))?;
        sources.push(SourceFeature { id, properties, geometry });
    }
    Ok((sources, attributes))
}

/// `id`, else `osmid`, else the feature's own id, else its position.
fn feature_id(properties: &Map<String, Value>, feature_id: &Value, index: usize) -> Arc<str> {
    ["id", "osmid"].iter()
        .filter_map(|key| properties.get(*key))
        .chain(std::iter::once(feature_id))
        .find_map(id_string)
        .unwrap_or_else(|| index.to_string())
        .into()
}

/// Strings verbatim, numbers in decimal, lists (merged OSM ways) comma-joined.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) if !items.is_empty() => {
            let parts = items.iter().map(id_string).collect::<Option<Vec<_>>>()?;
            Some(parts.join(","))
        }
        _ => None,
    }
}

/// LineString or MultiLineString as a multi-line; anything else is `None`.
fn parse_geometry(geometry: &Value) -> Result<Option<MultiLineString<f64>>> {
    let coordinates = &geometry["coordinates"];
    let lines = match geometry["type"].as_str() {
        Some("LineString") => vec![parse_line(coordinates)?],
        Some("MultiLineString") => coordinates.as_array()
            .ok_or_else(|| anyhow!("MultiLineString coordinates must be an array"))?
            .iter()
            .map(parse_line)
            .collect::<Result<Vec<_>>>()?,
        _ => return Ok(None),
    };
    let lines = lines.into_iter().filter(|l| !l.0.is_empty()).collect::<Vec<_>>();
    Ok((!lines.is_empty()).then(|| MultiLineString::new(lines)))
}

fn parse_line(coordinates: &Value) -> Result<LineString<f64>> {
    let positions = coordinates.as_array()
        .ok_or_else(|| anyhow!("line coordinates must be an array"))?;
    positions.iter()
        .map(|position| {
            let x = position[0].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
            let y = position[1].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

/// Restore every attribute group whose leading key is present. Returns
/// whether anything was restored.
fn restore(segment: &mut RoadSegment, attributes: &Map<String, Value>) -> Result<bool> {
    let mut any = false;
    if let Some(group) = group::<DistressAttributes>(attributes, "avg_distress", &segment.id)? {
        segment.set_distress(group)?;
        any = true;
    }
    if let Some(group) = group::<ComplexityAttributes>(attributes, "avg_complexity", &segment.id)? {
        segment.set_complexity(group)?;
        any = true;
    }
    if let Some(group) = group::<AccidentAttributes>(attributes, "accident_count", &segment.id)? {
        segment.set_accidents(group)?;
        any = true;
    }
    if let Some(group) = group::<RiskAttributes>(attributes, "risk_score", &segment.id)? {
        segment.set_risk(group)?;
        any = true;
    }
    if let Some(group) = group::<HotspotAttributes>(attributes, "hotspot_class", &segment.id)? {
        segment.set_hotspot(group)?;
        any = true;
    }
    Ok(any)
}

fn group<T: DeserializeOwned>(attributes: &Map<String, Value>, leading: &str, id: &str) -> Result<Option<T>> {
    if attributes.get(leading).is_none_or(Value::is_null) {
        return Ok(None);
    }
    serde_json::from_value(Value::Object(attributes.clone()))
        .map(Some)
        .with_context(|| format!("[io::geojson::read] segment {id} has malformed {leading} attributes"))
}
