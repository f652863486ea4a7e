use std::path::Path;

use anyhow::{Context, Result};
use geo::{LineString, MultiLineString};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::io::fs::write_atomic;
use crate::network::{RoadNetwork, RoadSegment};

/// Write `network` as a lon/lat FeatureCollection with every attribute present.
pub fn write_network(network: &RoadNetwork, path: &Path) -> Result<()> {
    let collection = network_to_geojson(network)?;
    write_atomic(path, |out| {
        serde_json::to_writer(out, &collection)
            .with_context(|| format!("[io::geojson::write] Failed to write GeoJSON to {}", path.display()))
    })
}

pub(crate) fn network_to_geojson(network: &RoadNetwork) -> Result<Value> {
    let features = network.segments().iter()
        .map(feature)
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

fn feature(segment: &RoadSegment) -> Result<Value> {
    let mut properties = segment.properties().clone();
    properties.insert("id".into(), json!(&*segment.id));
    properties.insert("centroid_lon".into(), json!(segment.centroid_lonlat().x()));
    properties.insert("centroid_lat".into(), json!(segment.centroid_lonlat().y()));

    merge(&mut properties, segment.distress())?;
    merge(&mut properties, segment.complexity())?;
    merge(&mut properties, segment.accidents())?;
    merge(&mut properties, segment.risk())?;
    merge(&mut properties, segment.hotspot())?;

    Ok(json!({
        "type": "Feature",
        "id": &*segment.id,
        "geometry": geometry(segment.source_geometry()),
        "properties": properties,
    }))
}

/// Flatten one attribute group into `properties`. Unset optional fields become null.
fn merge<T: Serialize>(properties: &mut Map<String, Value>, group: Option<&T>) -> Result<()> {
    let Some(group) = group else { return Ok(()) };
    if let Value::Object(fields) = serde_json::to_value(group)
        .context("[io::geojson::write] Failed to serialize attributes")?
    {
        properties.extend(fields);
    }
    Ok(())
}

/// Single lines stay LineStrings; merged ways become MultiLineStrings.
fn geometry(lines: &MultiLineString<f64>) -> Value {
    match &lines.0[..] {
        [line] => json!({ "type": "LineString", "coordinates": positions(line) }),
        lines => json!({
            "type": "MultiLineString",
            "coordinates": lines.iter().map(positions).collect::<Vec<_>>(),
        }),
    }
}

fn positions(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().map(|c| [c.x, c.y]).collect()
}
