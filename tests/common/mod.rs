#![allow(dead_code)]

use std::path::{Path, PathBuf};

use roadrisk::RiskConfig;
use serde_json::json;

/// Default configuration for fixtures drawn directly in meters.
pub fn projected_config() -> RiskConfig {
    let mut config = RiskConfig::default();
    config.projection.assume_projected = true;
    config
}

/// Write a FeatureCollection of two-point LineStrings, one per `(id, from, to)`.
pub fn write_network(dir: &Path, lines: &[(&str, (f64, f64), (f64, f64))]) -> PathBuf {
    let features = lines.iter()
        .map(|(id, from, to)| json!({
            "type": "Feature",
            "properties": { "id": id, "highway": "residential" },
            "geometry": { "type": "LineString", "coordinates": [[from.0, from.1], [to.0, to.1]] },
        }))
        .collect::<Vec<_>>();
    let path = dir.join("network.geojson");
    std::fs::write(&path, json!({ "type": "FeatureCollection", "features": features }).to_string()).unwrap();
    path
}

/// Five 10 m vertical segments, 50 m apart along the x axis, ids "0".."4".
pub fn line_of_five(dir: &Path) -> PathBuf {
    let lines = (0..5)
        .map(|i| {
            let x = 50.0 * i as f64;
            (i.to_string(), (x, 0.0), (x, 10.0))
        })
        .collect::<Vec<_>>();
    let borrowed = lines.iter().map(|(id, a, b)| (id.as_str(), *a, *b)).collect::<Vec<_>>();
    write_network(dir, &borrowed)
}

pub fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
