//! CSV writing operations.

use std::path::Path;

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{CsvWriter, NamedFrom}, series::Series};

use crate::io::fs::write_atomic;
use crate::network::RoadNetwork;
use crate::proxy::ProxyScenario;

/// Write a DataFrame to a CSV file.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    write_atomic(path, |out| {
        CsvWriter::new(out)
            .finish(df)
            .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))
    })
}

/// Flat per-segment table: identity, centroid, and every attribute present.
fn segments_frame(network: &RoadNetwork) -> Result<DataFrame> {
    let segments = network.segments();
    macro_rules! column {
        ($name:literal, $f:expr) => {
            Series::new($name.into(), segments.iter().map($f).collect::<Vec<_>>()).into()
        };
    }

    let df = DataFrame::new(vec![
        column!("id", |s| s.id.to_string()),
        column!("name", |s| s.name.as_deref().map(str::to_string)),
        column!("highway", |s| s.highway().map(|h| h.as_str())),
        column!("centroid_lon", |s| s.centroid_lonlat().x()),
        column!("centroid_lat", |s| s.centroid_lonlat().y()),
        column!("avg_distress", |s| s.distress().map(|d| d.avg_distress)),
        column!("max_distress", |s| s.distress().and_then(|d| d.max_distress)),
        column!("std_distress", |s| s.distress().and_then(|d| d.std_distress)),
        column!("sample_count", |s| s.distress().map(|d| d.sample_count)),
        column!("reliable", |s| s.distress().map(|d| d.reliable)),
        column!("distress_imputed", |s| s.distress().map(|d| d.distress_imputed)),
        column!("distress_class", |s| s.distress().and_then(|d| d.distress_class).map(|c| c.as_str())),
        column!("avg_complexity", |s| s.complexity().map(|c| c.avg_complexity)),
        column!("max_complexity", |s| s.complexity().and_then(|c| c.max_complexity)),
        column!("scenario_count", |s| s.complexity().map(|c| c.scenario_count)),
        column!("complexity_imputed", |s| s.complexity().map(|c| c.complexity_imputed)),
        column!("accident_count", |s| s.accidents().map(|a| a.accident_count)),
        column!("severity_score", |s| s.accidents().map(|a| a.severity_score)),
        column!("norm_surface", |s| s.risk().map(|r| r.norm_surface)),
        column!("norm_behavior", |s| s.risk().map(|r| r.norm_behavior)),
        column!("norm_accidents", |s| s.risk().map(|r| r.norm_accidents)),
        column!("risk_score", |s| s.risk().map(|r| r.risk_score)),
        column!("risk_tier", |s| s.risk().map(|r| r.risk_tier.as_str())),
        column!("dominant_factor", |s| s.risk().map(|r| r.dominant_factor.as_str())),
        column!("gi_zscore", |s| s.hotspot().and_then(|h| h.gi_zscore)),
        column!("gi_pvalue", |s| s.hotspot().and_then(|h| h.gi_pvalue)),
        column!("gi_pvalue_norm", |s| s.hotspot().and_then(|h| h.gi_pvalue_norm)),
        column!("neighbor_count", |s| s.hotspot().map(|h| h.neighbor_count)),
        column!("hotspot_class", |s| s.hotspot().map(|h| h.hotspot_class.as_str())),
    ])?;
    Ok(df)
}

/// Write the per-segment table to `path`.
pub fn write_segments(network: &RoadNetwork, path: &Path) -> Result<()> {
    write_csv(&mut segments_frame(network)?, path)
}

/// Write a generated complexity proxy in the complexity-layer table format.
pub fn write_proxy(scenarios: &[ProxyScenario], path: &Path) -> Result<()> {
    let mut df = DataFrame::new(vec![
        Series::new("scenario_id".into(), scenarios.iter().map(|s| s.scenario_id.to_string()).collect::<Vec<_>>()).into(),
        Series::new("center_x".into(), scenarios.iter().map(|s| s.center.x()).collect::<Vec<_>>()).into(),
        Series::new("center_y".into(), scenarios.iter().map(|s| s.center.y()).collect::<Vec<_>>()).into(),
        Series::new("complexity_score".into(), scenarios.iter().map(|s| s.complexity_score).collect::<Vec<_>>()).into(),
        Series::new("source".into(), vec!["osm_proxy"; scenarios.len()]).into(),
    ])?;
    write_csv(&mut df, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use geo::Point;

    use crate::io::csv::read::read_layer;
    use crate::layers::LayerTag;

    #[test]
    fn proxy_table_reads_back_as_complexity_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("complexity.csv");
        let scenarios = vec![
            ProxyScenario { scenario_id: Arc::from("osm_0"), center: Point::new(-122.41, 37.77), complexity_score: 0.4 },
            ProxyScenario { scenario_id: Arc::from("osm_1"), center: Point::new(-122.42, 37.78), complexity_score: 0.9 },
        ];
        write_proxy(&scenarios, &path).unwrap();

        let read = read_layer(LayerTag::Complexity, &path).unwrap();
        assert!(read.conditions.is_empty());
        assert_eq!(read.layer.len(), 2);
        assert_eq!(read.layer.records()[1].value, 0.9);
        assert_eq!(read.layer.records()[1].key.as_deref(), Some("osm_1"));
    }
}
