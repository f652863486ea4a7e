//! CSV reading operations.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::{Context, Result};
use geo::Point;
use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReader, DataType}};
use tracing::debug;

use crate::layers::{LayerTag, RiskLayer, RiskLayerRecord};
use crate::pipeline::Condition;

/// A layer table as read, plus whatever went wrong reading it.
#[derive(Debug, Clone)]
pub struct LayerRead {
    pub layer: RiskLayer,
    pub conditions: Vec<Condition>,
}

impl LayerRead {
    fn degraded(tag: LayerTag, condition: Condition) -> Self {
        Self { layer: RiskLayer::empty(tag), conditions: vec![condition] }
    }
}

/// Reads a CSV file from `path` into a Polars DataFrame.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReader::new(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Reads a layer table, or degrades it to empty when the file is absent.
pub fn read_layer(tag: LayerTag, path: &Path) -> Result<LayerRead> {
    if !path.exists() {
        return Ok(LayerRead::degraded(tag, Condition::MissingInputArtifact { layer: tag, path: path.to_path_buf() }));
    }
    let df = read_csv(path)?;
    debug!(layer = %tag, rows = df.height(), path = %path.display(), "read layer table");
    match tag {
        LayerTag::Distress => distress_layer(&df),
        LayerTag::Complexity => complexity_layer(&df),
        LayerTag::Accident => accident_layer(&df),
    }
}

/// Segment-keyed distress: `id|osmid`, `distress|avg_distress|distress_score`, optional `sample_count`.
pub(crate) fn distress_layer(df: &DataFrame) -> Result<LayerRead> {
    let tag = LayerTag::Distress;
    let id = find_column(df, &["id", "osmid"]);
    let value = find_column(df, &["distress", "avg_distress", "distress_score"]);
    let (Some(id), Some(value)) = (&id, &value) else {
        return Ok(schema_mismatch(tag, [
            id.is_none().then_some("id"),
            value.is_none().then_some("distress"),
        ]));
    };

    let ids = strings(df, id)?;
    let values = floats(df, value)?;
    let counts = match find_column(df, &["sample_count"]) {
        Some(name) => floats(df, &name)?,
        None => vec![None; df.height()],
    };

    let mut dropped = 0;
    let records = ids.into_iter().zip(values).zip(counts)
        .filter_map(|((id, value), count)| {
            let Some(id) = id else { dropped += 1; return None };
            Some(RiskLayerRecord::distress(id, value.unwrap_or(f64::NAN), count))
        })
        .collect();

    finish(tag, records, dropped, "distress rows without a segment id")
}

/// Point-located scenarios: `center_x`, `center_y`, `complexity_score`, optional `scenario_id`.
pub(crate) fn complexity_layer(df: &DataFrame) -> Result<LayerRead> {
    let tag = LayerTag::Complexity;
    let required = ["center_x", "center_y", "complexity_score"];
    let found = required.map(|c| find_column(df, &[c]));
    let [Some(x), Some(y), Some(score)] = &found else {
        return Ok(schema_mismatch(tag, required.iter().zip(&found).map(|(c, f)| f.is_none().then_some(*c))));
    };

    let xs = floats(df, x)?;
    let ys = floats(df, y)?;
    let scores = floats(df, score)?;
    let scenario_ids = match find_column(df, &["scenario_id"]) {
        Some(name) => strings(df, &name)?,
        None => vec![None; df.height()],
    };

    let mut dropped = 0;
    let records = (0..df.height())
        .filter_map(|i| {
            let Some(center) = point(xs[i], ys[i]) else { dropped += 1; return None };
            Some(RiskLayerRecord::complexity(center, scores[i].unwrap_or(f64::NAN), scenario_ids[i].clone()))
        })
        .collect();

    finish(tag, records, dropped, "complexity rows without coordinates")
}

/// Point-located accidents: `latitude`, `longitude`, and a severity taken from
/// `severity_weight`, or derived from SWITRS casualty counts when present.
pub(crate) fn accident_layer(df: &DataFrame) -> Result<LayerRead> {
    let tag = LayerTag::Accident;
    let lat = find_column(df, &["latitude", "lat"]);
    let lon = find_column(df, &["longitude", "lon", "lng"]);
    let (Some(lat), Some(lon)) = (&lat, &lon) else {
        return Ok(schema_mismatch(tag, [
            lat.is_none().then_some("latitude"),
            lon.is_none().then_some("longitude"),
        ]));
    };

    let lats = floats(df, lat)?;
    let lons = floats(df, lon)?;
    let severities = severities(df)?;

    let mut dropped = 0;
    let records = (0..df.height())
        .filter_map(|i| {
            let Some(location) = point(lons[i], lats[i]) else { dropped += 1; return None };
            Some(RiskLayerRecord::accident(location, severities[i]))
        })
        .collect();

    finish(tag, records, dropped, "accident rows without coordinates")
}

/// Per-row severity. An explicit `severity_weight` wins; otherwise
/// `3 * killed + 2 * severe + injured`, floored at 1. `None` means unweighted.
fn severities(df: &DataFrame) -> Result<Vec<Option<f64>>> {
    if let Some(name) = find_column(df, &["severity_weight", "severity"]) {
        return floats(df, &name);
    }

    let casualties = [("number_killed", 3.0), ("count_severe_inj", 2.0), ("number_injured", 1.0)];
    let mut columns = Vec::new();
    for (name, factor) in casualties {
        if let Some(found) = find_column(df, &[name]) {
            columns.push((floats(df, &found)?, factor));
        }
    }
    if columns.is_empty() {
        return Ok(vec![None; df.height()]);
    }

    Ok((0..df.height())
        .map(|i| {
            let weighted = columns.iter()
                .map(|(values, factor)| values[i].filter(|v| v.is_finite()).unwrap_or(0.0) * factor)
                .sum::<f64>();
            Some(weighted.max(1.0))
        })
        .collect())
}

fn finish(tag: LayerTag, records: Vec<RiskLayerRecord>, dropped: usize, reason: &str) -> Result<LayerRead> {
    let mut conditions = Vec::new();
    if dropped > 0 {
        conditions.push(Condition::DroppedFeatures { reason: reason.to_string(), count: dropped });
    }
    Ok(LayerRead { layer: RiskLayer::new(tag, records)?, conditions })
}

fn schema_mismatch<'a>(tag: LayerTag, missing: impl IntoIterator<Item = Option<&'a str>>) -> LayerRead {
    let missing_columns = missing.into_iter().flatten().map(str::to_string).collect();
    LayerRead::degraded(tag, Condition::SchemaMismatch { layer: tag, missing_columns })
}

/// First column whose name matches one of `candidates`, ignoring ASCII case.
fn find_column(df: &DataFrame, candidates: &[&str]) -> Option<String> {
    let names = df.get_column_names();
    candidates.iter().find_map(|candidate| {
        names.iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(candidate))
            .map(|name| name.to_string())
    })
}

fn floats(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)
        .with_context(|| format!("[io::csv::read] column {name} is not numeric"))?;
    Ok(column.f64()?.into_iter().collect())
}

fn strings(df: &DataFrame, name: &str) -> Result<Vec<Option<Arc<str>>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column.str()?.into_iter()
        .map(|s| s.map(str::trim).filter(|s| !s.is_empty()).map(Arc::from))
        .collect())
}

/// A lon/lat point, when both coordinates are present and finite.
fn point(x: Option<f64>, y: Option<f64>) -> Option<Point<f64>> {
    let (x, y) = (x?, y?);
    (x.is_finite() && y.is_finite()).then(|| Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_degrades_to_empty_layer() {
        let read = read_layer(LayerTag::Accident, Path::new("/nonexistent/accidents.csv")).unwrap();
        assert!(read.layer.is_empty());
        assert!(matches!(read.conditions[..], [Condition::MissingInputArtifact { layer: LayerTag::Accident, .. }]));
    }

    #[test]
    fn distress_accepts_column_aliases() {
        let (_dir, path) = table("osmid,distress_score,sample_count\n101,0.2,3\n102,,1\n,0.5,1\n");
        let read = read_layer(LayerTag::Distress, &path).unwrap();

        assert_eq!(read.layer.len(), 2);
        let first = &read.layer.records()[0];
        assert_eq!(first.segment_key(), Some("101"));
        assert_eq!(first.value, 0.2);
        assert_eq!(first.weight, Some(3.0));
        assert!(read.layer.records()[1].value.is_nan());
        assert!(matches!(read.conditions[..], [Condition::DroppedFeatures { count: 1, .. }]));
    }

    #[test]
    fn complexity_without_score_is_a_schema_mismatch() {
        let (_dir, path) = table("center_x,center_y\n-122.4,37.7\n");
        let read = read_layer(LayerTag::Complexity, &path).unwrap();

        assert!(read.layer.is_empty());
        match &read.conditions[..] {
            [Condition::SchemaMismatch { missing_columns, .. }] => assert_eq!(missing_columns, &["complexity_score"]),
            other => panic!("unexpected conditions {other:?}"),
        }
    }

    #[test]
    fn complexity_reads_points_and_scenario_ids() {
        let (_dir, path) = table("scenario_id,center_x,center_y,complexity_score\nosm_0,-122.4,37.7,0.6\n");
        let read = read_layer(LayerTag::Complexity, &path).unwrap();
        let record = &read.layer.records()[0];

        assert_eq!(record.point(), Some(Point::new(-122.4, 37.7)));
        assert_eq!(record.value, 0.6);
        assert_eq!(record.key.as_deref(), Some("osm_0"));
    }

    #[test]
    fn accident_severity_from_casualty_counts() {
        let (_dir, path) = table(
            "LATITUDE,LONGITUDE,NUMBER_KILLED,COUNT_SEVERE_INJ,NUMBER_INJURED\n\
             37.7,-122.4,1,0,2\n\
             37.7,-122.4,0,0,0\n",
        );
        let read = read_layer(LayerTag::Accident, &path).unwrap();
        let weights = read.layer.records().iter().map(|r| r.weight).collect::<Vec<_>>();
        assert_eq!(weights, vec![Some(5.0), Some(1.0)]);
    }

    #[test]
    fn explicit_severity_weight_wins() {
        let (_dir, path) = table("latitude,longitude,severity_weight,number_killed\n37.7,-122.4,2.5,1\n37.8,-122.5,,0\n,-122.6,1.0,0\n");
        let read = read_layer(LayerTag::Accident, &path).unwrap();
        assert_eq!(read.layer.len(), 2);
        assert_eq!(read.layer.records()[0].weight, Some(2.5));
        assert_eq!(read.layer.records()[1].weight, None);
        assert_eq!(read.layer.records()[1].point(), Some(Point::new(-122.5, 37.8)));
        assert!(matches!(read.conditions[..], [Condition::DroppedFeatures { count: 1, .. }]));
    }
}
