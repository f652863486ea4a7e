//! GeoJSON road networks and stage artifacts.
//!
//! Artifacts are FeatureCollections in lon/lat whose properties carry the
//! source attributes followed by every attribute group computed so far.
//! Reading an artifact back restores those groups onto the segments.

mod read;
mod write;

pub use read::read_network;
pub use write::write_network;

/// Property keys written by the pipeline rather than the source network.
pub(crate) const ATTRIBUTE_KEYS: &[&str] = &[
    "centroid_lon", "centroid_lat",
    "avg_distress", "max_distress", "std_distress", "sample_count", "reliable", "distress_imputed", "distress_class",
    "avg_complexity", "max_complexity", "scenario_count", "complexity_imputed",
    "accident_count", "severity_score",
    "norm_surface", "norm_behavior", "norm_accidents", "risk_score", "risk_tier", "dominant_factor",
    "gi_zscore", "gi_pvalue", "gi_pvalue_norm", "neighbor_count", "hotspot_class",
];
