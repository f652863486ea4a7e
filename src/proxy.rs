//! Behavioral-complexity proxy derived from road attributes.
//!
//! Stands in for a trajectory-derived complexity table when none exists: one
//! scenario per segment, placed at the segment centroid, scored from its
//! highway class, lane count, directionality and speed limit.

use std::sync::{Arc, OnceLock};

use anyhow::{anyhow, Result};
use geo::Point;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use regex::Regex;
use serde_json::Value;
use tracing::info;

use crate::config::ProxyConfig;
use crate::layers::{LayerTag, RiskLayer, RiskLayerRecord};
use crate::network::{HighwayKind, RoadNetwork, RoadSegment};

const MIN_SCORE: f64 = 0.1;
const MAX_SCORE: f64 = 1.0;

/// A synthetic complexity scenario for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyScenario {
    pub scenario_id: Arc<str>,
    /// Segment centroid in lon/lat.
    pub center: Point<f64>,
    pub complexity_score: f64,
}

/// Score every segment of `network`, in segment order.
pub fn generate(network: &RoadNetwork, config: &ProxyConfig) -> Result<Vec<ProxyScenario>> {
    let noise = Normal::new(0.0, config.jitter_sigma)
        .map_err(|e| anyhow!("[proxy] invalid jitter sigma {}: {e}", config.jitter_sigma))?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let scenarios = network.segments().iter().enumerate()
        .map(|(i, segment)| {
            let jitter = noise.sample(&mut rng);
            ProxyScenario {
                scenario_id: Arc::from(format!("osm_{i}")),
                center: segment.centroid_lonlat(),
                complexity_score: (structural_score(segment) + jitter).clamp(MIN_SCORE, MAX_SCORE),
            }
        })
        .collect::<Vec<_>>();

    info!(segments = scenarios.len(), sigma = config.jitter_sigma, "generated complexity proxy");
    Ok(scenarios)
}

/// Complexity layer built from proxy scenarios.
pub fn to_layer(scenarios: &[ProxyScenario]) -> Result<RiskLayer> {
    RiskLayer::new(LayerTag::Complexity, scenarios.iter()
        .map(|s| RiskLayerRecord::complexity(s.center, s.complexity_score, Some(s.scenario_id.clone())))
        .collect())
}

/// Clipped score before jitter.
fn structural_score(segment: &RoadSegment) -> f64 {
    let base = segment.highway().map_or(HighwayKind::Unknown.base_complexity(), HighwayKind::base_complexity);
    let score = base
        + lane_factor(segment.property("lanes"))
        + oneway_factor(segment.property("oneway"))
        + speed_factor(segment.property("maxspeed"));
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// `+0.05` per lane beyond the first; unparsable or missing counts as one lane.
fn lane_factor(lanes: Option<&Value>) -> f64 {
    let lanes = match lanes {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    (lanes.filter(|l| l.is_finite()).unwrap_or(1.0) - 1.0) * 0.05
}

/// One-way roads are simpler than two-way roads.
fn oneway_factor(oneway: Option<&Value>) -> f64 {
    let oneway = match oneway {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "1"),
        _ => false,
    };
    if oneway { -0.05 } else { 0.05 }
}

/// Slow zones add complexity, fast roads remove some.
fn speed_factor(maxspeed: Option<&Value>) -> f64 {
    let speed = match maxspeed {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_speed(s),
        _ => None,
    };
    match speed {
        Some(s) if s <= 25.0 => 0.15,
        Some(s) if s <= 35.0 => 0.05,
        Some(s) if s <= 45.0 => 0.0,
        Some(_) => -0.05,
        None => 0.0,
    }
}

/// Numeric part of a posted limit such as `"25 mph"` or `"40"`.
fn parse_speed(value: &str) -> Option<f64> {
    static SPEED: OnceLock<Option<Regex>> = OnceLock::new();
    let re = SPEED.get_or_init(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:mph|kmh|km/h)?\s*$").ok());
    re.as_ref()?
        .captures(value)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}
