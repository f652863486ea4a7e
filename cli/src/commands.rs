pub mod pipeline;
pub mod proxy;
pub mod stage;

use anyhow::Result;
use roadrisk::{ComplexitySource, Pipeline, PipelineInputs, RiskConfig, RunOutcome};

use crate::cli::{ConfigArgs, InputArgs, OutputArgs};

/// Load the config file (or defaults) and apply flag overrides.
pub(crate) fn load_config(args: &ConfigArgs) -> Result<RiskConfig> {
    let mut config = match &args.config {
        Some(path) => RiskConfig::load(path)?,
        None => RiskConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.hotspot.seed = Some(seed);
    }
    if args.unseeded {
        config.hotspot.seed = None;
    }
    if let Some(permutations) = args.permutations {
        config.hotspot.permutations = permutations;
    }
    Ok(config)
}

pub(crate) fn build_pipeline(config: &ConfigArgs, output: &OutputArgs) -> Result<Pipeline> {
    Ok(Pipeline::new(load_config(config)?, &output.out)?.force(output.force))
}

pub(crate) fn inputs(args: &InputArgs) -> PipelineInputs {
    let complexity = match (&args.complexity, args.complexity_proxy) {
        (Some(path), _) => ComplexitySource::Table(path.clone()),
        (None, true) => ComplexitySource::Proxy,
        (None, false) => ComplexitySource::Absent,
    };
    PipelineInputs {
        network: args.network.clone(),
        distress: args.distress.clone(),
        complexity,
        accidents: args.accidents.clone(),
    }
}

/// One-paragraph summary on stderr once a run finishes.
pub(crate) fn summarize(outcome: &RunOutcome) {
    let diagnostics = &outcome.diagnostics;
    eprintln!("segments: {}", diagnostics.segments);
    for (layer, coverage) in diagnostics.coverage() {
        eprintln!("  {layer:<10} coverage {:>5.1}%", coverage * 100.0);
    }
    for (tier, count) in &diagnostics.distribution.risk_tiers {
        eprintln!("  tier {tier:<10} {count}");
    }
    for (class, count) in &diagnostics.distribution.hotspot_classes {
        eprintln!("  {class:<16} {count}");
    }
    if let Some(seed) = diagnostics.seed() {
        eprintln!("  permutation seed {seed}");
    }
    if !diagnostics.conditions.is_empty() {
        eprintln!("  {} condition(s) recorded; see diagnostics.json", diagnostics.conditions.len());
    }
}
