//! Stage orchestration, artifacts and run diagnostics.
//!
//! A full run fuses the three risk layers onto the base network, scores it,
//! and runs the hotspot analysis, writing one GeoJSON artifact per stage. A
//! single stage can be rerun on its own from the previous stage's artifact.

mod diagnostics;
mod manifest;

use std::{collections::BTreeMap, path::{Path, PathBuf}};

use anyhow::{ensure, Context, Result};
use tracing::{info, warn};

use crate::config::RiskConfig;
use crate::hotspot;
use crate::io::{self, LayerRead};
use crate::join::{JoinReport, SpatialJoinEngine};
use crate::layers::{LayerTag, RiskLayer};
use crate::network::{RoadNetwork, Stage};
use crate::proxy;
use crate::score::RiskNormalizer;

pub use diagnostics::{Condition, Distribution, RunDiagnostics};
pub use manifest::{FileHash, Manifest, MANIFEST_NAME};

pub const SEGMENTS_NAME: &str = "segments.csv";
pub const DIAGNOSTICS_NAME: &str = "diagnostics.json";
pub const PROXY_NAME: &str = "complexity_proxy.csv";

/// Where the behavioral-complexity layer comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ComplexitySource {
    Table(PathBuf),
    /// Derived from the network's own road attributes.
    Proxy,
    Absent,
}

/// Input files of the fuse stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInputs {
    pub network: PathBuf,
    pub distress: Option<PathBuf>,
    pub complexity: ComplexitySource,
    pub accidents: Option<PathBuf>,
}

impl PipelineInputs {
    pub fn new(network: impl Into<PathBuf>) -> Self {
        Self { network: network.into(), distress: None, complexity: ComplexitySource::Absent, accidents: None }
    }
}

/// Result of a run: the enriched network and what was observed on the way.
#[derive(Debug)]
pub struct RunOutcome {
    pub network: RoadNetwork,
    pub diagnostics: RunDiagnostics,
    pub manifest: Manifest,
}

/// Runs pipeline stages against an output directory.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: RiskConfig,
    out_dir: PathBuf,
    force: bool,
}

impl Pipeline {
    /// Validates `config` once; every stage trusts it afterwards.
    pub fn new(config: RiskConfig, out_dir: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        let out_dir = out_dir.into();
        io::assert_not_stdout(&out_dir)?;
        Ok(Self { config, out_dir, force: false })
    }

    /// Allow stage artifacts that already exist to be replaced.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[inline] pub fn config(&self) -> &RiskConfig { &self.config }

    #[inline] pub fn out_dir(&self) -> &Path { &self.out_dir }

    pub fn artifact_path(&self, stage: Stage) -> PathBuf {
        self.out_dir.join(stage.artifact_name())
    }

    /// Fuse, score and analyze hotspots, writing every artifact.
    pub fn run(&self, inputs: &PipelineInputs) -> Result<RunOutcome> {
        self.check_targets(&Stage::ALL)?;

        let mut diagnostics = RunDiagnostics::default();
        let mut network = self.load_network(&inputs.network, &mut diagnostics)?;

        self.fuse(&mut network, inputs, &mut diagnostics)?;
        io::write_network(&network, &self.artifact_path(Stage::Fuse))?;
        self.score(&mut network, &mut diagnostics)?;
        io::write_network(&network, &self.artifact_path(Stage::Score))?;
        self.hotspots(&mut network, &mut diagnostics)?;
        io::write_network(&network, &self.artifact_path(Stage::Hotspot))?;

        self.finish(network, diagnostics, &Stage::ALL, &inputs.complexity)
    }

    /// Rerun one stage. `fuse` reads the inputs; later stages read the
    /// previous stage's artifact from the output directory.
    pub fn run_stage(&self, stage: Stage, inputs: Option<&PipelineInputs>) -> Result<RunOutcome> {
        self.check_targets(&[stage])?;

        let mut diagnostics = RunDiagnostics::default();
        let mut network = match stage.previous() {
            None => {
                let inputs = inputs.context("[pipeline] the fuse stage needs input files")?;
                let mut network = self.load_network(&inputs.network, &mut diagnostics)?;
                self.fuse(&mut network, inputs, &mut diagnostics)?;
                network
            }
            Some(previous) => {
                let path = self.artifact_path(previous);
                ensure!(path.is_file(),
                    "[pipeline] {} not found; run the {} stage first", path.display(), previous.as_str());
                let mut network = self.load_network(&path, &mut diagnostics)?;
                ensure!(network.has_stage(previous),
                    "[pipeline] {} lacks {} attributes; run the {} stage first",
                    path.display(), previous.as_str(), previous.as_str());
                network.clear_from(stage);
                match stage {
                    Stage::Score => self.score(&mut network, &mut diagnostics)?,
                    _ => self.hotspots(&mut network, &mut diagnostics)?,
                }
                network
            }
        };

        io::write_network(&network, &self.artifact_path(stage))?;
        self.warn_stale(stage);

        let complexity = match (stage, inputs) {
            (Stage::Fuse, Some(inputs)) => inputs.complexity.clone(),
            _ => ComplexitySource::Absent,
        };
        self.finish(network, diagnostics, &[stage], &complexity)
    }

    /// Join the three layers onto `network`.
    pub fn fuse(&self, network: &mut RoadNetwork, inputs: &PipelineInputs, diagnostics: &mut RunDiagnostics) -> Result<()> {
        let engine = SpatialJoinEngine::new(&self.config.join);
        network.clear_from(Stage::Fuse);

        let distress = self.load_layer(LayerTag::Distress, inputs.distress.as_deref(), diagnostics)?;
        let complexity = match &inputs.complexity {
            ComplexitySource::Table(path) => self.load_layer(LayerTag::Complexity, Some(path.as_path()), diagnostics)?,
            ComplexitySource::Absent => self.load_layer(LayerTag::Complexity, None, diagnostics)?,
            ComplexitySource::Proxy => {
                let scenarios = proxy::generate(network, &self.config.proxy)?;
                io::write_proxy(&scenarios, &self.out_dir.join(PROXY_NAME))?;
                proxy::to_layer(&scenarios)?
            }
        };
        let accidents = self.load_layer(LayerTag::Accident, inputs.accidents.as_deref(), diagnostics)?;

        let reports = [
            engine.join_distress(network, &distress)?,
            engine.join_complexity(network, &complexity)?,
            engine.join_accidents(network, &accidents)?,
        ];
        for report in reports {
            record_join(&report, diagnostics);
            diagnostics.joins.push(report);
        }
        Ok(())
    }

    /// Normalize, combine and tier the fused attributes.
    pub fn score(&self, network: &mut RoadNetwork, diagnostics: &mut RunDiagnostics) -> Result<()> {
        let report = RiskNormalizer::new(&self.config.scoring).score(network)?;
        for attribute in &report.constant_attributes {
            diagnostics.record(Condition::ConstantDistribution { attribute: attribute.to_string() });
        }
        diagnostics.scoring = Some(report);
        Ok(())
    }

    /// Spatial weights, Gi* and classification.
    pub fn hotspots(&self, network: &mut RoadNetwork, diagnostics: &mut RunDiagnostics) -> Result<()> {
        let report = hotspot::analyze(network, &self.config.hotspot)?;
        if !report.islands.is_empty() {
            diagnostics.record(Condition::DegenerateNeighborhood { segment_ids: report.islands.clone() });
        }
        let recorded = diagnostics.has_condition(|c| {
            matches!(c, Condition::ConstantDistribution { attribute } if attribute == "risk_score")
        });
        if report.constant && !recorded {
            diagnostics.record(Condition::ConstantDistribution { attribute: "risk_score".into() });
        }
        diagnostics.hotspots = Some(report);
        Ok(())
    }

    fn load_network(&self, path: &Path, diagnostics: &mut RunDiagnostics) -> Result<RoadNetwork> {
        let network = io::read_network(path, &self.config.projection)?;
        ensure!(!network.is_empty(), "[pipeline] {} has no usable road segments", path.display());
        if network.dropped() > 0 {
            diagnostics.record(Condition::DroppedFeatures {
                reason: "road features without usable geometry".into(),
                count: network.dropped(),
            });
        }
        Ok(network)
    }

    /// Read a layer table, recording why it degraded when it did.
    fn load_layer(&self, tag: LayerTag, path: Option<&Path>, diagnostics: &mut RunDiagnostics) -> Result<RiskLayer> {
        let Some(path) = path else {
            diagnostics.record(Condition::MissingInputArtifact { layer: tag, path: PathBuf::new() });
            return Ok(RiskLayer::empty(tag));
        };
        let LayerRead { layer, conditions } = io::read_layer(tag, path)?;
        conditions.into_iter().for_each(|c| diagnostics.record(c));
        Ok(layer)
    }

    /// Refuse to replace existing stage artifacts unless forced.
    fn check_targets(&self, stages: &[Stage]) -> Result<()> {
        for &stage in stages {
            io::check_overwrite(&self.artifact_path(stage), self.force)?;
        }
        Ok(())
    }

    /// Downstream artifacts of an earlier run no longer match a rerun stage.
    /// They are left in place but kept out of the manifest.
    fn warn_stale(&self, stage: Stage) {
        for later in Stage::ALL.into_iter().filter(|&s| s > stage) {
            let path = self.artifact_path(later);
            if path.is_file() {
                warn!(artifact = %path.display(), rerun = stage.as_str(), "stale artifact from an earlier run");
            }
        }
    }

    /// Write the per-segment table, diagnostics and a manifest of the files
    /// this run wrote.
    fn finish(
        &self,
        network: RoadNetwork,
        mut diagnostics: RunDiagnostics,
        stages: &[Stage],
        complexity: &ComplexitySource,
    ) -> Result<RunOutcome> {
        diagnostics.segments = network.len();
        diagnostics.distribution = Distribution::of(&network);

        io::write_segments(&network, &self.out_dir.join(SEGMENTS_NAME))?;
        io::fs::write_json(&diagnostics, &self.out_dir.join(DIAGNOSTICS_NAME))?;

        let counts = BTreeMap::from([
            ("segments", network.len()),
            ("dropped_features", network.dropped()),
            ("conditions", diagnostics.conditions.len()),
        ]);
        let mut names = stages.iter().map(|s| s.artifact_name()).collect::<Vec<_>>();
        if stages.contains(&Stage::Fuse) && *complexity == ComplexitySource::Proxy {
            names.push(PROXY_NAME);
        }
        names.extend([SEGMENTS_NAME, DIAGNOSTICS_NAME]);
        let manifest = Manifest::new(
            &self.out_dir,
            &names,
            network.projector().definition(),
            network.completed_stage(),
            diagnostics.seed(),
            &self.config,
            counts,
        )?;
        io::fs::write_json(&manifest, &self.out_dir.join(MANIFEST_NAME))?;

        info!(
            out = %self.out_dir.display(),
            segments = network.len(),
            stage = ?manifest.stage,
            conditions = diagnostics.conditions.len(),
            "run complete"
        );
        Ok(RunOutcome { network, diagnostics, manifest })
    }
}

/// Turn the leftovers of a join into recorded conditions.
fn record_join(report: &JoinReport, diagnostics: &mut RunDiagnostics) {
    if report.unmatched_records > 0 {
        diagnostics.record(Condition::UnmatchedRecords {
            layer: report.layer,
            count: report.unmatched_records,
            radius_m: report.radius_m,
        });
    }
    if report.invalid_records > 0 {
        diagnostics.record(Condition::DroppedFeatures {
            reason: format!("{} records with invalid values", report.layer),
            count: report.invalid_records,
        });
    }
}
