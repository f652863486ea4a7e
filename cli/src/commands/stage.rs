use anyhow::Result;
use roadrisk::Stage;
use tracing::info;

use crate::cli::{Cli, RunArgs, StageArgs};

/// Rerun the fuse stage from the input files.
pub fn fuse(_cli: &Cli, args: &RunArgs) -> Result<()> {
    let pipeline = super::build_pipeline(&args.config, &args.output)?;
    let inputs = super::inputs(&args.inputs);

    info!(stage = Stage::Fuse.as_str(), out = %pipeline.out_dir().display(), "running stage");
    let outcome = pipeline.run_stage(Stage::Fuse, Some(&inputs))?;

    super::summarize(&outcome);
    Ok(())
}

/// Rerun `stage` from the previous stage's artifact.
pub fn run(_cli: &Cli, stage: Stage, args: &StageArgs) -> Result<()> {
    let pipeline = super::build_pipeline(&args.config, &args.output)?;

    info!(stage = stage.as_str(), out = %pipeline.out_dir().display(), "running stage");
    let outcome = pipeline.run_stage(stage, None)?;

    super::summarize(&outcome);
    Ok(())
}
