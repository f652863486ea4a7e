use anyhow::Result;
use tracing::info;

use crate::cli::{Cli, RunArgs};

pub fn run(_cli: &Cli, args: &RunArgs) -> Result<()> {
    let pipeline = super::build_pipeline(&args.config, &args.output)?;
    let inputs = super::inputs(&args.inputs);

    info!(network = %inputs.network.display(), out = %pipeline.out_dir().display(), "running all stages");
    let outcome = pipeline.run(&inputs)?;

    super::summarize(&outcome);
    Ok(())
}
