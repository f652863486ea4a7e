use anyhow::Result;
use roadrisk::{assert_not_stdout, check_overwrite, generate_proxy, read_network, write_proxy, RiskConfig};
use tracing::info;

use crate::cli::{Cli, ProxyArgs};

pub fn run(_cli: &Cli, args: &ProxyArgs) -> Result<()> {
    assert_not_stdout(&args.output)?;
    check_overwrite(&args.output, args.force)?;

    let mut config = match &args.config {
        Some(path) => RiskConfig::load(path)?,
        None => RiskConfig::default(),
    };
    if let Some(sigma) = args.sigma { config.proxy.jitter_sigma = sigma; }
    if let Some(seed) = args.seed { config.proxy.seed = seed; }
    config.validate()?;

    info!(network = %args.network.display(), "loading road network");
    let network = read_network(&args.network, &config.projection)?;
    let scenarios = generate_proxy(&network, &config.proxy)?;

    write_proxy(&scenarios, &args.output)?;
    eprintln!("wrote {} proxy scenarios to {}", scenarios.len(), args.output.display());
    Ok(())
}
