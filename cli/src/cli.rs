use std::path::PathBuf;

/// Road risk fusion and hotspot analysis
#[derive(clap::Parser, Debug)]
#[command(name = "roadrisk", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Fuse, score and analyze hotspots in one go
    Run(RunArgs),

    /// Fuse the risk layers onto the base network
    Fuse(RunArgs),

    /// Score a fused artifact from the output directory
    Score(StageArgs),

    /// Run the hotspot analysis on a scored artifact from the output directory
    Hotspots(StageArgs),

    /// Derive a complexity table from road attributes (forbids stdout)
    Proxy(ProxyArgs),
}

#[derive(clap::Args, Debug)]
pub struct InputArgs {
    /// Base road network (GeoJSON, lon/lat)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub network: PathBuf,

    /// Surface distress table (CSV keyed by segment id)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub distress: Option<PathBuf>,

    /// Behavioral complexity table (CSV of scenario points)
    #[arg(long, value_hint = clap::ValueHint::FilePath, conflicts_with = "complexity_proxy")]
    pub complexity: Option<PathBuf>,

    /// Derive behavioral complexity from road attributes instead of a table
    #[arg(long)]
    pub complexity_proxy: bool,

    /// Accident table (CSV of crash points)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub accidents: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct OutputArgs {
    /// Output directory for artifacts
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub out: PathBuf,

    /// Overwrite existing stage artifacts
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// JSON configuration file; missing fields take defaults
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Permutation seed for the hotspot test
    #[arg(long, conflicts_with = "unseeded")]
    pub seed: Option<u64>,

    /// Draw a fresh permutation seed (it is recorded in diagnostics.json)
    #[arg(long)]
    pub unseeded: bool,

    /// Number of conditional permutations per segment
    #[arg(long)]
    pub permutations: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(clap::Args, Debug)]
pub struct StageArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(clap::Args, Debug)]
pub struct ProxyArgs {
    /// Base road network (GeoJSON, lon/lat)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub network: PathBuf,

    /// Output complexity table (CSV)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Standard deviation of the Gaussian jitter
    #[arg(long)]
    pub sigma: Option<f64>,

    /// Jitter seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON configuration file (projection and proxy settings)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}
