use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use skald::build::build_site;
use skald::config::Config;
use skald::draft::{BuildMode, LOAD_DRAFTS};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skald")]
#[command(about = "Static site generator for blogs")]
#[command(version)]
struct Cli {
    /// Log debug events
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site. Set LOAD_DRAFTS=true to include drafts.
    Build(BuildArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Any directory inside the project; `skald.yaml` is looked up from here
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// Output directory [default: `_site` under the project root]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of worker threads [default: one per core]
    #[arg(long)]
    threads: Option<usize>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "skald=debug" } else { "skald=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn init_thread_pool(threads: Option<usize>) -> Result<()> {
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Configuring the thread pool")?;
    }
    Ok(())
}

fn build(args: BuildArgs) -> Result<()> {
    init_thread_pool(args.threads)?;
    let config = Config::from_directory(&args.project, args.output.as_deref())?;
    let mode = BuildMode::from_env();
    info!(
        project = %config.project_root.display(),
        drafts = mode.include_drafts,
        "building site"
    );
    if mode.include_drafts {
        info!("{} is set; drafts will be published", LOAD_DRAFTS);
    }
    build_site(&config, mode).context("Building site")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Command::Build(args) => build(args),
    }
}
