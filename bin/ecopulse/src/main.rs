//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Binary entrypoint for the telemetry generator."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ecopulse_common::{init_tracing, parse_sites, AppConfig, GeneratorConfig, LogFormat};
use ecopulse_sim::{
    analyze_path, parse_seed, seeded_rng, Catalog, EmissionSettings, Emitter, JsonlSink,
    ProfileTable, StopReason, Synthesizer,
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Emit synthetic energy consumption telemetry as JSON Lines",
    long_about = None
)]
struct Cli {
    /// TOML configuration file (`ECOPULSE_CONFIG` takes precedence)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: GeneratorArgs,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<CliLogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Settings that override the configuration file.
#[derive(Debug, Default, Args)]
struct GeneratorArgs {
    /// Seconds between two ticks (fractions allowed)
    #[arg(long = "interval-secs", env = "FREQ_SECONDS", global = true)]
    interval_secs: Option<f64>,

    /// Comma separated list of site identifiers
    #[arg(long, env = "SITES", value_parser = parse_site_list, global = true)]
    sites: Option<SiteList>,

    /// Append target for emitted readings
    #[arg(long = "out", env = "OUT_PATH", global = true)]
    out_path: Option<PathBuf>,

    /// Stop after emitting this many readings
    #[arg(long, env = "MAX_MESSAGES", global = true)]
    max_messages: Option<u64>,

    /// Seed for reproducible output
    #[arg(
        long,
        env = "RANDOM_SEED",
        value_parser = parse_seed_arg,
        global = true,
        allow_hyphen_values = true
    )]
    seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SiteList(Vec<String>);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogFormat {
    Json,
    Pretty,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Json => LogFormat::StructuredJson,
            CliLogFormat::Pretty => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Emit readings until the budget is spent or interrupted")]
    Run,
    #[command(about = "Summarise an existing sink file")]
    Analyze {
        /// Sink to read; defaults to the configured output path
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },
}

fn parse_site_list(raw: &str) -> Result<SiteList, String> {
    parse_sites(raw).map(SiteList).map_err(|err| err.to_string())
}

fn parse_seed_arg(raw: &str) -> Result<u64, String> {
    parse_seed(raw).map_err(|err| err.to_string())
}

fn apply_overrides(config: &mut GeneratorConfig, args: &GeneratorArgs) -> Result<()> {
    if let Some(secs) = args.interval_secs {
        config.set_interval_secs(secs)?;
    }
    if let Some(SiteList(sites)) = &args.sites {
        config.sites = sites.clone();
    }
    if let Some(path) = &args.out_path {
        config.out_path = path.clone();
    }
    if let Some(max) = args.max_messages {
        config.max_messages = Some(max);
    }
    if let Some(seed) = args.seed {
        config.random_seed = Some(seed);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut config.generator, &cli.overrides)?;
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    config.validate()?;
    init_tracing("ecopulse", &config.logging)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config.generator).await,
        Commands::Analyze { path } => {
            analyze(path.as_deref().unwrap_or(config.generator.out_path.as_path()))
        }
    }
}

async fn run(config: &GeneratorConfig) -> Result<()> {
    let profiles = ProfileTable::standard();
    let catalog = Catalog::standard(config.sites.clone(), &profiles)?;
    let mut emitter = Emitter::new(
        Synthesizer::new(profiles),
        catalog,
        seeded_rng(config.random_seed),
        EmissionSettings {
            interval: config.interval,
            max_messages: config.max_messages,
        },
    );
    let mut sink = JsonlSink::open(&config.out_path)?;

    println!("[EcoPulse] Writing messages to {}", config.out_path.display());
    match config.max_messages {
        Some(max) => println!(
            "-> {} messages max, every {}s",
            max,
            config.interval.as_secs_f64()
        ),
        None => println!(
            "-> unbounded, every {}s (Ctrl-C to stop)",
            config.interval.as_secs_f64()
        ),
    }

    let shutdown = armed(interrupted());
    let report = emitter.run_until(&mut sink, shutdown).await?;
    match report.stop {
        StopReason::BudgetReached => println!(
            "[EcoPulse] Done! {} messages written to {}",
            report.emitted,
            config.out_path.display()
        ),
        StopReason::Interrupted => println!(
            "[EcoPulse] Interrupted after {} messages written to {}",
            report.emitted,
            config.out_path.display()
        ),
    }
    Ok(())
}

/// Start polling `signal` on its own task right away, so the listener is
/// registered before the first tick rather than at the first pause.
fn armed<F>(signal: F) -> impl Future<Output = ()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::spawn(signal);
    async move {
        if let Err(err) = listener.await {
            warn!(error = %err, "interrupt listener stopped");
            std::future::pending::<()>().await;
        }
    }
}

async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received"),
        Err(err) => {
            warn!(error = %err, "unable to listen for interrupts");
            std::future::pending::<()>().await;
        }
    }
}

fn analyze(path: &Path) -> Result<()> {
    let summary = analyze_path(path).with_context(|| {
        format!(
            "cannot analyze {}; run the generator first",
            path.display()
        )
    })?;
    print!("{summary}");
    Ok(())
}
