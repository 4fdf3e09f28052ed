mod commands;
mod config;
mod input;
mod output;
mod staging;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::build::BuildArgs;
use commands::facts::FactsArgs;
use commands::ma::MergerArgs;
use commands::valuation::{CompsArgs, DcfArgs, PrecedentsArgs};
use config::DealConfig;

/// Deal pitchbook: DCF valuation and merger accretion/dilution
#[derive(Parser)]
#[command(
    name = "pitchbook",
    version,
    about = "Deal pitchbook: DCF valuation and merger accretion/dilution",
    long_about = "Stages company facts, values the acquirer with a constant-growth DCF, \
                  runs the accretion/dilution model for the deal, and writes the tables \
                  a pitchbook is assembled from. All arithmetic is 128-bit decimal."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Deal config file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only on stderr
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage acquirer and target facts into the raw-data directory
    Facts(FactsArgs),
    /// Run a constant-growth FCF DCF valuation
    Dcf(DcfArgs),
    /// Evaluate merger accretion/dilution
    Merger(MergerArgs),
    /// Trading comparables analysis
    Comps(CompsArgs),
    /// Precedent transactions analysis
    Precedents(PrecedentsArgs),
    /// Run the full pipeline and write the pitchbook tables
    Build(BuildArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.quiet, cli.verbose) {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(1);
    }

    let config = match DealConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Facts(args) => commands::facts::run_facts(args, &config),
        Commands::Dcf(args) => commands::valuation::run_dcf(args, &config),
        Commands::Merger(args) => commands::ma::run_merger(args, &config),
        Commands::Comps(args) => commands::valuation::run_comps(args, &config),
        Commands::Precedents(args) => commands::valuation::run_precedents(args, &config),
        Commands::Build(args) => commands::build::run_build(args, &config),
        Commands::Version => {
            println!("pitchbook {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable. `PITCHBOOK_LOG`
/// overrides the level picked by the flags.
fn init_tracing(quiet: bool, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("PITCHBOOK_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("failed to initialize tracing subscriber: {e}"))?;

    Ok(())
}
