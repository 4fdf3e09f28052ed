use std::path::Path;

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use pitchbook_core::facts::FactsProvider;
use pitchbook_core::valuation::comps::{self, CompsInput, MultipleType};
use pitchbook_core::valuation::dcf::{self, DcfInput, ProjectionConfig};
use pitchbook_core::valuation::precedents::{self, PrecedentsInput};

use crate::config::DealConfig;
use crate::{input, staging};

/// Arguments for DCF valuation
#[derive(Args)]
pub struct DcfArgs {
    /// Path to JSON input file with a full DCF input (overrides other flags)
    #[arg(long)]
    pub input: Option<String>,

    /// FCF history CSV with `year,fcf` columns
    #[arg(long)]
    pub fcf: Option<String>,

    /// Company to value (defaults to the config's acquirer)
    #[arg(long)]
    pub ticker: Option<String>,

    /// Discount rate (e.g. 0.115 for 11.5%)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Perpetual growth rate for the terminal value
    #[arg(long, alias = "perp_growth")]
    pub perp_growth: Option<Decimal>,

    /// Annual FCF growth over the explicit horizon
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// Explicit projection years
    #[arg(long)]
    pub years: Option<u32>,

    /// Report enterprise value only, without the equity bridge
    #[arg(long)]
    pub no_bridge: bool,
}

/// Arguments for comparable company analysis
#[derive(Args)]
pub struct CompsArgs {
    /// Path to JSON input file with target and peers
    #[arg(long)]
    pub input: Option<String>,

    /// Peers CSV in the staged facts layout (defaults to <raw_dir>/comps.csv)
    #[arg(long)]
    pub peers: Option<String>,

    /// Company being valued (defaults to the config's acquirer)
    #[arg(long)]
    pub target: Option<String>,
}

/// Arguments for precedent transactions analysis
#[derive(Args)]
pub struct PrecedentsArgs {
    /// Path to JSON input file with target and transactions
    #[arg(long)]
    pub input: Option<String>,

    /// Transactions CSV (defaults to <raw_dir>/precedents.csv)
    #[arg(long)]
    pub transactions: Option<String>,

    /// Company the transaction multiples are applied to (defaults to the config's target)
    #[arg(long)]
    pub target: Option<String>,
}

pub fn run_dcf(args: DcfArgs, config: &DealConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let dcf_input: DcfInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        dcf_input_from_args(&args, config)?
    };

    let result = dcf::calculate_dcf(&dcf_input)?;
    info!(
        enterprise_value = %result.result.projection.enterprise_value.round_dp(0),
        "DCF complete"
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_comps(
    args: CompsArgs,
    config: &DealConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let comps_input: CompsInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let ticker = args.target.as_deref().unwrap_or(&config.acquirer);
        let peers_path = match args.peers {
            Some(ref p) => input::file::resolve_path(p)?,
            None => config.raw_dir.join(staging::COMPS_FILE),
        };
        comps_input_from_files(ticker, &peers_path, &config.raw_dir)?
    };

    let result = comps::calculate_comps(&comps_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_precedents(
    args: PrecedentsArgs,
    config: &DealConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let precedents_input: PrecedentsInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let ticker = args.target.as_deref().unwrap_or(&config.target);
        let path = match args.transactions {
            Some(ref p) => input::file::resolve_path(p)?,
            None => config.raw_dir.join(staging::PRECEDENTS_FILE),
        };
        precedents_input_from_files(ticker, &path, &config.raw_dir)?
    };

    let result = precedents::calculate_precedents(&precedents_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Assemble a DCF input from flags, the deal config, and the provider chain.
pub fn dcf_input_from_args(
    args: &DcfArgs,
    config: &DealConfig,
) -> Result<DcfInput, Box<dyn std::error::Error>> {
    let discount_rate = args.discount_rate.unwrap_or(config.discount_rate);
    let perpetual_growth = args.perp_growth.unwrap_or(config.perpetual_growth);
    let projection = ProjectionConfig {
        annual_growth_rate: args.growth_rate.unwrap_or(config.annual_growth_rate),
        horizon_years: args.years.unwrap_or(config.horizon_years),
    };
    let ticker = args.ticker.as_deref().unwrap_or(&config.acquirer);
    let provider = super::provider_chain(&config.raw_dir);

    let series = match args.fcf {
        Some(ref path) => staging::read_fcf_csv(&input::file::resolve_path(path)?)?,
        None => provider.fcf_history(ticker)?,
    };

    // An explicit FCF file belongs to an unnamed company unless --ticker says otherwise.
    let bridge = !args.no_bridge && (args.fcf.is_none() || args.ticker.is_some());
    if !bridge {
        return Ok(DcfInput {
            fcf_series: series,
            discount_rate,
            perpetual_growth,
            config: projection,
            net_debt: None,
            shares_outstanding: None,
        });
    }

    let facts = provider.company_facts(ticker)?;
    Ok(DcfInput::for_company(
        &facts,
        series,
        discount_rate,
        perpetual_growth,
        projection,
    ))
}

/// Target facts from the provider chain, peers from a facts-layout CSV.
pub fn comps_input_from_files(
    target: &str,
    peers_path: &Path,
    raw_dir: &Path,
) -> Result<CompsInput, Box<dyn std::error::Error>> {
    if !peers_path.is_file() {
        return Err(format!("Comps file missing: {}", peers_path.display()).into());
    }
    let peers = staging::read_facts_csv(peers_path)?;
    let target = super::provider_chain(raw_dir).company_facts(target)?;
    Ok(CompsInput {
        target,
        peers,
        multiples: MultipleType::ALL.to_vec(),
    })
}

/// Target facts from the provider chain, transactions from a staged CSV.
pub fn precedents_input_from_files(
    target: &str,
    transactions_path: &Path,
    raw_dir: &Path,
) -> Result<PrecedentsInput, Box<dyn std::error::Error>> {
    if !transactions_path.is_file() {
        return Err(format!("Precedents file missing: {}", transactions_path.display()).into());
    }
    let transactions = staging::read_precedents_csv(transactions_path)?;
    let target = super::provider_chain(raw_dir).company_facts(target)?;
    Ok(PrecedentsInput {
        target,
        transactions,
    })
}
