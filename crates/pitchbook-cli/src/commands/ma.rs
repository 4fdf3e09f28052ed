use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{info, warn};

use pitchbook_core::facts::{CompanyFacts, FactsProvider};
use pitchbook_core::ma::merger_model::{self, MergerInput, MismatchPolicy};

use crate::config::DealConfig;
use crate::{input, staging};

/// Arguments for accretion/dilution analysis
#[derive(Args)]
pub struct MergerArgs {
    /// Path to JSON input file with acquirer, target and deal (overrides other flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Acquirer facts CSV (defaults to the provider chain)
    #[arg(long)]
    pub acquirer_csv: Option<String>,

    /// Target facts CSV (defaults to the provider chain)
    #[arg(long)]
    pub target_csv: Option<String>,

    /// Acquirer ticker
    #[arg(long)]
    pub acquirer: Option<String>,

    /// Target ticker
    #[arg(long)]
    pub target: Option<String>,

    /// Fraction of the deal paid in cash (e.g. 0.60)
    #[arg(long, alias = "cash_pct")]
    pub cash_pct: Option<Decimal>,

    /// Fraction of the deal paid in acquirer stock (e.g. 0.40)
    #[arg(long, alias = "stock_pct")]
    pub stock_pct: Option<Decimal>,

    /// Annual run-rate synergies in whole USD
    #[arg(long)]
    pub synergies: Option<Decimal>,

    /// Closing year, for labelling
    #[arg(long, alias = "deal_year")]
    pub deal_year: Option<i32>,

    /// Fail instead of flagging when cash and stock fractions do not sum to 1
    #[arg(long)]
    pub strict_structure: bool,
}

pub fn run_merger(
    args: MergerArgs,
    config: &DealConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let merger_input: MergerInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        merger_input_from_args(&args, config)?
    };

    let result = merger_model::analyze_merger(&merger_input)?;
    for w in &result.warnings {
        warn!("{w}");
    }
    info!(
        accretion_pct = %result.result.accretion_pct.round_dp(2),
        accretive = result.result.is_accretive,
        "merger model complete"
    );
    Ok(serde_json::to_value(result)?)
}

pub fn merger_input_from_args(
    args: &MergerArgs,
    config: &DealConfig,
) -> Result<MergerInput, Box<dyn std::error::Error>> {
    let acquirer = load_party(
        args.acquirer_csv.as_deref(),
        args.acquirer.as_deref().unwrap_or(&config.acquirer),
        config,
    )?;
    let target = load_party(
        args.target_csv.as_deref(),
        args.target.as_deref().unwrap_or(&config.target),
        config,
    )?;

    let mut deal = config.deal_structure();
    if let Some(cash) = args.cash_pct {
        deal.cash_fraction = cash;
    }
    if let Some(stock) = args.stock_pct {
        deal.stock_fraction = stock;
    }
    if let Some(synergies) = args.synergies {
        deal.synergies = synergies;
    }
    if args.strict_structure {
        deal.mismatch_policy = MismatchPolicy::Reject;
    }

    Ok(MergerInput {
        acquirer,
        target,
        deal,
        deal_year: Some(args.deal_year.unwrap_or(config.deal_year)),
    })
}

/// First row of an explicit facts CSV, else the provider chain's record.
fn load_party(
    csv_path: Option<&str>,
    ticker: &str,
    config: &DealConfig,
) -> Result<CompanyFacts, Box<dyn std::error::Error>> {
    match csv_path {
        Some(path) => {
            let path = input::file::resolve_path(path)?;
            staging::read_facts_csv(&path)?
                .into_iter()
                .next()
                .ok_or_else(|| format!("No rows in '{}'", path.display()).into())
        }
        None => Ok(super::provider_chain(&config.raw_dir).company_facts(ticker)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchbook_core::facts::StaticProvider;
    use pitchbook_core::PitchbookError;
    use rust_decimal_macros::dec;

    fn args() -> MergerArgs {
        MergerArgs {
            input: None,
            acquirer_csv: None,
            target_csv: None,
            acquirer: None,
            target: None,
            cash_pct: None,
            stock_pct: None,
            synergies: None,
            deal_year: None,
            strict_structure: false,
        }
    }

    fn config_in(dir: &std::path::Path) -> DealConfig {
        DealConfig {
            raw_dir: dir.to_path_buf(),
            ..DealConfig::default()
        }
    }

    #[test]
    fn test_reference_deal_from_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let input = merger_input_from_args(&args(), &config_in(tmp.path())).unwrap();
        assert_eq!(input.deal.synergies, dec!(75000000));
        assert_eq!(input.deal_year, Some(2025));

        let out = merger_model::analyze_merger(&input).unwrap();
        assert_eq!(out.result.accretion_pct.round_dp(2), dec!(23.91));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_staged_csv_beats_reference_table() {
        let tmp = tempfile::tempdir().unwrap();
        let mut target = StaticProvider::reference_table()
            .company_facts("11Street")
            .unwrap();
        target.net_income = dec!(0);
        staging::write_facts_csv(
            &staging::facts_path(tmp.path(), "11Street"),
            std::slice::from_ref(&target),
        )
        .unwrap();

        let input = merger_input_from_args(&args(), &config_in(tmp.path())).unwrap();
        assert_eq!(input.target.net_income, dec!(0));
    }

    #[test]
    fn test_strict_structure_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let mut a = args();
        a.cash_pct = Some(dec!(0.7));
        a.strict_structure = true;
        let input = merger_input_from_args(&a, &config_in(tmp.path())).unwrap();
        let err = merger_model::analyze_merger(&input).unwrap_err();
        assert!(matches!(err, PitchbookError::StructureMismatch { .. }));
    }
}
