use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use pitchbook_core::facts::FactsProvider;
use pitchbook_core::ma::merger_model::{self, MergerInput};
use pitchbook_core::report::{self, DcfRow, DisplayUnit, MetricRow};
use pitchbook_core::valuation::comps;
use pitchbook_core::valuation::dcf::{self, DcfInput};
use pitchbook_core::valuation::precedents;

use super::valuation::{comps_input_from_files, precedents_input_from_files};
use crate::config::DealConfig;
use crate::staging;

/// Arguments for the full pitchbook pipeline
#[derive(Args)]
pub struct BuildArgs {
    /// Directory the DCF, merger and comps tables are written to
    #[arg(long, default_value = "pitchbook_out")]
    pub out_dir: PathBuf,

    /// Write monetary columns in USD millions
    #[arg(long)]
    pub millions: bool,
}

pub fn run_build(
    args: BuildArgs,
    config: &DealConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let unit = if args.millions {
        DisplayUnit::Millions
    } else {
        DisplayUnit::Dollars
    };
    build_pitchbook(config, &args.out_dir, unit)
}

/// DCF on the acquirer, the merger model, and (when staged) trading comps and
/// precedent transactions, each written as a CSV table into `out_dir`.
pub fn build_pitchbook(
    config: &DealConfig,
    out_dir: &Path,
    unit: DisplayUnit,
) -> Result<Value, Box<dyn std::error::Error>> {
    fs::create_dir_all(out_dir)
        .map_err(|e| format!("Failed to create '{}': {}", out_dir.display(), e))?;
    let provider = super::provider_chain(&config.raw_dir);
    let mut files = Vec::new();
    let mut warnings = Vec::new();

    // DCF
    let acquirer = provider.company_facts(&config.acquirer)?;
    let series = provider.fcf_history(&config.acquirer)?;
    let dcf_out = dcf::calculate_dcf(&DcfInput::for_company(
        &acquirer,
        series,
        config.discount_rate,
        config.perpetual_growth,
        config.projection(),
    ))?;
    let dcf_rows: Vec<DcfRow> = report::dcf_table(&dcf_out.result.projection, unit)
        .into_iter()
        .map(|row| DcfRow {
            fcf: row.fcf.map(|v| v.round_dp(2)),
            present_value: row.present_value.round_dp(2),
            ..row
        })
        .collect();
    files.push(write_table(&out_dir.join("dcf.csv"), &dcf_rows)?);
    warnings.extend(dcf_out.warnings);

    // Merger model
    let merger = merger_model::analyze_merger(&MergerInput {
        acquirer: acquirer.clone(),
        target: provider.company_facts(&config.target)?,
        deal: config.deal_structure(),
        deal_year: Some(config.deal_year),
    })?;
    let merger_rows: Vec<MetricRow> = report::merger_table(&merger.result)
        .into_iter()
        .map(|row| MetricRow {
            value: row.value.round_dp(4),
            ..row
        })
        .collect();
    files.push(write_table(&out_dir.join("merger_model.csv"), &merger_rows)?);
    warnings.extend(merger.warnings);

    // Trading comps, only when analysts staged a peer set
    let comps_path = config.raw_dir.join(staging::COMPS_FILE);
    let mut comps_peers = None;
    if comps_path.is_file() {
        let comps_input = comps_input_from_files(&config.acquirer, &comps_path, &config.raw_dir)?;
        let comps_out = comps::calculate_comps(&comps_input)?;
        let rows = report::comps_table(&comps_out.result, unit);
        files.push(write_table(&out_dir.join("comps.csv"), &rows)?);
        comps_peers = Some(comps_out.result.peer_count);
        warnings.extend(comps_out.warnings);
    } else {
        info!(path = %comps_path.display(), "no comps file staged, skipping trading comps");
    }

    // Precedent transactions, applied to the deal target
    let precedents_path = config.raw_dir.join(staging::PRECEDENTS_FILE);
    let mut precedent_count = None;
    let precedents_input = if precedents_path.is_file() {
        Some(precedents_input_from_files(&config.target, &precedents_path, &config.raw_dir)?)
    } else {
        info!(path = %precedents_path.display(), "no precedents staged, skipping transactions");
        None
    };
    match precedents_input {
        Some(input) if input.transactions.is_empty() => {
            warnings.push(format!("{} has no transactions", precedents_path.display()));
        }
        Some(input) => {
            let out = precedents::calculate_precedents(&input)?;
            let rows = report::precedents_table(&out.result, unit);
            files.push(write_table(&out_dir.join(staging::PRECEDENTS_FILE), &rows)?);
            precedent_count = Some(out.result.transaction_count);
            warnings.extend(out.warnings);
        }
        None => {}
    }

    info!(out_dir = %out_dir.display(), files = files.len(), "pitchbook tables written");

    let dcf = &dcf_out.result;
    Ok(json!({
        "result": {
            "acquirer": config.acquirer,
            "target": config.target,
            "unit": unit.suffix(),
            "enterprise_value": unit.scale(dcf.projection.enterprise_value).round_dp(2),
            "equity_value_per_share": dcf.equity_value_per_share.map(|v| v.round_dp(2)),
            "terminal_value_pct": dcf.projection.terminal_value_pct.round_dp(4),
            "pro_forma_eps": merger.result.pro_forma_eps.round_dp(4),
            "accretion_pct": merger.result.accretion_pct.round_dp(2),
            "is_accretive": merger.result.is_accretive,
            "comps_peer_count": comps_peers,
            "precedent_count": precedent_count,
            "files": files,
        },
        "methodology": "Pitchbook build: DCF, accretion/dilution, trading comps, precedents",
        "warnings": warnings,
    }))
}

fn write_table<T: Serialize>(
    path: &Path,
    rows: &[T],
) -> Result<String, Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(path.display().to_string())
}
