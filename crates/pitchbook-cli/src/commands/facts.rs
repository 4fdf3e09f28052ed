use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use pitchbook_core::facts::{FactsProvider, StaticProvider};

use crate::config::DealConfig;
use crate::staging;

/// Arguments for staging company facts
#[derive(Args)]
pub struct FactsArgs {
    /// Raw-data directory to stage into (defaults to the config's raw_dir)
    #[arg(long)]
    pub raw_dir: Option<PathBuf>,

    /// Acquirer ticker
    #[arg(long)]
    pub acquirer: Option<String>,

    /// Target ticker
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StagingSummary {
    pub raw_dir: String,
    pub written: Vec<String>,
    pub missing_source_docs: Vec<String>,
}

pub fn run_facts(
    args: FactsArgs,
    config: &DealConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let dir = args.raw_dir.unwrap_or_else(|| config.raw_dir.clone());
    let acquirer = args.acquirer.unwrap_or_else(|| config.acquirer.clone());
    let target = args.target.unwrap_or_else(|| config.target.clone());

    let summary = stage_facts(
        &dir,
        &[acquirer.as_str(), target.as_str()],
        &StaticProvider::reference_table(),
    )?;
    Ok(serde_json::to_value(summary)?)
}

/// Write `<TICKER>_facts.csv` for every ticker, and `<TICKER>_fcf.csv` where
/// the provider has an FCF history.
pub fn stage_facts(
    dir: &Path,
    tickers: &[&str],
    provider: &impl FactsProvider,
) -> Result<StagingSummary, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create '{}': {}", dir.display(), e))?;

    let missing: Vec<String> = staging::missing_source_docs(dir)
        .into_iter()
        .map(String::from)
        .collect();
    for doc in &missing {
        warn!(document = %dir.join(doc).display(), "source document missing");
    }

    let mut written = Vec::new();
    for ticker in tickers {
        let facts = provider.company_facts(ticker)?;
        let path = staging::facts_path(dir, ticker);
        staging::write_facts_csv(&path, std::slice::from_ref(&facts))?;
        written.push(path.display().to_string());

        match provider.fcf_history(ticker) {
            Ok(series) => {
                let path = staging::fcf_path(dir, ticker);
                staging::write_fcf_csv(&path, &series)?;
                written.push(path.display().to_string());
            }
            Err(e) => debug!(ticker, error = %e, "no FCF history to stage"),
        }
    }
    info!(provider = provider.name(), files = written.len(), "staged facts");

    Ok(StagingSummary {
        raw_dir: dir.display().to_string(),
        written,
        missing_source_docs: missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::CsvFactsProvider;

    #[test]
    fn test_stage_reference_deal() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("00_Raw_Data");
        let summary =
            stage_facts(&dir, &["SE", "11Street"], &StaticProvider::reference_table()).unwrap();

        // SE facts + SE fcf + 11Street facts; no FCF history for the target
        assert_eq!(summary.written.len(), 3);
        assert_eq!(summary.missing_source_docs.len(), 4);
        assert!(staging::facts_path(&dir, "11Street").is_file());
        assert!(!staging::fcf_path(&dir, "11Street").exists());

        let staged = CsvFactsProvider::new(&dir);
        assert_eq!(staged.fcf_history("SE").unwrap().len(), 5);
    }

    #[test]
    fn test_unknown_ticker_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(stage_facts(tmp.path(), &["NOPE"], &StaticProvider::reference_table()).is_err());
    }
}
