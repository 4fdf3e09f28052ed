//! CSV staging of company facts and FCF history under the raw-data directory.
//!
//! Layout: `<TICKER>_facts.csv` (one row) and `<TICKER>_fcf.csv` (`year,fcf`
//! rows, oldest first). Amounts are whole USD.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pitchbook_core::facts::{CompanyFacts, FactsProvider, FcfObservation, FcfSeries, Provenance};
use pitchbook_core::valuation::precedents::PrecedentTransaction;
use pitchbook_core::{PitchbookError, PitchbookResult};

/// Source documents the analysts are expected to drop into the raw-data directory.
pub const EXPECTED_SOURCE_DOCS: [&str; 4] = [
    "SE_20F_2024.pdf",
    "SKT_2024_Annual.pdf",
    "Precedents.xlsx",
    "comps.csv",
];

/// Trading comparables file name inside the raw-data directory.
pub const COMPS_FILE: &str = "comps.csv";

/// Precedent transactions, staged as CSV from the analysts' workbook.
pub const PRECEDENTS_FILE: &str = "precedents.csv";

#[derive(Debug, Serialize, Deserialize)]
struct FactsRow {
    ticker: String,
    #[serde(with = "rust_decimal::serde::str")]
    revenue: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    ebitda: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    shares_outstanding: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    net_debt: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    cash: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    net_income: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    share_price: Decimal,
    source: Option<String>,
    as_of: Option<NaiveDate>,
}

impl From<&CompanyFacts> for FactsRow {
    fn from(f: &CompanyFacts) -> Self {
        FactsRow {
            ticker: f.ticker.clone(),
            revenue: f.revenue,
            ebitda: f.ebitda,
            shares_outstanding: f.shares_outstanding,
            net_debt: f.net_debt,
            cash: f.cash,
            net_income: f.net_income,
            share_price: f.share_price,
            source: f.provenance.as_ref().map(|p| p.source.clone()),
            as_of: f.provenance.as_ref().and_then(|p| p.as_of),
        }
    }
}

impl From<FactsRow> for CompanyFacts {
    fn from(row: FactsRow) -> Self {
        CompanyFacts {
            ticker: row.ticker,
            revenue: row.revenue,
            ebitda: row.ebitda,
            shares_outstanding: row.shares_outstanding,
            net_debt: row.net_debt,
            cash: row.cash,
            net_income: row.net_income,
            share_price: row.share_price,
            provenance: row.source.map(|source| Provenance {
                source,
                as_of: row.as_of,
                provider: None,
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FcfRow {
    year: i32,
    #[serde(with = "rust_decimal::serde::str")]
    fcf: Decimal,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

pub fn facts_path(dir: &Path, ticker: &str) -> PathBuf {
    dir.join(format!("{ticker}_facts.csv"))
}

pub fn fcf_path(dir: &Path, ticker: &str) -> PathBuf {
    dir.join(format!("{ticker}_fcf.csv"))
}

#[derive(Debug, Deserialize)]
struct PrecedentRow {
    acquirer: String,
    target: String,
    year: i32,
    #[serde(with = "rust_decimal::serde::str")]
    deal_value: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    target_revenue: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    target_ebitda: Decimal,
}

impl From<PrecedentRow> for PrecedentTransaction {
    fn from(row: PrecedentRow) -> Self {
        PrecedentTransaction {
            acquirer: row.acquirer,
            target: row.target,
            year: row.year,
            deal_value: row.deal_value,
            target_revenue: row.target_revenue,
            target_ebitda: row.target_ebitda,
        }
    }
}

// ---------------------------------------------------------------------------
// Readers / writers
// ---------------------------------------------------------------------------

fn csv_error(path: &Path, e: csv::Error) -> PitchbookError {
    PitchbookError::Serialization(format!("'{}': {}", path.display(), e))
}

/// Read every row of a facts CSV. A comps file is just a facts file with
/// one row per peer.
pub fn read_facts_csv(path: &Path) -> PitchbookResult<Vec<CompanyFacts>> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut out = Vec::new();
    for row in rdr.deserialize::<FactsRow>() {
        let row = row.map_err(|e| csv_error(path, e))?;
        out.push(CompanyFacts::from(row).validated()?);
    }
    Ok(out)
}

pub fn read_fcf_csv(path: &Path) -> PitchbookResult<FcfSeries> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut observations = Vec::new();
    for row in rdr.deserialize::<FcfRow>() {
        let row = row.map_err(|e| csv_error(path, e))?;
        observations.push(FcfObservation {
            year: row.year,
            value: row.fcf,
        });
    }
    FcfSeries::new(observations)
}

pub fn read_precedents_csv(path: &Path) -> PitchbookResult<Vec<PrecedentTransaction>> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    rdr.deserialize::<PrecedentRow>()
        .map(|row| row.map(PrecedentTransaction::from).map_err(|e| csv_error(path, e)))
        .collect()
}

pub fn write_facts_csv(
    path: &Path,
    facts: &[CompanyFacts],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for f in facts {
        wtr.serialize(FactsRow::from(f))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_fcf_csv(path: &Path, series: &FcfSeries) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for obs in series.observations() {
        wtr.serialize(FcfRow {
            year: obs.year,
            fcf: obs.value,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Which of the expected source documents are absent from `dir`.
pub fn missing_source_docs(dir: &Path) -> Vec<&'static str> {
    EXPECTED_SOURCE_DOCS
        .iter()
        .copied()
        .filter(|name| !dir.join(name).is_file())
        .collect()
}

// ---------------------------------------------------------------------------
// CsvFactsProvider
// ---------------------------------------------------------------------------

/// Facts provider backed by the staged CSV files in a raw-data directory.
#[derive(Debug, Clone)]
pub struct CsvFactsProvider {
    dir: PathBuf,
}

impl CsvFactsProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn unavailable(&self, ticker: &str, reason: impl std::fmt::Display) -> PitchbookError {
        PitchbookError::FactsUnavailable {
            provider: self.name().into(),
            ticker: ticker.into(),
            reason: reason.to_string(),
        }
    }
}

impl FactsProvider for CsvFactsProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn company_facts(&self, ticker: &str) -> PitchbookResult<CompanyFacts> {
        let path = facts_path(&self.dir, ticker);
        if !path.is_file() {
            return Err(self.unavailable(ticker, format!("{} not staged", path.display())));
        }
        debug!(path = %path.display(), "reading staged facts");
        read_facts_csv(&path)?
            .into_iter()
            .next()
            .ok_or_else(|| self.unavailable(ticker, format!("{} has no rows", path.display())))
    }

    fn fcf_history(&self, ticker: &str) -> PitchbookResult<FcfSeries> {
        let path = fcf_path(&self.dir, ticker);
        if !path.is_file() {
            return Err(self.unavailable(ticker, format!("{} not staged", path.display())));
        }
        debug!(path = %path.display(), "reading staged FCF history");
        read_fcf_csv(&path)
    }
}
