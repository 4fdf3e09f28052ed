//! Deal configuration: which companies, which assumptions, where the staged
//! data lives. Loaded from YAML or JSON; every field has a default.

use std::path::{Path, PathBuf};

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pitchbook_core::ma::merger_model::{DealStructure, MismatchPolicy};
use pitchbook_core::valuation::dcf::{
    ProjectionConfig, DEFAULT_ANNUAL_GROWTH_RATE, DEFAULT_HORIZON_YEARS,
};
use pitchbook_core::{Money, Rate};

use crate::input;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealConfig {
    pub acquirer: String,
    pub target: String,
    /// Directory holding staged facts CSVs and source documents
    pub raw_dir: PathBuf,
    pub discount_rate: Rate,
    pub perpetual_growth: Rate,
    pub annual_growth_rate: Rate,
    pub horizon_years: u32,
    pub cash_fraction: Rate,
    pub stock_fraction: Rate,
    /// Annual run-rate synergies, whole USD
    pub synergies: Money,
    pub deal_year: i32,
    pub mismatch_policy: MismatchPolicy,
}

impl Default for DealConfig {
    fn default() -> Self {
        DealConfig {
            acquirer: "SE".into(),
            target: "11Street".into(),
            raw_dir: PathBuf::from("00_Raw_Data"),
            discount_rate: dec!(0.115),
            perpetual_growth: dec!(0.03),
            annual_growth_rate: DEFAULT_ANNUAL_GROWTH_RATE,
            horizon_years: DEFAULT_HORIZON_YEARS,
            cash_fraction: dec!(0.60),
            stock_fraction: dec!(0.40),
            synergies: dec!(75000000),
            deal_year: 2025,
            mismatch_policy: MismatchPolicy::Flag,
        }
    }
}

impl DealConfig {
    /// Load from `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let config: DealConfig = if is_yaml(Path::new(path)) {
            input::file::read_yaml(path)?
        } else {
            input::file::read_json(path)?
        };
        debug!(path, acquirer = %config.acquirer, target = %config.target, "loaded deal config");
        Ok(config)
    }

    pub fn projection(&self) -> ProjectionConfig {
        ProjectionConfig {
            annual_growth_rate: self.annual_growth_rate,
            horizon_years: self.horizon_years,
        }
    }

    pub fn deal_structure(&self) -> DealStructure {
        DealStructure::new(self.cash_fraction, self.stock_fraction, self.synergies)
            .with_policy(self.mismatch_policy)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
