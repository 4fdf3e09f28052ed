//! Company facts and historical free-cash-flow records consumed by the
//! valuation and merger engines.

pub mod provider;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PitchbookError;
use crate::types::{Money, Shares};
use crate::PitchbookResult;

pub use provider::{FactsProvider, FallbackProvider, StaticProvider};

// ---------------------------------------------------------------------------
// CompanyFacts
// ---------------------------------------------------------------------------

/// Where a facts record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Human-readable source, e.g. "Sea Limited Form 20-F (static)"
    pub source: String,
    /// Date the figures are as of, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    /// Name of the provider that answered, stamped by `FallbackProvider`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Fixed-shape financial snapshot for one company. All monetary fields are
/// whole USD; scaling to millions happens only when rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFacts {
    pub ticker: String,
    pub revenue: Money,
    pub ebitda: Money,
    pub shares_outstanding: Shares,
    /// Total debt minus cash
    pub net_debt: Money,
    pub cash: Money,
    pub net_income: Money,
    pub share_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl CompanyFacts {
    /// Check the record invariants: non-empty ticker, positive share count
    /// and positive share price.
    pub fn validate(&self) -> PitchbookResult<()> {
        if self.ticker.trim().is_empty() {
            return Err(PitchbookError::invalid("ticker", "Ticker must not be empty"));
        }
        if self.shares_outstanding <= Decimal::ZERO {
            return Err(PitchbookError::invalid(
                "shares_outstanding",
                format!("{}: shares outstanding must be positive", self.ticker),
            ));
        }
        if self.share_price <= Decimal::ZERO {
            return Err(PitchbookError::invalid(
                "share_price",
                format!("{}: share price must be positive", self.ticker),
            ));
        }
        Ok(())
    }

    /// Validate and return the record, for use at construction sites.
    pub fn validated(self) -> PitchbookResult<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn with_provenance(mut self, source: impl Into<String>, as_of: Option<NaiveDate>) -> Self {
        self.provenance = Some(Provenance {
            source: source.into(),
            as_of,
            provider: None,
        });
        self
    }

    /// Equity market value at the current share price.
    pub fn market_cap(&self) -> PitchbookResult<Money> {
        self.share_price
            .checked_mul(self.shares_outstanding)
            .ok_or_else(|| PitchbookError::overflow(format!("{} market cap", self.ticker)))
    }

    /// Market capitalisation plus net debt.
    pub fn enterprise_value(&self) -> PitchbookResult<Money> {
        self.market_cap()?
            .checked_add(self.net_debt)
            .ok_or_else(|| PitchbookError::overflow(format!("{} enterprise value", self.ticker)))
    }

    /// Basic earnings per share.
    pub fn eps(&self) -> PitchbookResult<Money> {
        self.net_income
            .checked_div(self.shares_outstanding)
            .ok_or_else(|| PitchbookError::overflow(format!("{} EPS", self.ticker)))
    }
}

// ---------------------------------------------------------------------------
// FcfSeries
// ---------------------------------------------------------------------------

/// One observed year of free cash flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FcfObservation {
    pub year: i32,
    pub value: Money,
}

/// Historical free cash flow, strictly increasing in year, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FcfObservation>", into = "Vec<FcfObservation>")]
pub struct FcfSeries {
    observations: Vec<FcfObservation>,
}

impl FcfSeries {
    pub fn new(observations: Vec<FcfObservation>) -> PitchbookResult<Self> {
        if observations.is_empty() {
            return Err(PitchbookError::EmptySeries(
                "FCF series has no observations".into(),
            ));
        }
        for obs in &observations {
            if !(1000..=9999).contains(&obs.year) {
                return Err(PitchbookError::invalid(
                    "year",
                    format!("Year {} is not a 4-digit year", obs.year),
                ));
            }
        }
        if let Some(pair) = observations.windows(2).find(|w| w[1].year <= w[0].year) {
            return Err(PitchbookError::invalid(
                "year",
                format!(
                    "FCF years must be strictly increasing ({} followed by {})",
                    pair[0].year, pair[1].year
                ),
            ));
        }
        Ok(Self { observations })
    }

    pub fn from_pairs(pairs: &[(i32, Money)]) -> PitchbookResult<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(year, value)| FcfObservation { year, value })
                .collect(),
        )
    }

    pub fn observations(&self) -> &[FcfObservation] {
        &self.observations
    }

    /// Most recent observation. Always present.
    pub fn latest(&self) -> FcfObservation {
        self.observations[self.observations.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl TryFrom<Vec<FcfObservation>> for FcfSeries {
    type Error = PitchbookError;

    fn try_from(observations: Vec<FcfObservation>) -> Result<Self, Self::Error> {
        FcfSeries::new(observations)
    }
}

impl From<FcfSeries> for Vec<FcfObservation> {
    fn from(series: FcfSeries) -> Self {
        series.observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_facts() -> CompanyFacts {
        CompanyFacts {
            ticker: "ACME".into(),
            revenue: dec!(1000),
            ebitda: dec!(200),
            shares_outstanding: dec!(100),
            net_debt: dec!(50),
            cash: dec!(25),
            net_income: dec!(80),
            share_price: dec!(12),
            provenance: None,
        }
    }

    #[test]
    fn test_valid_facts_pass() {
        assert!(sample_facts().validated().is_ok());
    }

    #[test]
    fn test_blank_ticker_rejected() {
        let mut facts = sample_facts();
        facts.ticker = "  ".into();
        match facts.validate().unwrap_err() {
            PitchbookError::InvalidParameter { field, .. } => assert_eq!(field, "ticker"),
            other => panic!("Expected InvalidParameter, got: {other}"),
        }
    }

    #[test]
    fn test_non_positive_price_and_shares_rejected() {
        let mut facts = sample_facts();
        facts.share_price = Decimal::ZERO;
        assert!(facts.validate().is_err());

        let mut facts = sample_facts();
        facts.shares_outstanding = dec!(-1);
        assert!(facts.validate().is_err());
    }

    #[test]
    fn test_derived_metrics() {
        let facts = sample_facts();
        assert_eq!(facts.market_cap().unwrap(), dec!(1200));
        assert_eq!(facts.enterprise_value().unwrap(), dec!(1250));
        assert_eq!(facts.eps().unwrap(), dec!(0.8));
    }

    #[test]
    fn test_empty_series_rejected() {
        let err = FcfSeries::new(Vec::new()).unwrap_err();
        assert!(matches!(err, PitchbookError::EmptySeries(_)));
    }

    #[test]
    fn test_series_years_must_increase() {
        let err = FcfSeries::from_pairs(&[(2022, dec!(1)), (2022, dec!(2))]).unwrap_err();
        assert!(matches!(err, PitchbookError::InvalidParameter { .. }));

        assert!(FcfSeries::from_pairs(&[(2023, dec!(1)), (2021, dec!(2))]).is_err());
    }

    #[test]
    fn test_series_year_must_be_four_digits() {
        assert!(FcfSeries::from_pairs(&[(24, dec!(1))]).is_err());
    }

    #[test]
    fn test_latest_is_last_observation() {
        let series =
            FcfSeries::from_pairs(&[(2022, dec!(620)), (2023, dec!(890)), (2024, dec!(1100))])
                .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(
            series.latest(),
            FcfObservation {
                year: 2024,
                value: dec!(1100)
            }
        );
    }

    #[test]
    fn test_series_deserialization_validates() {
        let json = r#"[{"year": 2023, "value": "10"}, {"year": 2022, "value": "12"}]"#;
        assert!(serde_json::from_str::<FcfSeries>(json).is_err());

        let json = r#"[{"year": 2022, "value": "10"}, {"year": 2023, "value": "12"}]"#;
        let series: FcfSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.latest().value, dec!(12));
    }
}
