use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use super::{CompanyFacts, FcfSeries, Provenance};
use crate::error::PitchbookError;
use crate::PitchbookResult;

/// Source of company facts and FCF history. Implementations are selected by
/// the caller; the engines never reach for a provider themselves.
pub trait FactsProvider {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    fn company_facts(&self, ticker: &str) -> PitchbookResult<CompanyFacts>;

    fn fcf_history(&self, ticker: &str) -> PitchbookResult<FcfSeries>;
}

impl<T: FactsProvider + ?Sized> FactsProvider for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn company_facts(&self, ticker: &str) -> PitchbookResult<CompanyFacts> {
        (**self).company_facts(ticker)
    }

    fn fcf_history(&self, ticker: &str) -> PitchbookResult<FcfSeries> {
        (**self).fcf_history(ticker)
    }
}

// ---------------------------------------------------------------------------
// StaticProvider
// ---------------------------------------------------------------------------

/// In-memory table of facts keyed by ticker (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    facts: BTreeMap<String, CompanyFacts>,
    fcf: BTreeMap<String, FcfSeries>,
}

fn key(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hard-coded deal table: Sea Limited (acquirer) from its 2024 20-F
    /// and the hypothetical 11Street Korea target.
    pub fn reference_table() -> Self {
        let sea = CompanyFacts {
            ticker: "SE".into(),
            revenue: dec!(13100000000),
            ebitda: dec!(1300000000),
            shares_outstanding: dec!(590000000),
            net_debt: dec!(3200000000),
            cash: dec!(6800000000),
            net_income: dec!(850000000),
            share_price: dec!(75.50),
            provenance: None,
        }
        .with_provenance(
            "Sea Limited Form 20-F filed 25-Apr-2024 (static)",
            NaiveDate::from_ymd_opt(2024, 4, 25),
        );

        // Private subsidiary: no market net debt or cash disclosed, agreed fallback is zero.
        let eleven_street = CompanyFacts {
            ticker: "11Street".into(),
            revenue: dec!(2300000000),
            ebitda: dec!(350000000),
            shares_outstanding: dec!(100000000),
            net_debt: dec!(0),
            cash: dec!(0),
            net_income: dec!(150000000),
            share_price: dec!(23.00),
            provenance: None,
        }
        .with_provenance("SK Telecom Annual Report 2024 (estimated/hypothetical)", None);

        let sea_fcf = FcfSeries::from_pairs(&[
            (2020, dec!(350000000)),
            (2021, dec!(480000000)),
            (2022, dec!(620000000)),
            (2023, dec!(890000000)),
            (2024, dec!(1100000000)),
        ]);

        let mut table = Self::new().with_facts(sea).with_facts(eleven_street);
        if let Ok(series) = sea_fcf {
            table = table.with_fcf("SE", series);
        }
        table
    }

    pub fn with_facts(mut self, facts: CompanyFacts) -> Self {
        self.facts.insert(key(&facts.ticker), facts);
        self
    }

    pub fn with_fcf(mut self, ticker: &str, series: FcfSeries) -> Self {
        self.fcf.insert(key(ticker), series);
        self
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.facts.values().map(|f| f.ticker.as_str())
    }

    fn unavailable(&self, ticker: &str, what: &str) -> PitchbookError {
        PitchbookError::FactsUnavailable {
            provider: self.name().into(),
            ticker: ticker.into(),
            reason: format!("no {what} in static table"),
        }
    }
}

impl FactsProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn company_facts(&self, ticker: &str) -> PitchbookResult<CompanyFacts> {
        let facts = self
            .facts
            .get(&key(ticker))
            .cloned()
            .ok_or_else(|| self.unavailable(ticker, "company facts"))?;
        facts.validated()
    }

    fn fcf_history(&self, ticker: &str) -> PitchbookResult<FcfSeries> {
        self.fcf
            .get(&key(ticker))
            .cloned()
            .ok_or_else(|| self.unavailable(ticker, "FCF history"))
    }
}

// ---------------------------------------------------------------------------
// FallbackProvider
// ---------------------------------------------------------------------------

/// Asks `primary` first and falls back when it reports `FactsUnavailable`.
/// Any other error (an invalid record, a malformed file) is returned as is.
/// Answered records carry the answering provider's name in their provenance.
#[derive(Debug, Clone)]
pub struct FallbackProvider<P, F> {
    primary: P,
    fallback: F,
    name: String,
}

impl<P: FactsProvider, F: FactsProvider> FallbackProvider<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        let name = format!("{}->{}", primary.name(), fallback.name());
        Self {
            primary,
            fallback,
            name,
        }
    }

    fn resolve<T>(
        &self,
        ticker: &str,
        what: &str,
        primary: impl FnOnce(&P) -> PitchbookResult<T>,
        fallback: impl FnOnce(&F) -> PitchbookResult<T>,
    ) -> PitchbookResult<(T, &str)> {
        match primary(&self.primary) {
            Ok(value) => {
                debug!(provider = self.primary.name(), ticker, what, "resolved");
                Ok((value, self.primary.name()))
            }
            Err(err @ PitchbookError::FactsUnavailable { .. }) => {
                warn!(
                    provider = self.primary.name(),
                    fallback = self.fallback.name(),
                    ticker,
                    what,
                    error = %err,
                    "primary provider failed, using fallback"
                );
                let value = fallback(&self.fallback)?;
                Ok((value, self.fallback.name()))
            }
            Err(err) => Err(err),
        }
    }
}

impl<P: FactsProvider, F: FactsProvider> FactsProvider for FallbackProvider<P, F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn company_facts(&self, ticker: &str) -> PitchbookResult<CompanyFacts> {
        let (mut facts, answered_by) = self.resolve(
            ticker,
            "company facts",
            |p| p.company_facts(ticker),
            |f| f.company_facts(ticker),
        )?;
        // An inner chain has already stamped the provider that really answered.
        let provenance = facts.provenance.get_or_insert_with(|| Provenance {
            source: answered_by.to_string(),
            as_of: None,
            provider: None,
        });
        provenance
            .provider
            .get_or_insert_with(|| answered_by.to_string());
        Ok(facts)
    }

    fn fcf_history(&self, ticker: &str) -> PitchbookResult<FcfSeries> {
        self.resolve(
            ticker,
            "FCF history",
            |p| p.fcf_history(ticker),
            |f| f.fcf_history(ticker),
        )
        .map(|(series, _)| series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reference_table_contains_deal_parties() {
        let table = StaticProvider::reference_table();
        let sea = table.company_facts("SE").unwrap();
        assert_eq!(sea.net_income, dec!(850000000));
        assert_eq!(sea.share_price, dec!(75.50));

        // Lookup is case-insensitive
        let target = table.company_facts("11street").unwrap();
        assert_eq!(target.ticker, "11Street");
        assert_eq!(target.shares_outstanding, dec!(100000000));
    }

    #[test]
    fn test_reference_fcf_history() {
        let table = StaticProvider::reference_table();
        let fcf = table.fcf_history("SE").unwrap();
        assert_eq!(fcf.len(), 5);
        assert_eq!(fcf.latest().year, 2024);
        assert_eq!(fcf.latest().value, dec!(1100000000));
    }

    #[test]
    fn test_missing_ticker_is_unavailable() {
        let table = StaticProvider::reference_table();
        match table.company_facts("NOPE").unwrap_err() {
            PitchbookError::FactsUnavailable { provider, ticker, .. } => {
                assert_eq!(provider, "static");
                assert_eq!(ticker, "NOPE");
            }
            other => panic!("Expected FactsUnavailable, got: {other}"),
        }
        assert!(table.fcf_history("11Street").is_err());
    }

    #[test]
    fn test_fallback_used_when_primary_fails() {
        let chain = FallbackProvider::new(StaticProvider::new(), StaticProvider::reference_table());
        assert_eq!(chain.name(), "static->static");
        let sea = chain.company_facts("SE").unwrap();
        assert_eq!(sea.ticker, "SE");
    }

    #[test]
    fn test_primary_wins_when_available() {
        let primary = StaticProvider::new().with_facts(CompanyFacts {
            ticker: "SE".into(),
            revenue: dec!(1),
            ebitda: dec!(1),
            shares_outstanding: dec!(1),
            net_debt: dec!(0),
            cash: dec!(0),
            net_income: dec!(1),
            share_price: dec!(99),
            provenance: None,
        });
        let chain = FallbackProvider::new(primary, StaticProvider::reference_table());
        assert_eq!(chain.company_facts("SE").unwrap().share_price, dec!(99));
        // FCF only lives in the fallback table
        assert_eq!(chain.fcf_history("SE").unwrap().len(), 5);
    }

    #[test]
    fn test_both_failing_surfaces_error() {
        let chain = FallbackProvider::new(StaticProvider::new(), StaticProvider::new());
        assert!(chain.company_facts("SE").is_err());
    }

    #[test]
    fn test_provenance_names_answering_provider() {
        let chain = FallbackProvider::new(StaticProvider::new(), StaticProvider::reference_table());
        let target = chain.company_facts("11Street").unwrap();
        let provenance = target.provenance.unwrap();
        assert_eq!(provenance.provider.as_deref(), Some("static"));
        assert!(provenance.source.starts_with("SK Telecom"));
    }

    #[test]
    fn test_invalid_primary_record_is_not_replaced() {
        let primary = StaticProvider::new().with_facts(CompanyFacts {
            ticker: "SE".into(),
            revenue: dec!(1),
            ebitda: dec!(1),
            shares_outstanding: dec!(0),
            net_debt: dec!(0),
            cash: dec!(0),
            net_income: dec!(1),
            share_price: dec!(1),
            provenance: None,
        });
        let chain = FallbackProvider::new(primary, StaticProvider::reference_table());
        assert!(matches!(
            chain.company_facts("SE"),
            Err(PitchbookError::InvalidParameter { .. })
        ));
    }
}
