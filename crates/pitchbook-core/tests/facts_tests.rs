use pitchbook_core::facts::{
    CompanyFacts, FactsProvider, FallbackProvider, FcfSeries, StaticProvider,
};
use pitchbook_core::PitchbookError;
use rust_decimal_macros::dec;

/// Provider that always fails, standing in for an unreachable live feed.
struct OfflineProvider;

impl FactsProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    fn company_facts(&self, ticker: &str) -> Result<CompanyFacts, PitchbookError> {
        Err(PitchbookError::FactsUnavailable {
            provider: self.name().into(),
            ticker: ticker.into(),
            reason: "connection refused".into(),
        })
    }

    fn fcf_history(&self, ticker: &str) -> Result<FcfSeries, PitchbookError> {
        Err(PitchbookError::FactsUnavailable {
            provider: self.name().into(),
            ticker: ticker.into(),
            reason: "connection refused".into(),
        })
    }
}

#[test]
fn test_offline_primary_falls_back_to_static_table() {
    let chain = FallbackProvider::new(OfflineProvider, StaticProvider::reference_table());
    assert_eq!(chain.name(), "offline->static");

    let sea = chain.company_facts("SE").unwrap();
    assert_eq!(sea.shares_outstanding, dec!(590000000));
    let provenance = sea.provenance.unwrap();
    assert!(provenance.source.contains("20-F"));
    assert_eq!(provenance.as_of.unwrap().to_string(), "2024-04-25");

    let fcf = chain.fcf_history("SE").unwrap();
    assert_eq!(fcf.observations()[0].year, 2020);
}

#[test]
fn test_boxed_providers_compose() {
    let primary: Box<dyn FactsProvider> = Box::new(OfflineProvider);
    let chain = FallbackProvider::new(primary, StaticProvider::reference_table());
    assert!(chain.company_facts("11Street").is_ok());
}

#[test]
fn test_static_provider_rejects_invalid_registered_record() {
    let table = StaticProvider::new().with_facts(CompanyFacts {
        ticker: "BAD".into(),
        revenue: dec!(1),
        ebitda: dec!(1),
        shares_outstanding: dec!(0),
        net_debt: dec!(0),
        cash: dec!(0),
        net_income: dec!(1),
        share_price: dec!(1),
        provenance: None,
    });
    assert!(matches!(
        table.company_facts("bad"),
        Err(PitchbookError::InvalidParameter { .. })
    ));
}

#[test]
fn test_facts_json_round_trip_keeps_provenance() {
    let sea = StaticProvider::reference_table().company_facts("SE").unwrap();
    let json = serde_json::to_string(&sea).unwrap();
    let back: CompanyFacts = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sea);
}

#[test]
fn test_registered_tickers() {
    let table = StaticProvider::reference_table();
    let tickers: Vec<&str> = table.tickers().collect();
    assert_eq!(tickers, vec!["11Street", "SE"]);
}
