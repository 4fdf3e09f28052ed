use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PitchbookError;
use crate::facts::CompanyFacts;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple};
use crate::valuation::comps::{
    compute_implied_valuation, compute_statistics, ImpliedValuation, MultipleStatistics,
    MultipleType,
};
use crate::PitchbookResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A closed deal used as a valuation benchmark. `deal_value` is the
/// enterprise value paid for the target, in whole USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecedentTransaction {
    pub acquirer: String,
    pub target: String,
    pub year: i32,
    pub deal_value: Money,
    pub target_revenue: Money,
    pub target_ebitda: Money,
}

impl PrecedentTransaction {
    pub fn label(&self) -> String {
        format!("{}/{} ({})", self.acquirer, self.target, self.year)
    }

    fn validate(&self) -> PitchbookResult<()> {
        if self.acquirer.trim().is_empty() || self.target.trim().is_empty() {
            return Err(PitchbookError::invalid(
                "transactions",
                "Acquirer and target names are required",
            ));
        }
        if self.deal_value <= Decimal::ZERO {
            return Err(PitchbookError::invalid(
                "deal_value",
                format!("{}: deal value must be positive", self.label()),
            ));
        }
        Ok(())
    }

    fn denominator(&self, mult_type: MultipleType) -> Money {
        match mult_type {
            MultipleType::EvRevenue => self.target_revenue,
            _ => self.target_ebitda,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecedentsInput {
    /// Company the transaction multiples are applied to
    pub target: CompanyFacts,
    pub transactions: Vec<PrecedentTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecedentsOutput {
    pub multiple_statistics: Vec<MultipleStatistics>,
    pub implied_valuations: Vec<ImpliedValuation>,
    pub transaction_count: usize,
}

/// Transaction multiples are paid enterprise values, so only EV multiples apply.
pub const TRANSACTION_MULTIPLES: [MultipleType; 2] =
    [MultipleType::EvEbitda, MultipleType::EvRevenue];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Summarise the EV multiples paid in precedent transactions and apply them
/// to `input.target`.
pub fn calculate_precedents(
    input: &PrecedentsInput,
) -> PitchbookResult<ComputationOutput<PrecedentsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.target.validate()?;
    if input.transactions.is_empty() {
        return Err(PitchbookError::EmptySeries(
            "No precedent transactions supplied".into(),
        ));
    }
    for deal in &input.transactions {
        deal.validate()?;
    }

    let mut multiple_statistics = Vec::new();
    let mut implied_valuations = Vec::new();

    for mult_type in TRANSACTION_MULTIPLES {
        let values = transaction_multiples(mult_type, &input.transactions, &mut warnings);
        if values.is_empty() {
            warnings.push(format!("No transaction had a positive denominator for {mult_type}"));
            continue;
        }
        let stats = compute_statistics(mult_type, values)?;
        if let Some(implied) = compute_implied_valuation(&stats, &input.target, &mut warnings)? {
            implied_valuations.push(implied);
        }
        multiple_statistics.push(stats);
    }

    if multiple_statistics.is_empty() {
        return Err(PitchbookError::EmptySeries(
            "Could not compute any multiples from the precedent transactions".into(),
        ));
    }

    let output = PrecedentsOutput {
        multiple_statistics,
        implied_valuations,
        transaction_count: input.transactions.len(),
    };

    Ok(with_metadata(
        "Precedent Transactions Analysis",
        &serde_json::json!({
            "target": input.target.ticker,
            "transactions": input.transactions.iter().map(|t| t.label()).collect::<Vec<_>>(),
        }),
        warnings,
        start,
        output,
    ))
}

fn transaction_multiples(
    mult_type: MultipleType,
    transactions: &[PrecedentTransaction],
    warnings: &mut Vec<String>,
) -> Vec<(String, Multiple)> {
    let mut values = Vec::new();
    for deal in transactions {
        let denominator = deal.denominator(mult_type);
        if denominator <= Decimal::ZERO {
            warnings.push(format!(
                "{}: non-positive denominator for {mult_type}, excluded",
                deal.label()
            ));
            continue;
        }
        match deal.deal_value.checked_div(denominator) {
            Some(m) => values.push((deal.label(), m)),
            None => warnings.push(format!(
                "{}: {mult_type} out of range, excluded",
                deal.label()
            )),
        }
    }
    values
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn deal(
        acquirer: &str,
        year: i32,
        value: Decimal,
        revenue: Decimal,
        ebitda: Decimal,
    ) -> PrecedentTransaction {
        PrecedentTransaction {
            acquirer: acquirer.into(),
            target: format!("{acquirer}-T"),
            year,
            deal_value: value,
            target_revenue: revenue,
            target_ebitda: ebitda,
        }
    }

    fn sample_input() -> PrecedentsInput {
        PrecedentsInput {
            target: CompanyFacts {
                ticker: "TGT".into(),
                revenue: dec!(500),
                ebitda: dec!(125),
                shares_outstanding: dec!(50),
                net_debt: dec!(100),
                cash: Decimal::ZERO,
                net_income: dec!(75),
                share_price: dec!(20),
                provenance: None,
            },
            transactions: vec![
                // 12x EBITDA, 3x revenue
                deal("A", 2019, dec!(1200), dec!(400), dec!(100)),
                // 10x EBITDA, 2x revenue
                deal("C", 2020, dec!(900), dec!(450), dec!(90)),
                // 10x EBITDA, 4x revenue
                deal("E", 2021, dec!(1400), dec!(350), dec!(140)),
            ],
        }
    }

    fn stats_for(out: &PrecedentsOutput, mult: MultipleType) -> &MultipleStatistics {
        out.multiple_statistics
            .iter()
            .find(|s| s.multiple_type == mult)
            .unwrap()
    }

    #[test]
    fn test_transaction_multiple_statistics() {
        let result = calculate_precedents(&sample_input()).unwrap();
        let out = &result.result;
        assert_eq!(out.transaction_count, 3);

        let ebitda = stats_for(out, MultipleType::EvEbitda);
        assert_eq!(ebitda.median, dec!(10));
        assert_eq!(ebitda.low, dec!(10));
        assert_eq!(ebitda.high, dec!(12));
        assert_eq!(ebitda.values[0].0, "A/A-T (2019)");

        let revenue = stats_for(out, MultipleType::EvRevenue);
        assert_eq!(revenue.mean, dec!(3));
        assert_eq!(revenue.median, dec!(3));
    }

    #[test]
    fn test_implied_target_value_bridges_net_debt() {
        let result = calculate_precedents(&sample_input()).unwrap();
        let implied = result
            .result
            .implied_valuations
            .iter()
            .find(|v| v.multiple_type == MultipleType::EvEbitda)
            .unwrap();
        // 125 EBITDA at 10x = 1250 EV; less 100 net debt over 50 shares
        assert_eq!(implied.implied_at_median, dec!(1250));
        assert_eq!(implied.implied_share_price_at_median, dec!(23));
    }

    #[test]
    fn test_deal_without_ebitda_still_counts_for_revenue() {
        let mut input = sample_input();
        input.transactions.push(deal("G", 2022, dec!(800), dec!(400), Decimal::ZERO));
        let result = calculate_precedents(&input).unwrap();

        assert_eq!(stats_for(&result.result, MultipleType::EvEbitda).count, 3);
        assert_eq!(stats_for(&result.result, MultipleType::EvRevenue).count, 4);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.starts_with("G/G-T (2022): non-positive denominator")));
    }

    #[test]
    fn test_no_transactions_is_empty_series() {
        let mut input = sample_input();
        input.transactions.clear();
        assert!(matches!(
            calculate_precedents(&input),
            Err(PitchbookError::EmptySeries(_))
        ));
    }

    #[test]
    fn test_non_positive_deal_value_rejected() {
        let mut input = sample_input();
        input.transactions[1].deal_value = Decimal::ZERO;
        match calculate_precedents(&input) {
            Err(PitchbookError::InvalidParameter { field, .. }) => assert_eq!(field, "deal_value"),
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }
}
