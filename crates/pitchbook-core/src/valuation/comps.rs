use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PitchbookError;
use crate::facts::CompanyFacts;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple};
use crate::PitchbookResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Trading multiples supported by the comps table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultipleType {
    EvEbitda,
    EvRevenue,
    PriceEarnings,
}

impl MultipleType {
    pub const ALL: [MultipleType; 3] = [
        MultipleType::EvEbitda,
        MultipleType::EvRevenue,
        MultipleType::PriceEarnings,
    ];

    /// EV multiples imply an enterprise value; P/E implies an equity value.
    pub(crate) fn implies_enterprise_value(self) -> bool {
        !matches!(self, MultipleType::PriceEarnings)
    }

    fn numerator(self, company: &CompanyFacts) -> PitchbookResult<Money> {
        if self.implies_enterprise_value() {
            company.enterprise_value()
        } else {
            company.market_cap()
        }
    }

    pub(crate) fn denominator(self, company: &CompanyFacts) -> Money {
        match self {
            MultipleType::EvEbitda => company.ebitda,
            MultipleType::EvRevenue => company.revenue,
            MultipleType::PriceEarnings => company.net_income,
        }
    }
}

impl std::fmt::Display for MultipleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultipleType::EvEbitda => write!(f, "EV/EBITDA"),
            MultipleType::EvRevenue => write!(f, "EV/Revenue"),
            MultipleType::PriceEarnings => write!(f, "P/E"),
        }
    }
}

fn all_multiples() -> Vec<MultipleType> {
    MultipleType::ALL.to_vec()
}

/// Input for a trading comparables analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompsInput {
    pub target: CompanyFacts,
    pub peers: Vec<CompanyFacts>,
    #[serde(default = "all_multiples")]
    pub multiples: Vec<MultipleType>,
}

/// Descriptive statistics for a single multiple across the peer set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleStatistics {
    pub multiple_type: MultipleType,
    pub values: Vec<(String, Multiple)>,
    pub mean: Multiple,
    pub median: Multiple,
    pub high: Multiple,
    pub low: Multiple,
    pub std_dev: Multiple,
    pub count: usize,
}

/// Target value implied by one multiple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpliedValuation {
    pub multiple_type: MultipleType,
    pub implied_at_low: Money,
    pub implied_at_median: Money,
    pub implied_at_mean: Money,
    pub implied_at_high: Money,
    /// Implied equity value per share at the median multiple
    pub implied_share_price_at_median: Money,
    /// The target metric the multiple is applied to
    pub target_metric_value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompsOutput {
    pub multiple_statistics: Vec<MultipleStatistics>,
    pub implied_valuations: Vec<ImpliedValuation>,
    pub peer_count: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a trading comparables analysis over `input.peers`.
pub fn calculate_comps(input: &CompsInput) -> PitchbookResult<ComputationOutput<CompsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.target.validate()?;
    for peer in &input.peers {
        peer.validate()?;
    }
    if input.peers.is_empty() {
        return Err(PitchbookError::EmptySeries(
            "No peer companies supplied for the comps table".into(),
        ));
    }
    if input.multiples.is_empty() {
        return Err(PitchbookError::invalid(
            "multiples",
            "At least one multiple type must be specified",
        ));
    }
    if input.peers.len() < 3 {
        warnings.push(format!(
            "Only {} peers supplied; consider adding more for a meaningful range",
            input.peers.len()
        ));
    }

    let mut multiple_statistics = Vec::new();
    let mut implied_valuations = Vec::new();

    for &mult_type in &input.multiples {
        let values = compute_multiples_for_type(mult_type, &input.peers, &mut warnings);
        if values.is_empty() {
            warnings.push(format!("No peer had a positive denominator for {mult_type}"));
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
            "Could not compute any multiples from the peer set".into(),
        ));
    }

    let output = CompsOutput {
        multiple_statistics,
        implied_valuations,
        peer_count: input.peers.len(),
    };

    Ok(with_metadata(
        "Trading Comparables Analysis",
        &serde_json::json!({
            "target": input.target.ticker,
            "peers": input.peers.iter().map(|p| p.ticker.as_str()).collect::<Vec<_>>(),
            "multiples": input.multiples.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        }),
        warnings,
        start,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn compute_multiples_for_type(
    mult_type: MultipleType,
    peers: &[CompanyFacts],
    warnings: &mut Vec<String>,
) -> Vec<(String, Multiple)> {
    let mut values = Vec::new();
    for peer in peers {
        let denominator = mult_type.denominator(peer);
        if denominator <= Decimal::ZERO {
            warnings.push(format!(
                "{}: non-positive denominator for {mult_type}, excluded",
                peer.ticker
            ));
            continue;
        }
        let multiple = mult_type
            .numerator(peer)
            .ok()
            .and_then(|numerator| numerator.checked_div(denominator));
        match multiple {
            Some(m) => values.push((peer.ticker.clone(), m)),
            None => warnings.push(format!(
                "{}: {mult_type} out of range, excluded",
                peer.ticker
            )),
        }
    }
    values
}

pub(crate) fn compute_statistics(
    multiple_type: MultipleType,
    values: Vec<(String, Multiple)>,
) -> PitchbookResult<MultipleStatistics> {
    let overflow = || PitchbookError::overflow(format!("{multiple_type} statistics"));
    let count = values.len();
    let mut sorted_vals: Vec<Multiple> = values.iter().map(|(_, v)| *v).collect();
    sorted_vals.sort();

    let sum = sorted_vals
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(overflow)?;
    let mean = sum / Decimal::from(count as i64);

    let median = if count % 2 == 0 {
        let mid = count / 2;
        sorted_vals[mid - 1]
            .checked_add(sorted_vals[mid])
            .ok_or_else(overflow)?
            / dec!(2)
    } else {
        sorted_vals[count / 2]
    };

    let std_dev = if count > 1 {
        let squares = sorted_vals
            .iter()
            .try_fold(Decimal::ZERO, |acc, v| {
                let diff = v.checked_sub(mean)?;
                acc.checked_add(diff.checked_mul(diff)?)
            })
            .ok_or_else(overflow)?;
        let variance = squares / Decimal::from((count - 1) as i64);
        variance.sqrt().unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    Ok(MultipleStatistics {
        multiple_type,
        values,
        mean,
        median,
        high: sorted_vals[count - 1],
        low: sorted_vals[0],
        std_dev,
        count,
    })
}

pub(crate) fn compute_implied_valuation(
    stats: &MultipleStatistics,
    target: &CompanyFacts,
    warnings: &mut Vec<String>,
) -> PitchbookResult<Option<ImpliedValuation>> {
    let mult_type = stats.multiple_type;
    let base_value = mult_type.denominator(target);
    if base_value <= Decimal::ZERO {
        warnings.push(format!(
            "{}: non-positive metric for {mult_type}, no implied valuation",
            target.ticker
        ));
        return Ok(None);
    }

    let implied = |multiple: Multiple| {
        base_value
            .checked_mul(multiple)
            .ok_or_else(|| PitchbookError::overflow(format!("implied value from {mult_type}")))
    };
    let implied_at_median = implied(stats.median)?;
    let equity_at_median = if mult_type.implies_enterprise_value() {
        implied_at_median
            .checked_sub(target.net_debt)
            .ok_or_else(|| PitchbookError::overflow("implied equity value"))?
    } else {
        implied_at_median
    };
    let implied_share_price_at_median = equity_at_median
        .checked_div(target.shares_outstanding)
        .ok_or_else(|| PitchbookError::overflow("implied share price"))?;

    Ok(Some(ImpliedValuation {
        multiple_type: mult_type,
        implied_at_low: implied(stats.low)?,
        implied_at_median,
        implied_at_mean: implied(stats.mean)?,
        implied_at_high: implied(stats.high)?,
        implied_share_price_at_median,
        target_metric_value: base_value,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn company(
        ticker: &str,
        price: Decimal,
        net_debt: Decimal,
        revenue: Decimal,
        ebitda: Decimal,
        net_income: Decimal,
    ) -> CompanyFacts {
        CompanyFacts {
            ticker: ticker.into(),
            revenue,
            ebitda,
            shares_outstanding: dec!(100),
            net_debt,
            cash: Decimal::ZERO,
            net_income,
            share_price: price,
            provenance: None,
        }
    }

    fn sample_comps_input() -> CompsInput {
        let mut target = company("TGT", dec!(20), dec!(100), dec!(500), dec!(125), dec!(75));
        target.shares_outstanding = dec!(50);
        CompsInput {
            target,
            peers: vec![
                // EV 2000, EV/EBITDA 10x
                company("PA", dec!(16), dec!(400), dec!(800), dec!(200), dec!(120)),
                // EV 3000, EV/EBITDA 8.33x
                company("PB", dec!(25), dec!(500), dec!(1200), dec!(360), dec!(200)),
                // EV 1500, EV/EBITDA 10x
                company("PC", dec!(12), dec!(300), dec!(600), dec!(150), dec!(90)),
            ],
            multiples: all_multiples(),
        }
    }

    fn stats_for(out: &CompsOutput, mult: MultipleType) -> &MultipleStatistics {
        out.multiple_statistics
            .iter()
            .find(|s| s.multiple_type == mult)
            .unwrap()
    }

    #[test]
    fn test_basic_comps() {
        let result = calculate_comps(&sample_comps_input()).unwrap();
        let out = &result.result;
        assert_eq!(out.peer_count, 3);
        assert_eq!(out.multiple_statistics.len(), 3);
        assert_eq!(out.implied_valuations.len(), 3);
    }

    #[test]
    fn test_ev_ebitda_statistics() {
        let result = calculate_comps(&sample_comps_input()).unwrap();
        let stats = stats_for(&result.result, MultipleType::EvEbitda);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.median, dec!(10));
        assert_eq!(stats.high, dec!(10));
        assert!((stats.low - dec!(8.33)).abs() < dec!(0.01));
    }

    #[test]
    fn test_ev_revenue_has_no_dispersion() {
        let result = calculate_comps(&sample_comps_input()).unwrap();
        let stats = stats_for(&result.result, MultipleType::EvRevenue);
        // All peers trade at 2.5x revenue
        assert_eq!(stats.mean, dec!(2.5));
        assert_eq!(stats.std_dev, Decimal::ZERO);
    }

    #[test]
    fn test_implied_share_price_bridges_net_debt() {
        let result = calculate_comps(&sample_comps_input()).unwrap();
        let implied = result
            .result
            .implied_valuations
            .iter()
            .find(|v| v.multiple_type == MultipleType::EvEbitda)
            .unwrap();
        // 125 * 10x = 1250 EV; less 100 net debt = 1150; / 50 shares = 23
        assert_eq!(implied.implied_at_median, dec!(1250));
        assert_eq!(implied.implied_share_price_at_median, dec!(23));
    }

    #[test]
    fn test_loss_making_peer_excluded_from_pe() {
        let mut input = sample_comps_input();
        input.peers[1].net_income = dec!(-10);
        let result = calculate_comps(&input).unwrap();
        let stats = stats_for(&result.result, MultipleType::PriceEarnings);
        assert_eq!(stats.count, 2);
        assert!(result.warnings.iter().any(|w| w.starts_with("PB:")));
    }

    #[test]
    fn test_thin_peer_set_warns() {
        let mut input = sample_comps_input();
        input.peers.truncate(2);
        let result = calculate_comps(&input).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("Only 2 peers")));
    }

    #[test]
    fn test_no_peers_rejected() {
        let mut input = sample_comps_input();
        input.peers.clear();
        let err = calculate_comps(&input).unwrap_err();
        assert!(matches!(err, PitchbookError::EmptySeries(_)));
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(MultipleType::EvEbitda.to_string(), "EV/EBITDA");
        assert_eq!(MultipleType::PriceEarnings.to_string(), "P/E");
    }

    #[test]
    fn test_peer_with_tiny_ebitda_excluded() {
        let target = company("TGT", dec!(20), dec!(100), dec!(2000), dec!(300), dec!(150));
        let peers = vec![
            company("AAA", dec!(30), dec!(200), dec!(3000), dec!(400), dec!(200)),
            company("BBB", dec!(40), dec!(300), dec!(4000), dec!(500), dec!(250)),
            company(
                "TINY",
                dec!(50),
                dec!(0),
                dec!(5000),
                dec!(0.0000000000000000000000000001),
                dec!(300),
            ),
        ];
        let input = CompsInput {
            target,
            peers,
            multiples: vec![MultipleType::EvEbitda],
        };
        let result = calculate_comps(&input).unwrap();
        assert_eq!(result.result.multiple_statistics[0].count, 2);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.starts_with("TINY: EV/EBITDA out of range")));
    }
}
