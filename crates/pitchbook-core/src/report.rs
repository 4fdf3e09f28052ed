//! Flattening of engine outputs into the row shapes the renderers print or
//! stage to CSV.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

#[cfg(feature = "ma")]
use crate::ma::merger_model::AccretionResult;
#[cfg(feature = "comps")]
use crate::valuation::comps::{CompsOutput, ImpliedValuation, MultipleStatistics};
#[cfg(feature = "comps")]
use crate::valuation::precedents::PrecedentsOutput;
#[cfg(feature = "valuation")]
use crate::valuation::dcf::ProjectionResult;

/// Unit monetary columns are shown in. Engines always work in whole USD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayUnit {
    #[default]
    Dollars,
    Millions,
}

impl DisplayUnit {
    pub fn scale(self, amount: Money) -> Money {
        match self {
            DisplayUnit::Dollars => amount,
            DisplayUnit::Millions => amount / dec!(1000000),
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            DisplayUnit::Dollars => "USD",
            DisplayUnit::Millions => "USD_m",
        }
    }
}

/// One line of the DCF sheet: a projection year, the terminal value, or the
/// enterprise value total (which has no FCF).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcfRow {
    pub label: String,
    pub fcf: Option<Money>,
    pub present_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompsRow {
    pub multiple: String,
    pub low: Decimal,
    pub median: Decimal,
    pub mean: Decimal,
    pub high: Decimal,
    pub peers: usize,
    pub implied_at_median: Option<Money>,
    pub implied_share_price: Option<Money>,
}

#[cfg(feature = "valuation")]
pub fn dcf_table(result: &ProjectionResult, unit: DisplayUnit) -> Vec<DcfRow> {
    let mut rows: Vec<DcfRow> = result
        .projections
        .iter()
        .map(|p| DcfRow {
            label: p.year.to_string(),
            fcf: Some(unit.scale(p.projected_fcf)),
            present_value: unit.scale(p.present_value),
        })
        .collect();

    rows.push(DcfRow {
        label: "Terminal Value".into(),
        fcf: Some(unit.scale(result.terminal_value)),
        present_value: unit.scale(result.pv_of_terminal),
    });
    rows.push(DcfRow {
        label: "Enterprise Value".into(),
        fcf: None,
        present_value: unit.scale(result.enterprise_value),
    });
    rows
}

/// EPS rows; the percentage row is never scaled.
#[cfg(feature = "ma")]
pub fn merger_table(result: &AccretionResult) -> Vec<MetricRow> {
    vec![
        MetricRow {
            metric: "Pre-Deal EPS".into(),
            value: result.pre_deal_eps,
        },
        MetricRow {
            metric: "Pro-Forma EPS".into(),
            value: result.pro_forma_eps,
        },
        MetricRow {
            metric: "Accretion/(Dilution) %".into(),
            value: result.accretion_pct,
        },
    ]
}

#[cfg(feature = "comps")]
pub fn comps_table(output: &CompsOutput, unit: DisplayUnit) -> Vec<CompsRow> {
    multiple_rows(&output.multiple_statistics, &output.implied_valuations, unit)
}

/// Same layout as the comps sheet; `peers` counts transactions.
#[cfg(feature = "comps")]
pub fn precedents_table(output: &PrecedentsOutput, unit: DisplayUnit) -> Vec<CompsRow> {
    multiple_rows(&output.multiple_statistics, &output.implied_valuations, unit)
}

#[cfg(feature = "comps")]
fn multiple_rows(
    statistics: &[MultipleStatistics],
    implied_valuations: &[ImpliedValuation],
    unit: DisplayUnit,
) -> Vec<CompsRow> {
    statistics
        .iter()
        .map(|stats| {
            let implied = implied_valuations
                .iter()
                .find(|v| v.multiple_type == stats.multiple_type);
            CompsRow {
                multiple: stats.multiple_type.to_string(),
                low: stats.low,
                median: stats.median,
                mean: stats.mean,
                high: stats.high,
                peers: stats.count,
                implied_at_median: implied.map(|v| unit.scale(v.implied_at_median)),
                implied_share_price: implied.map(|v| v.implied_share_price_at_median),
            }
        })
        .collect()
}

#[cfg(all(test, feature = "valuation", feature = "ma"))]
mod tests {
    use super::*;
    use crate::facts::{CompanyFacts, FcfSeries};
    use crate::ma::merger_model::{evaluate_accretion, DealStructure};
    use crate::valuation::dcf::{project, ProjectionConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dcf_table_layout() {
        let series = FcfSeries::from_pairs(&[(2023, dec!(890000000)), (2024, dec!(1100000000))])
            .unwrap();
        let result =
            project(&series, dec!(0.115), dec!(0.03), &ProjectionConfig::default()).unwrap();
        let rows = dcf_table(&result, DisplayUnit::Millions);

        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].label, "2025");
        assert_eq!(rows[0].fcf, Some(dec!(1265)));
        assert_eq!(rows[5].label, "Terminal Value");
        assert_eq!(rows[6].label, "Enterprise Value");
        assert_eq!(rows[6].fcf, None);
        assert_eq!(rows[6].present_value.round_dp(2), dec!(21597.13));
    }

    #[test]
    fn test_merger_table_rows() {
        let facts = |ticker: &str, ni, shares, price| CompanyFacts {
            ticker: ticker.into(),
            revenue: Decimal::ZERO,
            ebitda: Decimal::ZERO,
            shares_outstanding: shares,
            net_debt: Decimal::ZERO,
            cash: Decimal::ZERO,
            net_income: ni,
            share_price: price,
            provenance: None,
        };
        let result = evaluate_accretion(
            &facts("A", dec!(500), dec!(100), dec!(50)),
            &facts("T", dec!(100), dec!(50), dec!(25)),
            &DealStructure::new(dec!(1), dec!(0), dec!(0)),
        )
        .unwrap();
        let metrics: Vec<String> = merger_table(&result).into_iter().map(|r| r.metric).collect();
        assert_eq!(
            metrics,
            vec!["Pre-Deal EPS", "Pro-Forma EPS", "Accretion/(Dilution) %"]
        );
    }

    #[test]
    fn test_display_unit_scaling() {
        assert_eq!(DisplayUnit::Millions.scale(dec!(2500000)), dec!(2.5));
        assert_eq!(DisplayUnit::Dollars.scale(dec!(2500000)), dec!(2500000));
    }
}
