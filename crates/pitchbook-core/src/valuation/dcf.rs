use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PitchbookError;
use crate::facts::{CompanyFacts, FcfSeries};
use crate::time_value::{discount_factor, gordon_terminal_value, growth_factor, present_value};
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Shares};
use crate::PitchbookResult;

/// Annual FCF growth applied over the explicit horizon unless overridden.
pub const DEFAULT_ANNUAL_GROWTH_RATE: Rate = dec!(0.15);

/// Length of the explicit projection horizon unless overridden.
pub const DEFAULT_HORIZON_YEARS: u32 = 5;

/// Projected years keep the four-digit year format of the history.
pub const MAX_PROJECTION_YEAR: i32 = 9999;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Projection assumptions that shape the explicit forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Constant annual growth applied to the latest historical FCF
    #[serde(default = "default_growth")]
    pub annual_growth_rate: Rate,
    /// Number of explicit projection years before the terminal value
    #[serde(default = "default_horizon")]
    pub horizon_years: u32,
}

fn default_growth() -> Rate {
    DEFAULT_ANNUAL_GROWTH_RATE
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_YEARS
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            annual_growth_rate: DEFAULT_ANNUAL_GROWTH_RATE,
            horizon_years: DEFAULT_HORIZON_YEARS,
        }
    }
}

/// One year of the explicit projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedYear {
    /// Calendar year (last historical year + period)
    pub year: i32,
    /// Periods from the valuation date (1-based)
    pub period: u32,
    pub projected_fcf: Money,
    pub discount_factor: Rate,
    pub present_value: Money,
}

/// Output of the projection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionResult {
    /// Year of the FCF observation the projection grows from
    pub base_year: i32,
    pub base_fcf: Money,
    pub projections: Vec<ProjectedYear>,
    /// Sum of present values of the explicit projections
    pub pv_of_projections: Money,
    /// Growing-perpetuity value at the end of the horizon
    pub terminal_value: Money,
    pub pv_of_terminal: Money,
    /// pv_of_projections + pv_of_terminal
    pub enterprise_value: Money,
    /// Share of enterprise value contributed by the terminal value
    pub terminal_value_pct: Rate,
    pub discount_rate: Rate,
    pub perpetual_growth: Rate,
    pub annual_growth_rate: Rate,
}

/// Input for a full DCF run, including the optional equity bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    pub fcf_series: FcfSeries,
    /// Discount rate (cost of capital)
    pub discount_rate: Rate,
    /// Perpetual growth rate for the terminal value
    pub perpetual_growth: Rate,
    #[serde(default)]
    pub config: ProjectionConfig,
    /// Net debt for equity bridge (debt minus cash)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_debt: Option<Money>,
    /// Shares outstanding for per-share value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Shares>,
}

impl DcfInput {
    /// Build an input that bridges to equity using a company's facts.
    pub fn for_company(
        facts: &CompanyFacts,
        fcf_series: FcfSeries,
        discount_rate: Rate,
        perpetual_growth: Rate,
        config: ProjectionConfig,
    ) -> Self {
        Self {
            fcf_series,
            discount_rate,
            perpetual_growth,
            config,
            net_debt: Some(facts.net_debt),
            shares_outstanding: Some(facts.shares_outstanding),
        }
    }
}

/// Projection plus equity bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfOutput {
    #[serde(flatten)]
    pub projection: ProjectionResult,
    /// EV - net debt (if bridge data provided)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_value_per_share: Option<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project FCF over the horizon and value it with a growing-perpetuity
/// terminal value.
///
/// The latest observation in `fcf_series` is the base. The series is taken in
/// the order given; sorting is the caller's job.
pub fn project(
    fcf_series: &FcfSeries,
    discount_rate: Rate,
    perpetual_growth: Rate,
    config: &ProjectionConfig,
) -> PitchbookResult<ProjectionResult> {
    validate_parameters(fcf_series, discount_rate, perpetual_growth, config)?;

    let base = fcf_series.latest();
    let n_years = config.horizon_years;

    let mut projections = Vec::with_capacity(n_years as usize);
    for period in 1..=n_years {
        let projected_fcf = base
            .value
            .checked_mul(growth_factor(config.annual_growth_rate, period)?)
            .ok_or_else(|| PitchbookError::overflow(format!("projected FCF for period {period}")))?;

        projections.push(ProjectedYear {
            year: base.year + period as i32,
            period,
            projected_fcf,
            discount_factor: discount_factor(discount_rate, period)?,
            present_value: present_value(projected_fcf, discount_rate, period)?,
        });
    }

    let pv_of_projections = projections
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.present_value))
        .ok_or_else(|| PitchbookError::overflow("sum of projected present values"))?;

    let last = projections
        .last()
        .ok_or_else(|| PitchbookError::EmptySeries("No projection years generated".into()))?;

    let terminal_value =
        gordon_terminal_value(last.projected_fcf, discount_rate, perpetual_growth)?;
    let pv_of_terminal = present_value(terminal_value, discount_rate, n_years)?;

    let enterprise_value = pv_of_projections
        .checked_add(pv_of_terminal)
        .ok_or_else(|| PitchbookError::overflow("enterprise value"))?;

    let terminal_value_pct = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        pv_of_terminal / enterprise_value
    };

    Ok(ProjectionResult {
        base_year: base.year,
        base_fcf: base.value,
        projections,
        pv_of_projections,
        terminal_value,
        pv_of_terminal,
        enterprise_value,
        terminal_value_pct,
        discount_rate,
        perpetual_growth,
        annual_growth_rate: config.annual_growth_rate,
    })
}

/// Run the projection and the equity bridge, wrapped in the standard
/// result envelope.
pub fn calculate_dcf(input: &DcfInput) -> PitchbookResult<ComputationOutput<DcfOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let projection = project(
        &input.fcf_series,
        input.discount_rate,
        input.perpetual_growth,
        &input.config,
    )?;

    if projection.base_fcf < Decimal::ZERO {
        warnings.push(format!(
            "Base FCF for {} is negative; growth compounds the outflow",
            projection.base_year
        ));
    }
    if input.fcf_series.len() == 1 {
        warnings.push("Only one historical FCF observation supplied".into());
    }
    if projection.terminal_value_pct > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            projection.terminal_value_pct * dec!(100)
        ));
    }

    let (equity_value, equity_value_per_share) =
        compute_equity_bridge(input, projection.enterprise_value)?;

    let output = DcfOutput {
        projection,
        equity_value,
        equity_value_per_share,
    };

    Ok(with_metadata(
        "Constant-growth FCF DCF with Gordon terminal value",
        input,
        warnings,
        start,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_parameters(
    fcf_series: &FcfSeries,
    discount_rate: Rate,
    perpetual_growth: Rate,
    config: &ProjectionConfig,
) -> PitchbookResult<()> {
    if fcf_series.is_empty() {
        return Err(PitchbookError::EmptySeries(
            "FCF series has no observations".into(),
        ));
    }
    if perpetual_growth <= dec!(-1) {
        return Err(PitchbookError::invalid(
            "perpetual_growth",
            format!("Perpetual growth ({perpetual_growth}) must be greater than -100%"),
        ));
    }
    if discount_rate <= perpetual_growth {
        return Err(PitchbookError::invalid(
            "discount_rate",
            format!(
                "Discount rate ({discount_rate}) must be greater than perpetual growth ({perpetual_growth})"
            ),
        ));
    }
    if config.horizon_years == 0 {
        return Err(PitchbookError::invalid(
            "horizon_years",
            "Projection horizon must be at least one year",
        ));
    }
    let base_year = fcf_series.latest().year;
    if i64::from(base_year) + i64::from(config.horizon_years) > i64::from(MAX_PROJECTION_YEAR) {
        return Err(PitchbookError::invalid(
            "horizon_years",
            format!(
                "Projection horizon of {} years from {base_year} runs past {MAX_PROJECTION_YEAR}",
                config.horizon_years
            ),
        ));
    }
    if config.annual_growth_rate <= dec!(-1) {
        return Err(PitchbookError::invalid(
            "annual_growth_rate",
            format!(
                "Annual growth rate ({}) must be greater than -100%",
                config.annual_growth_rate
            ),
        ));
    }
    Ok(())
}

fn compute_equity_bridge(
    input: &DcfInput,
    enterprise_value: Money,
) -> PitchbookResult<(Option<Money>, Option<Money>)> {
    let equity_value = input
        .net_debt
        .map(|nd| {
            enterprise_value
                .checked_sub(nd)
                .ok_or_else(|| PitchbookError::overflow("equity value"))
        })
        .transpose()?;

    let equity_per_share = match (equity_value, input.shares_outstanding) {
        (Some(_), Some(shares)) if shares <= Decimal::ZERO => {
            return Err(PitchbookError::invalid(
                "shares_outstanding",
                "Shares outstanding must be positive for a per-share value",
            ));
        }
        (Some(equity), Some(shares)) => Some(
            equity
                .checked_div(shares)
                .ok_or_else(|| PitchbookError::overflow("equity value per share"))?,
        ),
        _ => None,
    };

    Ok((equity_value, equity_per_share))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
