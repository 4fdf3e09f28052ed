use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PitchbookError;
use crate::facts::CompanyFacts;
use crate::types::*;
use crate::PitchbookResult;

/// Allowed gap between `cash_fraction + stock_fraction` and 1.
pub const FRACTION_TOLERANCE: Rate = dec!(0.000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What to do when the cash and stock fractions do not sum to one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Fail with `StructureMismatch`.
    Reject,
    /// Compute anyway and set `structure_mismatch` on the result.
    #[default]
    Flag,
}

/// How the acquirer pays for the target, plus expected synergies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealStructure {
    /// Fraction of deal value paid in cash (0..=1)
    pub cash_fraction: Rate,
    /// Fraction of deal value paid in acquirer stock (0..=1)
    pub stock_fraction: Rate,
    /// Annual run-rate synergies added to pro-forma net income (USD)
    pub synergies: Money,
    #[serde(default)]
    pub mismatch_policy: MismatchPolicy,
}

impl DealStructure {
    pub fn new(cash_fraction: Rate, stock_fraction: Rate, synergies: Money) -> Self {
        Self {
            cash_fraction,
            stock_fraction,
            synergies,
            mismatch_policy: MismatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.mismatch_policy = policy;
        self
    }

    pub fn fractions_sum_to_one(&self) -> bool {
        (self.cash_fraction + self.stock_fraction - Decimal::ONE).abs() <= FRACTION_TOLERANCE
    }
}

/// Accretion / dilution of the acquirer's EPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccretionResult {
    /// Target shares * target share price
    pub deal_value: Money,
    /// Cash portion of the consideration
    pub cash_used: Money,
    /// Stock portion of the consideration
    pub stock_consideration: Money,
    /// New acquirer shares issued to target holders
    pub shares_issued: Shares,
    pub pre_deal_eps: Money,
    pub pro_forma_net_income: Money,
    pub pro_forma_shares: Shares,
    pub pro_forma_eps: Money,
    /// pro_forma_eps - pre_deal_eps
    pub eps_change: Money,
    /// Percentage change in EPS (23.9 = 23.9% accretive)
    pub accretion_pct: Rate,
    /// `true` when pro-forma EPS >= pre-deal EPS
    pub is_accretive: bool,
    /// Cash and stock fractions did not sum to one
    pub structure_mismatch: bool,
    /// Synergies at which pro-forma EPS equals pre-deal EPS (floored at zero)
    pub breakeven_synergies: Money,
}

/// Inputs for the enveloped merger analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergerInput {
    pub acquirer: CompanyFacts,
    pub target: CompanyFacts,
    pub deal: DealStructure,
    /// Closing year, for labelling only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_year: Option<i32>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Pro-forma EPS of the combined company against the acquirer's standalone EPS.
pub fn evaluate_accretion(
    acquirer: &CompanyFacts,
    target: &CompanyFacts,
    deal: &DealStructure,
) -> PitchbookResult<AccretionResult> {
    validate_input(acquirer, target, deal)?;

    let structure_mismatch = !deal.fractions_sum_to_one();
    if structure_mismatch && deal.mismatch_policy == MismatchPolicy::Reject {
        return Err(PitchbookError::StructureMismatch {
            cash_fraction: deal.cash_fraction,
            stock_fraction: deal.stock_fraction,
        });
    }

    let deal_value = checked(
        target.shares_outstanding.checked_mul(target.share_price),
        "deal value",
    )?;
    let cash_used = checked(deal_value.checked_mul(deal.cash_fraction), "cash consideration")?;
    let stock_consideration =
        checked(deal_value.checked_mul(deal.stock_fraction), "stock consideration")?;
    let shares_issued = checked(
        stock_consideration.checked_div(acquirer.share_price),
        "shares issued",
    )?;

    let pre_deal_eps = checked(
        acquirer.net_income.checked_div(acquirer.shares_outstanding),
        "pre-deal EPS",
    )?;

    let combined_net_income = checked(
        acquirer.net_income.checked_add(target.net_income),
        "combined net income",
    )?;
    let pro_forma_net_income = checked(
        combined_net_income.checked_add(deal.synergies),
        "pro-forma net income",
    )?;
    let pro_forma_shares = checked(
        acquirer.shares_outstanding.checked_add(shares_issued),
        "pro-forma shares",
    )?;
    let pro_forma_eps = checked(
        pro_forma_net_income.checked_div(pro_forma_shares),
        "pro-forma EPS",
    )?;

    // Scaled by |pre-deal EPS| so the sign always follows the EPS change.
    let eps_change = checked(pro_forma_eps.checked_sub(pre_deal_eps), "EPS change")?;
    let accretion_pct = checked(
        eps_change
            .checked_div(pre_deal_eps.abs())
            .and_then(|r| r.checked_mul(dec!(100))),
        "accretion percentage",
    )?;

    let breakeven_synergies = checked(
        pre_deal_eps
            .checked_mul(pro_forma_shares)
            .and_then(|needed| needed.checked_sub(combined_net_income)),
        "breakeven synergies",
    )?
    .max(Decimal::ZERO);

    Ok(AccretionResult {
        deal_value,
        cash_used,
        stock_consideration,
        shares_issued,
        pre_deal_eps,
        pro_forma_net_income,
        pro_forma_shares,
        pro_forma_eps,
        eps_change,
        accretion_pct,
        is_accretive: eps_change >= Decimal::ZERO,
        structure_mismatch,
        breakeven_synergies,
    })
}

/// Run [`evaluate_accretion`] and wrap it in the standard result envelope.
pub fn analyze_merger(input: &MergerInput) -> PitchbookResult<ComputationOutput<AccretionResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = evaluate_accretion(&input.acquirer, &input.target, &input.deal)?;

    if result.structure_mismatch {
        warnings.push(format!(
            "Cash fraction ({}) and stock fraction ({}) do not sum to 1; consideration is internally inconsistent",
            input.deal.cash_fraction, input.deal.stock_fraction
        ));
    }
    if result.cash_used > input.acquirer.cash {
        warnings.push(format!(
            "Cash consideration ({}) exceeds {} balance-sheet cash ({}); new financing required",
            result.cash_used, input.acquirer.ticker, input.acquirer.cash
        ));
    }
    if !result.is_accretive {
        warnings.push(format!(
            "Deal is dilutive by {:.2}%; breakeven synergies are {}",
            result.accretion_pct.abs(),
            result.breakeven_synergies.round_dp(0)
        ));
    }

    Ok(with_metadata(
        "M&A Accretion/Dilution Analysis",
        &serde_json::json!({
            "acquirer": input.acquirer.ticker,
            "target": input.target.ticker,
            "cash_fraction": input.deal.cash_fraction.to_string(),
            "stock_fraction": input.deal.stock_fraction.to_string(),
            "synergies": input.deal.synergies.to_string(),
            "deal_year": input.deal_year,
        }),
        warnings,
        start,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(
    acquirer: &CompanyFacts,
    target: &CompanyFacts,
    deal: &DealStructure,
) -> PitchbookResult<()> {
    acquirer.validate()?;
    target.validate()?;

    if acquirer.net_income.is_zero() {
        return Err(PitchbookError::invalid(
            "acquirer.net_income",
            "Acquirer net income must be non-zero; pre-deal EPS is a divisor",
        ));
    }
    for (field, value) in [
        ("cash_fraction", deal.cash_fraction),
        ("stock_fraction", deal.stock_fraction),
    ] {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(PitchbookError::invalid(
                field,
                format!("Fraction ({value}) must be between 0 and 1"),
            ));
        }
    }
    Ok(())
}

fn checked(value: Option<Decimal>, context: &str) -> PitchbookResult<Decimal> {
    value.ok_or_else(|| PitchbookError::overflow(context))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
