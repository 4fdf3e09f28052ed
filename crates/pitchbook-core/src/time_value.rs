use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::PitchbookError;
use crate::types::{Money, Rate};
use crate::PitchbookResult;

/// Compounding factor `(1 + rate)^periods`.
pub fn growth_factor(rate: Rate, periods: u32) -> PitchbookResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(PitchbookError::invalid(
            "rate",
            format!("Rate ({rate}) must be greater than -100%"),
        ));
    }
    (Decimal::ONE + rate)
        .checked_powi(i64::from(periods))
        .ok_or_else(|| PitchbookError::overflow(format!("(1 + {rate})^{periods}")))
}

/// Discount factor `1 / (1 + rate)^periods`.
pub fn discount_factor(rate: Rate, periods: u32) -> PitchbookResult<Decimal> {
    let factor = growth_factor(rate, periods)?;
    Decimal::ONE
        .checked_div(factor)
        .ok_or_else(|| PitchbookError::overflow(format!("discount factor at period {periods}")))
}

/// Present value of a single amount received `periods` years out.
pub fn present_value(amount: Money, rate: Rate, periods: u32) -> PitchbookResult<Money> {
    let factor = growth_factor(rate, periods)?;
    amount
        .checked_div(factor)
        .ok_or_else(|| PitchbookError::overflow(format!("present value at period {periods}")))
}

/// Growing-perpetuity value one period after `cash_flow`:
/// `cash_flow * (1 + g) / (r - g)`.
pub fn gordon_terminal_value(
    cash_flow: Money,
    discount_rate: Rate,
    perpetual_growth: Rate,
) -> PitchbookResult<Money> {
    let spread = discount_rate - perpetual_growth;
    if spread <= Decimal::ZERO {
        return Err(PitchbookError::invalid(
            "discount_rate",
            format!(
                "Discount rate ({discount_rate}) must be greater than perpetual growth ({perpetual_growth})"
            ),
        ));
    }
    cash_flow
        .checked_mul(Decimal::ONE + perpetual_growth)
        .and_then(|grown| grown.checked_div(spread))
        .ok_or_else(|| PitchbookError::overflow("terminal value"))
}
