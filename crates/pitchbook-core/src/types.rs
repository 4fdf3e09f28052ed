use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Monetary amounts, whole USD. Never f64.
pub type Money = Decimal;

/// Rates as decimals (0.115 = 11.5%), never percentages.
pub type Rate = Decimal;

/// Valuation multiples (e.g. 9.2x EV/EBITDA)
pub type Multiple = Decimal;

pub type Shares = Decimal;

/// Arithmetic backend reported in every envelope.
pub const PRECISION: &str = "rust_decimal_128bit";

/// Envelope returned by every `calculate_*` / `analyze_*` entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    /// Inputs that shaped the result, echoed back for audit
    pub assumptions: serde_json::Value,
    /// Non-fatal conditions a reader of the result should know about
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    /// Crate version that produced the result
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

impl<T: Serialize> ComputationOutput<T> {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Wrap `result` in the standard envelope, timing from `started`.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    started: Instant,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: started.elapsed().as_micros() as u64,
            precision: PRECISION.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_metadata() {
        let out = with_metadata(
            "Test",
            &serde_json::json!({"discount_rate": "0.115"}),
            vec![],
            Instant::now(),
            42u32,
        );
        assert_eq!(out.result, 42);
        assert_eq!(out.metadata.precision, PRECISION);
        assert_eq!(out.metadata.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(out.assumptions["discount_rate"], "0.115");
        assert!(!out.has_warnings());
    }
}
