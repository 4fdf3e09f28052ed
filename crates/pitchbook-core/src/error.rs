use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PitchbookError {
    #[error("Invalid parameter {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Empty series: {0}")]
    EmptySeries(String),

    #[error("Deal structure mismatch: cash fraction {cash_fraction} + stock fraction {stock_fraction} does not equal 1")]
    StructureMismatch {
        cash_fraction: Decimal,
        stock_fraction: Decimal,
    },

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Facts unavailable from {provider} for {ticker}: {reason}")]
    FactsUnavailable {
        provider: String,
        ticker: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PitchbookError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        PitchbookError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        PitchbookError::NumericOverflow {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for PitchbookError {
    fn from(e: serde_json::Error) -> Self {
        PitchbookError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_becomes_serialization() {
        let err: PitchbookError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, PitchbookError::Serialization(_)));
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = PitchbookError::invalid("discount_rate", "must exceed growth");
        assert_eq!(
            err.to_string(),
            "Invalid parameter discount_rate: must exceed growth"
        );
    }
}
