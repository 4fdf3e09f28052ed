pub mod error;
pub mod facts;
pub mod report;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "ma")]
pub mod ma;

pub use error::PitchbookError;
pub use types::*;

/// Standard result type for all pitchbook operations
pub type PitchbookResult<T> = Result<T, PitchbookError>;
