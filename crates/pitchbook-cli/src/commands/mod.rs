pub mod build;
pub mod facts;
pub mod ma;
pub mod valuation;

use std::path::Path;

use pitchbook_core::facts::{FallbackProvider, StaticProvider};

use crate::staging::CsvFactsProvider;

/// Staged CSVs in `raw_dir` first, the built-in reference table second.
pub fn provider_chain(raw_dir: &Path) -> FallbackProvider<CsvFactsProvider, StaticProvider> {
    FallbackProvider::new(
        CsvFactsProvider::new(raw_dir),
        StaticProvider::reference_table(),
    )
}
