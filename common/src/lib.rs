//! Reagent Enrich Common Library
//!
//! 試薬台帳の補完処理で使う I/O を持たない型とアルゴリズム

pub mod types;
pub mod alias;
pub mod emptiness;
pub mod error;
pub mod extract;

pub use types::{ChemicalInfo, EnrichmentTask, FailureKind, Record, RunStatistics};
pub use alias::{resolve_column, ColumnAliases};
pub use emptiness::is_formula_empty;
pub use error::{Error, Result};
pub use extract::{ExtractionStrategy, Extractor};
