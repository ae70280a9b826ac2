//! Crate-root error type unifying every subsystem's error.
//!
//! Each subsystem owns its own error enum, and the crate root stitches them
//! together with `#[from]` so callers match on one type.

use thiserror::Error;

use crate::analyzer::errors::AnalyzerError;
use crate::assembler::errors::AssemblerError;
use crate::db::DbError;
use crate::planner::errors::PlannerError;
use crate::selection::errors::SelectionError;
use crate::spec::InvalidSpec;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    InvalidSpec(#[from] InvalidSpec),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    /// An id column held a value this crate doesn't bind as a query
    /// parameter (only `Int`, `Str`, and `DateTime` round-trip).
    #[error("id column held an unsupported value: {0}")]
    UnsupportedIdValue(String),
}
