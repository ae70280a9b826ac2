use thiserror::Error;

use crate::transform::TransformError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssemblerError {
    /// The planner should always select every leaf field's alias; seeing
    /// one missing from a row means the row and the spec have drifted
    /// apart (a planner/driver bug, not a data problem).
    #[error("row is missing expected column \"{alias}\"")]
    MissingColumn { alias: String },

    /// A transform raised while assembling `table.field`.
    #[error("transform for \"{table}.{field}\" failed: {source}")]
    Transform {
        table: String,
        field: String,
        #[source]
        source: TransformError,
    },

    /// Two writes at the same output path disagree about whether that
    /// location holds an object or a scalar/array.
    #[error("output path {path:?} collides: expected an object at this location")]
    PathCollision { path: Vec<String> },
}
