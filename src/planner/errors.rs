use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlannerError {
    /// The fixed-point join-ordering scan made no progress for a full lap
    /// of the remaining queue. Indicates a single-valued graph that's
    /// cyclic or disconnected from the root — analysis should normally
    /// prevent this from reaching the planner.
    #[error("cannot order joins for group rooted at \"{source_table}\": remaining {remaining:?}")]
    UnorderableJoins {
        source_table: String,
        remaining: Vec<String>,
    },
}
