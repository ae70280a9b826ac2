use thiserror::Error;

/// The analyzer pass in which a structural error was detected, used to tag
/// which stage of a multi-pass pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Classification,
    Promotion,
    RepeatedTableCheck,
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pass::Classification => write!(f, "classification"),
            Pass::Promotion => write!(f, "promotion"),
            Pass::RepeatedTableCheck => write!(f, "repeated-table check"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    /// The same target table appears twice in a group's promoted
    /// single-valued set.
    #[error("table \"{source_table}\" has a repeated join target in its single-valued group: {tables:?}")]
    RepeatedJoinTable {
        source_table: String,
        tables: Vec<String>,
    },

    /// A relationship's qualified column namespace matches neither the
    /// source table nor the target table — a parser bug, since the DSL's
    /// underscore convention should always produce one or the other.
    #[error(
        "{pass}: relationship column \"{table}/{column}\" does not belong to source table \"{source}\" or target table \"{target}\""
    )]
    NamespaceMismatch {
        pass: Pass,
        table: String,
        column: String,
        source: String,
        target: String,
    },
}
