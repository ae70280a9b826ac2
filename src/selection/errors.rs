use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// `:update_table` supplied `:date` without `:updated` — this
    /// combination is undefined, so this crate rejects it outright rather
    /// than guess.
    #[error(":update_table was given :date without :updated")]
    DateWithoutUpdatedColumn,

    /// A `:delta`/`:expiry` column referenced a table other than the one
    /// the id list is being resolved against. This crate's selection
    /// builder only filters on the driving table's own columns.
    #[error("selection field \"{table}/{column}\" does not belong to driving table \"{driving_table}\"")]
    FieldNotInTable {
        table: String,
        column: String,
        driving_table: String,
    },

    /// `:delta` was given an empty field list.
    #[error(":delta requires at least one field")]
    EmptyDeltaFields,

    /// A `:delta`/`:expiry` field string wasn't the `table/column` shape
    /// the wire format requires.
    #[error("expected a \"table/column\" field reference, got \"{0}\"")]
    InvalidFieldFormat(String),
}
