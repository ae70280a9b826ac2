use thiserror::Error;

/// An inline or registered transform raised during row assembly.
/// Associated with the specific field and row by the assembler; this variant
/// carries just the transform-local reason, the assembler wraps it with
/// field/row context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("no transform registered under the name \"{0}\"")]
    UnknownTransform(String),

    #[error("transform \"{name}\" rejected its input: {reason}")]
    Rejected { name: String, reason: String },
}
