//! Fixed transform registry.
//!
//! A transform is a pure `RawValue -> Option<serde_json::Value>` conversion
//! applied to a column's raw value before it's written into the output
//! record. Returning `None` omits the field from the record entirely.
//!
//! This crate never evaluates inline DSL code: a [`TransformRef`] is always
//! a name, resolved either against the built-in registry or against a
//! caller-supplied map passed into [`compile`]. This keeps the DSL's
//! ergonomics (`["data" :as "text" binary-string]`) without an embedded
//! interpreter.
//!
//! [`compile`]: crate::compile

pub mod errors;
mod registry;

use std::collections::HashMap;
use std::sync::Arc;

use crate::db::RawValue;
pub use errors::TransformError;

/// A transform reference: always a name in this crate (no inline code eval).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformRef {
    Named(String),
}

impl TransformRef {
    pub fn name(&self) -> &str {
        match self {
            TransformRef::Named(name) => name,
        }
    }
}

/// A pure value-to-value transform function.
pub type TransformFn = Arc<dyn Fn(RawValue) -> Result<Option<serde_json::Value>, TransformError> + Send + Sync>;

/// Resolves [`TransformRef`]s to [`TransformFn`]s: first checks the
/// caller-supplied overrides, then falls back to the built-in registry.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    user: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    pub fn new(user: HashMap<String, TransformFn>) -> Self {
        TransformRegistry { user }
    }

    pub fn resolve(&self, reference: &TransformRef) -> Result<TransformFn, TransformError> {
        let name = reference.name();
        if let Some(f) = self.user.get(name) {
            return Ok(Arc::clone(f));
        }
        registry::builtin(name).ok_or_else(|| TransformError::UnknownTransform(name.to_owned()))
    }

    /// Identity transform used for fields with no `transform` option.
    pub fn apply_identity(value: RawValue) -> Option<serde_json::Value> {
        value.into_json()
    }
}
