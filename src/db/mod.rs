//! Database collaborator: the concrete connection factory and SQL dialect
//! are external to this crate's core. `Database` is the trait this crate
//! drives; a `mockall`-backed fixture for it lives in `db::mock` for this
//! crate's own tests.

pub mod errors;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use futures_core::stream::BoxStream;

pub use errors::DbError;

/// A raw column value as delivered by the driver, before any field transform
/// runs. Modeled as a closed enum (rather than a trait object) so transforms
/// are plain functions with no downcasting.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    DateTime(chrono::NaiveDateTime),
}

impl RawValue {
    /// Identity conversion to the output value tree. `Null` maps to `None`
    /// so the field is omitted, matching every other transform's nil rule.
    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            RawValue::Null => None,
            RawValue::Bool(b) => Some(serde_json::Value::Bool(b)),
            RawValue::Int(i) => Some(serde_json::Value::Number(i.into())),
            RawValue::Float(f) => serde_json::Number::from_f64(f).map(serde_json::Value::Number),
            RawValue::Str(s) => Some(serde_json::Value::String(s)),
            RawValue::Bytes(b) => Some(serde_json::Value::String(
                String::from_utf8_lossy(&b).into_owned(),
            )),
            RawValue::DateTime(dt) => Some(serde_json::Value::String(
                dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            )),
        }
    }
}

/// A bound query parameter (positional `?` placeholders).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Param {
    Int(i64),
    Str(String),
    DateTime(chrono::NaiveDateTime),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Int(i) => write!(f, "{i}"),
            Param::Str(s) => write!(f, "{s}"),
            Param::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A flat result row keyed by the literal alias strings the planner
/// generated.
pub type Row = HashMap<String, RawValue>;

pub type RowStream = BoxStream<'static, Result<Row, DbError>>;

/// The connection-factory collaborator this crate drives. A concrete
/// implementation wraps the caller's MySQL-family driver; this crate
/// does not implement one itself.
#[async_trait]
pub trait Database: Send + Sync {
    async fn query(&self, sql: &str, params: &[Param]) -> Result<RowStream, DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(RawValue::Null => None; "null is omitted")]
    #[test_case(RawValue::Bool(true) => Some(serde_json::Value::Bool(true)); "bool passes through")]
    #[test_case(RawValue::Int(7) => Some(serde_json::Value::Number(7.into())); "int passes through")]
    #[test_case(RawValue::Str("hi".into()) => Some(serde_json::Value::String("hi".into())); "string passes through")]
    fn into_json_omits_only_null(value: RawValue) -> Option<serde_json::Value> {
        value.into_json()
    }
}
