//! The built-in, process-wide transform registry.
//!
//! A static name-to-behavior map, built once behind a `OnceLock`.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::{TransformError, TransformFn};
use crate::db::RawValue;

fn binary_string(value: RawValue) -> Result<Option<serde_json::Value>, TransformError> {
    match value {
        RawValue::Null => Ok(None),
        RawValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => Ok(Some(serde_json::Value::String(s))),
            Err(e) => Err(TransformError::Rejected {
                name: "binary-string".into(),
                reason: format!("invalid UTF-8: {e}"),
            }),
        },
        RawValue::Str(s) => Ok(Some(serde_json::Value::String(s))),
        other => Err(TransformError::Rejected {
            name: "binary-string".into(),
            reason: format!("expected bytes or a string, got {other:?}"),
        }),
    }
}

fn registry_map() -> &'static HashMap<&'static str, TransformFn> {
    static REGISTRY: OnceLock<HashMap<&'static str, TransformFn>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<&'static str, TransformFn> = HashMap::new();
        map.insert("binary-string", Arc::new(binary_string));
        map
    })
}

pub fn builtin(name: &str) -> Option<TransformFn> {
    registry_map().get(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(RawValue::Null => None; "null yields no value")]
    #[test_case(RawValue::Str("hi".into()) => Some(serde_json::Value::String("hi".into())); "plain string passes through")]
    #[test_case(RawValue::Bytes(b"hi".to_vec()) => Some(serde_json::Value::String("hi".into())); "valid utf8 bytes decode")]
    fn binary_string_handles_its_supported_inputs(value: RawValue) -> Option<serde_json::Value> {
        binary_string(value).unwrap()
    }

    #[test]
    fn binary_string_rejects_invalid_utf8() {
        let err = binary_string(RawValue::Bytes(vec![0xff, 0xfe])).unwrap_err();
        assert!(matches!(err, TransformError::Rejected { .. }));
    }

    #[test]
    fn binary_string_rejects_non_string_types() {
        let err = binary_string(RawValue::Int(1)).unwrap_err();
        assert!(matches!(err, TransformError::Rejected { .. }));
    }
}
