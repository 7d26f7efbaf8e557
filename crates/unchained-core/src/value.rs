//! The erased value that fields exchange with the outside world.
//!
//! Both wire formats decode into [`Value`] before any field sees the data, so
//! a field's accepted shape set is the same for JSON and YAML.

pub use serde_json::Value;

/// Short name of a value's shape, used in error messages.
pub const fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Null or the empty string. Either triggers default substitution.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_shape_of() {
        assert_eq!(shape_of(&json!(null)), "null");
        assert_eq!(shape_of(&json!(1)), "number");
        assert_eq!(shape_of(&json!({"a": 1})), "object");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&json!(null)));
        assert!(is_blank(&json!("")));
        assert!(!is_blank(&json!(" ")));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!([])));
    }
}
