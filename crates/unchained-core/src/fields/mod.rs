//! Typed field containers.
//!
//! Every field kind holds one native value plus a [`Meta`], and converts
//! between that value and the erased [`Value`] in both directions:
//!
//! ```text
//!   wire ──decode──► Value ──to_internal_value──► native
//!   native ──to_representation──► Value ──encode──► wire
//! ```
//!
//! The null state of every kind is its zero value: `None` for scalar and
//! object kinds, an empty vec for array kinds.

/// Implement the [`Field`] plumbing shared by kinds with `meta` and `value`
/// members and an `Option` value. Must stay above the `mod` items below.
macro_rules! impl_option_field {
    ($ty:ty) => {
        impl $crate::fields::Field for $ty {
            fn meta(&self) -> &$crate::meta::Meta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut $crate::meta::Meta {
                &mut self.meta
            }

            fn as_dyn(&self) -> &dyn $crate::fields::Field {
                self
            }

            fn is_null(&self) -> bool {
                self.value.is_none()
            }
        }
    };
}

mod array;
mod boolean;
mod choice;
mod datetime;
mod integer;
mod object;
mod text;

pub use array::{ObjectArrayField, StringArrayField};
pub use boolean::BooleanField;
pub use choice::{ChoiceField, IntegerChoiceField, TextChoiceField};
pub use datetime::DateTimeField;
pub use integer::IntegerField;
pub use object::ObjectField;
pub use text::TextField;

use crate::error::{FieldError, ValidationErrors};
use crate::meta::Meta;
use crate::validators;
use crate::value::{self, Value};

/// Inbound conversion: erased value to native state.
pub trait Internalizable {
    /// Convert `raw` and store it. On failure the field is left in its zero
    /// state and an `InvalidValue` error is returned.
    fn to_internal_value(&mut self, raw: Value) -> Result<(), FieldError>;

    /// The native state, erased without re-shaping.
    fn internal(&self) -> Value;
}

/// Outbound conversion: native state to its wire-facing shape.
pub trait Representable {
    fn to_representation(&self) -> Value;
}

pub trait Field: Internalizable + Representable + Send {
    fn meta(&self) -> &Meta;

    fn meta_mut(&mut self) -> &mut Meta;

    /// Upcast used by the provided methods to hand `self` to validators.
    fn as_dyn(&self) -> &dyn Field;

    /// True while the field holds its null state.
    fn is_null(&self) -> bool;

    /// True for an empty (whitespace-only) string value.
    fn is_blank(&self) -> bool {
        false
    }

    /// True when a `required` check should report the value as missing.
    fn is_zero(&self) -> bool {
        self.is_null()
    }

    /// The wire value for this field. Write-only fields marshal to null.
    fn marshal(&self) -> Value {
        if self.meta().is_write_only() {
            Value::Null
        } else {
            self.to_representation()
        }
    }

    /// Accept one decoded wire value: substitute the default for blank input,
    /// convert, then validate. A read-only field ignores its input.
    fn unmarshal(&mut self, raw: &Value) -> Result<(), ValidationErrors> {
        if self.meta().is_read_only() {
            return Ok(());
        }
        let raw = match self.meta().default() {
            Some(default) if value::is_blank(raw) => default.clone(),
            _ => raw.clone(),
        };
        self.to_internal_value(raw)?;
        self.validate()
    }

    /// Load the configured default, if any. Used when a key is absent.
    fn apply_default(&mut self) -> Result<(), ValidationErrors> {
        match self.meta().default().cloned() {
            Some(default) => self.to_internal_value(default).map_err(Into::into),
            None => Ok(()),
        }
    }

    /// Run the default validators (unless disabled), then the declared ones.
    /// Every validator runs; failures are aggregated.
    fn validate(&self) -> Result<(), ValidationErrors> {
        validators::run(self.as_dyn())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::FieldErrorKind;

    #[test]
    fn test_unmarshal_substitutes_default_for_blank_input() -> Result<(), ValidationErrors> {
        let mut field = IntegerField::new(Meta::new("count").with_default(0)).map_err(|e| {
            ValidationErrors::from(FieldError::custom("count", e.to_string()))
        })?;

        field.unmarshal(&json!(""))?;
        assert_eq!(field.value(), Some(0));

        field.unmarshal(&json!(null))?;
        assert_eq!(field.value(), Some(0));

        field.unmarshal(&json!(7))?;
        assert_eq!(field.value(), Some(7));
        Ok(())
    }

    #[test]
    fn test_unmarshal_read_only_is_noop() {
        let mut field = TextField::new(Meta::new("id").read_only()).unwrap();
        assert!(field.unmarshal(&json!("ignored")).is_ok());
        assert!(field.value().is_none());
    }

    #[test]
    fn test_unmarshal_invalid_value_zeroes_field() {
        let mut field = IntegerField::new(Meta::new("age")).unwrap();
        field.unmarshal(&json!(5)).unwrap();

        let errors = field.unmarshal(&json!("five")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.iter().all(FieldError::is_invalid_value));
        assert!(field.is_null());
    }

    #[test]
    fn test_marshal_write_only_is_null() {
        let mut field = TextField::new(Meta::new("password").write_only()).unwrap();
        field.to_internal_value(json!("hunter2")).unwrap();
        assert_eq!(field.marshal(), Value::Null);
        assert_eq!(field.to_representation(), json!("hunter2"));
    }

    #[test]
    fn test_validate_reports_null_not_allowed() {
        let mut field = TextField::new(Meta::new("nickname")).unwrap();
        let errors = field.unmarshal(&json!(null)).unwrap_err();
        assert_eq!(
            errors.iter().map(FieldError::kind).collect::<Vec<_>>(),
            vec![&FieldErrorKind::NullNotAllowed]
        );
    }
}
