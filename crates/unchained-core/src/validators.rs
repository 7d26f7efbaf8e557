//! Built-in validators.
//!
//! A validator inspects a field after conversion and returns a [`FieldError`]
//! naming the field by its wire key. The constructors here return
//! [`Validator`] handles for [`Meta::with_validators`](crate::Meta::with_validators).

use std::sync::Arc;

use itertools::Itertools;

use crate::error::{FieldError, FieldErrorKind, ValidationErrors};
use crate::fields::Field;
use crate::meta::Validator;
use crate::value::Value;

/// Equality used by choice validation.
pub type Comparator = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Run the default validators (unless disabled) and then the declared ones.
pub fn run(field: &dyn Field) -> Result<(), ValidationErrors> {
    let meta = field.meta();
    let mut errors = ValidationErrors::new();

    if meta.runs_default_validators() {
        for check in [validate_required, validate_allow_null] {
            if let Err(e) = check(field) {
                errors.push(e);
            }
        }
    }
    errors.extend(meta.validators().iter().filter_map(|v| v(field).err()));

    errors.into_result()
}

fn error(field: &dyn Field, kind: FieldErrorKind) -> FieldError {
    FieldError::new(field.meta().source(), kind)
}

// ============================================================================
// DEFAULT VALIDATORS
// ============================================================================

/// A required field may not hold its zero value.
pub fn validate_required(field: &dyn Field) -> Result<(), FieldError> {
    if field.meta().is_required() && field.is_zero() {
        return Err(error(field, FieldErrorKind::MissingRequiredField));
    }
    Ok(())
}

/// Null and blank values are rejected unless explicitly allowed.
///
/// Null on a required field is already reported by [`validate_required`].
pub fn validate_allow_null(field: &dyn Field) -> Result<(), FieldError> {
    let meta = field.meta();
    if field.is_null() && !meta.allows_null() && !meta.is_required() {
        return Err(error(field, FieldErrorKind::NullNotAllowed));
    }
    if field.is_blank() && !meta.allows_blank() {
        return Err(error(field, FieldErrorKind::BlankNotAllowed));
    }
    Ok(())
}

// ============================================================================
// CONSTRUCTORS
// ============================================================================

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Strings (in characters) and arrays (in elements) must be at least `min` long.
pub fn min_length(min: usize) -> Validator {
    Arc::new(move |field: &dyn Field| match field.internal() {
        Value::Null => Ok(()),
        value => match length_of(&value) {
            Some(len) if len < min => Err(error(field, FieldErrorKind::TooShort { min })),
            Some(_) => Ok(()),
            None => Err(error(
                field,
                FieldErrorKind::UnsupportedType {
                    validator: "min_length",
                },
            )),
        },
    })
}

pub fn max_length(max: usize) -> Validator {
    Arc::new(move |field: &dyn Field| match field.internal() {
        Value::Null => Ok(()),
        value => match length_of(&value) {
            Some(len) if len > max => Err(error(field, FieldErrorKind::TooLong { max })),
            Some(_) => Ok(()),
            None => Err(error(
                field,
                FieldErrorKind::UnsupportedType {
                    validator: "max_length",
                },
            )),
        },
    })
}

pub fn min_value(min: i64) -> Validator {
    Arc::new(move |field: &dyn Field| match field.internal() {
        Value::Null => Ok(()),
        Value::Number(n) => match n.as_i64() {
            Some(v) if v < min => Err(error(field, FieldErrorKind::TooSmall { min })),
            Some(_) => Ok(()),
            None => Err(error(
                field,
                FieldErrorKind::UnsupportedType {
                    validator: "min_value",
                },
            )),
        },
        _ => Err(error(
            field,
            FieldErrorKind::UnsupportedType {
                validator: "min_value",
            },
        )),
    })
}

pub fn max_value(max: i64) -> Validator {
    Arc::new(move |field: &dyn Field| match field.internal() {
        Value::Null => Ok(()),
        Value::Number(n) => match n.as_i64() {
            Some(v) if v > max => Err(error(field, FieldErrorKind::TooLarge { max })),
            Some(_) => Ok(()),
            None => Err(error(
                field,
                FieldErrorKind::UnsupportedType {
                    validator: "max_value",
                },
            )),
        },
        _ => Err(error(
            field,
            FieldErrorKind::UnsupportedType {
                validator: "max_value",
            },
        )),
    })
}

/// Reject strings containing NUL.
pub fn prohibit_null_characters() -> Validator {
    Arc::new(|field: &dyn Field| match field.internal() {
        Value::String(s) if s.contains('\0') => Err(error(field, FieldErrorKind::NullCharacters)),
        _ => Ok(()),
    })
}

/// Loose equality: numbers compare by magnitude (`1 == 1.0`), everything else
/// structurally.
pub fn lazy_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Membership in a closed option set, compared with [`lazy_equal`].
pub fn choice(options: Vec<Value>) -> Validator {
    choice_with(options, Arc::new(lazy_equal))
}

/// Membership in a closed option set under a custom comparator. Null passes;
/// it is the null validator's concern.
pub fn choice_with(options: Vec<Value>, compare: Comparator) -> Validator {
    Arc::new(move |field: &dyn Field| {
        let value = field.internal();
        if value.is_null() || options.iter().any(|option| compare(option, &value)) {
            return Ok(());
        }
        let expected = format!("one of [{}]", options.iter().join(", "));
        Err(FieldError::invalid_value(
            field.meta().source(),
            &value,
            expected,
        ))
    })
}
