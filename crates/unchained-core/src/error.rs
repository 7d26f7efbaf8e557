//! Error types for the conversion engine.
//!
//! Errors fall into two groups:
//!
//! - **Aggregated**: [`FieldError`]s raised while converting or validating a
//!   single field. They are collected into [`ValidationErrors`] so one request
//!   reports every violation at once.
//! - **Structural**: [`ConfigError`] (a field or model was declared
//!   inconsistently) and the non-validation arms of [`SerializerError`]. These
//!   fail immediately.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::format::Format;
use crate::serializer::Phase;

// ============================================================================
// FIELD ERRORS
// ============================================================================

/// What went wrong with a single field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldErrorKind {
    /// The field received data outside its accepted shape set.
    #[error("invalid field value {value} ({shape}), expected {expected}")]
    InvalidValue {
        value: Value,
        shape: &'static str,
        expected: String,
    },

    #[error("missing required field")]
    MissingRequiredField,

    #[error("null is not allowed")]
    NullNotAllowed,

    #[error("blank is not allowed")]
    BlankNotAllowed,

    #[error("ensure this field has at least {min} characters")]
    TooShort { min: usize },

    #[error("ensure this field has no more than {max} characters")]
    TooLong { max: usize },

    #[error("ensure this value is greater than or equal to {min}")]
    TooSmall { min: i64 },

    #[error("ensure this value is less than or equal to {max}")]
    TooLarge { max: i64 },

    #[error("null characters are not allowed")]
    NullCharacters,

    #[error("unsupported data type for the {validator} validator")]
    UnsupportedType { validator: &'static str },

    /// Raised by user-supplied validators and modifiers.
    #[error("{0}")]
    Custom(String),
}

/// A failure attributed to one field, keyed by the field's wire name.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("error processing field {field}: {kind}")]
pub struct FieldError {
    field: String,
    kind: FieldErrorKind,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    /// Build an `InvalidValue` error carrying the offending value and its shape.
    pub fn invalid_value(field: impl Into<String>, value: &Value, expected: impl Into<String>) -> Self {
        Self::new(
            field,
            FieldErrorKind::InvalidValue {
                value: value.clone(),
                shape: crate::value::shape_of(value),
                expected: expected.into(),
            },
        )
    }

    pub fn custom(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, FieldErrorKind::Custom(message.into()))
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub const fn kind(&self) -> &FieldErrorKind {
        &self.kind
    }

    pub const fn is_invalid_value(&self) -> bool {
        matches!(self.kind, FieldErrorKind::InvalidValue { .. })
    }
}

// ============================================================================
// AGGREGATED ERRORS
// ============================================================================

/// Every field-level violation found in one pass, in the order they occurred.
///
/// Field order follows model declaration order, so the list is deterministic
/// for a given model and payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }

    /// True if any error is attributed to `field`.
    pub fn contains_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Flatten into `field -> [messages]`, preserving first-seen field order.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for error in &self.0 {
            let entry = map
                .entry(error.field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(messages) = entry {
                messages.push(Value::String(error.kind.to_string()));
            }
        }
        map
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for (i, error) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl FromIterator<FieldError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<FieldError> for ValidationErrors {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// STRUCTURAL ERRORS
// ============================================================================

/// A field or model was declared with contradictory options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("field {field}: may not set both `read_only` and `write_only`")]
    ReadOnlyAndWriteOnly { field: String },

    #[error("field {field}: may not set both `read_only` and `required`")]
    ReadOnlyAndRequired { field: String },

    #[error("field {field}: may not set both `required` and `default`")]
    RequiredWithDefault { field: String },

    #[error("field {field}: no field kind for type `{field_type}`")]
    InvalidFieldType { field: String, field_type: String },

    #[error("more than one field is bound to the wire key `{key}`")]
    DuplicateSource { key: String },
}

/// Failures of a [`crate::ModelSerializer`] run.
#[derive(Debug, Error)]
pub enum SerializerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to decode {format} payload: {message}")]
    Decode { format: Format, message: String },

    #[error("failed to encode {format} payload: {message}")]
    Encode { format: Format, message: String },

    #[error("expected a mapping at the top level of the payload, found {shape}")]
    InvalidPayload { shape: &'static str },

    #[error("{phase} modifiers failed: {errors}")]
    Modifier {
        phase: Phase,
        errors: ValidationErrors,
    },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl SerializerError {
    /// The aggregated field errors, if this is a validation failure.
    pub const fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
