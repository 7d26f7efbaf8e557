//! # Unchained Core
//!
//! Declarative conversion between wire payloads (JSON, YAML) and typed
//! models, with validation and query specifications.
//!
//! ## Layers
//!
//! - [`fields`]: typed containers that convert to and from the erased
//!   [`Value`], each carrying a [`Meta`].
//! - [`validators`]: reusable checks run after conversion.
//! - [`model`] / [`schema`]: ordered field collections, hand-written or
//!   assembled at runtime.
//! - [`serializer`]: the read/write pipelines with their four modifier phases.
//! - [`specification`]: composable `WHERE` predicates for repositories.
//!
//! ## Error Handling
//!
//! Field problems are collected into [`ValidationErrors`] so a single pass
//! reports every violation. Structural problems ([`ConfigError`], decode
//! failures) fail immediately.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod error;
pub mod fields;
pub mod format;
pub mod meta;
pub mod model;
pub mod schema;
pub mod serializer;
pub mod specification;
pub mod validators;
pub mod value;

pub use error::{ConfigError, FieldError, FieldErrorKind, SerializerError, ValidationErrors};
pub use fields::{
    BooleanField, ChoiceField, DateTimeField, Field, IntegerChoiceField, IntegerField,
    Internalizable, ObjectArrayField, ObjectField, Representable, StringArrayField,
    TextChoiceField, TextField,
};
pub use format::Format;
pub use meta::{FieldMetadata, FieldType, Meta, Validator};
pub use model::Model;
pub use schema::{DynamicModel, Schema, SchemaBuilder};
pub use serializer::{FieldModifier, ModelSerializer, ModifierSpec, Phase, SerializerMeta};
pub use specification::{Operator, Specification, SpecificationError};
pub use value::Value;
