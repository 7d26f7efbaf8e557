//! The model abstraction: an ordered, named collection of fields.
//!
//! A model is usually a plain struct whose members are field containers:
//!
//! ```
//! use unchained_core::{ConfigError, Field, IntegerField, Meta, Model, TextField};
//!
//! struct Person {
//!     id: IntegerField,
//!     name: TextField,
//! }
//!
//! impl Model for Person {
//!     fn init(&mut self) -> Result<(), ConfigError> {
//!         self.id = IntegerField::id(Meta::new("id"))?;
//!         self.name = TextField::new(Meta::new("name").required())?;
//!         Ok(())
//!     }
//!
//!     fn fields(&self) -> Vec<&dyn Field> {
//!         vec![&self.id as &dyn Field, &self.name]
//!     }
//!
//!     fn fields_mut(&mut self) -> Vec<&mut dyn Field> {
//!         vec![&mut self.id as &mut dyn Field, &mut self.name]
//!     }
//! }
//! ```
//!
//! Field order in `fields` is declaration order; it drives output key order
//! and error order.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::fields::Field;
use crate::meta::FieldMetadata;

pub trait Model: Send {
    /// (Re)build every field's metadata. Also used to reset a model.
    fn init(&mut self) -> Result<(), ConfigError>;

    fn fields(&self) -> Vec<&dyn Field>;

    fn fields_mut(&mut self) -> Vec<&mut dyn Field>;
}

/// Look up a field by wire key.
pub fn get_field<'a, M: Model + ?Sized>(model: &'a M, source: &str) -> Option<&'a dyn Field> {
    model
        .fields()
        .into_iter()
        .find(|f| f.meta().source() == source)
}

pub fn get_field_mut<'a, M: Model + ?Sized>(
    model: &'a mut M,
    source: &str,
) -> Option<&'a mut dyn Field> {
    model
        .fields_mut()
        .into_iter()
        .find(|f| f.meta().source() == source)
}

pub fn has_field<M: Model + ?Sized>(model: &M, source: &str) -> bool {
    get_field(model, source).is_some()
}

/// Reject models that bind two fields to the same wire key.
pub fn check_sources<M: Model + ?Sized>(model: &M) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for field in model.fields() {
        let key = field.meta().source();
        if !seen.insert(key) {
            return Err(ConfigError::DuplicateSource {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Describe every field, in declaration order.
pub fn metadata<M: Model + ?Sized>(model: &M) -> Vec<FieldMetadata> {
    model
        .fields()
        .into_iter()
        .map(|f| FieldMetadata::from(f.meta()))
        .collect()
}
