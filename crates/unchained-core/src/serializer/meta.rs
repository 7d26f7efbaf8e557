use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::modifiers::{set_field_read_only, set_field_write_only, FieldModifier};
use crate::error::FieldError;
use crate::fields::Field;

/// When a modifier runs relative to encoding or decoding.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreRead,
    PreWrite,
    PostRead,
    PostWrite,
}

/// A modifier bound to the fields it targets.
#[derive(Clone)]
pub struct ModifierSpec {
    fields: Vec<String>,
    modifier: FieldModifier,
}

impl ModifierSpec {
    pub fn new<I, S, F>(fields: I, modifier: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut dyn Field) -> Result<(), FieldError> + Send + Sync + 'static,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            modifier: Arc::new(modifier),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub const fn modifier(&self) -> &FieldModifier {
        &self.modifier
    }
}

impl fmt::Debug for ModifierSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierSpec")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Serializer-level configuration.
///
/// `read_only_fields` and `write_only_fields` are shorthand: when the
/// serializer is built they become a `PreWrite` and a `PreRead` modifier
/// respectively, placed ahead of any modifiers declared for that phase.
#[derive(Debug, Clone, Default)]
pub struct SerializerMeta {
    read_only_fields: Vec<String>,
    write_only_fields: Vec<String>,
    modifiers: BTreeMap<Phase, Vec<ModifierSpec>>,
}

impl SerializerMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_only_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_only_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_write_only_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_only_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_modifier(mut self, phase: Phase, spec: ModifierSpec) -> Self {
        self.modifiers.entry(phase).or_default().push(spec);
        self
    }

    pub fn read_only_fields(&self) -> &[String] {
        &self.read_only_fields
    }

    pub fn write_only_fields(&self) -> &[String] {
        &self.write_only_fields
    }

    pub fn modifiers(&self, phase: Phase) -> &[ModifierSpec] {
        self.modifiers.get(&phase).map(Vec::as_slice).unwrap_or_default()
    }

    /// Fold the shorthand lists into their phases. Consumes the meta, so the
    /// shorthand is materialized exactly once per serializer.
    pub(crate) fn compile(mut self) -> Self {
        if !self.read_only_fields.is_empty() {
            let spec = ModifierSpec::new(self.read_only_fields.clone(), set_field_read_only);
            self.modifiers.entry(Phase::PreWrite).or_default().insert(0, spec);
        }
        if !self.write_only_fields.is_empty() {
            let spec = ModifierSpec::new(self.write_only_fields.clone(), set_field_write_only);
            self.modifiers.entry(Phase::PreRead).or_default().insert(0, spec);
        }
        self
    }
}
