//! Per-field metadata.
//!
//! A [`Meta`] is built once with chained `with_*` calls and handed to a field
//! constructor, which runs [`Meta::check`]. After that the only mutations are
//! the flag setters used by serializer modifiers. The wire key (`source`) has
//! no setter at all.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{ConfigError, FieldError};
use crate::fields::Field;
use crate::value::Value;

/// Tag describing what kind of field a [`Meta`] belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Invalid,
    String,
    Boolean,
    Choice,
    Integer,
    Id,
    DateTime,
    Array,
    Object,
}

/// A validation rule run after a field's value has been converted.
pub type Validator = Arc<dyn Fn(&dyn Field) -> Result<(), FieldError> + Send + Sync>;

#[derive(Clone)]
pub struct Meta {
    name: String,
    source: String,
    field_type: FieldType,
    read_only: bool,
    write_only: bool,
    required: bool,
    allow_null: bool,
    allow_blank: bool,
    default: Option<Value>,
    label: Option<String>,
    help_text: Option<String>,
    placeholder: Option<String>,
    dependant_fields: Vec<String>,
    choices: Vec<Value>,
    validators: Vec<Validator>,
    default_validators: bool,
}

impl Meta {
    /// Metadata for a field whose wire key equals its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            name,
            field_type: FieldType::Invalid,
            read_only: false,
            write_only: false,
            required: false,
            allow_null: false,
            allow_blank: false,
            default: None,
            label: None,
            help_text: None,
            placeholder: None,
            dependant_fields: Vec::new(),
            choices: Vec::new(),
            validators: Vec::new(),
            default_validators: true,
        }
    }

    // ------------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------------

    /// Bind the field to a wire key different from its name.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub const fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub const fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub const fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    /// Value substituted when the input is absent, null or `""`.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_dependant_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependant_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Options for choice fields, reported in field metadata.
    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Append a validator. Validators run in the order they were added.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&dyn Field) -> Result<(), FieldError> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Append prebuilt validators such as those in [`crate::validators`].
    pub fn with_validators<I>(mut self, validators: I) -> Self
    where
        I: IntoIterator<Item = Validator>,
    {
        self.validators.extend(validators);
        self
    }

    /// Skip the built-in required/null/blank checks.
    pub const fn without_default_validators(mut self) -> Self {
        self.default_validators = false;
        self
    }

    pub(crate) fn with_type_if_unset(mut self, field_type: FieldType) -> Self {
        if self.field_type == FieldType::Invalid {
            self.field_type = field_type;
        }
        self
    }

    pub(crate) fn set_choices(&mut self, choices: Vec<Value>) {
        self.choices = choices;
    }

    pub(crate) fn set_type(&mut self, field_type: FieldType) {
        self.field_type = field_type;
    }

    pub(crate) fn prepend_validator(&mut self, validator: Validator) {
        self.validators.insert(0, validator);
    }

    /// Reject contradictory combinations of options.
    pub fn check(&self) -> Result<(), ConfigError> {
        let field = || self.name.clone();
        if self.read_only && self.write_only {
            return Err(ConfigError::ReadOnlyAndWriteOnly { field: field() });
        }
        if self.read_only && self.required {
            return Err(ConfigError::ReadOnlyAndRequired { field: field() });
        }
        if self.required && self.default.as_ref().is_some_and(|d| !d.is_null()) {
            return Err(ConfigError::RequiredWithDefault { field: field() });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Modifier hooks
    // ------------------------------------------------------------------------

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn set_write_only(&mut self, write_only: bool) {
        self.write_only = write_only;
    }

    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key under which the field appears on the wire.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub const fn is_write_only(&self) -> bool {
        self.write_only
    }

    pub const fn is_required(&self) -> bool {
        self.required
    }

    pub const fn allows_null(&self) -> bool {
        self.allow_null
    }

    pub const fn allows_blank(&self) -> bool {
        self.allow_blank
    }

    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help_text.as_deref()
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn dependant_fields(&self) -> &[String] {
        &self.dependant_fields
    }

    pub fn choices(&self) -> &[Value] {
        &self.choices
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub const fn runs_default_validators(&self) -> bool {
        self.default_validators
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("field_type", &self.field_type)
            .field("read_only", &self.read_only)
            .field("write_only", &self.write_only)
            .field("required", &self.required)
            .field("allow_null", &self.allow_null)
            .field("allow_blank", &self.allow_blank)
            .field("default", &self.default)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

/// Serializable description of a field, as reported by OPTIONS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    pub source: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub allow_null: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,
}

impl From<&Meta> for FieldMetadata {
    fn from(meta: &Meta) -> Self {
        Self {
            name: meta.name.clone(),
            source: meta.source.clone(),
            field_type: meta.field_type,
            required: meta.required,
            read_only: meta.read_only,
            write_only: meta.write_only,
            allow_null: meta.allow_null,
            label: meta.label.clone(),
            help_text: meta.help_text.clone(),
            placeholder: meta.placeholder.clone(),
            default: meta.default.clone(),
            choices: meta.choices.clone(),
        }
    }
}
