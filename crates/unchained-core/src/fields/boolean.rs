use crate::error::{ConfigError, FieldError};
use crate::fields::{Internalizable, Representable};
use crate::meta::{FieldType, Meta};
use crate::value::Value;

/// Three-state boolean: true, false or null.
#[derive(Debug, Clone)]
pub struct BooleanField {
    value: Option<bool>,
    meta: Meta,
}

impl BooleanField {
    pub fn new(meta: Meta) -> Result<Self, ConfigError> {
        let meta = meta.with_type_if_unset(FieldType::Boolean);
        meta.check()?;
        Ok(Self { value: None, meta })
    }

    pub const fn value(&self) -> Option<bool> {
        self.value
    }

    pub fn set_value(&mut self, value: Option<bool>) {
        self.value = value;
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

impl Internalizable for BooleanField {
    fn to_internal_value(&mut self, raw: Value) -> Result<(), FieldError> {
        self.value = None;
        let parsed = match &raw {
            Value::Null => return Ok(()),
            Value::Bool(b) => Some(*b),
            Value::String(s) => parse_bool(s),
            _ => None,
        };
        match parsed {
            Some(b) => {
                self.value = Some(b);
                Ok(())
            }
            None => Err(FieldError::invalid_value(self.meta.source(), &raw, "a boolean")),
        }
    }

    fn internal(&self) -> Value {
        self.value.map_or(Value::Null, Value::Bool)
    }
}

impl Representable for BooleanField {
    fn to_representation(&self) -> Value {
        self.internal()
    }
}

impl_option_field!(BooleanField);
