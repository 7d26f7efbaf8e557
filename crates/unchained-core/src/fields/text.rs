use crate::error::{ConfigError, FieldError};
use crate::fields::{Field, Internalizable, Representable};
use crate::meta::{FieldType, Meta};
use crate::value::Value;

/// Nullable string. Accepts strings and UTF-8 byte arrays.
#[derive(Debug, Clone)]
pub struct TextField {
    value: Option<String>,
    meta: Meta,
}

impl TextField {
    pub fn new(meta: Meta) -> Result<Self, ConfigError> {
        let meta = meta.with_type_if_unset(FieldType::String);
        meta.check()?;
        Ok(Self { value: None, meta })
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }
}

fn from_bytes(items: &[Value]) -> Option<String> {
    let bytes = items
        .iter()
        .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

impl Internalizable for TextField {
    fn to_internal_value(&mut self, raw: Value) -> Result<(), FieldError> {
        self.value = None;
        let parsed = match &raw {
            Value::Null => return Ok(()),
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => from_bytes(items),
            _ => None,
        };
        match parsed {
            Some(s) => {
                self.value = Some(s);
                Ok(())
            }
            None => Err(FieldError::invalid_value(self.meta.source(), &raw, "a string")),
        }
    }

    fn internal(&self) -> Value {
        self.value.clone().map_or(Value::Null, Value::String)
    }
}

impl Representable for TextField {
    fn to_representation(&self) -> Value {
        self.internal()
    }
}

impl Field for TextField {
    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn as_dyn(&self) -> &dyn Field {
        self
    }

    fn is_null(&self) -> bool {
        self.value.is_none()
    }

    fn is_blank(&self) -> bool {
        self.value.as_deref().is_some_and(|s| s.trim().is_empty())
    }
}
