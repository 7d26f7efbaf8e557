use std::any::type_name;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ConfigError, FieldError};
use crate::fields::{Field, Internalizable, Representable};
use crate::meta::{FieldType, Meta};
use crate::value::Value;

// ============================================================================
// STRING ARRAY
// ============================================================================

/// List of strings. Null decodes to the empty list.
///
/// Besides JSON arrays of strings, accepts the Postgres array literal form
/// (`{a,"b c"}`) so columns stored that way decode directly.
#[derive(Debug, Clone)]
pub struct StringArrayField {
    value: Vec<String>,
    meta: Meta,
}

impl StringArrayField {
    pub fn new(meta: Meta) -> Result<Self, ConfigError> {
        let meta = meta.with_type_if_unset(FieldType::Array);
        meta.check()?;
        Ok(Self {
            value: Vec::new(),
            meta,
        })
    }

    pub fn value(&self) -> &[String] {
        &self.value
    }

    pub fn set_value(&mut self, value: Vec<String>) {
        self.value = value;
    }
}

/// Parse `{a, "b c", d\,e}` into its elements.
fn parse_array_literal(literal: &str) -> Option<Vec<String>> {
    let inner = literal.trim().strip_prefix('{')?.strip_suffix('}')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let mut item = String::new();
        if chars.next_if_eq(&'"').is_some() {
            loop {
                match chars.next()? {
                    '"' => break,
                    '\\' => item.push(chars.next()?),
                    c => item.push(c),
                }
            }
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                if c == '\\' {
                    item.push(chars.next()?);
                } else {
                    item.push(c);
                }
            }
            item = item.trim_end().to_string();
            if item.is_empty() {
                return None;
            }
        }
        items.push(item);
        match chars.next() {
            Some(',') => {}
            None => return Some(items),
            Some(_) => return None,
        }
    }
}

impl Internalizable for StringArrayField {
    fn to_internal_value(&mut self, raw: Value) -> Result<(), FieldError> {
        self.value.clear();
        let parsed = match &raw {
            Value::Null => Some(Vec::new()),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>(),
            Value::String(s) => parse_array_literal(s),
            _ => None,
        };
        match parsed {
            Some(items) => {
                self.value = items;
                Ok(())
            }
            None => Err(FieldError::invalid_value(
                self.meta.source(),
                &raw,
                "a list of strings",
            )),
        }
    }

    fn internal(&self) -> Value {
        Value::Array(self.value.iter().cloned().map(Value::String).collect())
    }
}

impl Representable for StringArrayField {
    fn to_representation(&self) -> Value {
        self.internal()
    }
}

impl Field for StringArrayField {
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
        false
    }

    fn is_zero(&self) -> bool {
        self.value.is_empty()
    }
}

// ============================================================================
// OBJECT ARRAY
// ============================================================================

/// List of structured values of type `T`.
pub struct ObjectArrayField<T> {
    value: Vec<T>,
    meta: Meta,
}

impl<T> ObjectArrayField<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(meta: Meta) -> Result<Self, ConfigError> {
        let meta = meta.with_type_if_unset(FieldType::Array);
        meta.check()?;
        Ok(Self {
            value: Vec::new(),
            meta,
        })
    }

    pub fn value(&self) -> &[T] {
        &self.value
    }

    pub fn set_value(&mut self, value: Vec<T>) {
        self.value = value;
    }
}

impl<T: fmt::Debug> fmt::Debug for ObjectArrayField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectArrayField")
            .field("value", &self.value)
            .field("meta", &self.meta)
            .finish()
    }
}

impl<T> Internalizable for ObjectArrayField<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    fn to_internal_value(&mut self, raw: Value) -> Result<(), FieldError> {
        self.value.clear();
        let parsed = match &raw {
            Value::Null => Some(Vec::new()),
            Value::Array(items) => items
                .iter()
                .map(|item| serde_json::from_value::<T>(item.clone()).ok())
                .collect::<Option<Vec<T>>>(),
            _ => None,
        };
        match parsed {
            Some(items) => {
                self.value = items;
                Ok(())
            }
            None => Err(FieldError::invalid_value(
                self.meta.source(),
                &raw,
                format!("a list of {}", type_name::<T>()),
            )),
        }
    }

    fn internal(&self) -> Value {
        Value::Array(
            self.value
                .iter()
                .map(|item| serde_json::to_value(item).unwrap_or(Value::Null))
                .collect(),
        )
    }
}

impl<T> Representable for ObjectArrayField<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    fn to_representation(&self) -> Value {
        self.internal()
    }
}

impl<T> Field for ObjectArrayField<T>
where
    T: Serialize + DeserializeOwned + Send,
{
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
        false
    }

    fn is_zero(&self) -> bool {
        self.value.is_empty()
    }
}
