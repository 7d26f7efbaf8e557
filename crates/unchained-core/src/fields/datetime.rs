use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{ConfigError, FieldError};
use crate::fields::{Internalizable, Representable};
use crate::meta::{FieldType, Meta};
use crate::value::Value;

/// Nullable UTC timestamp.
///
/// Accepts RFC 3339 strings (any offset, normalized to UTC) and integer Unix
/// seconds. Represented as RFC 3339 with a `Z` suffix.
#[derive(Debug, Clone)]
pub struct DateTimeField {
    value: Option<DateTime<Utc>>,
    meta: Meta,
}

impl DateTimeField {
    pub fn new(meta: Meta) -> Result<Self, ConfigError> {
        let meta = meta.with_type_if_unset(FieldType::DateTime);
        meta.check()?;
        Ok(Self { value: None, meta })
    }

    pub const fn value(&self) -> Option<DateTime<Utc>> {
        self.value
    }

    pub fn set_value(&mut self, value: Option<DateTime<Utc>>) {
        self.value = value;
    }
}

fn parse(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

impl Internalizable for DateTimeField {
    fn to_internal_value(&mut self, raw: Value) -> Result<(), FieldError> {
        self.value = None;
        if raw.is_null() {
            return Ok(());
        }
        match parse(&raw) {
            Some(dt) => {
                self.value = Some(dt);
                Ok(())
            }
            None => Err(FieldError::invalid_value(
                self.meta.source(),
                &raw,
                "an RFC 3339 timestamp",
            )),
        }
    }

    fn internal(&self) -> Value {
        self.value.map_or(Value::Null, |dt| {
            Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        })
    }
}

impl Representable for DateTimeField {
    fn to_representation(&self) -> Value {
        self.internal()
    }
}

impl_option_field!(DateTimeField);
