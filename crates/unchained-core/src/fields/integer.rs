use crate::error::{ConfigError, FieldError};
use crate::fields::{Internalizable, Representable};
use crate::meta::{FieldType, Meta};
use crate::value::Value;

/// Signed 64-bit integer, nullable.
///
/// Accepts JSON integers, floats with no fractional part, and decimal strings.
#[derive(Debug, Clone)]
pub struct IntegerField {
    value: Option<i64>,
    meta: Meta,
}

impl IntegerField {
    pub fn new(meta: Meta) -> Result<Self, ConfigError> {
        let meta = meta.with_type_if_unset(FieldType::Integer);
        meta.check()?;
        Ok(Self { value: None, meta })
    }

    /// A read-only integer tagged as the model's identifier.
    pub fn id(meta: Meta) -> Result<Self, ConfigError> {
        Self::new(meta.with_type(FieldType::Id).read_only())
    }

    pub const fn value(&self) -> Option<i64> {
        self.value
    }

    pub fn set_value(&mut self, value: Option<i64>) {
        self.value = value;
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn parse(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Internalizable for IntegerField {
    fn to_internal_value(&mut self, raw: Value) -> Result<(), FieldError> {
        self.value = None;
        if raw.is_null() {
            return Ok(());
        }
        match parse(&raw) {
            Some(v) => {
                self.value = Some(v);
                Ok(())
            }
            None => Err(FieldError::invalid_value(
                self.meta.source(),
                &raw,
                "an integer",
            )),
        }
    }

    fn internal(&self) -> Value {
        self.value.map_or(Value::Null, Value::from)
    }
}

impl Representable for IntegerField {
    fn to_representation(&self) -> Value {
        self.internal()
    }
}

impl_option_field!(IntegerField);
