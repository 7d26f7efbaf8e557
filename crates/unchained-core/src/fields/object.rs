use std::any::type_name;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ConfigError, FieldError};
use crate::fields::{Field, Internalizable, Representable};
use crate::meta::{FieldType, Meta};
use crate::value::Value;

/// A nested structured value of type `T`, nullable.
///
/// Use `ObjectField<Value>` for free-form objects.
pub struct ObjectField<T> {
    value: Option<T>,
    meta: Meta,
}

impl<T> ObjectField<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(meta: Meta) -> Result<Self, ConfigError> {
        let meta = meta.with_type_if_unset(FieldType::Object);
        meta.check()?;
        Ok(Self { value: None, meta })
    }

    pub const fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: Option<T>) {
        self.value = value;
    }
}

impl<T: fmt::Debug> fmt::Debug for ObjectField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectField")
            .field("value", &self.value)
            .field("meta", &self.meta)
            .finish()
    }
}

impl<T> Internalizable for ObjectField<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    fn to_internal_value(&mut self, raw: Value) -> Result<(), FieldError> {
        self.value = None;
        if raw.is_null() {
            return Ok(());
        }
        match serde_json::from_value::<T>(raw.clone()) {
            Ok(v) => {
                self.value = Some(v);
                Ok(())
            }
            Err(_) => Err(FieldError::invalid_value(
                self.meta.source(),
                &raw,
                format!("an object of type {}", type_name::<T>()),
            )),
        }
    }

    fn internal(&self) -> Value {
        self.value
            .as_ref()
            .and_then(|v| serde_json::to_value(v).ok())
            .unwrap_or(Value::Null)
    }
}

impl<T> Representable for ObjectField<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    fn to_representation(&self) -> Value {
        self.internal()
    }
}

impl<T> Field for ObjectField<T>
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
        self.value.is_none()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Address {
        street: String,
        zip: Option<String>,
    }

    #[test]
    fn test_decodes_matching_object() {
        let mut f = ObjectField::<Address>::new(Meta::new("address")).unwrap();
        f.to_internal_value(json!({"street": "Main", "zip": null}))
            .unwrap();
        assert_eq!(
            f.value(),
            Some(&Address {
                street: "Main".to_string(),
                zip: None
            })
        );
        assert_eq!(f.to_representation(), json!({"street": "Main", "zip": null}));
    }

    #[test]
    fn test_rejects_mismatched_shape() {
        let mut f = ObjectField::<Address>::new(Meta::new("address")).unwrap();
        let err = f.to_internal_value(json!(["Main"])).unwrap_err();
        assert!(err.is_invalid_value());
        assert!(f.is_null());
    }

    #[test]
    fn test_free_form_object() {
        let mut f = ObjectField::<Value>::new(Meta::new("extra")).unwrap();
        f.to_internal_value(json!({"anything": [1, 2]})).unwrap();
        assert_eq!(f.internal(), json!({"anything": [1, 2]}));
    }
}
