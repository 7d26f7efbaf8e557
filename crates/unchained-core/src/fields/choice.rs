use crate::error::{ConfigError, FieldError};
use crate::fields::{Field, IntegerField, Internalizable, Representable, TextField};
use crate::meta::{FieldType, Meta};
use crate::validators::{self, Comparator};
use crate::value::Value;

/// Restricts an inner field to a closed set of options.
///
/// Conversion is delegated to the inner field. Membership is checked by a
/// validator placed ahead of any user validators.
#[derive(Debug, Clone)]
pub struct ChoiceField<F> {
    inner: F,
}

pub type TextChoiceField = ChoiceField<TextField>;
pub type IntegerChoiceField = ChoiceField<IntegerField>;

impl<F: Field> ChoiceField<F> {
    /// Wrap an already-constructed field.
    pub fn wrap(inner: F, options: Vec<Value>) -> Self {
        let validator = validators::choice(options.clone());
        Self::install(inner, options, validator)
    }

    /// Wrap with a custom equality for membership tests.
    pub fn wrap_with(inner: F, options: Vec<Value>, compare: Comparator) -> Self {
        let validator = validators::choice_with(options.clone(), compare);
        Self::install(inner, options, validator)
    }

    fn install(mut inner: F, options: Vec<Value>, validator: crate::meta::Validator) -> Self {
        let meta = inner.meta_mut();
        meta.set_type(FieldType::Choice);
        meta.set_choices(options);
        meta.prepend_validator(validator);
        Self { inner }
    }

    pub fn options(&self) -> &[Value] {
        self.inner.meta().choices()
    }

    pub const fn inner(&self) -> &F {
        &self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl ChoiceField<TextField> {
    pub fn text<I, S>(options: I, meta: Meta) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(|s| Value::String(s.into())).collect();
        Ok(Self::wrap(TextField::new(meta)?, options))
    }

    pub fn value(&self) -> Option<&str> {
        self.inner.value()
    }
}

impl ChoiceField<IntegerField> {
    pub fn integer<I>(options: I, meta: Meta) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = i64>,
    {
        let options = options.into_iter().map(Value::from).collect();
        Ok(Self::wrap(IntegerField::new(meta)?, options))
    }

    pub const fn value(&self) -> Option<i64> {
        self.inner.value()
    }
}

impl<F: Field> Internalizable for ChoiceField<F> {
    fn to_internal_value(&mut self, raw: Value) -> Result<(), FieldError> {
        self.inner.to_internal_value(raw)
    }

    fn internal(&self) -> Value {
        self.inner.internal()
    }
}

impl<F: Field> Representable for ChoiceField<F> {
    fn to_representation(&self) -> Value {
        self.inner.to_representation()
    }
}

impl<F: Field> Field for ChoiceField<F> {
    fn meta(&self) -> &Meta {
        self.inner.meta()
    }

    fn meta_mut(&mut self) -> &mut Meta {
        self.inner.meta_mut()
    }

    fn as_dyn(&self) -> &dyn Field {
        self
    }

    fn is_null(&self) -> bool {
        self.inner.is_null()
    }

    fn is_blank(&self) -> bool {
        self.inner.is_blank()
    }

    fn is_zero(&self) -> bool {
        self.inner.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::validators::min_length;

    #[test]
    fn test_text_choice_accepts_members() {
        let mut f = TextChoiceField::text(["draft", "published"], Meta::new("status")).unwrap();
        assert!(f.unmarshal(&json!("draft")).is_ok());
        assert_eq!(f.value(), Some("draft"));
        assert_eq!(f.meta().field_type(), FieldType::Choice);
        assert_eq!(f.options(), [json!("draft"), json!("published")]);
    }

    #[test]
    fn test_text_choice_rejects_non_members() {
        let mut f = TextChoiceField::text(["draft"], Meta::new("status")).unwrap();
        let errors = f.unmarshal(&json!("archived")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.iter().all(FieldError::is_invalid_value));
    }

    #[test]
    fn test_integer_choice_compares_loosely() {
        let mut f = IntegerChoiceField::integer([1, 2, 3], Meta::new("level")).unwrap();
        assert!(f.unmarshal(&json!("2")).is_ok());
        assert_eq!(f.value(), Some(2));
        assert!(f.unmarshal(&json!(4)).is_err());
    }

    #[test]
    fn test_choice_validator_runs_before_user_validators() {
        let meta = Meta::new("status").with_validators([min_length(10)]);
        let mut f = TextChoiceField::text(["ok"], meta).unwrap();
        let errors = f.unmarshal(&json!("bad")).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().next().is_some_and(FieldError::is_invalid_value));
    }

    #[test]
    fn test_custom_comparator() {
        let inner = TextField::new(Meta::new("code")).unwrap();
        let case_insensitive: Comparator = Arc::new(|a: &Value, b: &Value| match (a.as_str(), b.as_str()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        });
        let mut f = ChoiceField::wrap_with(inner, vec![json!("ABC")], case_insensitive);
        assert!(f.unmarshal(&json!("abc")).is_ok());
    }
}
