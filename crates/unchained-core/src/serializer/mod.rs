//! Model serializer.
//!
//! Wraps a [`Model`] and drives the read and write pipelines:
//!
//! ```text
//!   marshal:    init → PreRead  → encode fields → PostRead
//!   unmarshal:  init → PreWrite → decode fields → PostWrite
//! ```
//!
//! Modifiers of a phase run in registration order, with the
//! `read_only_fields` / `write_only_fields` shorthand first.
//!
//! On output each readable field appears under its wire key; write-only fields
//! are omitted. On input, keys the model does not know are ignored; a missing
//! key yields `MissingRequiredField` for a required field and the configured
//! default otherwise. Field errors are aggregated across the whole payload.
//! A [partial](ModelSerializer::partial) serializer skips absent keys
//! entirely, for patch-style updates.

mod meta;
pub mod modifiers;

pub use meta::{ModifierSpec, Phase, SerializerMeta};
pub use modifiers::{manage_model_fields, set_field_read_only, set_field_write_only, FieldModifier};

use serde_json::Map;
use tracing::debug;

use crate::error::{FieldError, FieldErrorKind, SerializerError, ValidationErrors};
use crate::format::Format;
use crate::meta::FieldMetadata;
use crate::model::{self, Model};
use crate::value::{self, Value};

pub type Result<T> = std::result::Result<T, SerializerError>;

#[derive(Debug)]
pub struct ModelSerializer<M> {
    model: M,
    meta: SerializerMeta,
    initialized: bool,
    partial: bool,
}

impl<M: Model> ModelSerializer<M> {
    pub fn new(model: M, meta: SerializerMeta) -> Self {
        Self {
            model,
            meta: meta.compile(),
            initialized: false,
            partial: false,
        }
    }

    /// Leave fields whose key is absent from the payload untouched: no
    /// required check, no default.
    #[must_use]
    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    pub const fn is_partial(&self) -> bool {
        self.partial
    }

    /// Initialize the model once. Later calls are no-ops.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.reset()
    }

    /// Re-initialize the model unconditionally, discarding field values and
    /// any metadata changes made by modifiers.
    pub fn reset(&mut self) -> Result<()> {
        self.model.init()?;
        model::check_sources(&self.model)?;
        self.initialized = true;
        Ok(())
    }

    /// Run every modifier registered for `phase`.
    pub fn perform_modifications(&mut self, phase: Phase) -> Result<()> {
        let mut errors = ValidationErrors::new();
        for spec in self.meta.modifiers(phase) {
            if let Err(e) = manage_model_fields(&mut self.model, spec.fields(), spec.modifier()) {
                errors.extend(e);
            }
        }
        errors
            .into_result()
            .map_err(|errors| SerializerError::Modifier { phase, errors })
    }

    // ========================================================================
    // READ PIPELINE
    // ========================================================================

    /// Encode the model into `format`.
    pub fn marshal(&mut self, format: Format) -> Result<Vec<u8>> {
        self.init()?;
        self.perform_modifications(Phase::PreRead)?;
        let bytes = format.encode(&self.encode_fields())?;
        self.perform_modifications(Phase::PostRead)?;
        debug!(%format, bytes = bytes.len(), "marshalled model");
        Ok(bytes)
    }

    /// Like [`marshal`](Self::marshal) but stops at the erased value.
    pub fn to_value(&mut self) -> Result<Value> {
        self.init()?;
        self.perform_modifications(Phase::PreRead)?;
        let value = self.encode_fields();
        self.perform_modifications(Phase::PostRead)?;
        Ok(value)
    }

    fn encode_fields(&self) -> Value {
        let object: Map<String, Value> = self
            .model
            .fields()
            .into_iter()
            .filter(|field| !field.meta().is_write_only())
            .map(|field| (field.meta().source().to_string(), field.marshal()))
            .collect();
        Value::Object(object)
    }

    // ========================================================================
    // WRITE PIPELINE
    // ========================================================================

    /// Decode a `format` payload into the model.
    pub fn unmarshal(&mut self, bytes: &[u8], format: Format) -> Result<()> {
        self.init()?;
        self.perform_modifications(Phase::PreWrite)?;
        let payload = format.decode(bytes)?;
        debug!(%format, bytes = bytes.len(), "unmarshalling payload");
        self.decode_fields(&payload)
    }

    /// Like [`unmarshal`](Self::unmarshal) for an already-decoded payload.
    pub fn from_value(&mut self, payload: &Value) -> Result<()> {
        self.init()?;
        self.perform_modifications(Phase::PreWrite)?;
        self.decode_fields(payload)
    }

    fn decode_fields(&mut self, payload: &Value) -> Result<()> {
        let Value::Object(object) = payload else {
            return Err(SerializerError::InvalidPayload {
                shape: value::shape_of(payload),
            });
        };

        let partial = self.partial;
        let mut errors = ValidationErrors::new();
        for field in self.model.fields_mut() {
            let outcome = match object.get(field.meta().source()) {
                Some(raw) => field.unmarshal(raw),
                None if partial || field.meta().is_read_only() => Ok(()),
                None if field.meta().is_required() => Err(FieldError::new(
                    field.meta().source(),
                    FieldErrorKind::MissingRequiredField,
                )
                .into()),
                None => field.apply_default(),
            };
            if let Err(e) = outcome {
                errors.extend(e);
            }
        }

        match self.perform_modifications(Phase::PostWrite) {
            Err(SerializerError::Modifier { errors: failed, .. }) => errors.extend(failed),
            other => other?,
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "payload failed validation");
        }
        errors.into_result().map_err(SerializerError::Validation)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub const fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub const fn meta(&self) -> &SerializerMeta {
        &self.meta
    }

    /// Field descriptions in declaration order, reflecting any modifier
    /// changes made so far.
    pub fn metadata(&self) -> Vec<FieldMetadata> {
        model::metadata(&self.model)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::error::ConfigError;
    use crate::fields::{Field, IntegerField, TextField};
    use crate::meta::Meta;

    #[derive(Debug)]
    struct Test {
        f1: IntegerField,
        f2: TextField,
        f3: TextField,
    }

    impl Test {
        fn new() -> Self {
            Self {
                f1: IntegerField::new(Meta::new("f1")).unwrap(),
                f2: TextField::new(Meta::new("f2")).unwrap(),
                f3: TextField::new(Meta::new("f3")).unwrap(),
            }
        }
    }

    impl Model for Test {
        fn init(&mut self) -> std::result::Result<(), ConfigError> {
            self.f1 = IntegerField::new(Meta::new("f1").with_source("Field1"))?;
            self.f2 = TextField::new(Meta::new("f2").with_source("Field2").allow_null())?;
            self.f3 = TextField::new(Meta::new("f3").with_source("Field3").allow_null())?;
            Ok(())
        }

        fn fields(&self) -> Vec<&dyn Field> {
            vec![&self.f1 as &dyn Field, &self.f2, &self.f3]
        }

        fn fields_mut(&mut self) -> Vec<&mut dyn Field> {
            vec![&mut self.f1 as &mut dyn Field, &mut self.f2, &mut self.f3]
        }
    }

    #[test]
    fn test_read_only_fields_ignore_input() {
        let meta = SerializerMeta::new().with_read_only_fields(["Field1"]);
        let mut s = ModelSerializer::new(Test::new(), meta);

        s.unmarshal(br#"{"Field1": 5, "Field2": "x"}"#, Format::Json)
            .unwrap();
        assert_eq!(s.model().f1.value(), None);
        assert_eq!(s.model().f2.value(), Some("x"));
    }

    #[test]
    fn test_write_only_fields_omitted_from_output() {
        let meta = SerializerMeta::new().with_write_only_fields(["Field2"]);
        let mut s = ModelSerializer::new(Test::new(), meta);
        s.init().unwrap();
        s.model_mut().f1.set_value(Some(1));
        s.model_mut().f2.set_value(Some("secret".to_string()));

        let value = s.to_value().unwrap();
        assert_eq!(value, json!({"Field1": 1, "Field3": null}));
    }

    #[test]
    fn test_shorthand_runs_before_user_modifiers() {
        let observed = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&observed);
        let meta = SerializerMeta::new()
            .with_read_only_fields(["Field1"])
            .with_modifier(
                Phase::PreWrite,
                ModifierSpec::new(["Field1"], move |field: &mut dyn Field| {
                    seen.store(field.meta().is_read_only(), Ordering::SeqCst);
                    Ok(())
                }),
            );
        let mut s = ModelSerializer::new(Test::new(), meta);
        s.unmarshal(b"{}", Format::Json).unwrap();
        assert!(observed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_each_phase_runs_once_per_pipeline() {
        let counts: Arc<[AtomicUsize; 4]> = Arc::new(Default::default());
        let mut meta = SerializerMeta::new();
        for (i, phase) in [Phase::PreRead, Phase::PostRead, Phase::PreWrite, Phase::PostWrite]
            .into_iter()
            .enumerate()
        {
            let counts = Arc::clone(&counts);
            meta = meta.with_modifier(
                phase,
                ModifierSpec::new(["Field2"], move |_: &mut dyn Field| {
                    counts[i].fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
        }
        let mut s = ModelSerializer::new(Test::new(), meta);
        s.marshal(Format::Json).unwrap();
        s.unmarshal(b"{}", Format::Json).unwrap();

        let counts: Vec<usize> = counts.iter().map(|c| c.load(Ordering::SeqCst)).collect();
        assert_eq!(counts, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_modifier_errors_fail_the_phase() {
        let meta = SerializerMeta::new().with_modifier(
            Phase::PreRead,
            ModifierSpec::new(["Field1", "Field3"], |field: &mut dyn Field| {
                Err(FieldError::custom(field.meta().source(), "denied"))
            }),
        );
        let mut s = ModelSerializer::new(Test::new(), meta);
        match s.marshal(Format::Json) {
            Err(SerializerError::Modifier { phase, errors }) => {
                assert_eq!(phase, Phase::PreRead);
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected modifier failure, got {other:?}"),
        }
    }

    #[test]
    fn test_init_is_idempotent_and_reset_is_not() {
        let mut s = ModelSerializer::new(Test::new(), SerializerMeta::new());
        s.unmarshal(br#"{"Field1": 9}"#, Format::Json).unwrap();
        s.init().unwrap();
        assert_eq!(s.model().f1.value(), Some(9));
        s.reset().unwrap();
        assert_eq!(s.model().f1.value(), None);
    }

    #[test]
    fn test_partial_skips_absent_keys() {
        let mut s = ModelSerializer::new(Test::new(), SerializerMeta::new()).partial();
        s.unmarshal(br#"{"Field2": "only"}"#, Format::Json).unwrap();
        assert!(s.is_partial());
        assert_eq!(s.model().f1.value(), None);
        assert_eq!(s.model().f2.value(), Some("only"));
    }

    #[test]
    fn test_rejects_non_object_payload() {
        let mut s = ModelSerializer::new(Test::new(), SerializerMeta::new());
        let err = s.unmarshal(b"[1, 2]", Format::Json).unwrap_err();
        assert!(matches!(
            err,
            SerializerError::InvalidPayload { shape: "array" }
        ));
    }

    #[test]
    fn test_errors_aggregated_in_declaration_order() {
        let mut s = ModelSerializer::new(Test::new(), SerializerMeta::new());
        let err = s
            .unmarshal(br#"{"Field1": "one", "Field2": 2, "Field3": "ok"}"#, Format::Json)
            .unwrap_err();
        let errors = err.validation_errors().unwrap();
        let fields: Vec<&str> = errors.iter().map(FieldError::field).collect();
        assert_eq!(fields, vec!["Field1", "Field2"]);
    }
}
