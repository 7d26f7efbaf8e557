//! End-to-end serializer scenarios over a hand-written model and a runtime
//! schema.

#![allow(clippy::unwrap_used)]

use serde_json::{json, Value};
use unchained_core::validators::{max_length, min_value};
use unchained_core::{
    ConfigError, DateTimeField, Field, FieldErrorKind, FieldType, Format, IntegerField, Meta,
    Model, ModelSerializer, ModifierSpec, Phase, Schema, SerializerError, SerializerMeta,
    StringArrayField, TextChoiceField, TextField,
};

// ═══════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════

struct Account {
    id: IntegerField,
    username: TextField,
    password: TextField,
    age: IntegerField,
    status: TextChoiceField,
    tags: StringArrayField,
    joined: DateTimeField,
}

impl Account {
    fn blank() -> Result<Self, ConfigError> {
        Ok(Self {
            id: IntegerField::id(Meta::new("id"))?,
            username: TextField::new(
                Meta::new("username")
                    .required()
                    .with_validators([max_length(12)]),
            )?,
            password: TextField::new(Meta::new("password").required())?,
            age: IntegerField::new(
                Meta::new("age")
                    .with_default(18)
                    .with_validators([min_value(0)]),
            )?,
            status: TextChoiceField::text(
                ["active", "suspended"],
                Meta::new("status").with_default("active"),
            )?,
            tags: StringArrayField::new(Meta::new("tags"))?,
            joined: DateTimeField::new(Meta::new("joined").with_source("joinedAt").allow_null())?,
        })
    }
}

impl Model for Account {
    fn init(&mut self) -> Result<(), ConfigError> {
        *self = Self::blank()?;
        Ok(())
    }

    fn fields(&self) -> Vec<&dyn Field> {
        vec![
            &self.id as &dyn Field,
            &self.username,
            &self.password,
            &self.age,
            &self.status,
            &self.tags,
            &self.joined,
        ]
    }

    fn fields_mut(&mut self) -> Vec<&mut dyn Field> {
        vec![
            &mut self.id as &mut dyn Field,
            &mut self.username,
            &mut self.password,
            &mut self.age,
            &mut self.status,
            &mut self.tags,
            &mut self.joined,
        ]
    }
}

fn serializer() -> ModelSerializer<Account> {
    let meta = SerializerMeta::new().with_write_only_fields(["password"]);
    ModelSerializer::new(Account::blank().unwrap(), meta)
}

// ═══════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn create_then_read_back() {
    let mut s = serializer();
    s.unmarshal(
        br#"{
            "id": 99,
            "username": "ada",
            "password": "s3cret",
            "tags": ["admin"],
            "joinedAt": "2024-05-01T12:00:00Z",
            "unknown": "ignored"
        }"#,
        Format::Json,
    )
    .unwrap();

    assert_eq!(s.model().id.value(), None);
    assert_eq!(s.model().age.value(), Some(18));
    assert_eq!(s.model().status.value(), Some("active"));

    let out: Value = serde_json::from_slice(&s.marshal(Format::Json).unwrap()).unwrap();
    assert_eq!(
        out,
        json!({
            "id": null,
            "username": "ada",
            "age": 18,
            "status": "active",
            "tags": ["admin"],
            "joinedAt": "2024-05-01T12:00:00Z"
        })
    );
}

#[test]
fn output_keys_follow_declaration_order() {
    let mut s = serializer();
    let out = s.to_value().unwrap();
    let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
    assert_eq!(
        keys,
        vec!["id", "username", "age", "status", "tags", "joinedAt"]
    );
}

#[test]
fn every_violation_is_reported() {
    let mut s = serializer();
    let err = s
        .unmarshal(
            br#"{"username": "a-very-long-name", "age": -1, "status": "banned"}"#,
            Format::Json,
        )
        .unwrap_err();
    let errors = err.validation_errors().unwrap();

    let map = errors.to_map();
    assert_eq!(
        map.keys().collect::<Vec<_>>(),
        vec!["username", "password", "age", "status"]
    );
    assert!(errors
        .iter()
        .any(|e| e.field() == "password" && e.kind() == &FieldErrorKind::MissingRequiredField));
    assert!(errors
        .iter()
        .any(|e| e.field() == "age" && e.kind() == &FieldErrorKind::TooSmall { min: 0 }));
}

#[test]
fn yaml_payload_decodes_like_json() {
    let mut s = serializer();
    s.unmarshal(
        b"username: grace\npassword: hopper\nage: 40\ntags:\n  - navy\n",
        Format::Yaml,
    )
    .unwrap();
    assert_eq!(s.model().username.value(), Some("grace"));
    assert_eq!(s.model().age.value(), Some(40));
    assert_eq!(s.model().tags.value(), ["navy"]);

    let yaml = String::from_utf8(s.marshal(Format::Yaml).unwrap()).unwrap();
    assert!(yaml.contains("username: grace"));
    assert!(!yaml.contains("hopper"));
}

#[test]
fn malformed_payload_is_a_decode_error() {
    let mut s = serializer();
    let err = s.unmarshal(b"{\"username\": ", Format::Json).unwrap_err();
    assert!(matches!(err, SerializerError::Decode { format: Format::Json, .. }));
}

#[test]
fn post_write_modifier_sees_decoded_values() {
    let meta = SerializerMeta::new().with_modifier(
        Phase::PostWrite,
        ModifierSpec::new(["username"], |field: &mut dyn Field| {
            let lowered = field.internal().as_str().map(str::to_lowercase);
            match lowered {
                Some(lowered) => field.to_internal_value(Value::String(lowered)),
                None => Ok(()),
            }
        }),
    );
    let mut s = ModelSerializer::new(Account::blank().unwrap(), meta);
    s.unmarshal(br#"{"username": "ADA", "password": "x"}"#, Format::Json)
        .unwrap();
    assert_eq!(s.model().username.value(), Some("ada"));
}

#[test]
fn dynamic_schema_round_trip() {
    let schema = Schema::builder()
        .add_field(Meta::new("id").with_type(FieldType::Id))
        .add_field(Meta::new("title").with_type(FieldType::String).required())
        .add_field(
            Meta::new("priority")
                .with_type(FieldType::Choice)
                .with_choices(["low", "high"])
                .with_default("low"),
        )
        .add_field(Meta::new("extra").with_type(FieldType::Object).allow_null())
        .build()
        .unwrap();

    let mut s = ModelSerializer::new(schema.instantiate().unwrap(), SerializerMeta::new());
    s.unmarshal(
        br#"{"title": "ship it", "extra": {"labels": [1, 2]}}"#,
        Format::Json,
    )
    .unwrap();

    assert_eq!(
        s.to_value().unwrap(),
        json!({
            "id": null,
            "title": "ship it",
            "priority": "low",
            "extra": {"labels": [1, 2]}
        })
    );

    let metadata = s.metadata();
    assert_eq!(metadata[2].field_type, FieldType::Choice);
    assert_eq!(metadata[2].choices, vec![json!("low"), json!("high")]);
}
