//! Runtime-assembled models.
//!
//! [`SchemaBuilder`] collects field declarations; [`Schema`] is the frozen
//! result and stamps out [`DynamicModel`] instances that behave like any
//! hand-written [`Model`].

use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigError;
use crate::fields::{
    BooleanField, ChoiceField, DateTimeField, Field, IntegerField, ObjectField, StringArrayField,
    TextField,
};
use crate::meta::{FieldType, Meta};
use crate::model::{self, Model};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fields: Vec<Meta>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. The kind comes from the meta's type tag; a
    /// declaration with the same name replaces the earlier one in place.
    pub fn add_field(mut self, meta: Meta) -> Self {
        match self.fields.iter_mut().find(|m| m.name() == meta.name()) {
            Some(existing) => *existing = meta,
            None => self.fields.push(meta),
        }
        self
    }

    pub fn remove_field(mut self, name: &str) -> Self {
        self.fields.retain(|m| m.name() != name);
        self
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|m| m.name() == name)
    }

    pub fn field(&self, name: &str) -> Option<&Meta> {
        self.fields.iter().find(|m| m.name() == name)
    }

    /// Validate every declaration and freeze the schema.
    pub fn build(self) -> Result<Schema, ConfigError> {
        let schema = Schema {
            fields: self.fields.into(),
        };
        // A throwaway instance surfaces bad metas, kinds and duplicate keys.
        schema.instantiate()?;
        debug!(fields = schema.fields.len(), "schema built");
        Ok(schema)
    }
}

/// Frozen field declarations. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Arc<[Meta]>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn fields(&self) -> &[Meta] {
        &self.fields
    }

    /// A fresh model with every field in its zero state.
    pub fn instantiate(&self) -> Result<DynamicModel, ConfigError> {
        let mut model = DynamicModel {
            schema: self.clone(),
            fields: Vec::new(),
        };
        model.init()?;
        Ok(model)
    }
}

fn build_field(meta: &Meta) -> Result<Box<dyn Field>, ConfigError> {
    let meta = meta.clone();
    let field: Box<dyn Field> = match meta.field_type() {
        FieldType::String => Box::new(TextField::new(meta)?),
        FieldType::Integer => Box::new(IntegerField::new(meta)?),
        FieldType::Id => Box::new(IntegerField::id(meta)?),
        FieldType::Boolean => Box::new(BooleanField::new(meta)?),
        FieldType::DateTime => Box::new(DateTimeField::new(meta)?),
        FieldType::Array => Box::new(StringArrayField::new(meta)?),
        FieldType::Object => Box::new(ObjectField::<Value>::new(meta)?),
        FieldType::Choice => {
            let options = meta.choices().to_vec();
            if !options.is_empty() && options.iter().all(Value::is_i64) {
                Box::new(ChoiceField::wrap(IntegerField::new(meta)?, options))
            } else {
                Box::new(ChoiceField::wrap(TextField::new(meta)?, options))
            }
        }
        FieldType::Invalid => {
            return Err(ConfigError::InvalidFieldType {
                field: meta.name().to_string(),
                field_type: FieldType::Invalid.to_string(),
            })
        }
    };
    Ok(field)
}

/// A model whose fields were declared at runtime.
pub struct DynamicModel {
    schema: Schema,
    fields: Vec<Box<dyn Field>>,
}

impl DynamicModel {
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl std::fmt::Debug for DynamicModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicModel")
            .field("schema", &self.schema)
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl Model for DynamicModel {
    fn init(&mut self) -> Result<(), ConfigError> {
        self.fields = self
            .schema
            .fields
            .iter()
            .map(build_field)
            .collect::<Result<_, _>>()?;
        model::check_sources(&*self)
    }

    fn fields(&self) -> Vec<&dyn Field> {
        self.fields.iter().map(|f| &**f as &dyn Field).collect()
    }

    fn fields_mut(&mut self) -> Vec<&mut dyn Field> {
        self.fields
            .iter_mut()
            .map(|f| &mut **f as &mut dyn Field)
            .collect()
    }
}
