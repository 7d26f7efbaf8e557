//! Field modifiers: functions that adjust a field in place around a read or
//! write.

use std::sync::Arc;

use tracing::debug;

use crate::error::{FieldError, ValidationErrors};
use crate::fields::Field;
use crate::model::{self, Model};

pub type FieldModifier = Arc<dyn Fn(&mut dyn Field) -> Result<(), FieldError> + Send + Sync>;

/// Make a field read-only. Also clears `write_only` and `required`, which
/// would otherwise contradict it.
pub fn set_field_read_only(field: &mut dyn Field) -> Result<(), FieldError> {
    let meta = field.meta_mut();
    meta.set_read_only(true);
    meta.set_write_only(false);
    meta.set_required(false);
    Ok(())
}

/// Make a field write-only. Also clears `read_only`.
pub fn set_field_write_only(field: &mut dyn Field) -> Result<(), FieldError> {
    let meta = field.meta_mut();
    meta.set_write_only(true);
    meta.set_read_only(false);
    Ok(())
}

/// Apply `modifier` to each named field (by wire key).
///
/// Names with no matching field are skipped. Every matching field is visited
/// even after a failure; failures are aggregated.
pub fn manage_model_fields<M: Model + ?Sized>(
    model: &mut M,
    fields: &[String],
    modifier: &FieldModifier,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for name in fields {
        match model::get_field_mut(&mut *model, name) {
            Some(field) => {
                if let Err(e) = modifier(field) {
                    errors.push(e);
                }
            }
            None => debug!(field = %name, "modifier target not found on model, skipping"),
        }
    }
    errors.into_result()
}
