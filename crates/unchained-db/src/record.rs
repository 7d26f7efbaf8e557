//! Row shapes and their entity mapping.

use sqlx::sqlite::SqliteRow;
use unchained_core::Value;

use crate::error::RepositoryResult;

/// A persistence row: one table, an integer `id` primary key, and an ordered
/// set of writable columns.
pub trait Record: Sized + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;

    /// Writable columns, excluding `id`. Order matches [`Record::values`].
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Column values aligned with [`Record::COLUMNS`].
    fn values(&self) -> Vec<Value>;

    fn from_row(row: &SqliteRow) -> RepositoryResult<Self>;
}

/// Bidirectional mapping between a row shape and a domain entity.
///
/// `Dto::from_entity(&e).to_entity()` reproduces `e` for every field the row
/// persists.
pub trait Dto: Record {
    type Entity: Send + Sync + 'static;

    fn from_entity(entity: &Self::Entity) -> Self;

    fn to_entity(&self) -> Self::Entity;
}
