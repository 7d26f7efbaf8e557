//! Repository traits and their SQLite implementation.
//!
//! # Architecture
//!
//! Callers depend on [`BaseRepository`] / [`Repository`] and hand entities
//! in and out. [`SqliteRepository`] projects each entity through its
//! [`Dto`], renders a statement with the [`statement`](crate::statement)
//! builders, and runs it on the pool. [`SqliteTransaction`] runs the same
//! statements on one connection inside a transaction that is committed or
//! rolled back by consuming it.
//!
//! Every operation takes a [`Context`]; the query future is dropped when the
//! context is canceled or its deadline passes.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqlitePool},
    Executor, Row, Sqlite, Transaction,
};
use tokio::sync::Mutex;
use tracing::debug;
use unchained_core::{Specification, Value};

use crate::{
    context::Context,
    error::{RepositoryError, RepositoryResult},
    record::{Dto, Record},
    statement::{Delete, Insert, SaveOptions, Select, Statement, Update},
};

// ============================================================================
// TRAITS
// ============================================================================

/// Entity-level persistence operations.
#[async_trait]
pub trait BaseRepository<E>: Send + Sync
where
    E: Send + 'static,
{
    /// Insert `entity` and return it with its generated id applied.
    async fn save(&self, ctx: &Context, entity: E) -> RepositoryResult<E> {
        self.save_with(ctx, entity, &SaveOptions::default()).await
    }

    async fn save_with(
        &self,
        ctx: &Context,
        entity: E,
        options: &SaveOptions,
    ) -> RepositoryResult<E>;

    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no row has `id`.
    async fn get(&self, ctx: &Context, id: i64) -> RepositoryResult<E>;

    /// Every row matching `filter`, or every row when `filter` is `None`.
    async fn find(&self, ctx: &Context, filter: Option<&Specification>)
        -> RepositoryResult<Vec<E>>;

    /// Write the non-null columns of `entity` to its row and return the
    /// stored row.
    async fn update(&self, ctx: &Context, entity: E) -> RepositoryResult<E>;

    async fn delete(&self, ctx: &Context, id: i64) -> RepositoryResult<()>;
}

/// A repository that can open transactions.
#[async_trait]
pub trait Repository<E>: BaseRepository<E>
where
    E: Send + 'static,
{
    type Tx: TxRepository<E>;

    async fn begin(&self) -> RepositoryResult<Self::Tx>;
}

/// A repository bound to one open transaction. Dropping it without
/// committing rolls back.
#[async_trait]
pub trait TxRepository<E>: BaseRepository<E> + Sized
where
    E: Send + 'static,
{
    async fn commit(self) -> RepositoryResult<()>;

    async fn rollback(self) -> RepositoryResult<()>;
}

// ============================================================================
// STATEMENT EXECUTION
// ============================================================================

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        // Arrays and objects are stored as JSON text.
        other => query.bind(other.to_string()),
    }
}

fn prepare(statement: &Statement) -> SqliteQuery<'_> {
    debug!(sql = statement.sql(), binds = statement.values().len(), "executing statement");
    statement
        .values()
        .iter()
        .fold(sqlx::query(statement.sql()), |query, value| {
            bind_value(query, value)
        })
}

fn columns<D: Record>(record: &D) -> RepositoryResult<Vec<(&'static str, Value)>> {
    let values = record.values();
    if values.len() != D::COLUMNS.len() {
        return Err(RepositoryError::invalid_input(format!(
            "{} record produced {} values for {} columns",
            D::TABLE,
            values.len(),
            D::COLUMNS.len()
        )));
    }
    Ok(D::COLUMNS.iter().copied().zip(values).collect())
}

async fn insert_record<'c, D, X>(
    executor: X,
    record: &D,
    options: &SaveOptions,
) -> RepositoryResult<i64>
where
    D: Record,
    X: Executor<'c, Database = Sqlite>,
{
    let statement = columns(record)?
        .into_iter()
        .fold(Insert::table(D::TABLE), |insert, (column, value)| {
            insert.value(column, value)
        })
        .options(options)
        .returning("id")
        .build()?;

    prepare(&statement)
        .fetch_optional(executor)
        .await?
        .map_or_else(
            || {
                Err(RepositoryError::Conflict(format!(
                    "{} row already exists",
                    D::TABLE
                )))
            },
            |row| row.try_get::<i64, _>("id").map_err(RepositoryError::from),
        )
}

async fn fetch_record<'c, D, X>(executor: X, id: i64) -> RepositoryResult<D>
where
    D: Record,
    X: Executor<'c, Database = Sqlite>,
{
    let filter = Specification::equal("id", id);
    let statement = Select::table(D::TABLE).filter(Some(&filter)).build()?;
    prepare(&statement)
        .fetch_optional(executor)
        .await?
        .map_or_else(
            || Err(RepositoryError::not_found(D::TABLE, id)),
            |row| D::from_row(&row),
        )
}

async fn fetch_records<'c, D, X>(
    executor: X,
    filter: Option<&Specification>,
) -> RepositoryResult<Vec<D>>
where
    D: Record,
    X: Executor<'c, Database = Sqlite>,
{
    let statement = Select::table(D::TABLE)
        .filter(filter)
        .order_by("id")
        .build()?;
    prepare(&statement)
        .fetch_all(executor)
        .await?
        .iter()
        .map(D::from_row)
        .collect()
}

async fn update_record<'c, D, X>(executor: X, record: &D) -> RepositoryResult<D>
where
    D: Record,
    X: Executor<'c, Database = Sqlite>,
{
    let id = record.id().ok_or_else(|| {
        RepositoryError::invalid_input(format!("{} update requires an id", D::TABLE))
    })?;
    let filter = Specification::equal("id", id);
    let statement = columns(record)?
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .fold(Update::table(D::TABLE), |update, (column, value)| {
            update.set(column, value)
        })
        .filter(&filter)
        .returning_all()
        .build()?;

    prepare(&statement)
        .fetch_optional(executor)
        .await?
        .map_or_else(
            || Err(RepositoryError::not_found(D::TABLE, id)),
            |row| D::from_row(&row),
        )
}

async fn delete_record<'c, D, X>(executor: X, id: i64) -> RepositoryResult<()>
where
    D: Record,
    X: Executor<'c, Database = Sqlite>,
{
    let filter = Specification::equal("id", id);
    let statement = Delete::table(D::TABLE).filter(&filter).build()?;
    let result = prepare(&statement).execute(executor).await?;
    if result.rows_affected() > 0 {
        Ok(())
    } else {
        Err(RepositoryError::not_found(D::TABLE, id))
    }
}

// ============================================================================
// POOL REPOSITORY
// ============================================================================

/// Repository over a connection pool, one table per [`Dto`] type.
pub struct SqliteRepository<D> {
    pool: SqlitePool,
    row: PhantomData<fn() -> D>,
}

impl<D> SqliteRepository<D> {
    pub const fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            row: PhantomData,
        }
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl<D> Clone for SqliteRepository<D> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<D> std::fmt::Debug for SqliteRepository<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRepository")
            .field("pool", &self.pool)
            .finish()
    }
}

#[async_trait]
impl<D: Dto> BaseRepository<D::Entity> for SqliteRepository<D> {
    async fn save_with(
        &self,
        ctx: &Context,
        entity: D::Entity,
        options: &SaveOptions,
    ) -> RepositoryResult<D::Entity> {
        let mut record = D::from_entity(&entity);
        let id = ctx
            .run(insert_record(&self.pool, &record, options))
            .await?;
        record.set_id(id);
        debug!(table = D::TABLE, id, "saved record");
        Ok(record.to_entity())
    }

    async fn get(&self, ctx: &Context, id: i64) -> RepositoryResult<D::Entity> {
        let record: D = ctx.run(fetch_record(&self.pool, id)).await?;
        Ok(record.to_entity())
    }

    async fn find(
        &self,
        ctx: &Context,
        filter: Option<&Specification>,
    ) -> RepositoryResult<Vec<D::Entity>> {
        let records: Vec<D> = ctx.run(fetch_records(&self.pool, filter)).await?;
        Ok(records.iter().map(D::to_entity).collect())
    }

    async fn update(&self, ctx: &Context, entity: D::Entity) -> RepositoryResult<D::Entity> {
        let record = D::from_entity(&entity);
        let stored = ctx.run(update_record(&self.pool, &record)).await?;
        Ok(stored.to_entity())
    }

    async fn delete(&self, ctx: &Context, id: i64) -> RepositoryResult<()> {
        ctx.run(delete_record::<D, _>(&self.pool, id)).await?;
        debug!(table = D::TABLE, id, "deleted record");
        Ok(())
    }
}

#[async_trait]
impl<D: Dto> Repository<D::Entity> for SqliteRepository<D> {
    type Tx = SqliteTransaction<D>;

    async fn begin(&self) -> RepositoryResult<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(SqliteTransaction {
            tx: Mutex::new(tx),
            row: PhantomData,
        })
    }
}

// ============================================================================
// TRANSACTION REPOSITORY
// ============================================================================

/// Repository bound to one open transaction. Operations are serialized on
/// the transaction's connection.
pub struct SqliteTransaction<D> {
    tx: Mutex<Transaction<'static, Sqlite>>,
    row: PhantomData<fn() -> D>,
}

impl<D> std::fmt::Debug for SqliteTransaction<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl<D: Dto> BaseRepository<D::Entity> for SqliteTransaction<D> {
    async fn save_with(
        &self,
        ctx: &Context,
        entity: D::Entity,
        options: &SaveOptions,
    ) -> RepositoryResult<D::Entity> {
        let mut record = D::from_entity(&entity);
        let mut tx = self.tx.lock().await;
        let id = ctx
            .run(insert_record(&mut **tx, &record, options))
            .await?;
        record.set_id(id);
        Ok(record.to_entity())
    }

    async fn get(&self, ctx: &Context, id: i64) -> RepositoryResult<D::Entity> {
        let mut tx = self.tx.lock().await;
        let record: D = ctx.run(fetch_record(&mut **tx, id)).await?;
        Ok(record.to_entity())
    }

    async fn find(
        &self,
        ctx: &Context,
        filter: Option<&Specification>,
    ) -> RepositoryResult<Vec<D::Entity>> {
        let mut tx = self.tx.lock().await;
        let records: Vec<D> = ctx.run(fetch_records(&mut **tx, filter)).await?;
        Ok(records.iter().map(D::to_entity).collect())
    }

    async fn update(&self, ctx: &Context, entity: D::Entity) -> RepositoryResult<D::Entity> {
        let record = D::from_entity(&entity);
        let mut tx = self.tx.lock().await;
        let stored = ctx.run(update_record(&mut **tx, &record)).await?;
        Ok(stored.to_entity())
    }

    async fn delete(&self, ctx: &Context, id: i64) -> RepositoryResult<()> {
        let mut tx = self.tx.lock().await;
        ctx.run(delete_record::<D, _>(&mut **tx, id)).await
    }
}

#[async_trait]
impl<D: Dto> TxRepository<D::Entity> for SqliteTransaction<D> {
    async fn commit(self) -> RepositoryResult<()> {
        self.tx.into_inner().commit().await?;
        debug!(table = D::TABLE, "committed transaction");
        Ok(())
    }

    async fn rollback(self) -> RepositoryResult<()> {
        self.tx.into_inner().rollback().await?;
        debug!(table = D::TABLE, "rolled back transaction");
        Ok(())
    }
}
