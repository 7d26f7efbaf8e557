//! # Unchained DB
//!
//! Repository adapter that persists entities through sqlx/SQLite.
//!
//! An entity type pairs with a [`Dto`] row shape. [`SqliteRepository`]
//! renders statements from the row shape and from [`Specification`]
//! predicates, and every operation runs under a [`Context`] that carries
//! cancellation and an optional deadline.
//!
//! [`Specification`]: unchained_core::Specification

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod context;
pub mod error;
pub mod mock;
pub mod record;
pub mod repository;
pub mod statement;

pub use context::{CancelHandle, Context};
pub use error::{RepositoryError, RepositoryResult};
pub use mock::MockRepository;
pub use record::{Dto, Record};
pub use repository::{BaseRepository, Repository, SqliteRepository, SqliteTransaction, TxRepository};
pub use statement::{Delete, Insert, OnConflict, SaveOptions, Select, Statement, Update};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Open a connection pool for `url`.
///
/// In-memory databases (`sqlite::memory:`) exist per connection, so they
/// need `max_connections` of 1 to be shared. Connections are never reaped
/// for idleness or age.
pub async fn connect(url: &str, max_connections: u32) -> RepositoryResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(url)
        .await?;
    tracing::debug!(url, max_connections, "opened sqlite pool");
    Ok(pool)
}
