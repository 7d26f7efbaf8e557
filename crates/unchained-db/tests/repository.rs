//! Repository behavior against an in-memory SQLite database.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::{json, Value};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use unchained_core::Specification;
use unchained_db::{
    BaseRepository, Context, Dto, Record, Repository, RepositoryError, RepositoryResult,
    SaveOptions, SqliteRepository, TxRepository,
};

// ═══════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
struct Account {
    id: Option<i64>,
    username: String,
    age: i64,
    active: bool,
    tags: Vec<String>,
}

fn account(username: &str, age: i64) -> Account {
    Account {
        id: None,
        username: username.to_string(),
        age,
        active: true,
        tags: Vec::new(),
    }
}

struct AccountRow {
    id: Option<i64>,
    username: String,
    age: i64,
    active: bool,
    tags: String,
}

impl Record for AccountRow {
    const TABLE: &'static str = "accounts";
    const COLUMNS: &'static [&'static str] = &["username", "age", "active", "tags"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            json!(self.username),
            json!(self.age),
            json!(self.active),
            json!(self.tags),
        ]
    }

    fn from_row(row: &SqliteRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            age: row.try_get("age")?,
            active: row.try_get("active")?,
            tags: row.try_get("tags")?,
        })
    }
}

impl Dto for AccountRow {
    type Entity = Account;

    fn from_entity(entity: &Account) -> Self {
        Self {
            id: entity.id,
            username: entity.username.clone(),
            age: entity.age,
            active: entity.active,
            tags: serde_json::to_string(&entity.tags).unwrap_or_else(|_| "[]".to_string()),
        }
    }

    fn to_entity(&self) -> Account {
        Account {
            id: self.id,
            username: self.username.clone(),
            age: self.age,
            active: self.active,
            tags: serde_json::from_str(&self.tags).unwrap_or_default(),
        }
    }
}

const SCHEMA: &str = r"
CREATE TABLE accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    age INTEGER NOT NULL DEFAULT 0,
    active BOOLEAN NOT NULL DEFAULT 1,
    tags TEXT NOT NULL DEFAULT '[]'
)";

async fn pool() -> SqlitePool {
    let pool = unchained_db::connect("sqlite::memory:", 1).await.unwrap();
    sqlx::query(SCHEMA).execute(&pool).await.unwrap();
    pool
}

async fn repository() -> SqliteRepository<AccountRow> {
    SqliteRepository::new(pool().await)
}

// ═══════════════════════════════════════════════════════════════════════════
// CRUD
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn save_returns_generated_id() {
    let repo = repository().await;
    let ctx = Context::background();

    let first = repo.save(&ctx, account("ada", 36)).await.unwrap();
    let second = repo.save(&ctx, account("grace", 45)).await.unwrap();

    assert_eq!(first.id, Some(1));
    assert_eq!(second.id, Some(2));
    assert_eq!(first.username, "ada");
}

#[tokio::test]
async fn get_round_trips_entity() {
    let repo = repository().await;
    let ctx = Context::background();
    let mut original = account("ada", 36);
    original.tags = vec!["admin".to_string(), "ops".to_string()];

    let saved = repo.save(&ctx, original.clone()).await.unwrap();
    let fetched = repo.get(&ctx, saved.id.unwrap()).await.unwrap();

    assert_eq!(fetched, Account { id: saved.id, ..original });
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let repo = repository().await;
    let result = repo.get(&Context::background(), 404).await;
    assert!(matches!(result, Err(RepositoryError::NotFound(_))));
}

#[tokio::test]
async fn find_without_specification_returns_all_rows() {
    let repo = repository().await;
    let ctx = Context::background();
    for (name, age) in [("ada", 36), ("grace", 45), ("linus", 21)] {
        repo.save(&ctx, account(name, age)).await.unwrap();
    }

    let all = repo.find(&ctx, None).await.unwrap();
    let names: Vec<&str> = all.iter().map(|a| a.username.as_str()).collect();
    assert_eq!(names, ["ada", "grace", "linus"]);
}

#[tokio::test]
async fn find_applies_specification() {
    let repo = repository().await;
    let ctx = Context::background();
    for (name, age) in [("ada", 36), ("grace", 45), ("linus", 21)] {
        repo.save(&ctx, account(name, age)).await.unwrap();
    }

    let spec = Specification::greater_or_equal("age", 30)
        & Specification::is_in("username", ["grace", "linus"]).unwrap();
    let found = repo.find(&ctx, Some(&spec)).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "grace");
}

#[tokio::test]
async fn find_rejects_unsafe_column() {
    let repo = repository().await;
    let spec = Specification::equal("age; DROP TABLE accounts", 1);
    let result = repo.find(&Context::background(), Some(&spec)).await;
    assert!(matches!(result, Err(RepositoryError::Specification(_))));
}

#[tokio::test]
async fn update_writes_row_and_returns_stored_state() {
    let repo = repository().await;
    let ctx = Context::background();
    let mut saved = repo.save(&ctx, account("ada", 36)).await.unwrap();

    saved.age = 37;
    saved.active = false;
    let updated = repo.update(&ctx, saved.clone()).await.unwrap();

    assert_eq!(updated, saved);
    assert_eq!(repo.get(&ctx, saved.id.unwrap()).await.unwrap().age, 37);
}

#[tokio::test]
async fn update_requires_existing_row() {
    let repo = repository().await;
    let ctx = Context::background();

    let missing = Account {
        id: Some(99),
        ..account("ghost", 1)
    };
    assert!(repo.update(&ctx, missing).await.unwrap_err().is_not_found());

    let unsaved = account("nobody", 1);
    assert!(matches!(
        repo.update(&ctx, unsaved).await,
        Err(RepositoryError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn delete_removes_row() {
    let repo = repository().await;
    let ctx = Context::background();
    let saved = repo.save(&ctx, account("ada", 36)).await.unwrap();
    let id = saved.id.unwrap();

    repo.delete(&ctx, id).await.unwrap();

    assert!(repo.get(&ctx, id).await.unwrap_err().is_not_found());
    assert!(repo.delete(&ctx, id).await.unwrap_err().is_not_found());
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFLICTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn duplicate_unique_column_is_conflict() {
    let repo = repository().await;
    let ctx = Context::background();
    repo.save(&ctx, account("ada", 36)).await.unwrap();

    let result = repo.save(&ctx, account("ada", 99)).await;
    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
}

#[tokio::test]
async fn upsert_updates_existing_row() {
    let repo = repository().await;
    let ctx = Context::background();
    let first = repo.save(&ctx, account("ada", 36)).await.unwrap();

    let options = SaveOptions::new().on_conflict(["username"], ["age"]);
    let second = repo
        .save_with(&ctx, account("ada", 40), &options)
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(repo.get(&ctx, first.id.unwrap()).await.unwrap().age, 40);
    assert_eq!(repo.find(&ctx, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn upsert_do_nothing_reports_conflict() {
    let repo = repository().await;
    let ctx = Context::background();
    repo.save(&ctx, account("ada", 36)).await.unwrap();

    let options = SaveOptions::new().on_conflict(["username"], Vec::<String>::new());
    let result = repo.save_with(&ctx, account("ada", 40), &options).await;

    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    assert_eq!(repo.find(&ctx, None).await.unwrap()[0].age, 36);
}

// ═══════════════════════════════════════════════════════════════════════════
// TRANSACTIONS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn rollback_discards_writes() {
    let repo = repository().await;
    let ctx = Context::background();

    let tx = repo.begin().await.unwrap();
    let saved = tx.save(&ctx, account("ada", 36)).await.unwrap();
    assert_eq!(tx.get(&ctx, saved.id.unwrap()).await.unwrap().username, "ada");
    tx.rollback().await.unwrap();

    assert!(repo.find(&ctx, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn commit_persists_writes() {
    let repo = repository().await;
    let ctx = Context::background();

    let tx = repo.begin().await.unwrap();
    tx.save(&ctx, account("ada", 36)).await.unwrap();
    tx.save(&ctx, account("grace", 45)).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(repo.find(&ctx, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let repo = repository().await;
    let ctx = Context::background();

    {
        let tx = repo.begin().await.unwrap();
        tx.save(&ctx, account("ada", 36)).await.unwrap();
    }

    assert!(repo.find(&ctx, None).await.unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTEXT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn cancelled_context_yields_cancelled() {
    let repo = repository().await;
    let (ctx, handle) = Context::with_cancel();
    handle.cancel();

    let result = repo.save(&ctx, account("ada", 36)).await;
    assert!(matches!(result, Err(RepositoryError::Cancelled)));
    assert!(repo
        .find(&Context::background(), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn generous_deadline_completes() {
    let repo = repository().await;
    let ctx = Context::background().timeout(Duration::from_secs(30));
    assert!(repo.save(&ctx, account("ada", 36)).await.is_ok());
}
