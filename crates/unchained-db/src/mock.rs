//! In-memory stand-in for a [`Repository`], for testing code that depends
//! on one.
//!
//! Each operation runs an injected closure when one is set and otherwise
//! falls back to a pass-through default. Invocations are recorded so tests
//! can assert which operations ran. Clones share their invocation flags, and
//! so does the transaction returned by [`Repository::begin`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use unchained_core::Specification;

use crate::{
    context::Context,
    error::{RepositoryError, RepositoryResult},
    repository::{BaseRepository, Repository, TxRepository},
    statement::SaveOptions,
};

type EntityFn<E> = Arc<dyn Fn(E) -> RepositoryResult<E> + Send + Sync>;
type IdFn<T> = Arc<dyn Fn(i64) -> RepositoryResult<T> + Send + Sync>;
type FindFn<E> = Arc<dyn Fn(Option<&Specification>) -> RepositoryResult<Vec<E>> + Send + Sync>;

#[derive(Debug, Default)]
struct Invocations {
    save: AtomicBool,
    get: AtomicBool,
    find: AtomicBool,
    update: AtomicBool,
    delete: AtomicBool,
    begin: AtomicBool,
    commit: AtomicBool,
    rollback: AtomicBool,
}

fn mark(flag: &AtomicBool) {
    flag.store(true, Ordering::SeqCst);
}

pub struct MockRepository<E> {
    save_fn: Option<EntityFn<E>>,
    get_fn: Option<IdFn<E>>,
    find_fn: Option<FindFn<E>>,
    update_fn: Option<EntityFn<E>>,
    delete_fn: Option<IdFn<()>>,
    invoked: Arc<Invocations>,
}

impl<E> MockRepository<E> {
    pub fn new() -> Self {
        Self {
            save_fn: None,
            get_fn: None,
            find_fn: None,
            update_fn: None,
            delete_fn: None,
            invoked: Arc::new(Invocations::default()),
        }
    }

    #[must_use]
    pub fn with_save_fn(
        mut self,
        f: impl Fn(E) -> RepositoryResult<E> + Send + Sync + 'static,
    ) -> Self {
        self.save_fn = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_get_fn(mut self, f: impl Fn(i64) -> RepositoryResult<E> + Send + Sync + 'static) -> Self {
        self.get_fn = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_find_fn(
        mut self,
        f: impl Fn(Option<&Specification>) -> RepositoryResult<Vec<E>> + Send + Sync + 'static,
    ) -> Self {
        self.find_fn = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_update_fn(
        mut self,
        f: impl Fn(E) -> RepositoryResult<E> + Send + Sync + 'static,
    ) -> Self {
        self.update_fn = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_delete_fn(
        mut self,
        f: impl Fn(i64) -> RepositoryResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.delete_fn = Some(Arc::new(f));
        self
    }

    pub fn save_invoked(&self) -> bool {
        self.invoked.save.load(Ordering::SeqCst)
    }

    pub fn get_invoked(&self) -> bool {
        self.invoked.get.load(Ordering::SeqCst)
    }

    pub fn find_invoked(&self) -> bool {
        self.invoked.find.load(Ordering::SeqCst)
    }

    pub fn update_invoked(&self) -> bool {
        self.invoked.update.load(Ordering::SeqCst)
    }

    pub fn delete_invoked(&self) -> bool {
        self.invoked.delete.load(Ordering::SeqCst)
    }

    pub fn begin_invoked(&self) -> bool {
        self.invoked.begin.load(Ordering::SeqCst)
    }

    pub fn commit_invoked(&self) -> bool {
        self.invoked.commit.load(Ordering::SeqCst)
    }

    pub fn rollback_invoked(&self) -> bool {
        self.invoked.rollback.load(Ordering::SeqCst)
    }
}

impl<E> Default for MockRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for MockRepository<E> {
    fn clone(&self) -> Self {
        Self {
            save_fn: self.save_fn.clone(),
            get_fn: self.get_fn.clone(),
            find_fn: self.find_fn.clone(),
            update_fn: self.update_fn.clone(),
            delete_fn: self.delete_fn.clone(),
            invoked: Arc::clone(&self.invoked),
        }
    }
}

impl<E> std::fmt::Debug for MockRepository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRepository")
            .field("invoked", &self.invoked)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: Send + 'static> BaseRepository<E> for MockRepository<E> {
    async fn save_with(
        &self,
        ctx: &Context,
        entity: E,
        _options: &SaveOptions,
    ) -> RepositoryResult<E> {
        mark(&self.invoked.save);
        let save_fn = self.save_fn.clone();
        ctx.run(async move {
            match save_fn {
                Some(f) => f(entity),
                None => Ok(entity),
            }
        })
        .await
    }

    async fn get(&self, ctx: &Context, id: i64) -> RepositoryResult<E> {
        mark(&self.invoked.get);
        let get_fn = self.get_fn.clone();
        ctx.run(async move {
            get_fn.map_or_else(|| Err(RepositoryError::not_found("mock", id)), |f| f(id))
        })
        .await
    }

    async fn find(
        &self,
        ctx: &Context,
        filter: Option<&Specification>,
    ) -> RepositoryResult<Vec<E>> {
        mark(&self.invoked.find);
        let find_fn = self.find_fn.clone();
        ctx.run(async move { find_fn.map_or_else(|| Ok(Vec::new()), |f| f(filter)) })
            .await
    }

    async fn update(&self, ctx: &Context, entity: E) -> RepositoryResult<E> {
        mark(&self.invoked.update);
        let update_fn = self.update_fn.clone();
        ctx.run(async move {
            match update_fn {
                Some(f) => f(entity),
                None => Ok(entity),
            }
        })
        .await
    }

    async fn delete(&self, ctx: &Context, id: i64) -> RepositoryResult<()> {
        mark(&self.invoked.delete);
        let delete_fn = self.delete_fn.clone();
        ctx.run(async move { delete_fn.map_or(Ok(()), |f| f(id)) })
            .await
    }
}

#[async_trait]
impl<E: Send + 'static> Repository<E> for MockRepository<E> {
    type Tx = Self;

    async fn begin(&self) -> RepositoryResult<Self::Tx> {
        mark(&self.invoked.begin);
        Ok(self.clone())
    }
}

#[async_trait]
impl<E: Send + 'static> TxRepository<E> for MockRepository<E> {
    async fn commit(self) -> RepositoryResult<()> {
        mark(&self.invoked.commit);
        Ok(())
    }

    async fn rollback(self) -> RepositoryResult<()> {
        mark(&self.invoked.rollback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Note {
        id: Option<i64>,
        body: String,
    }

    fn note(body: &str) -> Note {
        Note {
            id: None,
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_defaults_pass_through() {
        let repo = MockRepository::<Note>::new();
        let ctx = Context::background();

        let saved = repo.save(&ctx, note("hello")).await.unwrap();
        assert_eq!(saved, note("hello"));
        assert!(repo.find(&ctx, None).await.unwrap().is_empty());
        assert!(repo.get(&ctx, 1).await.unwrap_err().is_not_found());
        assert!(repo.save_invoked());
        assert!(repo.find_invoked());
        assert!(!repo.update_invoked());
    }

    #[tokio::test]
    async fn test_injected_closures_run() {
        let repo = MockRepository::new()
            .with_save_fn(|mut n: Note| {
                n.id = Some(10);
                Ok(n)
            })
            .with_find_fn(|filter| {
                assert!(filter.is_some());
                Ok(vec![note("match")])
            })
            .with_delete_fn(|id| Err(RepositoryError::not_found("notes", id)));
        let ctx = Context::background();

        assert_eq!(repo.save(&ctx, note("x")).await.unwrap().id, Some(10));
        let spec = Specification::equal("body", "match");
        assert_eq!(repo.find(&ctx, Some(&spec)).await.unwrap().len(), 1);
        assert!(repo.delete(&ctx, 3).await.is_err());
        assert!(repo.delete_invoked());
    }

    #[tokio::test]
    async fn test_update_returns_entity_or_closure_result() {
        let ctx = Context::background();
        let plain = MockRepository::<Note>::new();
        assert_eq!(plain.update(&ctx, note("same")).await.unwrap(), note("same"));
        assert!(plain.update_invoked());

        let stamped = MockRepository::new().with_update_fn(|mut n: Note| {
            n.body.push_str(" (edited)");
            Ok(n)
        });
        let updated = stamped.update(&ctx, note("draft")).await.unwrap();
        assert_eq!(updated.body, "draft (edited)");

        let failing = MockRepository::new()
            .with_save_fn(|_: Note| Err(RepositoryError::Conflict("notes".into())));
        assert!(failing.save(&ctx, note("dup")).await.is_err());
    }

    #[tokio::test]
    async fn test_transaction_shares_flags() {
        let repo = MockRepository::<Note>::new();
        let tx = repo.begin().await.unwrap();
        tx.commit().await.unwrap();

        assert!(repo.begin_invoked());
        assert!(repo.commit_invoked());
        assert!(!repo.rollback_invoked());
    }

    #[tokio::test]
    async fn test_cancelled_context_is_honored() {
        let repo = MockRepository::<Note>::new();
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();

        let result = repo.save(&ctx, note("late")).await;
        assert!(matches!(result, Err(RepositoryError::Cancelled)));
        assert!(repo.save_invoked());
    }
}
