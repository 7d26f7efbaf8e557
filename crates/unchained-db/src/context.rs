//! Per-call cancellation and deadline context.
//!
//! Every repository operation takes a [`Context`]. A canceled context drops
//! the in-flight query future and reports [`RepositoryError::Cancelled`]; an
//! expired deadline reports [`RepositoryError::DeadlineExceeded`].

use std::{future::Future, time::Duration};

use tokio::{sync::watch, time::Instant};

use crate::error::{RepositoryError, RepositoryResult};

#[derive(Debug, Clone)]
pub struct Context {
    deadline: Option<Instant>,
    cancelled: watch::Receiver<bool>,
}

/// Cancels every [`Context`] derived from the same [`Context::with_cancel`]
/// call. Dropping the handle does not cancel.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that never expires and cannot be canceled.
    pub fn background() -> Self {
        let (_, cancelled) = watch::channel(false);
        Self {
            deadline: None,
            cancelled,
        }
    }

    /// A cancelable context plus the handle that cancels it.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, cancelled) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancelled,
            },
            CancelHandle { tx },
        )
    }

    /// Derive a context that expires after `timeout`, keeping cancellation.
    #[must_use]
    pub fn timeout(&self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline`. An earlier existing
    /// deadline wins.
    #[must_use]
    pub fn deadline(&self, deadline: Instant) -> Self {
        let deadline = self
            .deadline
            .map_or(deadline, |current| current.min(deadline));
        Self {
            deadline: Some(deadline),
            cancelled: self.cancelled.clone(),
        }
    }

    pub const fn expires_at(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Drive `operation` to completion unless the context is canceled or its
    /// deadline passes first.
    pub async fn run<F, T>(&self, operation: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        if self.is_cancelled() {
            return Err(RepositoryError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(RepositoryError::DeadlineExceeded);
        }

        let mut cancelled = self.cancelled.clone();
        let guarded = async move {
            tokio::select! {
                biased;
                () = wait_cancelled(&mut cancelled) => Err(RepositoryError::Cancelled),
                result = operation => result,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(RepositoryError::DeadlineExceeded)),
            None => guarded.await,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    // A closed channel without a cancel never fires.
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = Context::background();
        let result = ctx.run(async { Ok(42) }).await;
        assert_eq!(result.ok(), Some(42));
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();
        let result = ctx.run(async { Ok(()) }).await;
        assert!(matches!(result, Err(RepositoryError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_during_run_drops_operation() {
        let (ctx, handle) = Context::with_cancel();
        let task = tokio::spawn(async move {
            ctx.run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(RepositoryError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = Context::background().timeout(Duration::from_millis(10));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::DeadlineExceeded)));
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let early = now + Duration::from_secs(1);
        let ctx = Context::background()
            .deadline(early)
            .deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.expires_at(), Some(early));
    }

    #[test]
    fn test_dropped_handle_does_not_cancel() {
        let (ctx, handle) = Context::with_cancel();
        drop(handle);
        assert!(!ctx.is_cancelled());
    }
}
