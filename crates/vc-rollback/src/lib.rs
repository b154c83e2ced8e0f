//! Rollback stack for multi-step operations.
//!
//! Each mutating step pushes its inverse once it succeeded. On failure the
//! stack unwinds in reverse order; errors raised while unwinding are logged
//! and skipped so the remaining inverses still run.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Inverse of one completed step
#[async_trait]
pub trait RollbackCommand: Send + Sync {
    fn description(&self) -> String;

    async fn rollback(&self) -> anyhow::Result<()>;
}

/// Rollback command built from a closure
pub struct FnCommand<F> {
    description: String,
    action: F,
}

impl<F> FnCommand<F>
where
    F: Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync,
{
    pub fn new(description: impl Into<String>, action: F) -> Self {
        Self {
            description: description.into(),
            action,
        }
    }
}

#[async_trait]
impl<F> RollbackCommand for FnCommand<F>
where
    F: Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    async fn rollback(&self) -> anyhow::Result<()> {
        (self.action)().await
    }
}

struct RollbackEntry {
    id: Uuid,
    pushed_at: DateTime<Utc>,
    command: Box<dyn RollbackCommand>,
}

/// A compensating command that failed during unwind
#[derive(Debug, Clone, Serialize)]
pub struct RollbackFailure {
    pub id: Uuid,
    pub description: String,
    pub error: String,
}

/// Outcome of one unwind
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<RollbackFailure>,
}

impl RollbackStats {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Stack of compensating commands for one operation
pub struct RollbackManager {
    operation: String,
    stack: Mutex<Vec<RollbackEntry>>,
}

impl RollbackManager {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            stack: Mutex::new(Vec::new()),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub async fn push<C>(&self, command: C) -> Uuid
    where
        C: RollbackCommand + 'static,
    {
        let id = Uuid::new_v4();
        debug!(
            "[{}] registered rollback step {}: {}",
            self.operation,
            id,
            command.description()
        );
        self.stack.lock().await.push(RollbackEntry {
            id,
            pushed_at: Utc::now(),
            command: Box::new(command),
        });
        id
    }

    pub async fn push_fn<F>(&self, description: impl Into<String>, action: F) -> Uuid
    where
        F: Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.push(FnCommand::new(description, action)).await
    }

    pub async fn len(&self) -> usize {
        self.stack.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stack.lock().await.is_empty()
    }

    /// Forget every registered step; the operation is committed
    pub async fn clear(&self) -> usize {
        let mut stack = self.stack.lock().await;
        let dropped = stack.len();
        stack.clear();
        dropped
    }

    /// Run every registered inverse, newest first
    pub async fn rollback_all(&self) -> RollbackStats {
        let entries: Vec<RollbackEntry> = {
            let mut stack = self.stack.lock().await;
            stack.drain(..).collect()
        };

        let mut stats = RollbackStats::default();
        if entries.is_empty() {
            return stats;
        }

        info!(
            "[{}] rolling back {} step(s)",
            self.operation,
            entries.len()
        );
        for entry in entries.into_iter().rev() {
            stats.attempted += 1;
            let description = entry.command.description();
            let age = Utc::now().signed_duration_since(entry.pushed_at);
            debug!(
                "[{}] undoing {} ({}), registered {}ms ago",
                self.operation,
                entry.id,
                description,
                age.num_milliseconds()
            );
            match entry.command.rollback().await {
                Ok(()) => stats.succeeded += 1,
                Err(e) => {
                    warn!(
                        "[{}] rollback step '{}' failed: {:#}",
                        self.operation, description, e
                    );
                    stats.failures.push(RollbackFailure {
                        id: entry.id,
                        description,
                        error: format!("{:#}", e),
                    });
                }
            }
        }
        stats
    }

    /// Run `work`; unwind on error and return the original error, commit on
    /// success
    pub async fn scope<T, E, Fut>(&self, work: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match work.await {
            Ok(value) => {
                self.clear().await;
                Ok(value)
            }
            Err(err) => {
                warn!("[{}] failed: {}", self.operation, err);
                let stats = self.rollback_all().await;
                if !stats.is_clean() {
                    warn!(
                        "[{}] {} of {} rollback step(s) failed",
                        self.operation,
                        stats.failures.len(),
                        stats.attempted
                    );
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::FutureExt;

    use super::*;

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        label: &'static str,
    ) -> impl Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static {
        let log = log.clone();
        move || {
            let log = log.clone();
            async move {
                log.lock().await.push(label.to_string());
                Ok::<(), anyhow::Error>(())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn unwinds_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = RollbackManager::new("test");
        manager.push_fn("first", recorder(&log, "first")).await;
        manager.push_fn("second", recorder(&log, "second")).await;
        manager.push_fn("third", recorder(&log, "third")).await;

        let stats = manager.rollback_all().await;
        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.succeeded, 3);
        assert_eq!(*log.lock().await, vec!["third", "second", "first"]);
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn failure_during_unwind_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = RollbackManager::new("test");
        manager.push_fn("first", recorder(&log, "first")).await;
        manager
            .push_fn("broken", || {
                async { Err::<(), _>(anyhow::anyhow!("remote gone")) }.boxed()
            })
            .await;

        let stats = manager.rollback_all().await;
        assert_eq!(stats.attempted, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failures.len(), 1);
        assert_eq!(stats.failures[0].description, "broken");
        assert_eq!(*log.lock().await, vec!["first"]);
    }

    #[tokio::test]
    async fn scope_returns_original_error_after_unwind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = RollbackManager::new("attach");
        manager.push_fn("destroy", recorder(&log, "destroy")).await;

        let result: Result<(), String> = manager
            .scope(async { Err("attach failed".to_string()) })
            .await;
        assert_eq!(result.unwrap_err(), "attach failed");
        assert_eq!(*log.lock().await, vec!["destroy"]);
    }

    #[tokio::test]
    async fn scope_commits_on_success() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = RollbackManager::new("attach");
        manager.push_fn("destroy", recorder(&log, "destroy")).await;

        let result: Result<u32, String> = manager.scope(async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert!(manager.is_empty().await);
        assert!(log.lock().await.is_empty());
        assert_eq!(manager.rollback_all().await.attempted, 0);
    }

    #[test]
    fn stats_serialize() {
        let stats = RollbackStats {
            attempted: 1,
            succeeded: 0,
            failures: vec![RollbackFailure {
                id: Uuid::nil(),
                description: "destroy".to_string(),
                error: "in use".to_string(),
            }],
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["failures"][0]["error"], "in use");
    }
}
