//! Per-user serialization locks
//!
//! At most one in-flight transition per user at any time. tokio's Mutex
//! hands the lock out in FIFO order, so events for the same user apply
//! strictly in arrival order while distinct users proceed in parallel.
//!
//! An in-memory lock is sufficient for a single-process deployment;
//! multi-process deployments need a distributed lock or a single-writer
//! queue per user in front of the dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-memory mutual-exclusion tokens keyed by user id
#[derive(Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the user's token, waiting behind earlier arrivals
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let token = {
            let mut map = self.inner.lock().await;
            map.entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        token.lock_owned().await
    }
}

impl std::fmt::Debug for UserLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLocks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_same_user_is_serialized() {
        let locks = UserLocks::new();
        let counter = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("u1").await;
                // Inside the critical section exactly one task may run
                let inside = counter.fetch_add(1, Ordering::SeqCst);
                assert_eq!(inside, 0);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_users_proceed_in_parallel() {
        let locks = UserLocks::new();
        let _guard_a = locks.acquire("a").await;
        // Must not deadlock waiting on a different user's token
        let _guard_b = locks.acquire("b").await;
    }
}
