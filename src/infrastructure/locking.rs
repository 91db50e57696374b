//! Per-path lock manager (component B).
//!
//! Locks are acquired in lexicographic path order regardless of request
//! order, which is sufficient to avoid deadlock between callers contending
//! for overlapping path sets.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

/// Holds write locks for a set of paths for the lifetime of the guard.
/// Dropping it releases every lock.
pub struct MultiLockGuard {
    _guards: Vec<OwnedRwLockWriteGuard<()>>,
}

#[derive(Default)]
pub struct PathLockManager {
    locks: DashMap<String, Arc<RwLock<()>>>,
}

impl PathLockManager {
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    fn entry_for(&self, path: &str) -> Arc<RwLock<()>> {
        self.locks.entry(path.to_string()).or_insert_with(|| Arc::new(RwLock::new(()))).clone()
    }

    /// Acquire write locks on `paths`, sorted and deduplicated first.
    pub async fn acquire(&self, paths: &[String]) -> MultiLockGuard {
        let mut sorted: Vec<String> = paths.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for path in &sorted {
            let lock = self.entry_for(path);
            guards.push(lock.write_owned().await);
        }
        MultiLockGuard { _guards: guards }
    }

    /// Acquire a single write lock.
    pub async fn acquire_one(&self, path: &str) -> MultiLockGuard {
        self.acquire(std::slice::from_ref(&path.to_string())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_acquires_on_same_path_serialize() {
        let mgr = Arc::new(PathLockManager::new());
        let counter = Arc::new(AtomicU32::new(0));
        let max_concurrent = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let mgr = mgr.clone();
            let counter = counter.clone();
            let max_concurrent = max_concurrent.clone();
            handles.push(tokio::spawn(async move {
                let _guard = mgr.acquire_one("viking://resources/a").await;
                let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disjoint_paths_do_not_serialize() {
        let mgr = PathLockManager::new();
        let g1 = mgr.acquire_one("viking://resources/a").await;
        let g2 = mgr.acquire_one("viking://resources/b").await;
        drop(g1);
        drop(g2);
    }
}
