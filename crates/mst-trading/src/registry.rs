//! Per-user serialization: one `tokio::sync::Mutex` per user id, so two
//! ticks for the same user never race on the same holdings, while
//! different users process concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct UserLockRegistry {
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl UserLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_user_id_returns_same_lock() {
        let registry = UserLockRegistry::new();
        let a = registry.lock_for("u1");
        let b = registry.lock_for("u1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn different_user_ids_return_different_locks() {
        let registry = UserLockRegistry::new();
        let a = registry.lock_for("u1");
        let b = registry.lock_for("u2");
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
