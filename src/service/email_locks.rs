use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::normalize_email;

/// Per-email critical sections for enrollments running in this process.
///
/// The membership service has no create-if-absent primitive, so two
/// enrollments for the same address are only linearised when they share a
/// process. Entries are dropped once nobody holds or waits on them.
#[derive(Default)]
pub struct EmailLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl EmailLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, email: &str) -> OwnedMutexGuard<()> {
        let lock = self.entry(&normalize_email(email));
        lock.lock_owned().await
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = locks.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        locks.retain(|_, weak| weak.strong_count() > 0);
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(key.to_string(), Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.values().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }
}
