//! Per-session async locks.
//!
//! The load, apply and save sequence for one session must not interleave with
//! another request for the same session. Different sessions never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Idle entries are swept once the registry grows past this size.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s session.
    pub async fn lock(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= SWEEP_THRESHOLD {
                sweep(&mut locks);
            }
            locks
                .entry(user_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop entries nobody is holding or waiting on.
    pub fn prune(&self) {
        sweep(&mut self.locks.lock().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sweep(locks: &mut HashMap<i64, Arc<AsyncMutex<()>>>) {
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
}
