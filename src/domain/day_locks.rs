//! Per-day writer locks.
//!
//! [`DayLocks`] hands out one [`tokio::sync::Mutex`] per calendar day so
//! that mutations of the same day are serialized while different days
//! proceed concurrently. Locks are created lazily on first use.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Registry of per-day mutexes.
///
/// # Concurrency
///
/// - Writers on the same day wait for each other.
/// - Writers on different days never contend beyond the brief map lookup.
#[derive(Debug, Default)]
pub struct DayLocks {
    days: RwLock<HashMap<NaiveDate, Arc<Mutex<()>>>>,
}

impl DayLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `date`.
    ///
    /// The lock is held until the returned guard is dropped.
    pub async fn acquire(&self, date: NaiveDate) -> OwnedMutexGuard<()> {
        let existing = self.days.read().await.get(&date).map(Arc::clone);
        let lock = match existing {
            Some(lock) => lock,
            None => {
                let mut map = self.days.write().await;
                Arc::clone(map.entry(date).or_default())
            }
        };
        lock.lock_owned().await
    }

    /// Number of days that have been locked at least once.
    pub async fn len(&self) -> usize {
        self.days.read().await.len()
    }

    /// Returns `true` if no day has been locked yet.
    pub async fn is_empty(&self) -> bool {
        self.days.read().await.is_empty()
    }
}
