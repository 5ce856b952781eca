use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

const PRUNE_THRESHOLD: usize = 1024;

/// Serializes admission decisions per `(doctor_id, date)`.
///
/// Holding the returned guard across check-then-reserve guarantees that at most
/// one emergency booking claims a given interval of that doctor's day.
#[derive(Default)]
pub struct AdmissionLocks {
    entries: Mutex<HashMap<(Uuid, NaiveDate), Arc<Mutex<()>>>>,
}

impl AdmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: Uuid, date: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().await;
            if entries.len() >= PRUNE_THRESHOLD {
                // Only entries nobody holds or waits on.
                entries.retain(|_, lock| Arc::strong_count(lock) > 1);
                debug!("Pruned admission locks, {} remain", entries.len());
            }
            entries
                .entry((doctor_id, date))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }

    pub async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }
}
