use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::models::{Reservation, ScheduleException, WeeklyPattern};

/// Weekly patterns and exceptions, owned by the doctor aggregate.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get_weekly_pattern(&self, doctor_id: Uuid) -> Result<Option<WeeklyPattern>, ScheduleError>;

    async fn save_weekly_pattern(&self, pattern: WeeklyPattern) -> Result<(), ScheduleError>;

    async fn get_exceptions(&self, doctor_id: Uuid) -> Result<Vec<ScheduleException>, ScheduleError>;

    async fn add_exception(&self, exception: ScheduleException) -> Result<(), ScheduleError>;

    /// Marks an exception deleted. Returns `false` when no such exception exists.
    async fn soft_delete_exception(&self, doctor_id: Uuid, exception_id: Uuid) -> Result<bool, ScheduleError>;
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn exists(&self, doctor_id: Uuid) -> Result<bool, ScheduleError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved(Reservation),
    /// The store refused the write because this reservation already holds the interval.
    Conflict(Reservation),
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn list_reservations(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Reservation>, ScheduleError>;

    /// Conditional insert: succeeds only if no existing reservation overlaps.
    async fn reserve(&self, reservation: Reservation) -> Result<ReserveOutcome, ScheduleError>;

    async fn release(&self, doctor_id: Uuid, reservation_id: Uuid) -> Result<Option<Reservation>, ScheduleError>;
}

/// Bounds a collaborator call by `limit`, mapping expiry to `ScheduleError::Timeout`.
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, ScheduleError>
where
    F: Future<Output = Result<T, ScheduleError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ScheduleError::Timeout {
            operation: operation.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

/// Process-local implementation of every collaborator interface.
#[derive(Default)]
pub struct InMemoryClinicStore {
    doctors: RwLock<HashSet<Uuid>>,
    patterns: RwLock<HashMap<Uuid, WeeklyPattern>>,
    exceptions: RwLock<HashMap<Uuid, Vec<ScheduleException>>>,
    reservations: RwLock<HashMap<(Uuid, NaiveDate), Vec<Reservation>>>,
}

impl InMemoryClinicStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_doctor(&self, doctor_id: Uuid) {
        debug!("Registering doctor {}", doctor_id);
        self.doctors.write().await.insert(doctor_id);
    }
}

#[async_trait]
impl ScheduleStore for InMemoryClinicStore {
    async fn get_weekly_pattern(&self, doctor_id: Uuid) -> Result<Option<WeeklyPattern>, ScheduleError> {
        Ok(self.patterns.read().await.get(&doctor_id).cloned())
    }

    async fn save_weekly_pattern(&self, pattern: WeeklyPattern) -> Result<(), ScheduleError> {
        self.patterns.write().await.insert(pattern.doctor_id, pattern);
        Ok(())
    }

    async fn get_exceptions(&self, doctor_id: Uuid) -> Result<Vec<ScheduleException>, ScheduleError> {
        Ok(self
            .exceptions
            .read()
            .await
            .get(&doctor_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_exception(&self, exception: ScheduleException) -> Result<(), ScheduleError> {
        let mut exceptions = self.exceptions.write().await;
        let entries = exceptions.entry(exception.doctor_id).or_default();
        if entries.iter().any(|existing| existing.id == exception.id) {
            return Err(ScheduleError::Conflict(format!(
                "Exception {} already exists",
                exception.id
            )));
        }
        entries.push(exception);
        Ok(())
    }

    async fn soft_delete_exception(&self, doctor_id: Uuid, exception_id: Uuid) -> Result<bool, ScheduleError> {
        let mut exceptions = self.exceptions.write().await;
        let found = exceptions
            .get_mut(&doctor_id)
            .and_then(|entries| entries.iter_mut().find(|e| e.id == exception_id));

        match found {
            Some(exception) => {
                exception.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryClinicStore {
    async fn exists(&self, doctor_id: Uuid) -> Result<bool, ScheduleError> {
        Ok(self.doctors.read().await.contains(&doctor_id))
    }
}

#[async_trait]
impl BookingRepository for InMemoryClinicStore {
    async fn list_reservations(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Reservation>, ScheduleError> {
        let mut reservations = self
            .reservations
            .read()
            .await
            .get(&(doctor_id, date))
            .cloned()
            .unwrap_or_default();
        reservations.sort_by_key(|r| r.start_time);
        Ok(reservations)
    }

    async fn reserve(&self, reservation: Reservation) -> Result<ReserveOutcome, ScheduleError> {
        let mut reservations = self.reservations.write().await;
        let day = reservations
            .entry((reservation.doctor_id, reservation.date))
            .or_default();

        if let Some(existing) = day
            .iter()
            .find(|r| r.overlaps(reservation.start_time, reservation.end_time))
        {
            return Ok(ReserveOutcome::Conflict(existing.clone()));
        }

        day.push(reservation.clone());
        Ok(ReserveOutcome::Reserved(reservation))
    }

    async fn release(&self, doctor_id: Uuid, reservation_id: Uuid) -> Result<Option<Reservation>, ScheduleError> {
        let mut reservations = self.reservations.write().await;
        for ((owner, _), day) in reservations.iter_mut() {
            if *owner != doctor_id {
                continue;
            }
            if let Some(index) = day.iter().position(|r| r.id == reservation_id) {
                return Ok(Some(day.remove(index)));
            }
        }
        Ok(None)
    }
}
