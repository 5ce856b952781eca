use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_utils::calendar::date_range;

use crate::error::ScheduleError;
use crate::models::{
    CreateExceptionRequest, ExceptionType, Reservation, ReservationKind, ScheduleException,
    TimeSlot, WeeklyPattern,
};
use crate::policy::SchedulingPolicy;
use crate::services::slots::{generate_slots, generate_slots_for_range};
use crate::services::store::{with_timeout, BookingRepository, DoctorDirectory, ScheduleStore};

pub struct AvailabilityService {
    store: Arc<dyn ScheduleStore>,
    directory: Arc<dyn DoctorDirectory>,
    bookings: Arc<dyn BookingRepository>,
    policy: Arc<SchedulingPolicy>,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        directory: Arc<dyn DoctorDirectory>,
        bookings: Arc<dyn BookingRepository>,
        policy: Arc<SchedulingPolicy>,
    ) -> Self {
        Self {
            store,
            directory,
            bookings,
            policy,
        }
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    /// Dates in `[start, end]` on which the doctor works and no holiday applies.
    pub async fn resolve_available_dates(
        &self,
        doctor_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, ScheduleError> {
        debug!("Resolving available dates for doctor {} from {} to {}", doctor_id, start, end);

        if start >= end {
            return Err(ScheduleError::InvalidArgument(
                "Start date must be before end date".to_string(),
            ));
        }

        self.ensure_doctor(doctor_id).await?;

        let Some(pattern) = self.load_pattern(doctor_id).await? else {
            debug!("Doctor {} has no weekly pattern", doctor_id);
            return Ok(Vec::new());
        };
        let exceptions = self.load_exceptions(doctor_id).await?;

        // Leave and Block are applied per slot, only holidays drop the whole date here.
        let dates: Vec<NaiveDate> = date_range(start, end)
            .filter(|date| pattern.work_day_for(*date).is_some())
            .filter(|date| {
                !exceptions
                    .iter()
                    .any(|e| e.exception_type == ExceptionType::Holiday && e.covers(*date))
            })
            .collect();

        debug!("Found {} available dates", dates.len());
        Ok(dates)
    }

    /// Bookable slots for one date, after work-day and exception checks.
    pub async fn resolve_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        debug!("Resolving available slots for doctor {} on {}", doctor_id, date);

        ensure_not_past(date)?;
        self.ensure_doctor(doctor_id).await?;

        let Some(pattern) = self.load_pattern(doctor_id).await? else {
            return Ok(Vec::new());
        };
        let exceptions = self.load_exceptions(doctor_id).await?;

        let slots = self.slots_for_date(&pattern, &exceptions, date)?;
        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }

    /// Resolved slots annotated with the reservations that already hold them.
    pub async fn resolve_slot_board(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        let slots = self.resolve_available_slots(doctor_id, date).await?;
        if slots.is_empty() {
            return Ok(slots);
        }

        let reservations = self.load_reservations(doctor_id, date).await?;
        Ok(annotate_slots(slots, &reservations))
    }

    /// Pure slot resolution over already-fetched schedule state.
    pub fn slots_for_date(
        &self,
        pattern: &WeeklyPattern,
        exceptions: &[ScheduleException],
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        let Some(work_day) = pattern.work_day_for(date) else {
            return Ok(Vec::new());
        };

        // Any live exception suppresses the whole day, whatever its type.
        if exceptions.iter().any(|e| e.covers(date)) {
            debug!("Exception covers {} for doctor {}, no slots", date, pattern.doctor_id);
            return Ok(Vec::new());
        }

        let duration = pattern.appointment_duration_minutes;
        if self.policy.resolve_all_time_ranges {
            return generate_slots(work_day, date, pattern.doctor_id, duration);
        }

        match work_day.first_active_range() {
            Some(range) => generate_slots_for_range(range, date, pattern.doctor_id, duration),
            None => Ok(Vec::new()),
        }
    }

    // ==========================================================================
    // SCHEDULE MAINTENANCE
    // ==========================================================================

    pub async fn get_weekly_pattern(&self, doctor_id: Uuid) -> Result<WeeklyPattern, ScheduleError> {
        self.ensure_doctor(doctor_id).await?;
        self.load_pattern(doctor_id)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(format!("No weekly schedule for doctor {}", doctor_id)))
    }

    pub async fn save_weekly_pattern(&self, pattern: WeeklyPattern) -> Result<WeeklyPattern, ScheduleError> {
        debug!("Saving weekly pattern for doctor {}", pattern.doctor_id);

        pattern.validate()?;
        self.ensure_doctor(pattern.doctor_id).await?;

        with_timeout(
            "save_weekly_pattern",
            self.policy.store_timeout,
            self.store.save_weekly_pattern(pattern.clone()),
        )
        .await?;

        Ok(pattern)
    }

    pub async fn add_exception(
        &self,
        doctor_id: Uuid,
        request: CreateExceptionRequest,
    ) -> Result<ScheduleException, ScheduleError> {
        debug!(
            "Adding {:?} exception for doctor {} starting {}",
            request.exception_type, doctor_id, request.date_range_start
        );

        if let Some(end) = request.date_range_end {
            if end < request.date_range_start {
                return Err(ScheduleError::InvalidArgument(
                    "Exception end date must not be before its start date".to_string(),
                ));
            }
        }

        self.ensure_doctor(doctor_id).await?;

        let exception = ScheduleException::new(
            doctor_id,
            request.exception_type,
            request.date_range_start,
            request.date_range_end,
            request.reason,
        );

        with_timeout(
            "add_exception",
            self.policy.store_timeout,
            self.store.add_exception(exception.clone()),
        )
        .await?;

        Ok(exception)
    }

    pub async fn remove_exception(&self, doctor_id: Uuid, exception_id: Uuid) -> Result<(), ScheduleError> {
        self.ensure_doctor(doctor_id).await?;

        let removed = with_timeout(
            "soft_delete_exception",
            self.policy.store_timeout,
            self.store.soft_delete_exception(doctor_id, exception_id),
        )
        .await?;

        if !removed {
            return Err(ScheduleError::NotFound(format!("Exception {} not found", exception_id)));
        }
        Ok(())
    }

    pub async fn list_exceptions(
        &self,
        doctor_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<ScheduleException>, ScheduleError> {
        self.ensure_doctor(doctor_id).await?;
        let mut exceptions = self.load_exceptions(doctor_id).await?;
        if !include_deleted {
            exceptions.retain(|e| !e.is_deleted);
        }
        exceptions.sort_by_key(|e| (e.date_range_start, e.created_at));
        Ok(exceptions)
    }

    // ==========================================================================
    // COLLABORATOR ACCESS
    // ==========================================================================

    pub async fn ensure_doctor(&self, doctor_id: Uuid) -> Result<(), ScheduleError> {
        if self.doctor_exists(doctor_id).await? {
            Ok(())
        } else {
            warn!("Doctor not found: {}", doctor_id);
            Err(ScheduleError::NotFound(format!("Doctor {} not found", doctor_id)))
        }
    }

    pub async fn doctor_exists(&self, doctor_id: Uuid) -> Result<bool, ScheduleError> {
        with_timeout("doctor_exists", self.policy.store_timeout, self.directory.exists(doctor_id)).await
    }

    pub async fn load_pattern(&self, doctor_id: Uuid) -> Result<Option<WeeklyPattern>, ScheduleError> {
        with_timeout(
            "get_weekly_pattern",
            self.policy.store_timeout,
            self.store.get_weekly_pattern(doctor_id),
        )
        .await
    }

    pub async fn load_exceptions(&self, doctor_id: Uuid) -> Result<Vec<ScheduleException>, ScheduleError> {
        with_timeout(
            "get_exceptions",
            self.policy.store_timeout,
            self.store.get_exceptions(doctor_id),
        )
        .await
    }

    pub async fn load_reservations(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Reservation>, ScheduleError> {
        with_timeout(
            "list_reservations",
            self.policy.store_timeout,
            self.bookings.list_reservations(doctor_id, date),
        )
        .await
    }
}

pub(crate) fn ensure_not_past(date: NaiveDate) -> Result<(), ScheduleError> {
    let today = Utc::now().date_naive();
    if date < today {
        return Err(ScheduleError::InvalidArgument(format!(
            "Date {} is in the past",
            date
        )));
    }
    Ok(())
}

/// Marks slots held by reservations as unavailable; emergency holds carry their priority.
pub fn annotate_slots(slots: Vec<TimeSlot>, reservations: &[Reservation]) -> Vec<TimeSlot> {
    slots
        .into_iter()
        .map(|mut slot| {
            let holders: Vec<&Reservation> = reservations
                .iter()
                .filter(|r| slot.overlaps(r.start_time, r.end_time))
                .collect();

            if !holders.is_empty() {
                slot.is_available = false;
            }

            if let Some(emergency) = holders
                .iter()
                .filter(|r| r.kind == ReservationKind::Emergency)
                .max_by_key(|r| r.rank())
            {
                slot.is_emergency_slot = true;
                slot.priority_label = emergency.priority_label();
            }

            slot
        })
        .collect()
}
