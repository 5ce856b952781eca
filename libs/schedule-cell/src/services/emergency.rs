use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::models::{
    AdmissionReason, ConflictResolutionResult, DisplacedBooking, EmergencyBookingRequest,
    EmergencyBookingResult, EmergencyCheckResult, EmergencyConflict, EmergencyPriority,
    Reservation, SuggestedResolution, TimeSlot,
};
use crate::services::availability::{ensure_not_past, AvailabilityService};
use crate::services::locks::AdmissionLocks;
use crate::services::store::{with_timeout, BookingRepository, ReserveOutcome};

/// Outcome of the precondition checks plus the interval an admitted request would hold.
struct Evaluation {
    check: EmergencyCheckResult,
    duration_minutes: i32,
}

pub struct EmergencyAdmissionService {
    availability: Arc<AvailabilityService>,
    bookings: Arc<dyn BookingRepository>,
    locks: Arc<AdmissionLocks>,
}

impl EmergencyAdmissionService {
    pub fn new(
        availability: Arc<AvailabilityService>,
        bookings: Arc<dyn BookingRepository>,
        locks: Arc<AdmissionLocks>,
    ) -> Self {
        Self {
            availability,
            bookings,
            locks,
        }
    }

    /// Checks doctor, calendar, exceptions and the priority policy, in that order.
    pub async fn can_book_emergency(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        priority: EmergencyPriority,
    ) -> Result<EmergencyCheckResult, ScheduleError> {
        Ok(self.evaluate(doctor_id, date, time, priority).await?.check)
    }

    /// Admits an emergency booking and reserves its interval atomically per `(doctor, date)`.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, date = %request.date, priority = %request.priority))]
    pub async fn book_emergency(&self, request: EmergencyBookingRequest) -> Result<EmergencyBookingResult, ScheduleError> {
        debug!("Emergency booking requested at {}", request.time);

        if request.patient_name.trim().is_empty() {
            return Ok(EmergencyBookingResult::rejected(
                AdmissionReason::MissingPatientName,
                "Patient name is required for an emergency booking",
            ));
        }
        if request.emergency_reason.trim().is_empty() {
            return Ok(EmergencyBookingResult::rejected(
                AdmissionReason::MissingEmergencyReason,
                "Emergency reason is required for an emergency booking",
            ));
        }

        let _guard = self.locks.acquire(request.doctor_id, request.date).await;

        let evaluation = self
            .evaluate(request.doctor_id, request.date, request.time, request.priority)
            .await?;
        if !evaluation.check.can_book {
            warn!("Emergency booking rejected: {}", evaluation.check.message);
            return Ok(EmergencyBookingResult::rejected(
                evaluation.check.reason,
                evaluation.check.message,
            ));
        }

        let end_time = interval_end(request.time, evaluation.duration_minutes);
        let reservations = self
            .availability
            .load_reservations(request.doctor_id, request.date)
            .await?;
        let conflicts = build_conflicts(&reservations, request.priority, request.time, end_time);
        if !conflicts.is_empty() {
            warn!("Emergency booking blocked by {} conflicting reservation(s)", conflicts.len());
            return Ok(EmergencyBookingResult::conflicted(conflicts));
        }

        let reservation = Reservation::emergency(&request, end_time);
        let outcome = with_timeout(
            "reserve",
            self.availability.policy().store_timeout,
            self.bookings.reserve(reservation),
        )
        .await?;

        match outcome {
            ReserveOutcome::Reserved(booking) => {
                info!(
                    "Emergency booking {} admitted for {} - {}",
                    booking.id, booking.start_time, booking.end_time
                );
                Ok(EmergencyBookingResult::booked(booking))
            }
            ReserveOutcome::Conflict(existing) => {
                warn!("Store refused emergency reservation, interval held by {}", existing.id);
                let conflict = conflict_for(existing, request.priority, request.time, end_time);
                Ok(EmergencyBookingResult::conflicted(vec![conflict]))
            }
        }
    }

    /// Existing reservations overlapping the requested emergency interval.
    pub async fn check_emergency_conflicts(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        priority: EmergencyPriority,
    ) -> Result<Vec<EmergencyConflict>, ScheduleError> {
        debug!("Checking emergency conflicts for doctor {} on {} at {}", doctor_id, date, time);

        self.availability.ensure_doctor(doctor_id).await?;
        let duration = self.appointment_duration(doctor_id).await?;
        let end_time = interval_end(time, duration);

        let reservations = self.availability.load_reservations(doctor_id, date).await?;
        let conflicts = build_conflicts(&reservations, priority, time, end_time);

        if !conflicts.is_empty() {
            warn!(
                "Conflict detected for doctor {} - {} conflicting reservations",
                doctor_id,
                conflicts.len()
            );
        }
        Ok(conflicts)
    }

    /// Displaces outranked bookings and moves them to the next free slot of the day.
    ///
    /// A booking is displaced only when the emergency strictly outranks it; on equal
    /// priority the earlier-created booking keeps its place.
    pub async fn resolve_emergency_conflicts(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        conflicts: Vec<EmergencyConflict>,
    ) -> Result<ConflictResolutionResult, ScheduleError> {
        debug!("Resolving {} emergency conflicts for doctor {} on {}", conflicts.len(), doctor_id, date);

        if let Some(foreign) = conflicts
            .iter()
            .find(|c| c.existing.doctor_id != doctor_id || c.existing.date != date)
        {
            return Err(ScheduleError::InvalidArgument(format!(
                "Conflict for reservation {} does not belong to doctor {} on {}",
                foreign.existing.id, doctor_id, date
            )));
        }

        ensure_not_past(date)?;
        self.availability.ensure_doctor(doctor_id).await?;

        let _guard = self.locks.acquire(doctor_id, date).await;

        let pattern = self.availability.load_pattern(doctor_id).await?;
        let exceptions = self.availability.load_exceptions(doctor_id).await?;
        let day_slots = match pattern.as_ref() {
            Some(pattern) => self.availability.slots_for_date(pattern, &exceptions, date)?,
            None => Vec::new(),
        };

        let mut current = self.availability.load_reservations(doctor_id, date).await?;
        let mut displaced = Vec::new();
        let mut unresolved = Vec::new();

        for conflict in conflicts {
            // Only the id and the requested side of a conflict are taken from the caller.
            let Some(stored) = current.iter().find(|r| r.id == conflict.existing.id).cloned() else {
                debug!("Reservation {} no longer present, nothing to displace", conflict.existing.id);
                continue;
            };

            if conflict.requested_priority.rank() <= stored.rank() {
                unresolved.push(conflict_for(
                    stored,
                    conflict.requested_priority,
                    conflict.requested_start_time,
                    conflict.requested_end_time,
                ));
                continue;
            }

            let released = with_timeout(
                "release",
                self.availability.policy().store_timeout,
                self.bookings.release(doctor_id, stored.id),
            )
            .await?;
            let Some(original) = released else {
                continue;
            };
            current.retain(|r| r.id != original.id);

            let rebooked_to = match self.rebook(&original, &day_slots, &mut current, &conflict).await {
                Ok(moved) => moved,
                Err(err) => {
                    self.restore(&original).await;
                    return Err(err);
                }
            };

            match &rebooked_to {
                Some(moved) => info!(
                    "Reservation {} displaced from {} to {}",
                    original.id, original.start_time, moved.start_time
                ),
                None => warn!(
                    "Reservation {} displaced with no free slot left on {}",
                    original.id, date
                ),
            }

            displaced.push(DisplacedBooking { original, rebooked_to });
        }

        let success = unresolved.is_empty();
        let message = if success {
            format!("Resolved conflicts by displacing {} reservation(s)", displaced.len())
        } else {
            format!(
                "{} conflict(s) could not be resolved: existing bookings have equal or higher priority",
                unresolved.len()
            )
        };

        Ok(ConflictResolutionResult {
            success,
            message,
            displaced,
            unresolved,
        })
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn evaluate(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        priority: EmergencyPriority,
    ) -> Result<Evaluation, ScheduleError> {
        let policy = self.availability.policy();
        let rejected = |reason, message: String| Evaluation {
            check: EmergencyCheckResult::rejected(reason, message),
            duration_minutes: 0,
        };

        if !self.availability.doctor_exists(doctor_id).await? {
            return Ok(rejected(AdmissionReason::DoctorNotFound, format!("Doctor {} not found", doctor_id)));
        }

        if date < Utc::now().date_naive() {
            return Ok(rejected(AdmissionReason::DateInPast, format!("Date {} is in the past", date)));
        }

        let pattern = self.availability.load_pattern(doctor_id).await?;
        let Some((work_day, duration_minutes)) = pattern
            .as_ref()
            .and_then(|p| p.work_day_for(date).map(|day| (day, p.appointment_duration_minutes)))
        else {
            return Ok(rejected(AdmissionReason::NoWorkDay, format!("Doctor does not work on {}", date)));
        };

        let ranges = work_day.active_ranges();
        if ranges.is_empty() {
            return Ok(rejected(
                AdmissionReason::NoTimeRange,
                format!("No active working hours on {}", date),
            ));
        }
        if !ranges.iter().any(|range| range.contains(time)) {
            return Ok(rejected(
                AdmissionReason::OutsideRange,
                format!("{} is outside the working hours on {}", time, date),
            ));
        }

        let exceptions = self.availability.load_exceptions(doctor_id).await?;
        if let Some(exception) = exceptions.iter().find(|e| e.covers(date)) {
            return Ok(rejected(
                AdmissionReason::ExceptionCoversDate,
                format!("A {:?} exception covers {}", exception.exception_type, date),
            ));
        }

        if !policy.is_admissible(priority) {
            return Ok(rejected(
                AdmissionReason::PriorityDenied,
                format!("{} priority emergencies are not admitted", priority),
            ));
        }

        Ok(Evaluation {
            check: EmergencyCheckResult::admitted(),
            duration_minutes,
        })
    }

    async fn appointment_duration(&self, doctor_id: Uuid) -> Result<i32, ScheduleError> {
        let duration = self
            .availability
            .load_pattern(doctor_id)
            .await?
            .map(|p| p.appointment_duration_minutes)
            .filter(|minutes| *minutes > 0)
            .unwrap_or(self.availability.policy().default_appointment_duration_minutes);
        Ok(duration)
    }

    async fn rebook(
        &self,
        original: &Reservation,
        day_slots: &[TimeSlot],
        current: &mut Vec<Reservation>,
        conflict: &EmergencyConflict,
    ) -> Result<Option<Reservation>, ScheduleError> {
        let candidates: Vec<&TimeSlot> = day_slots
            .iter()
            .filter(|slot| {
                slot.start_time >= original.start_time
                    && !slot.overlaps(conflict.requested_start_time, conflict.requested_end_time)
                    && !current.iter().any(|r| slot.overlaps(r.start_time, r.end_time))
            })
            .collect();

        for slot in candidates {
            let moved = Reservation {
                start_time: slot.start_time,
                end_time: slot.end_time,
                ..original.clone()
            };

            let outcome = with_timeout(
                "reserve",
                self.availability.policy().store_timeout,
                self.bookings.reserve(moved),
            )
            .await?;

            if let ReserveOutcome::Reserved(moved) = outcome {
                current.push(moved.clone());
                return Ok(Some(moved));
            }
        }

        Ok(None)
    }

    /// Puts a released booking back at its original interval after a failed rebook.
    async fn restore(&self, original: &Reservation) {
        warn!("Rebooking {} failed, restoring it at {}", original.id, original.start_time);
        let restored = with_timeout(
            "reserve",
            self.availability.policy().store_timeout,
            self.bookings.reserve(original.clone()),
        )
        .await;

        match restored {
            Ok(ReserveOutcome::Reserved(_)) => {}
            Ok(ReserveOutcome::Conflict(holder)) => error!(
                "Could not restore reservation {}, interval now held by {}",
                original.id, holder.id
            ),
            Err(err) => error!("Could not restore reservation {}: {}", original.id, err),
        }
    }
}

fn interval_end(start: NaiveTime, duration_minutes: i32) -> NaiveTime {
    let (end, wrapped_seconds) = start.overflowing_add_signed(Duration::minutes(duration_minutes as i64));
    if wrapped_seconds != 0 {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(end)
    } else {
        end
    }
}

fn build_conflicts(
    reservations: &[Reservation],
    priority: EmergencyPriority,
    start: NaiveTime,
    end: NaiveTime,
) -> Vec<EmergencyConflict> {
    reservations
        .iter()
        .filter(|r| r.overlaps(start, end))
        .map(|r| conflict_for(r.clone(), priority, start, end))
        .collect()
}

fn conflict_for(
    existing: Reservation,
    requested_priority: EmergencyPriority,
    requested_start_time: NaiveTime,
    requested_end_time: NaiveTime,
) -> EmergencyConflict {
    let (resolution, message) = if requested_priority.rank() > existing.rank() {
        (
            SuggestedResolution::DisplaceExisting,
            format!(
                "Bump {} ({} - {}) to a later slot for the {} emergency",
                existing.patient_name, existing.start_time, existing.end_time, requested_priority
            ),
        )
    } else {
        (
            SuggestedResolution::KeepExisting,
            format!(
                "Keep {} ({} - {}); it has equal or higher priority",
                existing.patient_name, existing.start_time, existing.end_time
            ),
        )
    };

    EmergencyConflict {
        existing,
        requested_priority,
        requested_start_time,
        requested_end_time,
        resolution,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReservationKind;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn emergency_at(priority: EmergencyPriority, start: NaiveTime, end: NaiveTime) -> Reservation {
        Reservation {
            kind: ReservationKind::Emergency,
            priority: Some(priority),
            ..Reservation::regular(Uuid::new_v4(), NaiveDate::from_ymd_opt(2030, 6, 3).unwrap(), start, end, "E")
        }
    }

    #[test]
    fn test_interval_end_clamps_at_end_of_day() {
        assert_eq!(interval_end(time(9, 0), 30), time(9, 30));
        assert_eq!(interval_end(time(23, 45), 30), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn test_conflict_suggestion_follows_rank() {
        let regular = Reservation::regular(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2030, 6, 3).unwrap(),
            time(9, 0),
            time(9, 30),
            "R",
        );
        let high = emergency_at(EmergencyPriority::High, time(9, 0), time(9, 30));

        let bump = conflict_for(regular, EmergencyPriority::Medium, time(9, 0), time(9, 30));
        assert_eq!(bump.resolution, SuggestedResolution::DisplaceExisting);

        let keep_equal = conflict_for(high.clone(), EmergencyPriority::High, time(9, 0), time(9, 30));
        assert_eq!(keep_equal.resolution, SuggestedResolution::KeepExisting);

        let displace_lower = conflict_for(high, EmergencyPriority::Critical, time(9, 0), time(9, 30));
        assert_eq!(displace_lower.resolution, SuggestedResolution::DisplaceExisting);
    }

    #[test]
    fn test_build_conflicts_ignores_adjacent_reservations() {
        let before = emergency_at(EmergencyPriority::Low, time(8, 30), time(9, 0));
        let overlapping = emergency_at(EmergencyPriority::Low, time(9, 15), time(9, 45));
        let conflicts = build_conflicts(&[before, overlapping.clone()], EmergencyPriority::High, time(9, 0), time(9, 30));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].existing.id, overlapping.id);
    }
}
