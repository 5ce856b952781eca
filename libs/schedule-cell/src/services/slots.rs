use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::models::{TimeRange, TimeSlot, WorkDay};

fn validate_duration(duration_minutes: i32) -> Result<(), ScheduleError> {
    if duration_minutes <= 0 {
        return Err(ScheduleError::InvalidArgument(format!(
            "Appointment duration must be positive, got {} minutes",
            duration_minutes
        )));
    }
    Ok(())
}

/// Bookable slots for one work day, ordered by start time.
///
/// Every active range is cut independently into back-to-back slots of
/// `duration_minutes`; a trailing remainder shorter than the duration is dropped.
/// An inactive work day yields no slots.
pub fn generate_slots(
    work_day: &WorkDay,
    date: NaiveDate,
    doctor_id: Uuid,
    duration_minutes: i32,
) -> Result<Vec<TimeSlot>, ScheduleError> {
    validate_duration(duration_minutes)?;

    if !work_day.is_active {
        return Ok(Vec::new());
    }

    let mut slots: Vec<TimeSlot> = work_day
        .time_ranges
        .iter()
        .flat_map(|range| slots_in_range(range, date, doctor_id, duration_minutes))
        .collect();

    slots.sort_by_key(|slot| slot.start_time);
    Ok(slots)
}

/// Same as [`generate_slots`], treating a missing work day as empty.
pub fn generate_slots_for_day(
    work_day: Option<&WorkDay>,
    date: NaiveDate,
    doctor_id: Uuid,
    duration_minutes: i32,
) -> Result<Vec<TimeSlot>, ScheduleError> {
    match work_day {
        Some(day) => generate_slots(day, date, doctor_id, duration_minutes),
        None => validate_duration(duration_minutes).map(|_| Vec::new()),
    }
}

pub fn generate_slots_for_range(
    range: &TimeRange,
    date: NaiveDate,
    doctor_id: Uuid,
    duration_minutes: i32,
) -> Result<Vec<TimeSlot>, ScheduleError> {
    validate_duration(duration_minutes)?;
    Ok(slots_in_range(range, date, doctor_id, duration_minutes))
}

fn slots_in_range(range: &TimeRange, date: NaiveDate, doctor_id: Uuid, duration_minutes: i32) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    if !range.is_active || !range.is_valid() {
        return slots;
    }

    let step = Duration::minutes(duration_minutes as i64);
    let mut current = range.start_time;

    loop {
        let (slot_end, wrapped_seconds) = current.overflowing_add_signed(step);
        if wrapped_seconds != 0 || slot_end > range.end_time {
            break;
        }

        slots.push(TimeSlot {
            date,
            start_time: current,
            end_time: slot_end,
            duration_minutes,
            doctor_id,
            is_available: true,
            is_emergency_slot: false,
            priority_label: None,
        });

        current = slot_end;
    }

    slots
}
