use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_utils::calendar::{day_of_week_index, minutes_between};

use crate::error::{ErrorKind, ScheduleError};

fn default_true() -> bool {
    true
}

// ==============================================================================
// WEEKLY PATTERN
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl TimeRange {
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
            is_active: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.end_time > self.start_time
    }

    pub fn span_minutes(&self) -> i64 {
        minutes_between(self.start_time, self.end_time).max(0)
    }

    /// Half-open containment: `start <= time < end`.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDay {
    pub day_of_week: u8, // 0 = Sunday, 1 = Monday, etc.
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub time_ranges: Vec<TimeRange>,
}

impl WorkDay {
    pub fn new(day_of_week: u8, time_ranges: Vec<TimeRange>) -> Self {
        Self {
            day_of_week,
            is_active: true,
            time_ranges,
        }
    }

    /// Active ranges ordered by start time.
    pub fn active_ranges(&self) -> Vec<&TimeRange> {
        let mut ranges: Vec<&TimeRange> = self.time_ranges.iter().filter(|r| r.is_active).collect();
        ranges.sort_by_key(|r| r.start_time);
        ranges
    }

    /// First active range in configured order.
    pub fn first_active_range(&self) -> Option<&TimeRange> {
        self.time_ranges.iter().find(|r| r.is_active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPattern {
    pub doctor_id: Uuid,
    pub work_days: Vec<WorkDay>,
    pub appointment_duration_minutes: i32,
    pub default_start_time: NaiveTime,
    pub default_end_time: NaiveTime,
}

impl WeeklyPattern {
    /// The active work day scheduled for the weekday of `date`, if any.
    pub fn work_day_for(&self, date: NaiveDate) -> Option<&WorkDay> {
        let day_of_week = day_of_week_index(date);
        self.work_days
            .iter()
            .find(|day| day.is_active && day.day_of_week == day_of_week)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.appointment_duration_minutes <= 0 {
            return Err(ScheduleError::InvalidArgument(
                "Appointment duration must be a positive number of minutes".to_string(),
            ));
        }

        if self.default_start_time >= self.default_end_time {
            return Err(ScheduleError::InvalidArgument(
                "Default start time must be before default end time".to_string(),
            ));
        }

        let mut active_days = [false; 7];
        for day in &self.work_days {
            if day.day_of_week > 6 {
                return Err(ScheduleError::InvalidArgument(format!(
                    "Day of week must be between 0 (Sunday) and 6 (Saturday), got {}",
                    day.day_of_week
                )));
            }

            if let Some(range) = day.time_ranges.iter().find(|r| !r.is_valid()) {
                return Err(ScheduleError::InvalidArgument(format!(
                    "Time range {} - {} on day {} must end after it starts",
                    range.start_time, range.end_time, day.day_of_week
                )));
            }

            if day.is_active {
                let slot = &mut active_days[day.day_of_week as usize];
                if *slot {
                    return Err(ScheduleError::InvalidArgument(format!(
                        "More than one active work day configured for day {}",
                        day.day_of_week
                    )));
                }
                *slot = true;
            }
        }

        Ok(())
    }
}

// ==============================================================================
// EXCEPTIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionType {
    Holiday,
    Leave,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleException {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub exception_type: ExceptionType,
    pub date_range_start: NaiveDate,
    pub date_range_end: Option<NaiveDate>,
    pub reason: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl ScheduleException {
    pub fn new(
        doctor_id: Uuid,
        exception_type: ExceptionType,
        date_range_start: NaiveDate,
        date_range_end: Option<NaiveDate>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            exception_type,
            date_range_start,
            date_range_end,
            reason,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }

    /// True when this exception is live and its (possibly open-ended) range includes `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        !self.is_deleted
            && self.date_range_start <= date
            && self.date_range_end.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExceptionRequest {
    pub exception_type: ExceptionType,
    pub date_range_start: NaiveDate,
    pub date_range_end: Option<NaiveDate>,
    pub reason: Option<String>,
}

// ==============================================================================
// SLOTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
    pub doctor_id: Uuid,
    pub is_available: bool,
    pub is_emergency_slot: bool,
    pub priority_label: Option<String>,
}

impl TimeSlot {
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time < end && start < self.end_time
    }
}

// ==============================================================================
// WORKLOAD
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    NoWorkDay,
    Light,
    Balanced,
    Heavy,
    Overloaded,
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkloadStatus::NoWorkDay => "no_work_day",
            WorkloadStatus::Light => "light",
            WorkloadStatus::Balanced => "balanced",
            WorkloadStatus::Heavy => "heavy",
            WorkloadStatus::Overloaded => "overloaded",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadBalanceResult {
    pub date: NaiveDate,
    pub status: WorkloadStatus,
    pub total_appointments: i32,
    pub total_work_minutes: i32,
    pub break_minutes: i32,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyWorkloadReport {
    pub doctor_id: Uuid,
    pub week_start: NaiveDate,
    pub status: WorkloadStatus,
    pub working_days: i32,
    pub total_appointments: i32,
    pub total_work_minutes: i32,
    pub days: Vec<WorkloadBalanceResult>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyWorkloadReport {
    pub doctor_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub total_appointments: i32,
    pub total_work_minutes: i32,
    pub weeks: Vec<WeeklyWorkloadReport>,
}

// ==============================================================================
// EMERGENCY ADMISSION
// ==============================================================================

/// Declared from least to most urgent so that `Ord` follows urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl EmergencyPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyPriority::Low => "low",
            EmergencyPriority::Medium => "medium",
            EmergencyPriority::High => "high",
            EmergencyPriority::Critical => "critical",
        }
    }

    /// Ranking used for displacement. Regular bookings rank 0.
    pub fn rank(&self) -> u8 {
        match self {
            EmergencyPriority::Low => 1,
            EmergencyPriority::Medium => 2,
            EmergencyPriority::High => 3,
            EmergencyPriority::Critical => 4,
        }
    }
}

impl fmt::Display for EmergencyPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EmergencyPriority {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "critical" => Ok(EmergencyPriority::Critical),
            "high" => Ok(EmergencyPriority::High),
            "medium" => Ok(EmergencyPriority::Medium),
            "low" => Ok(EmergencyPriority::Low),
            _ => Err(ScheduleError::InvalidArgument(format!(
                "Invalid priority: '{}'. Must be one of: critical, high, medium, low",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyBookingRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub priority: EmergencyPriority,
    pub patient_name: String,
    pub emergency_reason: String,
}

/// Machine-checkable outcome of an admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionReason {
    Admitted,
    DoctorNotFound,
    DateInPast,
    NoWorkDay,
    NoTimeRange,
    OutsideRange,
    ExceptionCoversDate,
    PriorityDenied,
    MissingPatientName,
    MissingEmergencyReason,
    SlotConflict,
}

impl AdmissionReason {
    /// Error kind of a rejection; `None` when admitted.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AdmissionReason::Admitted => None,
            AdmissionReason::DoctorNotFound => Some(ErrorKind::NotFound),
            AdmissionReason::DateInPast
            | AdmissionReason::MissingPatientName
            | AdmissionReason::MissingEmergencyReason => Some(ErrorKind::InvalidArgument),
            AdmissionReason::NoWorkDay
            | AdmissionReason::NoTimeRange
            | AdmissionReason::OutsideRange
            | AdmissionReason::ExceptionCoversDate
            | AdmissionReason::PriorityDenied => Some(ErrorKind::PolicyDenied),
            AdmissionReason::SlotConflict => Some(ErrorKind::Conflict),
        }
    }

    pub fn into_error(self, message: impl Into<String>) -> Option<ScheduleError> {
        let message = message.into();
        self.kind().map(|kind| match kind {
            ErrorKind::NotFound => ScheduleError::NotFound(message),
            ErrorKind::InvalidArgument => ScheduleError::InvalidArgument(message),
            ErrorKind::Conflict => ScheduleError::Conflict(message),
            _ => ScheduleError::PolicyDenied(message),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyCheckResult {
    pub can_book: bool,
    pub reason: AdmissionReason,
    pub message: String,
}

impl EmergencyCheckResult {
    pub fn admitted() -> Self {
        Self {
            can_book: true,
            reason: AdmissionReason::Admitted,
            message: "Emergency booking can be admitted".to_string(),
        }
    }

    pub fn rejected(reason: AdmissionReason, message: impl Into<String>) -> Self {
        Self {
            can_book: false,
            reason,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationKind {
    Regular,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub kind: ReservationKind,
    pub priority: Option<EmergencyPriority>,
    pub patient_name: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn regular(
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        patient_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            date,
            start_time,
            end_time,
            kind: ReservationKind::Regular,
            priority: None,
            patient_name: patient_name.into(),
            reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn emergency(request: &EmergencyBookingRequest, end_time: NaiveTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            date: request.date,
            start_time: request.time,
            end_time,
            kind: ReservationKind::Emergency,
            priority: Some(request.priority),
            patient_name: request.patient_name.trim().to_string(),
            reason: Some(request.emergency_reason.trim().to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time < end && start < self.end_time
    }

    pub fn rank(&self) -> u8 {
        match self.kind {
            ReservationKind::Regular => 0,
            ReservationKind::Emergency => self.priority.map(|p| p.rank()).unwrap_or(0),
        }
    }

    pub fn priority_label(&self) -> Option<String> {
        self.priority.map(|p| p.as_str().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedResolution {
    DisplaceExisting,
    KeepExisting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyConflict {
    pub existing: Reservation,
    pub requested_priority: EmergencyPriority,
    pub requested_start_time: NaiveTime,
    pub requested_end_time: NaiveTime,
    pub resolution: SuggestedResolution,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyBookingResult {
    pub success: bool,
    pub reason: AdmissionReason,
    pub message: String,
    pub booking: Option<Reservation>,
    pub conflicts: Vec<EmergencyConflict>,
}

impl EmergencyBookingResult {
    pub fn booked(booking: Reservation) -> Self {
        Self {
            success: true,
            reason: AdmissionReason::Admitted,
            message: format!(
                "Emergency booking confirmed for {} at {}",
                booking.date, booking.start_time
            ),
            booking: Some(booking),
            conflicts: Vec::new(),
        }
    }

    pub fn rejected(reason: AdmissionReason, message: impl Into<String>) -> Self {
        Self {
            success: false,
            reason,
            message: message.into(),
            booking: None,
            conflicts: Vec::new(),
        }
    }

    pub fn conflicted(conflicts: Vec<EmergencyConflict>) -> Self {
        Self {
            success: false,
            reason: AdmissionReason::SlotConflict,
            message: format!(
                "Requested time conflicts with {} existing reservation(s)",
                conflicts.len()
            ),
            booking: None,
            conflicts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplacedBooking {
    pub original: Reservation,
    pub rebooked_to: Option<Reservation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolutionResult {
    pub success: bool,
    pub message: String,
    pub displaced: Vec<DisplacedBooking>,
    pub unresolved: Vec<EmergencyConflict>,
}
