#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use schedule_cell::models::{EmergencyBookingRequest, EmergencyPriority, TimeRange, WeeklyPattern, WorkDay};
use schedule_cell::services::{AvailabilityService, EmergencyAdmissionService, InMemoryClinicStore, WorkloadService};
use schedule_cell::state::ScheduleState;
use shared_config::AppConfig;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn range(start: (u32, u32), end: (u32, u32)) -> TimeRange {
    TimeRange::new(time(start.0, start.1), time(end.0, end.1))
}

/// 2030-06-03, a Monday well in the future.
pub fn monday() -> NaiveDate {
    date(2030, 6, 3)
}

pub fn sunday() -> NaiveDate {
    date(2030, 6, 2)
}

/// Monday to Friday with the same ranges, 30 minute appointments.
pub fn weekday_pattern(doctor_id: Uuid, ranges: Vec<TimeRange>) -> WeeklyPattern {
    WeeklyPattern {
        doctor_id,
        work_days: (1..=5).map(|day| WorkDay::new(day, ranges.clone())).collect(),
        appointment_duration_minutes: 30,
        default_start_time: time(8, 0),
        default_end_time: time(16, 0),
    }
}

pub fn booking_request(
    doctor_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    priority: EmergencyPriority,
) -> EmergencyBookingRequest {
    EmergencyBookingRequest {
        doctor_id,
        date,
        time,
        priority,
        patient_name: "Jane Doe".to_string(),
        emergency_reason: "Acute chest pain".to_string(),
    }
}

/// One registered doctor working weekdays 08:00-16:00 over an in-memory store.
pub struct TestClinic {
    pub doctor_id: Uuid,
    pub store: Arc<InMemoryClinicStore>,
    pub state: Arc<ScheduleState>,
}

impl TestClinic {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let clinic = Self::empty(config).await;
        clinic
            .save_pattern(weekday_pattern(clinic.doctor_id, vec![range((8, 0), (16, 0))]))
            .await;
        clinic
    }

    /// Registered doctor without a weekly pattern.
    pub async fn empty(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryClinicStore::new());
        let state = Arc::new(ScheduleState::with_store(config, store.clone()));
        let doctor_id = Uuid::new_v4();
        store.register_doctor(doctor_id).await;

        Self {
            doctor_id,
            store,
            state,
        }
    }

    pub async fn save_pattern(&self, pattern: WeeklyPattern) {
        self.state.availability.save_weekly_pattern(pattern).await.unwrap();
    }

    pub fn availability(&self) -> &AvailabilityService {
        &self.state.availability
    }

    pub fn workload(&self) -> &WorkloadService {
        &self.state.workload
    }

    pub fn emergency(&self) -> &EmergencyAdmissionService {
        &self.state.emergency
    }
}
