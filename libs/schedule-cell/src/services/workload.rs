use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use shared_utils::calendar::{iso_week_key, minutes_between, month_dates};

use crate::error::ScheduleError;
use crate::models::{
    MonthlyWorkloadReport, ScheduleException, WeeklyPattern, WeeklyWorkloadReport, WorkDay,
    WorkloadBalanceResult, WorkloadStatus,
};
use crate::policy::{SchedulingPolicy, WorkloadThresholds};
use crate::services::availability::AvailabilityService;

const SHORT_BREAK_RECOMMENDATION: &str =
    "Break time is under the recommended minimum; schedule longer breaks between appointment blocks";
const REBALANCE_RECOMMENDATION: &str =
    "Move appointments from overloaded days to lighter days in the same week";

/// Fixed advisory catalogue keyed by workload band.
pub fn recommendations_for(status: WorkloadStatus) -> Vec<String> {
    let entries: &[&str] = match status {
        WorkloadStatus::NoWorkDay => &["No working hours are configured for this period"],
        WorkloadStatus::Light => &[
            "Workload is light; consider opening additional appointment slots",
            "Consider consolidating working hours into fewer days",
        ],
        WorkloadStatus::Balanced => &["Workload is balanced; keep the current schedule"],
        WorkloadStatus::Heavy => &[
            "Workload is heavy; consider adding breaks between appointment blocks",
            "Consider redistributing appointments to lighter days",
        ],
        WorkloadStatus::Overloaded => &[
            "Workload exceeds recommended capacity; reduce the number of appointments",
            "Redistribute appointments to other days or colleagues",
            "Schedule mandatory rest breaks",
        ],
    };
    entries.iter().map(|entry| entry.to_string()).collect()
}

/// Pure capacity classification over a work day's configured hours.
#[derive(Debug, Clone)]
pub struct WorkloadClassifier {
    thresholds: WorkloadThresholds,
    slot_minutes: i32,
    minimum_break_minutes: i32,
}

impl WorkloadClassifier {
    pub fn new(policy: &SchedulingPolicy) -> Self {
        Self {
            thresholds: policy.workload,
            slot_minutes: policy.default_appointment_duration_minutes.max(1),
            minimum_break_minutes: policy.minimum_break_minutes,
        }
    }

    pub fn classify_daily_load(&self, work_day: Option<&WorkDay>, date: NaiveDate) -> WorkloadBalanceResult {
        let ranges = match work_day {
            Some(day) if day.is_active => day.active_ranges(),
            _ => Vec::new(),
        };

        if ranges.is_empty() {
            return WorkloadBalanceResult {
                date,
                status: WorkloadStatus::NoWorkDay,
                total_appointments: 0,
                total_work_minutes: 0,
                break_minutes: 0,
                recommendations: recommendations_for(WorkloadStatus::NoWorkDay),
            };
        }

        let total_work_minutes: i64 = ranges.iter().map(|r| r.span_minutes()).sum();
        let break_minutes: i64 = ranges
            .windows(2)
            .map(|pair| minutes_between(pair[0].end_time, pair[1].start_time).max(0))
            .sum();

        let total_appointments = (total_work_minutes / self.slot_minutes as i64) as i32;
        let status = self.thresholds.classify(total_appointments);

        let mut recommendations = recommendations_for(status);
        if break_minutes < self.minimum_break_minutes as i64 {
            recommendations.push(SHORT_BREAK_RECOMMENDATION.to_string());
        }

        WorkloadBalanceResult {
            date,
            status,
            total_appointments,
            total_work_minutes: total_work_minutes as i32,
            break_minutes: break_minutes as i32,
            recommendations,
        }
    }

    /// Aggregates daily results; the band is taken from the average per working day.
    pub fn summarize_week(
        &self,
        doctor_id: Uuid,
        week_start: NaiveDate,
        days: Vec<WorkloadBalanceResult>,
    ) -> WeeklyWorkloadReport {
        let working: Vec<&WorkloadBalanceResult> = days
            .iter()
            .filter(|day| day.status != WorkloadStatus::NoWorkDay)
            .collect();

        let working_days = working.len() as i32;
        let total_appointments: i32 = working.iter().map(|d| d.total_appointments).sum();
        let total_work_minutes: i32 = working.iter().map(|d| d.total_work_minutes).sum();

        let status = if working_days == 0 {
            WorkloadStatus::NoWorkDay
        } else {
            self.thresholds.classify(total_appointments / working_days)
        };

        let mut recommendations = recommendations_for(status);
        let has_overloaded = working.iter().any(|d| d.status == WorkloadStatus::Overloaded);
        let has_light = working.iter().any(|d| d.status == WorkloadStatus::Light);
        if has_overloaded && has_light {
            recommendations.push(REBALANCE_RECOMMENDATION.to_string());
        }

        WeeklyWorkloadReport {
            doctor_id,
            week_start,
            status,
            working_days,
            total_appointments,
            total_work_minutes,
            days,
            recommendations,
        }
    }
}

pub struct WorkloadService {
    availability: Arc<AvailabilityService>,
    classifier: WorkloadClassifier,
}

impl WorkloadService {
    pub fn new(availability: Arc<AvailabilityService>) -> Self {
        let classifier = WorkloadClassifier::new(availability.policy());
        Self {
            availability,
            classifier,
        }
    }

    pub async fn classify_day(&self, doctor_id: Uuid, date: NaiveDate) -> Result<WorkloadBalanceResult, ScheduleError> {
        let (pattern, exceptions) = self.load_schedule(doctor_id).await?;
        Ok(self.classify_date(pattern.as_ref(), &exceptions, date))
    }

    pub async fn classify_week(&self, doctor_id: Uuid, week_start: NaiveDate) -> Result<WeeklyWorkloadReport, ScheduleError> {
        debug!("Classifying week of {} for doctor {}", week_start, doctor_id);

        let (pattern, exceptions) = self.load_schedule(doctor_id).await?;
        let days = (0..7)
            .map(|offset| week_start + Duration::days(offset))
            .map(|date| self.classify_date(pattern.as_ref(), &exceptions, date))
            .collect();

        Ok(self.classifier.summarize_week(doctor_id, week_start, days))
    }

    /// One weekly summary per ISO week touching the month, limited to the month's days.
    pub async fn classify_month(&self, doctor_id: Uuid, year: i32, month: u32) -> Result<MonthlyWorkloadReport, ScheduleError> {
        debug!("Classifying {}-{:02} for doctor {}", year, month, doctor_id);

        let dates = month_dates(year, month).ok_or_else(|| {
            ScheduleError::InvalidArgument(format!("Invalid month {}-{}", year, month))
        })?;

        let (pattern, exceptions) = self.load_schedule(doctor_id).await?;

        let mut by_week: BTreeMap<(i32, u32), Vec<WorkloadBalanceResult>> = BTreeMap::new();
        for date in dates {
            by_week
                .entry(iso_week_key(date))
                .or_default()
                .push(self.classify_date(pattern.as_ref(), &exceptions, date));
        }

        let weeks: Vec<WeeklyWorkloadReport> = by_week
            .into_values()
            .map(|days| {
                let week_start = days[0].date;
                self.classifier.summarize_week(doctor_id, week_start, days)
            })
            .collect();

        Ok(MonthlyWorkloadReport {
            doctor_id,
            year,
            month,
            total_appointments: weeks.iter().map(|w| w.total_appointments).sum(),
            total_work_minutes: weeks.iter().map(|w| w.total_work_minutes).sum(),
            weeks,
        })
    }

    fn classify_date(
        &self,
        pattern: Option<&WeeklyPattern>,
        exceptions: &[ScheduleException],
        date: NaiveDate,
    ) -> WorkloadBalanceResult {
        let work_day = if exceptions.iter().any(|e| e.covers(date)) {
            None
        } else {
            pattern.and_then(|p| p.work_day_for(date))
        };
        self.classifier.classify_daily_load(work_day, date)
    }

    async fn load_schedule(
        &self,
        doctor_id: Uuid,
    ) -> Result<(Option<WeeklyPattern>, Vec<ScheduleException>), ScheduleError> {
        self.availability.ensure_doctor(doctor_id).await?;
        let pattern = self.availability.load_pattern(doctor_id).await?;
        let exceptions = self.availability.load_exceptions(doctor_id).await?;
        Ok((pattern, exceptions))
    }
}
