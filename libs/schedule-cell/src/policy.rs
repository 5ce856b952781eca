use std::time::Duration;

use tracing::warn;

use shared_config::AppConfig;

use crate::models::{EmergencyPriority, WorkloadStatus};

const FALLBACK_APPOINTMENT_DURATION_MINUTES: i32 = 30;

/// Inclusive upper bounds of the workload bands, in appointments per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadThresholds {
    pub light_max: i32,
    pub balanced_max: i32,
    pub heavy_max: i32,
}

impl Default for WorkloadThresholds {
    fn default() -> Self {
        Self {
            light_max: 8,
            balanced_max: 12,
            heavy_max: 16,
        }
    }
}

impl WorkloadThresholds {
    pub fn classify(&self, appointments: i32) -> WorkloadStatus {
        if appointments <= self.light_max {
            WorkloadStatus::Light
        } else if appointments <= self.balanced_max {
            WorkloadStatus::Balanced
        } else if appointments <= self.heavy_max {
            WorkloadStatus::Heavy
        } else {
            WorkloadStatus::Overloaded
        }
    }
}

/// Per-clinic tunables for the scheduling engine.
#[derive(Debug, Clone)]
pub struct SchedulingPolicy {
    pub default_appointment_duration_minutes: i32,
    pub workload: WorkloadThresholds,
    pub minimum_break_minutes: i32,
    pub admissible_priorities: Vec<EmergencyPriority>,
    pub resolve_all_time_ranges: bool,
    pub store_timeout: Duration,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            default_appointment_duration_minutes: FALLBACK_APPOINTMENT_DURATION_MINUTES,
            workload: WorkloadThresholds::default(),
            minimum_break_minutes: 60,
            admissible_priorities: vec![
                EmergencyPriority::Critical,
                EmergencyPriority::High,
                EmergencyPriority::Medium,
            ],
            resolve_all_time_ranges: false,
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl SchedulingPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        let defaults = Self::default();

        let default_appointment_duration_minutes = if config.default_appointment_duration_minutes > 0 {
            config.default_appointment_duration_minutes
        } else {
            warn!(
                "Non-positive default appointment duration {}, falling back to {}",
                config.default_appointment_duration_minutes, FALLBACK_APPOINTMENT_DURATION_MINUTES
            );
            FALLBACK_APPOINTMENT_DURATION_MINUTES
        };

        let workload = WorkloadThresholds {
            light_max: config.workload_light_max,
            balanced_max: config.workload_balanced_max,
            heavy_max: config.workload_heavy_max,
        };
        let workload = if workload.light_max < workload.balanced_max && workload.balanced_max < workload.heavy_max {
            workload
        } else {
            warn!("Workload thresholds {:?} are not ascending, using defaults", workload);
            defaults.workload
        };

        let mut admissible_priorities = Vec::new();
        for raw in &config.emergency_admissible_priorities {
            match raw.parse::<EmergencyPriority>() {
                Ok(priority) if !admissible_priorities.contains(&priority) => admissible_priorities.push(priority),
                Ok(_) => {}
                Err(e) => warn!("Ignoring admissible priority entry: {}", e),
            }
        }

        let store_timeout = if config.store_timeout_ms > 0 {
            Duration::from_millis(config.store_timeout_ms)
        } else {
            warn!(
                "Non-positive store timeout {} ms, falling back to {:?}",
                config.store_timeout_ms, defaults.store_timeout
            );
            defaults.store_timeout
        };

        Self {
            default_appointment_duration_minutes,
            workload,
            minimum_break_minutes: config.minimum_break_minutes.max(0),
            admissible_priorities,
            resolve_all_time_ranges: config.resolve_all_time_ranges,
            store_timeout,
        }
    }

    pub fn is_admissible(&self, priority: EmergencyPriority) -> bool {
        self.admissible_priorities.contains(&priority)
    }
}
