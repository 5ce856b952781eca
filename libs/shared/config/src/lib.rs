use std::env;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_APPOINTMENT_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_appointment_duration_minutes: i32,
    pub workload_light_max: i32,
    pub workload_balanced_max: i32,
    pub workload_heavy_max: i32,
    pub minimum_break_minutes: i32,
    pub emergency_admissible_priorities: Vec<String>,
    pub resolve_all_time_ranges: bool,
    pub store_timeout_ms: u64,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_appointment_duration_minutes: DEFAULT_APPOINTMENT_DURATION_MINUTES,
            workload_light_max: 8,
            workload_balanced_max: 12,
            workload_heavy_max: 16,
            minimum_break_minutes: 60,
            emergency_admissible_priorities: vec![
                "critical".to_string(),
                "high".to_string(),
                "medium".to_string(),
            ],
            resolve_all_time_ranges: false,
            store_timeout_ms: 5_000,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            default_appointment_duration_minutes: parse_var(
                "DEFAULT_APPOINTMENT_DURATION_MINUTES",
                defaults.default_appointment_duration_minutes,
            ),
            workload_light_max: parse_var("WORKLOAD_LIGHT_MAX", defaults.workload_light_max),
            workload_balanced_max: parse_var("WORKLOAD_BALANCED_MAX", defaults.workload_balanced_max),
            workload_heavy_max: parse_var("WORKLOAD_HEAVY_MAX", defaults.workload_heavy_max),
            minimum_break_minutes: parse_var("MINIMUM_BREAK_MINUTES", defaults.minimum_break_minutes),
            emergency_admissible_priorities: env::var("EMERGENCY_ADMISSIBLE_PRIORITIES")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|_| {
                    warn!("EMERGENCY_ADMISSIBLE_PRIORITIES not set, using default");
                    defaults.emergency_admissible_priorities.clone()
                }),
            resolve_all_time_ranges: parse_var("RESOLVE_ALL_TIME_RANGES", defaults.resolve_all_time_ranges),
            store_timeout_ms: parse_var("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            port: parse_var("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Scheduling configuration is inconsistent - thresholds must ascend and durations must be positive");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.default_appointment_duration_minutes > 0
            && self.workload_light_max < self.workload_balanced_max
            && self.workload_balanced_max < self.workload_heavy_max
            && self.minimum_break_minutes >= 0
            && self.store_timeout_ms > 0
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {:?}", name, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {:?}", name, default);
            default
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}
