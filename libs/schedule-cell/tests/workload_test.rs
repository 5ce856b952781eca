mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use schedule_cell::error::ScheduleError;
use schedule_cell::models::{CreateExceptionRequest, ExceptionType, WeeklyPattern, WorkDay, WorkloadStatus};
use schedule_cell::policy::SchedulingPolicy;
use schedule_cell::services::workload::{recommendations_for, WorkloadClassifier};
use shared_config::AppConfig;

use common::{date, monday, range, time, TestClinic};

fn classifier() -> WorkloadClassifier {
    WorkloadClassifier::new(&SchedulingPolicy::default())
}

#[test]
fn test_band_boundaries_at_thirty_minute_slots() {
    let classifier = classifier();
    let cases = [
        ((12, 0), 8, WorkloadStatus::Light),
        ((12, 30), 9, WorkloadStatus::Balanced),
        ((14, 0), 12, WorkloadStatus::Balanced),
        ((14, 30), 13, WorkloadStatus::Heavy),
        ((16, 0), 16, WorkloadStatus::Heavy),
        ((16, 30), 17, WorkloadStatus::Overloaded),
    ];

    for (end, appointments, status) in cases {
        let day = WorkDay::new(1, vec![range((8, 0), end)]);
        let result = classifier.classify_daily_load(Some(&day), monday());

        assert_eq!(result.total_appointments, appointments, "range ending {:?}", end);
        assert_eq!(result.status, status, "range ending {:?}", end);
    }
}

#[test]
fn test_missing_or_inactive_day_is_no_work_day() {
    let classifier = classifier();
    let mut inactive = WorkDay::new(1, vec![range((8, 0), (16, 0))]);
    inactive.is_active = false;

    let missing = classifier.classify_daily_load(None, monday());
    let idle = classifier.classify_daily_load(Some(&inactive), monday());

    for result in [missing, idle] {
        assert_eq!(result.status, WorkloadStatus::NoWorkDay);
        assert_eq!(result.total_appointments, 0);
        assert_eq!(result.recommendations, recommendations_for(WorkloadStatus::NoWorkDay));
    }
}

#[test]
fn test_short_break_adds_recommendation() {
    let classifier = classifier();

    let continuous = WorkDay::new(1, vec![range((8, 0), (16, 0))]);
    let split = WorkDay::new(1, vec![range((8, 0), (12, 0)), range((13, 0), (17, 0))]);

    let no_break = classifier.classify_daily_load(Some(&continuous), monday());
    let with_break = classifier.classify_daily_load(Some(&split), monday());

    assert_eq!(no_break.break_minutes, 0);
    assert!(no_break.recommendations.len() > recommendations_for(no_break.status).len());

    assert_eq!(with_break.break_minutes, 60);
    assert_eq!(with_break.total_appointments, 16);
    assert_eq!(with_break.total_work_minutes, 480);
    assert_eq!(with_break.recommendations, recommendations_for(WorkloadStatus::Heavy));
}

#[test]
fn test_thresholds_follow_configuration() {
    let config = AppConfig {
        workload_light_max: 4,
        workload_balanced_max: 6,
        workload_heavy_max: 8,
        ..AppConfig::default()
    };
    let classifier = WorkloadClassifier::new(&SchedulingPolicy::from_config(&config));
    let day = WorkDay::new(1, vec![range((8, 0), (12, 0))]);

    assert_eq!(
        classifier.classify_daily_load(Some(&day), monday()).status,
        WorkloadStatus::Heavy
    );
}

#[tokio::test]
async fn test_week_report_averages_working_days() {
    let clinic = TestClinic::new().await;

    let report = clinic.workload().classify_week(clinic.doctor_id, monday()).await.unwrap();

    assert_eq!(report.days.len(), 7);
    assert_eq!(report.working_days, 5);
    assert_eq!(report.total_appointments, 80);
    assert_eq!(report.total_work_minutes, 2400);
    assert_eq!(report.status, WorkloadStatus::Heavy);
    assert_eq!(report.days[5].status, WorkloadStatus::NoWorkDay);
    assert_eq!(report.days[6].status, WorkloadStatus::NoWorkDay);
}

#[tokio::test]
async fn test_week_report_skips_exception_days() {
    let clinic = TestClinic::new().await;
    clinic
        .availability()
        .add_exception(
            clinic.doctor_id,
            CreateExceptionRequest {
                exception_type: ExceptionType::Leave,
                date_range_start: date(2030, 6, 5),
                date_range_end: Some(date(2030, 6, 5)),
                reason: None,
            },
        )
        .await
        .unwrap();

    let report = clinic.workload().classify_week(clinic.doctor_id, monday()).await.unwrap();
    assert_eq!(report.working_days, 4);
    assert_eq!(report.days[2].status, WorkloadStatus::NoWorkDay);

    let day = clinic.workload().classify_day(clinic.doctor_id, date(2030, 6, 5)).await.unwrap();
    assert_eq!(day.status, WorkloadStatus::NoWorkDay);
}

#[tokio::test]
async fn test_uneven_week_recommends_rebalancing() {
    let clinic = TestClinic::empty(AppConfig::default()).await;
    clinic
        .save_pattern(WeeklyPattern {
            doctor_id: clinic.doctor_id,
            work_days: vec![
                WorkDay::new(1, vec![range((8, 0), (18, 0))]),
                WorkDay::new(2, vec![range((8, 0), (10, 0))]),
            ],
            appointment_duration_minutes: 30,
            default_start_time: time(8, 0),
            default_end_time: time(18, 0),
        })
        .await;

    let report = clinic.workload().classify_week(clinic.doctor_id, monday()).await.unwrap();

    assert_eq!(report.days[0].status, WorkloadStatus::Overloaded);
    assert_eq!(report.days[1].status, WorkloadStatus::Light);
    assert_eq!(report.total_appointments, 24);
    assert_eq!(report.status, WorkloadStatus::Balanced);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.contains("overloaded days to lighter days")));
}

#[tokio::test]
async fn test_month_report_groups_by_iso_week() {
    let clinic = TestClinic::new().await;

    let report = clinic.workload().classify_month(clinic.doctor_id, 2030, 6).await.unwrap();

    assert_eq!(report.weeks.len(), 5);
    assert_eq!(report.weeks[0].week_start, date(2030, 6, 1));
    assert_eq!(report.weeks[0].working_days, 0);
    assert_eq!(report.weeks[1].week_start, monday());
    assert_eq!(report.total_appointments, 20 * 16);
    let days: usize = report.weeks.iter().map(|w| w.days.len()).sum();
    assert_eq!(days, 30);
}

#[tokio::test]
async fn test_workload_errors() {
    let clinic = TestClinic::new().await;

    assert_matches!(
        clinic.workload().classify_month(clinic.doctor_id, 2030, 13).await,
        Err(ScheduleError::InvalidArgument(_))
    );
    assert_matches!(
        clinic.workload().classify_week(Uuid::new_v4(), monday()).await,
        Err(ScheduleError::NotFound(_))
    );
}
