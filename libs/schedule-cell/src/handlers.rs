use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AdmissionReason, CreateExceptionRequest, EmergencyBookingRequest, EmergencyConflict,
    EmergencyPriority, WeeklyPattern, WorkDay,
};
use crate::state::ScheduleState;

#[derive(Debug, Deserialize)]
pub struct SaveScheduleRequest {
    pub work_days: Vec<WorkDay>,
    pub appointment_duration_minutes: Option<i32>,
    pub default_start_time: NaiveTime,
    pub default_end_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub struct ExceptionListQuery {
    pub include_deleted: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub week_start: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

// Priorities arrive as strings so a malformed value is reported as a bad request.
#[derive(Debug, Deserialize)]
pub struct EmergencyCheckRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub priority: String,
}

#[derive(Debug, Deserialize)]
pub struct EmergencyBookRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub priority: String,
    pub patient_name: String,
    pub emergency_reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ConflictQuery {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub priority: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveConflictsRequest {
    pub date: NaiveDate,
    pub conflicts: Vec<EmergencyConflict>,
}

fn parse_priority(raw: &str) -> Result<EmergencyPriority, AppError> {
    raw.parse::<EmergencyPriority>().map_err(AppError::from)
}

/// Status for an admission decision: `admitted` when accepted, else derived from the reason.
fn decision_status(reason: AdmissionReason, message: &str, admitted: StatusCode) -> StatusCode {
    match reason.into_error(message) {
        Some(err) => AppError::from(err).status_code(),
        None => admitted,
    }
}

// ==============================================================================
// DOCTOR & SCHEDULE MAINTENANCE
// ==============================================================================

#[axum::debug_handler]
pub async fn register_doctor(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.store.register_doctor(doctor_id).await;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "registered": true
    })))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let pattern = state.availability.get_weekly_pattern(doctor_id).await?;
    Ok(Json(json!(pattern)))
}

#[axum::debug_handler]
pub async fn save_schedule(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<SaveScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let pattern = WeeklyPattern {
        doctor_id,
        work_days: request.work_days,
        appointment_duration_minutes: request
            .appointment_duration_minutes
            .unwrap_or(state.availability.policy().default_appointment_duration_minutes),
        default_start_time: request.default_start_time,
        default_end_time: request.default_end_time,
    };

    let saved = state.availability.save_weekly_pattern(pattern).await?;
    Ok(Json(json!(saved)))
}

#[axum::debug_handler]
pub async fn list_exceptions(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<ExceptionListQuery>,
) -> Result<Json<Value>, AppError> {
    let exceptions = state
        .availability
        .list_exceptions(doctor_id, query.include_deleted.unwrap_or(false))
        .await?;

    Ok(Json(json!({
        "exceptions": exceptions,
        "total": exceptions.len()
    })))
}

#[axum::debug_handler]
pub async fn add_exception(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateExceptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let exception = state.availability.add_exception(doctor_id, request).await?;
    Ok((StatusCode::CREATED, Json(json!(exception))))
}

#[axum::debug_handler]
pub async fn delete_exception(
    State(state): State<Arc<ScheduleState>>,
    Path((doctor_id, exception_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    state.availability.remove_exception(doctor_id, exception_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Exception deleted"
    })))
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_dates(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let dates = state
        .availability
        .resolve_available_dates(doctor_id, query.start, query.end)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "dates": dates,
        "total": dates.len()
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state
        .availability
        .resolve_available_slots(doctor_id, query.date)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_slot_board(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state.availability.resolve_slot_board(doctor_id, query.date).await?;
    let free = slots.iter().filter(|slot| slot.is_available).count();

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots,
        "total": slots.len(),
        "free": free
    })))
}

// ==============================================================================
// WORKLOAD
// ==============================================================================

#[axum::debug_handler]
pub async fn get_daily_workload(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    let result = state.workload.classify_day(doctor_id, query.date).await?;
    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn get_weekly_workload(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Value>, AppError> {
    let report = state.workload.classify_week(doctor_id, query.week_start).await?;
    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn get_monthly_workload(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Value>, AppError> {
    let report = state
        .workload
        .classify_month(doctor_id, query.year, query.month)
        .await?;
    Ok(Json(json!(report)))
}

// ==============================================================================
// EMERGENCY ADMISSION
// ==============================================================================

#[axum::debug_handler]
pub async fn check_emergency(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<EmergencyCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let priority = parse_priority(&request.priority)?;

    let result = state
        .emergency
        .can_book_emergency(doctor_id, request.date, request.time, priority)
        .await?;

    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn book_emergency(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<EmergencyBookRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let priority = parse_priority(&request.priority)?;

    let booking_request = EmergencyBookingRequest {
        doctor_id,
        date: request.date,
        time: request.time,
        priority,
        patient_name: request.patient_name,
        emergency_reason: request.emergency_reason,
    };

    let result = state.emergency.book_emergency(booking_request).await?;
    let status = decision_status(result.reason, &result.message, StatusCode::CREATED);
    debug!("Emergency booking decision {:?} -> {}", result.reason, status);

    Ok((status, Json(json!(result))))
}

#[axum::debug_handler]
pub async fn get_emergency_conflicts(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<ConflictQuery>,
) -> Result<Json<Value>, AppError> {
    let priority = parse_priority(&query.priority)?;

    let conflicts = state
        .emergency
        .check_emergency_conflicts(doctor_id, query.date, query.time, priority)
        .await?;

    Ok(Json(json!({
        "has_conflicts": !conflicts.is_empty(),
        "conflicts": conflicts,
        "total": conflicts.len()
    })))
}

#[axum::debug_handler]
pub async fn resolve_emergency_conflicts(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<ResolveConflictsRequest>,
) -> Result<Json<Value>, AppError> {
    let result = state
        .emergency
        .resolve_emergency_conflicts(doctor_id, request.date, request.conflicts)
        .await?;

    Ok(Json(json!(result)))
}
