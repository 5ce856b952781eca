mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use schedule_cell::router::schedule_routes;

use common::TestClinic;

async fn create_test_app() -> (Router, Uuid) {
    let clinic = TestClinic::new().await;
    (schedule_routes(clinic.state.clone()), clinic.doctor_id)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn book_body(priority: &str) -> Value {
    json!({
        "date": "2030-06-03",
        "time": "09:00:00",
        "priority": priority,
        "patient_name": "Jane Doe",
        "emergency_reason": "Acute chest pain"
    })
}

#[tokio::test]
async fn test_register_and_configure_doctor() {
    let (app, _) = create_test_app().await;
    let doctor_id = Uuid::new_v4();

    let (status, _) = send(&app, "GET", &format!("/{}/schedule", doctor_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "PUT", &format!("/{}", doctor_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registered"], true);

    let schedule = json!({
        "work_days": [
            { "day_of_week": 1, "time_ranges": [{ "start_time": "08:00:00", "end_time": "12:00:00" }] }
        ],
        "appointment_duration_minutes": 20,
        "default_start_time": "08:00:00",
        "default_end_time": "12:00:00"
    });
    let (status, body) = send(&app, "PUT", &format!("/{}/schedule", doctor_id), Some(schedule)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment_duration_minutes"], 20);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/{}/available-slots?date=2030-06-03", doctor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 12);
}

#[tokio::test]
async fn test_invalid_schedule_is_bad_request() {
    let (app, doctor_id) = create_test_app().await;

    let schedule = json!({
        "work_days": [
            { "day_of_week": 9, "time_ranges": [{ "start_time": "08:00:00", "end_time": "12:00:00" }] }
        ],
        "default_start_time": "08:00:00",
        "default_end_time": "12:00:00"
    });
    let (status, body) = send(&app, "PUT", &format!("/{}/schedule", doctor_id), Some(schedule)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Day of week"));
}

#[tokio::test]
async fn test_available_slots_and_dates() {
    let (app, doctor_id) = create_test_app().await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/{}/available-slots?date=2030-06-03", doctor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 16);
    assert_eq!(body["slots"][0]["start_time"], "08:00:00");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/{}/available-dates?start=2030-06-02&end=2030-06-08", doctor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/{}/available-dates?start=2030-06-03&end=2030-06-03", doctor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/{}/available-slots?date=2030-06-03", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_exception_lifecycle() {
    let (app, doctor_id) = create_test_app().await;

    let (status, created) = send(
        &app,
        "POST",
        &format!("/{}/exceptions", doctor_id),
        Some(json!({
            "exception_type": "holiday",
            "date_range_start": "2030-06-03",
            "date_range_end": "2030-06-03",
            "reason": "Public holiday"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let exception_id = created["id"].as_str().unwrap().to_string();

    let (_, body) = send(
        &app,
        "GET",
        &format!("/{}/available-slots?date=2030-06-03", doctor_id),
        None,
    )
    .await;
    assert_eq!(body["total"], 0);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/{}/exceptions/{}", doctor_id, exception_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/{}/exceptions", doctor_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/{}/exceptions/{}", doctor_id, Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_workload_endpoints() {
    let (app, doctor_id) = create_test_app().await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/{}/workload/day?date=2030-06-03", doctor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "heavy");
    assert_eq!(body["total_appointments"], 16);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/{}/workload/week?week_start=2030-06-03", doctor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["working_days"], 5);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/{}/workload/month?year=2030&month=6", doctor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weeks"].as_array().unwrap().len(), 5);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/{}/workload/month?year=2030&month=0", doctor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_emergency_check_reports_reason() {
    let (app, doctor_id) = create_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/{}/emergency/check", doctor_id),
        Some(json!({ "date": "2030-06-02", "time": "09:00:00", "priority": "critical" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_book"], false);
    assert_eq!(body["reason"], "no_work_day");
}

#[tokio::test]
async fn test_emergency_booking_statuses() {
    let (app, doctor_id) = create_test_app().await;
    let uri = format!("/{}/emergency/book", doctor_id);

    let (status, body) = send(&app, "POST", &uri, Some(book_body("critical"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["booking"]["end_time"], "09:30:00");

    let (status, body) = send(&app, "POST", &uri, Some(book_body("critical"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "slot_conflict");
    assert_eq!(body["conflicts"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "POST", &uri, Some(book_body("low"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["reason"], "priority_denied");

    let (status, _) = send(&app, "POST", &uri, Some(book_body("urgent"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_emergency_conflicts_and_resolution() {
    let (app, doctor_id) = create_test_app().await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/{}/emergency/book", doctor_id),
        Some(book_body("medium")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "GET",
        &format!(
            "/{}/emergency/conflicts?date=2030-06-03&time=09:00:00&priority=critical",
            doctor_id
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_conflicts"], true);
    assert_eq!(body["conflicts"][0]["resolution"], "displace_existing");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/{}/emergency/resolve", doctor_id),
        Some(json!({ "date": "2030-06-03", "conflicts": body["conflicts"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["displaced"][0]["rebooked_to"]["start_time"], "09:30:00");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/{}/slot-board?date=2030-06-03", doctor_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["free"], 15);
    assert_eq!(body["slots"][3]["priority_label"], "medium");
}
