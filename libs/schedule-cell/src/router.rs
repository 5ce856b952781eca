use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers;
use crate::state::ScheduleState;

pub fn schedule_routes(state: Arc<ScheduleState>) -> Router {
    Router::new()
        // Directory and weekly pattern
        .route("/{doctor_id}", put(handlers::register_doctor))
        .route(
            "/{doctor_id}/schedule",
            get(handlers::get_schedule).put(handlers::save_schedule),
        )
        .route(
            "/{doctor_id}/exceptions",
            get(handlers::list_exceptions).post(handlers::add_exception),
        )
        .route(
            "/{doctor_id}/exceptions/{exception_id}",
            delete(handlers::delete_exception),
        )
        // Availability
        .route("/{doctor_id}/available-dates", get(handlers::get_available_dates))
        .route("/{doctor_id}/available-slots", get(handlers::get_available_slots))
        .route("/{doctor_id}/slot-board", get(handlers::get_slot_board))
        // Workload
        .route("/{doctor_id}/workload/day", get(handlers::get_daily_workload))
        .route("/{doctor_id}/workload/week", get(handlers::get_weekly_workload))
        .route("/{doctor_id}/workload/month", get(handlers::get_monthly_workload))
        // Emergency admission
        .route("/{doctor_id}/emergency/check", post(handlers::check_emergency))
        .route("/{doctor_id}/emergency/book", post(handlers::book_emergency))
        .route("/{doctor_id}/emergency/conflicts", get(handlers::get_emergency_conflicts))
        .route("/{doctor_id}/emergency/resolve", post(handlers::resolve_emergency_conflicts))
        .with_state(state)
}
