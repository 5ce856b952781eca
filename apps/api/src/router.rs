use std::sync::Arc;

use axum::{routing::get, Router};

use schedule_cell::{schedule_routes, ScheduleState};

pub fn create_router(state: Arc<ScheduleState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/doctors", schedule_routes(state))
}
