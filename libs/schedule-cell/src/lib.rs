pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod router;
pub mod services;
pub mod state;

pub use error::{ErrorKind, ScheduleError};
pub use models::*;
pub use policy::{SchedulingPolicy, WorkloadThresholds};
pub use router::schedule_routes;
pub use services::*;
pub use state::ScheduleState;
