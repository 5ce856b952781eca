pub mod availability;
pub mod emergency;
pub mod locks;
pub mod slots;
pub mod store;
pub mod workload;

pub use availability::AvailabilityService;
pub use emergency::EmergencyAdmissionService;
pub use locks::AdmissionLocks;
pub use store::{BookingRepository, DoctorDirectory, InMemoryClinicStore, ReserveOutcome, ScheduleStore};
pub use workload::{WorkloadClassifier, WorkloadService};
