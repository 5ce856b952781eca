use std::sync::Arc;

use shared_config::AppConfig;

use crate::policy::SchedulingPolicy;
use crate::services::{
    AdmissionLocks, AvailabilityService, EmergencyAdmissionService, InMemoryClinicStore,
    WorkloadService,
};

/// Shared handler state: the wired services over one in-memory clinic store.
pub struct ScheduleState {
    pub config: AppConfig,
    pub store: Arc<InMemoryClinicStore>,
    pub availability: Arc<AvailabilityService>,
    pub workload: Arc<WorkloadService>,
    pub emergency: Arc<EmergencyAdmissionService>,
}

impl ScheduleState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryClinicStore::new()))
    }

    pub fn with_store(config: AppConfig, store: Arc<InMemoryClinicStore>) -> Self {
        let policy = Arc::new(SchedulingPolicy::from_config(&config));

        let availability = Arc::new(AvailabilityService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            policy,
        ));
        let workload = Arc::new(WorkloadService::new(availability.clone()));
        let emergency = Arc::new(EmergencyAdmissionService::new(
            availability.clone(),
            store.clone(),
            Arc::new(AdmissionLocks::new()),
        ));

        Self {
            config,
            store,
            availability,
            workload,
            emergency,
        }
    }
}
