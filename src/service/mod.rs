pub mod email_locks;
pub mod enrollment_service;
pub mod transition_service;
pub mod broadcast_service;

use std::sync::Arc;
use crate::config::Settings;
use crate::directory::MemberDirectory;
use enrollment_service::EnrollmentService;
use transition_service::TransitionService;
use broadcast_service::MetadataBroadcastService;

pub use broadcast_service::MetadataCondition;

pub struct ServiceContext {
    pub directory: Arc<dyn MemberDirectory>,
    pub enrollment_service: Arc<EnrollmentService>,
    pub transition_service: Arc<TransitionService>,
    pub broadcast_service: Arc<MetadataBroadcastService>,
}

impl ServiceContext {
    pub fn new(directory: Arc<dyn MemberDirectory>, settings: &Settings) -> Self {
        let enrollment_service = Arc::new(EnrollmentService::new(
            directory.clone(),
            settings.enrollment.clone(),
        ));
        let transition_service = Arc::new(TransitionService::new(directory.clone()));
        let broadcast_service = Arc::new(MetadataBroadcastService::new(
            directory.clone(),
            settings.enrollment.default_next_match.clone(),
        ));

        Self {
            directory,
            enrollment_service,
            transition_service,
            broadcast_service,
        }
    }
}
