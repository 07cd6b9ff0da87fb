//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::ScheduleService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Schedule service for all business logic.
    pub schedule_service: Arc<ScheduleService>,
}

impl AppState {
    /// Wraps a service for sharing across handlers.
    #[must_use]
    pub fn new(schedule_service: ScheduleService) -> Self {
        Self {
            schedule_service: Arc::new(schedule_service),
        }
    }
}
