//! Shared application state for Axum routers.

use std::time::Instant;

use crate::services::ListService;

/// Application-wide state shared across all routes.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: ListService,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: ListService) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(ListService, service);
crate::impl_from_ref!(Instant, start_time);
