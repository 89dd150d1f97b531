//! Shared application state for the web server.

use std::sync::Arc;

use snomedix_link::LinkingService;

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LinkingService>,
}

impl AppState {
    pub fn new(service: LinkingService) -> Self {
        Self { service: Arc::new(service) }
    }
}

pub type SharedState = Arc<AppState>;
