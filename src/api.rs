//! HTTP API for NEXUS

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::advisors::AdvisorGallery;
use crate::runtime::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub advisors: Arc<AdvisorGallery>,
}

impl AppState {
    pub fn new(sessions: SessionManager, advisors: Arc<AdvisorGallery>) -> Self {
        Self {
            sessions: Arc::new(sessions),
            advisors,
        }
    }
}
