//! HTTP API for the brand assistant

mod assets;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::RuntimeManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
}

impl AppState {
    pub fn new(runtime: Arc<RuntimeManager>) -> Self {
        Self { runtime }
    }
}
