use axum::{
    Router,
    routing::{get, post},
};
use processor::Processor;
use std::sync::Arc;

pub mod error;
pub mod handlers;
pub mod settings;

use handlers::health::health;
use handlers::process::process;

pub struct AppState {
    pub processor: Arc<dyn Processor>,
}

pub fn get_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/process", post(process))
        .route("/health", get(health))
        .with_state(state)
}
