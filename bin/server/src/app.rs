//! Application state and routing.

use crate::relay::Relay;
use crate::routes;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Path the messaging provider posts inbound messages to.
pub const START_BOT_PATH: &str = "/BotConnector/StartBot";

/// Shared application state.
pub struct AppState {
    /// The relay every inbound message goes through.
    pub relay: Relay,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }
}

/// Builds the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(START_BOT_PATH, post(routes::start_bot))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
