//! Webhook and health routes.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{Form, extract::State};
use botbridge_core::SenderId;
use serde::Deserialize;
use std::sync::Arc;

/// Form fields posted by the messaging provider.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    /// Sender address, e.g. a phone number.
    #[serde(rename = "From")]
    pub from: String,
    /// Message text.
    #[serde(rename = "Body")]
    pub body: String,
}

/// Relays an inbound message and answers with the bot's reply as plain text.
pub async fn start_bot(
    State(state): State<Arc<AppState>>,
    Form(message): Form<InboundMessage>,
) -> Result<String, ApiError> {
    if message.from.trim().is_empty() {
        return Err(ApiError::InvalidMessage { field: "From" });
    }
    if message.body.trim().is_empty() {
        return Err(ApiError::InvalidMessage { field: "Body" });
    }

    let sender = SenderId::new(message.from);
    let reply = state.relay.relay(&sender, &message.body).await?;
    Ok(reply)
}

pub async fn health() -> &'static str {
    "ok"
}
