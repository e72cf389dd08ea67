//! Domain error types for server operations.
//!
//! - `ConfigError`: startup configuration problems
//! - `RelayError`: a relayed message could not be answered, wrapping the
//!   connector or reply report that caused it
//! - `ApiError`: what the webhook handler returns, mapped to a status code

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use botbridge_core::SenderId;
use rootcause::prelude::Report;
use std::fmt;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The environment could not be read into the configuration.
    Load { reason: String },
    /// A required setting is absent or empty.
    MissingSetting { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { reason } => write!(f, "failed to load configuration: {reason}"),
            Self::MissingSetting { name } => write!(f, "required setting {name} is not set"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from relaying one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// No token could be obtained for a new conversation.
    Auth { sender: SenderId },
    /// The connector failed or misbehaved.
    Connector { sender: SenderId },
    /// The sender's conversation is gone; the next message starts a new one.
    SessionExpired { sender: SenderId },
    /// The bot did not answer in time.
    Timeout { sender: SenderId },
}

impl RelayError {
    /// HTTP status the webhook answers with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth { .. } | Self::Connector { .. } => StatusCode::BAD_GATEWAY,
            Self::SessionExpired { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth { sender } => {
                write!(f, "could not authenticate a conversation for {sender}")
            }
            Self::Connector { sender } => {
                write!(f, "bot connector failed while relaying for {sender}")
            }
            Self::SessionExpired { sender } => {
                write!(f, "conversation for {sender} expired")
            }
            Self::Timeout { sender } => write!(f, "bot did not answer {sender} in time"),
        }
    }
}

impl std::error::Error for RelayError {}

/// Webhook handler errors.
#[derive(Debug)]
pub enum ApiError {
    /// A form field was present but empty.
    InvalidMessage { field: &'static str },
    /// The message could not be relayed.
    Relay(Report<RelayError>),
}

impl From<Report<RelayError>> for ApiError {
    fn from(report: Report<RelayError>) -> Self {
        Self::Relay(report)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidMessage { field } => {
                tracing::debug!(field, "rejected inbound message");
                (StatusCode::BAD_REQUEST, "Invalid message")
            }
            Self::Relay(report) => {
                let relay = report.current_context();
                tracing::error!(error = %report, "relay failed");
                let message = match relay {
                    RelayError::Auth { .. } => "Bot authentication failed",
                    RelayError::Connector { .. } => "Bot connector unavailable",
                    RelayError::SessionExpired { .. } => "Conversation expired, please retry",
                    RelayError::Timeout { .. } => "Bot did not respond in time",
                };
                (relay.status(), message)
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_error_statuses() {
        let sender = SenderId::from("+1");
        assert_eq!(
            RelayError::Auth {
                sender: sender.clone()
            }
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::Connector {
                sender: sender.clone()
            }
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::SessionExpired {
                sender: sender.clone()
            }
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RelayError::Timeout { sender }.status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn api_error_uses_relay_status() {
        let report: Report<RelayError> = RelayError::Timeout {
            sender: SenderId::from("+1"),
        }
        .into();
        let response = ApiError::from(report).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn invalid_message_is_bad_request() {
        let response = ApiError::InvalidMessage { field: "Body" }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_setting_display_names_variable() {
        let err = ConfigError::MissingSetting { name: "BOT_NAME" };
        assert_eq!(err.to_string(), "required setting BOT_NAME is not set");
    }
}
