//! Error types for the connector crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConnectorError`: Errors from individual connector operations
//!
//! Callers wrap these with their own context (sender, session) via
//! `.context()` as they propagate.

use botbridge_core::ConversationId;
use std::fmt;

/// Errors from bot connector operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// The token endpoint was unreachable or issued no token.
    AuthenticationFailed { reason: String },
    /// Connection to the connector service failed or it answered with an error status.
    ConnectionFailed { reason: String },
    /// The connector answered with a body that could not be understood.
    ProtocolError { reason: String },
    /// The conversation can no longer be used (expired or revoked token).
    SessionExpired { conversation_id: ConversationId },
    /// Timeout waiting for response.
    Timeout,
}

impl ConnectorError {
    /// Returns true if the conversation must be discarded.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "token acquisition failed: {reason}")
            }
            Self::ConnectionFailed { reason } => {
                write!(f, "connection failed: {reason}")
            }
            Self::ProtocolError { reason } => {
                write!(f, "protocol error: {reason}")
            }
            Self::SessionExpired { conversation_id } => {
                write!(f, "conversation {conversation_id} has expired")
            }
            Self::Timeout => write!(f, "operation timed out"),
        }
    }
}

impl std::error::Error for ConnectorError {}
