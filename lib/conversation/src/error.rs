//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `SessionError`: Errors from the conversation store
//! - `ReplyError`: Errors from reply collection, wrapping connector reports

use botbridge_core::{ConversationId, SenderId};
use std::fmt;

/// Errors from conversation store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The sender already has a live session.
    AlreadyExists { sender: SenderId },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists { sender } => {
                write!(f, "sender {sender} already has a session")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors from collecting a bot reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    /// The connector reported the conversation as unusable.
    SessionExpired { conversation_id: ConversationId },
    /// A poll failed for another reason (use as context wrapper).
    PollFailed {
        conversation_id: ConversationId,
        attempt: u32,
    },
    /// The bot did not answer within the allowed number of polls.
    Timeout {
        conversation_id: ConversationId,
        attempts: u32,
    },
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionExpired { conversation_id } => {
                write!(f, "conversation {conversation_id} expired while polling")
            }
            Self::PollFailed {
                conversation_id,
                attempt,
            } => {
                write!(
                    f,
                    "poll {attempt} of conversation {conversation_id} failed"
                )
            }
            Self::Timeout {
                conversation_id,
                attempts,
            } => {
                write!(
                    f,
                    "no bot reply in conversation {conversation_id} after {attempts} polls"
                )
            }
        }
    }
}

impl std::error::Error for ReplyError {}
