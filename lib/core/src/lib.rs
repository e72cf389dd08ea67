//! Core types shared by every botbridge crate.
//!
//! This crate provides the `Result` alias used for rootcause-based error
//! propagation and the strongly-typed identifiers that flow between the
//! inbound channel, the session store and the bot connector.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConversationId, ParseIdError, SenderId, SessionId};
