//! Conversation handling for botbridge.
//!
//! This crate provides:
//!
//! - **Conversation Store**: Sender-to-session mapping with per-sender locking
//! - **Reply Collector**: Watermark-driven polling for bot replies
//! - **Reply Formatting**: Folding bot activities into a plain-text answer

pub mod collector;
pub mod error;
pub mod reply;
pub mod session;

pub use collector::{PollConfig, ReplyCollector};
pub use error::{ReplyError, SessionError};
pub use reply::format_reply;
pub use session::{ConversationStore, Session, SessionGuard};
