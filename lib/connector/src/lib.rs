//! Bot connector client for botbridge.
//!
//! This crate provides:
//!
//! - **Activity model**: The JSON shapes exchanged with the connector service
//! - **BotClient trait**: Token, conversation, post and poll operations
//! - **DirectLineClient**: The reqwest-backed implementation of `BotClient`

pub mod activity;
pub mod client;
pub mod direct_line;
pub mod error;
pub mod token;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use activity::{
    Activity, ActivitySet, ActivityType, CardAction, ChannelAccount, SuggestedActions, Watermark,
};
pub use client::BotClient;
pub use direct_line::{DirectLineClient, DirectLineConfig};
pub use error::ConnectorError;
pub use token::{Token, TokenSource};
