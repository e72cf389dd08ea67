//! botbridge web server.
//!
//! This crate provides the axum webhook that relays inbound messages (for
//! example SMS forwarded by a messaging provider) to a bot connector and
//! answers with the bot's reply.

pub mod app;
pub mod config;
pub mod error;
pub mod relay;
pub mod routes;
