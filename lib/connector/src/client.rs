//! The `BotClient` trait.
//!
//! All access to the connector service goes through this trait, giving the
//! relay a uniform interface whether it talks to the real service or to a
//! scripted double in tests.

use crate::activity::{ActivitySet, Watermark};
use crate::error::ConnectorError;
use crate::token::Token;
use async_trait::async_trait;
use botbridge_core::ConversationId;
use rootcause::prelude::Report;
use std::sync::Arc;

/// Trait for bot connector clients.
#[async_trait]
pub trait BotClient: Send + Sync {
    /// Acquires a fresh token from the token endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if the endpoint is unreachable or
    /// issues no token. There is no retry.
    async fn acquire_token(&self) -> Result<Token, Report<ConnectorError>>;

    /// Opens a new conversation.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unreadable response.
    async fn start_conversation(
        &self,
        token: &Token,
    ) -> Result<ConversationId, Report<ConnectorError>>;

    /// Posts a plain-text message as the synthetic relay user.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, or `SessionExpired` if the
    /// conversation no longer accepts the token.
    async fn post_message(
        &self,
        conversation_id: &ConversationId,
        token: &Token,
        text: &str,
    ) -> Result<(), Report<ConnectorError>>;

    /// Reads the activities posted since `watermark`.
    ///
    /// # Errors
    ///
    /// Returns `SessionExpired` when the connector reports the conversation
    /// as unusable, or another error on transport failure.
    async fn fetch_activities(
        &self,
        conversation_id: &ConversationId,
        token: &Token,
        watermark: Option<&Watermark>,
    ) -> Result<ActivitySet, Report<ConnectorError>>;
}

#[async_trait]
impl<T: BotClient + ?Sized> BotClient for Arc<T> {
    async fn acquire_token(&self) -> Result<Token, Report<ConnectorError>> {
        (**self).acquire_token().await
    }

    async fn start_conversation(
        &self,
        token: &Token,
    ) -> Result<ConversationId, Report<ConnectorError>> {
        (**self).start_conversation(token).await
    }

    async fn post_message(
        &self,
        conversation_id: &ConversationId,
        token: &Token,
        text: &str,
    ) -> Result<(), Report<ConnectorError>> {
        (**self).post_message(conversation_id, token, text).await
    }

    async fn fetch_activities(
        &self,
        conversation_id: &ConversationId,
        token: &Token,
        watermark: Option<&Watermark>,
    ) -> Result<ActivitySet, Report<ConnectorError>> {
        (**self)
            .fetch_activities(conversation_id, token, watermark)
            .await
    }
}
