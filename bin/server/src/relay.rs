//! Relaying one inbound message to the bot and back.
//!
//! A request holds its sender's slot in the [`ConversationStore`] from the
//! moment it arrives until the reply is formatted. The session is stored as
//! soon as its conversation is opened and is edited in place, so a request
//! dropped mid-exchange leaves it behind for the next message. Only a
//! connector reporting the conversation dead removes it.

use crate::config::EndConversationConfig;
use crate::error::RelayError;
use botbridge_connector::{BotClient, ConnectorError};
use botbridge_conversation::{ConversationStore, ReplyCollector, ReplyError, Session, format_reply};
use botbridge_core::SenderId;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Relays webhook messages to the bot connector.
pub struct Relay {
    client: Arc<dyn BotClient>,
    store: ConversationStore,
    collector: ReplyCollector,
    end_conversation: EndConversationConfig,
}

impl Relay {
    #[must_use]
    pub fn new(
        client: Arc<dyn BotClient>,
        collector: ReplyCollector,
        end_conversation: EndConversationConfig,
    ) -> Self {
        Self {
            client,
            store: ConversationStore::new(),
            collector,
            end_conversation,
        }
    }

    /// Sessions keyed by sender.
    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Posts `body` on behalf of `sender` and returns the bot's formatted
    /// answer.
    ///
    /// The first message from a sender opens a conversation; later ones
    /// reuse it. An empty string means the bot had nothing to say.
    ///
    /// # Errors
    ///
    /// Returns a `RelayError` describing which side failed. On
    /// `SessionExpired` the sender's session has already been dropped.
    #[instrument(skip_all, fields(sender = %sender))]
    pub async fn relay(
        &self,
        sender: &SenderId,
        body: &str,
    ) -> Result<String, Report<RelayError>> {
        let mut guard = self.store.lock(sender).await;

        if self.end_conversation.matches(body) {
            if let Some(session) = guard.take() {
                info!(
                    session_id = %session.id,
                    conversation_id = %session.conversation_id,
                    "conversation ended by sender"
                );
            }
            return Ok(String::new());
        }

        let session = match guard.session_mut() {
            Some(session) => session,
            None => {
                let opened = self.open_session(sender).await?;
                info!(
                    session_id = %opened.id,
                    conversation_id = %opened.conversation_id,
                    "started conversation"
                );
                guard.replace(opened)
            }
        };

        if let Err(report) = self
            .client
            .post_message(&session.conversation_id, &session.token, body)
            .await
        {
            if report.current_context().is_session_expired() {
                drop_expired(guard.take());
            }
            return Err(connector_failure(sender, report));
        }
        session.touch();

        match self.collector.collect(self.client.as_ref(), session).await {
            Ok(replies) => Ok(format_reply(&replies)),
            Err(report) => {
                if matches!(report.current_context(), ReplyError::SessionExpired { .. }) {
                    drop_expired(guard.take());
                }
                Err(reply_failure(sender, report))
            }
        }
    }

    async fn open_session(&self, sender: &SenderId) -> Result<Session, Report<RelayError>> {
        let token = self
            .client
            .acquire_token()
            .await
            .map_err(|report| connector_failure(sender, report))?;

        let conversation_id = self
            .client
            .start_conversation(&token)
            .await
            .map_err(|report| connector_failure(sender, report))?;

        Ok(Session::new(sender.clone(), token, conversation_id))
    }
}

fn drop_expired(session: Option<Session>) {
    if let Some(session) = session {
        warn!(
            session_id = %session.id,
            conversation_id = %session.conversation_id,
            "conversation expired, dropping session"
        );
    }
}

fn connector_failure(sender: &SenderId, report: Report<ConnectorError>) -> Report<RelayError> {
    let sender = sender.clone();
    let context = match report.current_context() {
        ConnectorError::AuthenticationFailed { .. } => RelayError::Auth { sender },
        ConnectorError::SessionExpired { .. } => RelayError::SessionExpired { sender },
        ConnectorError::Timeout => RelayError::Timeout { sender },
        ConnectorError::ConnectionFailed { .. } | ConnectorError::ProtocolError { .. } => {
            RelayError::Connector { sender }
        }
    };
    report.context(context)
}

fn reply_failure(sender: &SenderId, report: Report<ReplyError>) -> Report<RelayError> {
    let sender = sender.clone();
    let context = match report.current_context() {
        ReplyError::SessionExpired { .. } => RelayError::SessionExpired { sender },
        ReplyError::PollFailed { .. } => RelayError::Connector { sender },
        ReplyError::Timeout { .. } => RelayError::Timeout { sender },
    };
    report.context(context)
}
