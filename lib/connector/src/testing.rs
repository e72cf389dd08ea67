//! Scripted [`BotClient`] for tests.
//!
//! Polls are answered from a queue; once the queue is drained every poll
//! returns an empty page. Every call is recorded so tests can assert on
//! the exact sequence the relay issued.

use crate::activity::{ActivitySet, Watermark};
use crate::client::BotClient;
use crate::error::ConnectorError;
use crate::token::Token;
use async_trait::async_trait;
use botbridge_core::ConversationId;
use rootcause::prelude::Report;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call observed by [`ScriptedBotClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    AcquireToken,
    StartConversation {
        token: String,
    },
    PostMessage {
        conversation_id: ConversationId,
        token: String,
        text: String,
    },
    FetchActivities {
        conversation_id: ConversationId,
        watermark: Option<Watermark>,
    },
}

#[derive(Debug, Default)]
struct Script {
    token_failures: VecDeque<ConnectorError>,
    post_failures: VecDeque<ConnectorError>,
    polls: VecDeque<Result<ActivitySet, ConnectorError>>,
    tokens_issued: usize,
    conversations_started: usize,
    calls: Vec<RecordedCall>,
}

/// An in-memory bot connector driven by a script.
#[derive(Debug, Default)]
pub struct ScriptedBotClient {
    script: Mutex<Script>,
}

impl ScriptedBotClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a page for the next unanswered poll.
    pub fn push_poll(&self, set: ActivitySet) {
        self.script().polls.push_back(Ok(set));
    }

    /// Queues a failure for the next unanswered poll.
    pub fn push_poll_error(&self, error: ConnectorError) {
        self.script().polls.push_back(Err(error));
    }

    /// Makes the next token acquisition fail.
    pub fn fail_next_token(&self, error: ConnectorError) {
        self.script().token_failures.push_back(error);
    }

    /// Makes the next message post fail.
    pub fn fail_next_post(&self, error: ConnectorError) {
        self.script().post_failures.push_back(error);
    }

    /// Returns every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script().calls.clone()
    }

    /// Number of conversations opened.
    #[must_use]
    pub fn conversations_started(&self) -> usize {
        self.script().conversations_started
    }

    /// Watermarks passed to each poll, in order.
    #[must_use]
    pub fn polled_watermarks(&self) -> Vec<Option<Watermark>> {
        self.script()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::FetchActivities { watermark, .. } => Some(watermark.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts posted to the connector, in order.
    #[must_use]
    pub fn posted_texts(&self) -> Vec<String> {
        self.script()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::PostMessage { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl BotClient for ScriptedBotClient {
    async fn acquire_token(&self) -> Result<Token, Report<ConnectorError>> {
        let mut script = self.script();
        script.calls.push(RecordedCall::AcquireToken);
        if let Some(error) = script.token_failures.pop_front() {
            return Err(error.into());
        }
        script.tokens_issued += 1;
        Ok(Token::new(format!("token-{}", script.tokens_issued)))
    }

    async fn start_conversation(
        &self,
        token: &Token,
    ) -> Result<ConversationId, Report<ConnectorError>> {
        let mut script = self.script();
        script.calls.push(RecordedCall::StartConversation {
            token: token.expose().to_string(),
        });
        script.conversations_started += 1;
        Ok(ConversationId::new(format!(
            "conv-{}",
            script.conversations_started
        )))
    }

    async fn post_message(
        &self,
        conversation_id: &ConversationId,
        token: &Token,
        text: &str,
    ) -> Result<(), Report<ConnectorError>> {
        let mut script = self.script();
        script.calls.push(RecordedCall::PostMessage {
            conversation_id: conversation_id.clone(),
            token: token.expose().to_string(),
            text: text.to_string(),
        });
        match script.post_failures.pop_front() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    async fn fetch_activities(
        &self,
        conversation_id: &ConversationId,
        _token: &Token,
        watermark: Option<&Watermark>,
    ) -> Result<ActivitySet, Report<ConnectorError>> {
        let mut script = self.script();
        script.calls.push(RecordedCall::FetchActivities {
            conversation_id: conversation_id.clone(),
            watermark: watermark.cloned(),
        });
        match script.polls.pop_front() {
            Some(Ok(set)) => Ok(set),
            Some(Err(error)) => Err(error.into()),
            None => Ok(ActivitySet::default()),
        }
    }
}
