//! Direct Line implementation of [`BotClient`].
//!
//! Endpoints used, relative to the configured base URL:
//!
//! - `POST /conversations` opens a conversation
//! - `POST /conversations/{id}/activities` posts a message
//! - `GET /conversations/{id}/activities?watermark=..` polls the feed
//!
//! Tokens come from a separate token endpoint, see [`TokenSource`].

use crate::activity::{Activity, ActivitySet, Watermark};
use crate::client::BotClient;
use crate::error::ConnectorError;
use crate::token::{Token, TokenResponse, TokenSource};
use async_trait::async_trait;
use botbridge_core::ConversationId;
use reqwest::{StatusCode, Url};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Connection settings for the Direct Line service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectLineConfig {
    /// Base URL of the Direct Line API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://directline.botframework.com/v3/directline".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

impl Default for DirectLineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl DirectLineConfig {
    /// Creates a configuration pointing at `base_url` with default timeouts.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Body of the conversation-start response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationResponse {
    conversation_id: String,
}

/// Direct Line client backed by reqwest.
#[derive(Debug, Clone)]
pub struct DirectLineClient {
    http: reqwest::Client,
    base_url: Url,
    token_source: TokenSource,
}

impl DirectLineClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path or the HTTP
    /// client cannot be constructed.
    pub fn new(
        config: &DirectLineConfig,
        token_source: TokenSource,
    ) -> Result<Self, Report<ConnectorError>> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ConnectorError::ConnectionFailed {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        let base_url =
            Url::parse(&config.base_url).map_err(|e| ConnectorError::ConnectionFailed {
                reason: format!("invalid base URL {}: {e}", config.base_url),
            })?;
        if base_url.cannot_be_a_base() {
            return Err(ConnectorError::ConnectionFailed {
                reason: format!("base URL {base_url} cannot carry a path"),
            }
            .into());
        }

        Ok(Self {
            http,
            base_url,
            token_source,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Report<ConnectorError>> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ConnectorError::ConnectionFailed {
                reason: format!("base URL {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn conversations_url(&self) -> Result<Url, Report<ConnectorError>> {
        self.endpoint(&["conversations"])
    }

    fn activities_url(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Url, Report<ConnectorError>> {
        self.endpoint(&["conversations", conversation_id.as_str(), "activities"])
    }
}

/// Maps a reqwest transport error onto the connector taxonomy.
fn transport_error(e: &reqwest::Error) -> ConnectorError {
    if e.is_timeout() {
        ConnectorError::Timeout
    } else {
        ConnectorError::ConnectionFailed {
            reason: e.to_string(),
        }
    }
}

/// Returns true if `status` means the conversation's token is no longer accepted.
fn is_session_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    )
}

/// Reads the body of a failed response for diagnostics.
async fn error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

#[async_trait]
impl BotClient for DirectLineClient {
    #[instrument(skip(self), fields(endpoint = %self.token_source.endpoint()))]
    async fn acquire_token(&self) -> Result<Token, Report<ConnectorError>> {
        let response = self
            .http
            .get(self.token_source.endpoint())
            .query(&self.token_source.query())
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to reach token endpoint");
                ConnectorError::AuthenticationFailed {
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            warn!(status = %status, body = %body, "token endpoint returned error");
            return Err(ConnectorError::AuthenticationFailed {
                reason: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        let body: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| ConnectorError::AuthenticationFailed {
                    reason: format!("unreadable token response: {e}"),
                })?;

        match body.token {
            Some(token) if !token.is_empty() => {
                debug!("acquired connector token");
                Ok(Token::new(token))
            }
            _ => Err(ConnectorError::AuthenticationFailed {
                reason: "token endpoint returned no token".to_string(),
            }
            .into()),
        }
    }

    #[instrument(skip_all)]
    async fn start_conversation(
        &self,
        token: &Token,
    ) -> Result<ConversationId, Report<ConnectorError>> {
        let response = self
            .http
            .post(self.conversations_url()?)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ConnectorError::AuthenticationFailed {
                reason: format!("token rejected when starting conversation: HTTP {status}"),
            }
            .into());
        }
        if !status.is_success() {
            let body = error_body(response).await;
            warn!(status = %status, body = %body, "conversation start returned error");
            return Err(ConnectorError::ConnectionFailed {
                reason: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        let body: ConversationResponse =
            response
                .json()
                .await
                .map_err(|e| ConnectorError::ProtocolError {
                    reason: format!("unreadable conversation response: {e}"),
                })?;

        let conversation_id = ConversationId::new(body.conversation_id);
        debug!(conversation_id = %conversation_id, "conversation started");
        Ok(conversation_id)
    }

    #[instrument(skip_all, fields(conversation_id = %conversation_id))]
    async fn post_message(
        &self,
        conversation_id: &ConversationId,
        token: &Token,
        text: &str,
    ) -> Result<(), Report<ConnectorError>> {
        let response = self
            .http
            .post(self.activities_url(conversation_id)?)
            .bearer_auth(token.expose())
            .json(&Activity::relay_message(text))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if is_session_rejection(status) {
            return Err(ConnectorError::SessionExpired {
                conversation_id: conversation_id.clone(),
            }
            .into());
        }
        if !status.is_success() {
            let body = error_body(response).await;
            warn!(status = %status, body = %body, "posting message returned error");
            return Err(ConnectorError::ConnectionFailed {
                reason: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        debug!("message posted");
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(conversation_id = %conversation_id, watermark = ?watermark.map(Watermark::as_str))
    )]
    async fn fetch_activities(
        &self,
        conversation_id: &ConversationId,
        token: &Token,
        watermark: Option<&Watermark>,
    ) -> Result<ActivitySet, Report<ConnectorError>> {
        let mut request = self
            .http
            .get(self.activities_url(conversation_id)?)
            .bearer_auth(token.expose());
        if let Some(watermark) = watermark {
            request = request.query(&[("watermark", watermark.as_str())]);
        }

        let response = request.send().await.map_err(|e| transport_error(&e))?;

        let status = response.status();
        if is_session_rejection(status) {
            return Err(ConnectorError::SessionExpired {
                conversation_id: conversation_id.clone(),
            }
            .into());
        }
        if !status.is_success() {
            let body = error_body(response).await;
            warn!(status = %status, body = %body, "activity poll returned error");
            return Err(ConnectorError::ConnectionFailed {
                reason: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        let body = response.text().await.map_err(|e| transport_error(&e))?;
        // An empty or null page is how the service reports a dead conversation.
        if body.trim().is_empty() || body.trim() == "null" {
            return Err(ConnectorError::SessionExpired {
                conversation_id: conversation_id.clone(),
            }
            .into());
        }

        let set: ActivitySet =
            serde_json::from_str(&body).map_err(|e| ConnectorError::ProtocolError {
                reason: format!("unreadable activity set: {e}"),
            })?;

        debug!(
            activities = set.activities.len(),
            watermark = ?set.watermark.as_ref().map(Watermark::as_str),
            "polled activity feed"
        );
        Ok(set)
    }
}
