//! Connector tokens and where they come from.
//!
//! Tokens are bearer credentials. They are never written to logs: the
//! `Debug` impl is redacted and the raw value is only reachable through
//! [`Token::expose`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A bearer token for the connector service.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wraps a raw token value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// The token endpoint and the bot it issues tokens for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSource {
    /// URL of the token endpoint.
    endpoint: String,
    /// Bot identifier, sent as the `botId` query parameter.
    bot_id: String,
    /// Tenant identifier, sent as the `tenantId` query parameter.
    tenant_id: String,
}

impl TokenSource {
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        bot_id: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bot_id: bot_id.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Returns the token endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Query parameters identifying the bot to the token endpoint.
    #[must_use]
    pub fn query(&self) -> [(&'static str, &str); 2] {
        [
            ("botId", self.bot_id.as_str()),
            ("tenantId", self.tenant_id.as_str()),
        ]
    }
}

/// Body returned by the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub(crate) token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = Token::new("secret-value");
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret-value"));
        assert_eq!(token.expose(), "secret-value");
    }

    #[test]
    fn token_source_query_parameters() {
        let source = TokenSource::new("https://tokens.example.com/token", "bot-1", "tenant-1");
        assert_eq!(
            source.query(),
            [("botId", "bot-1"), ("tenantId", "tenant-1")]
        );
    }

    #[test]
    fn token_response_tolerates_missing_token() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"expires_in": 3600}"#).expect("deserialize");
        assert!(response.token.is_none());
    }
}
