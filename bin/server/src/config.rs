//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the relay,
//! loaded via the `config` crate from environment variables. Nested
//! settings use `__` as separator, e.g. `POLL__MAX_ATTEMPTS`.
//!
//! See [`DirectLineConfig`] for connector settings and [`PollConfig`] for
//! reply polling.

use crate::error::ConfigError;
use botbridge_connector::{DirectLineConfig, TokenSource};
use botbridge_conversation::PollConfig;
use rootcause::prelude::Report;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Bot identifier passed to the token endpoint.
    #[serde(default)]
    pub bot_id: String,

    /// Tenant the bot lives in.
    #[serde(default)]
    pub bot_tenant_id: String,

    /// URL of the token endpoint.
    #[serde(default)]
    pub bot_token_endpoint: String,

    /// Display name the bot's replies are authored under.
    #[serde(default)]
    pub bot_name: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Direct Line connection settings.
    #[serde(default)]
    pub direct_line: DirectLineConfig,

    /// Reply polling settings.
    #[serde(default)]
    pub poll: PollConfig,

    /// End-conversation trigger settings.
    #[serde(default)]
    pub end_conversation: EndConversationConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

/// Phrase that lets a sender drop their conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct EndConversationConfig {
    /// Whether the phrase is honoured. Off by default, so sessions live for
    /// the lifetime of the process.
    #[serde(default)]
    pub enabled: bool,

    /// The phrase itself, matched case-insensitively after trimming.
    #[serde(default = "default_end_conversation_message")]
    pub message: String,
}

fn default_end_conversation_message() -> String {
    "quit".to_string()
}

impl Default for EndConversationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            message: default_end_conversation_message(),
        }
    }
}

impl EndConversationConfig {
    /// Returns true if `body` should end the sender's conversation.
    #[must_use]
    pub fn matches(&self, body: &str) -> bool {
        self.enabled && body.trim().eq_ignore_ascii_case(self.message.trim())
    }
}

impl ServerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is malformed or a required bot
    /// setting is missing or empty.
    pub fn from_env() -> Result<Self, Report<ConfigError>> {
        Self::from_environment(config::Environment::default())
    }

    /// Loads configuration from an explicit environment source.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is malformed or a required bot
    /// setting is missing or empty.
    pub fn from_environment(environment: config::Environment) -> Result<Self, Report<ConfigError>> {
        let config: Self = config::Config::builder()
            .add_source(environment.separator("__"))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ConfigError::Load {
                reason: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that every required bot setting is present.
    ///
    /// # Errors
    ///
    /// Returns `MissingSetting` naming the first empty setting.
    pub fn validate(&self) -> Result<(), Report<ConfigError>> {
        let required = [
            ("BOT_ID", &self.bot_id),
            ("BOT_TENANT_ID", &self.bot_tenant_id),
            ("BOT_TOKEN_ENDPOINT", &self.bot_token_endpoint),
            ("BOT_NAME", &self.bot_name),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingSetting { name }.into());
            }
        }
        Ok(())
    }

    /// The token endpoint and bot identity.
    #[must_use]
    pub fn token_source(&self) -> TokenSource {
        TokenSource::new(
            self.bot_token_endpoint.clone(),
            self.bot_id.clone(),
            self.bot_tenant_id.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        config::Environment::default().source(Some(source))
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("BOT_ID", "bot-1"),
        ("BOT_TENANT_ID", "tenant-1"),
        ("BOT_TOKEN_ENDPOINT", "https://tokens.example.com/token"),
        ("BOT_NAME", "Bot"),
    ];

    #[test]
    fn loads_required_settings_with_defaults() {
        let config = ServerConfig::from_environment(environment(&REQUIRED)).expect("config");

        assert_eq!(config.bot_id, "bot-1");
        assert_eq!(config.bot_name, "Bot");
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.poll.interval_ms, 1000);
        assert_eq!(config.poll.max_attempts, 30);
        assert!(!config.end_conversation.enabled);
        assert_eq!(config.end_conversation.message, "quit");
        assert_eq!(
            config.direct_line.base_url,
            "https://directline.botframework.com/v3/directline"
        );
    }

    #[test]
    fn nested_settings_use_double_underscore() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("POLL__MAX_ATTEMPTS", "5"));
        vars.push(("END_CONVERSATION__ENABLED", "true"));
        vars.push(("DIRECT_LINE__BASE_URL", "http://localhost:9000/v3/directline"));

        let config = ServerConfig::from_environment(environment(&vars)).expect("config");

        assert_eq!(config.poll.max_attempts, 5);
        assert!(config.end_conversation.enabled);
        assert_eq!(config.direct_line.base_url, "http://localhost:9000/v3/directline");
    }

    #[test]
    fn numeric_looking_settings_stay_verbatim() {
        let mut vars = REQUIRED.to_vec();
        vars[0] = ("BOT_ID", "0123");
        vars[3] = ("BOT_NAME", "007");

        let config = ServerConfig::from_environment(environment(&vars)).expect("config");

        assert_eq!(config.bot_id, "0123");
        assert_eq!(config.bot_name, "007");
    }

    #[test]
    fn missing_bot_name_is_rejected() {
        let vars: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "BOT_NAME")
            .collect();

        let err = ServerConfig::from_environment(environment(&vars)).expect_err("should fail");
        assert_eq!(
            err.current_context(),
            &ConfigError::MissingSetting { name: "BOT_NAME" }
        );
    }

    #[test]
    fn blank_setting_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars[0] = ("BOT_ID", "   ");

        let err = ServerConfig::from_environment(environment(&vars)).expect_err("should fail");
        assert_eq!(
            err.current_context(),
            &ConfigError::MissingSetting { name: "BOT_ID" }
        );
    }

    #[test]
    fn end_conversation_phrase_matching() {
        let trigger = EndConversationConfig {
            enabled: true,
            message: "quit".to_string(),
        };
        assert!(trigger.matches("quit"));
        assert!(trigger.matches("  QUIT "));
        assert!(!trigger.matches("quit now"));

        let disabled = EndConversationConfig::default();
        assert!(!disabled.matches("quit"));
    }
}
