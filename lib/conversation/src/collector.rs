//! Polling the activity feed for the bot's reply.
//!
//! The bot answers asynchronously: its reply shows up as one or more
//! activities in the conversation feed some time after the user's message
//! was posted. The collector polls the feed from the session's watermark
//! until it sees a message authored by the bot, the feed runs dry, or the
//! attempt budget is spent.

use crate::error::ReplyError;
use crate::session::Session;
use botbridge_connector::{Activity, BotClient};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Poll loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause between polls, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Polls allowed before giving up with a timeout.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    30
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Collects bot replies from a conversation's activity feed.
#[derive(Debug, Clone)]
pub struct ReplyCollector {
    bot_name: String,
    config: PollConfig,
}

impl ReplyCollector {
    /// Creates a collector that keeps messages authored by `bot_name`.
    #[must_use]
    pub fn new(bot_name: impl Into<String>, config: PollConfig) -> Self {
        Self {
            bot_name: bot_name.into(),
            config,
        }
    }

    /// Returns true if `activity` is a message authored by the bot.
    #[must_use]
    pub fn is_bot_message(&self, activity: &Activity) -> bool {
        activity.is_message() && activity.is_from(&self.bot_name)
    }

    /// Polls until the bot answers.
    ///
    /// Returns the bot's messages from the first page that holds any, or an
    /// empty list once a page comes back with no activities at all. The
    /// session's watermark is advanced after every successful poll, so each
    /// poll resumes where the previous one stopped.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` if the connector reports the conversation unusable
    /// - `PollFailed` for any other connector failure
    /// - `Timeout` once `max_attempts` polls saw activity but no bot message
    #[instrument(
        skip_all,
        fields(session_id = %session.id, conversation_id = %session.conversation_id)
    )]
    pub async fn collect<C>(
        &self,
        client: &C,
        session: &mut Session,
    ) -> Result<Vec<Activity>, Report<ReplyError>>
    where
        C: BotClient + ?Sized,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let set = match client
                .fetch_activities(
                    &session.conversation_id,
                    &session.token,
                    session.watermark.as_ref(),
                )
                .await
            {
                Ok(set) => set,
                Err(report) => {
                    let context = if report.current_context().is_session_expired() {
                        ReplyError::SessionExpired {
                            conversation_id: session.conversation_id.clone(),
                        }
                    } else {
                        ReplyError::PollFailed {
                            conversation_id: session.conversation_id.clone(),
                            attempt,
                        }
                    };
                    warn!(attempt, error = %report, "activity poll failed");
                    return Err(report.context(context));
                }
            };

            session.advance_watermark(set.watermark);

            if set.activities.is_empty() {
                debug!(attempt, "activity feed is empty, no reply");
                return Ok(Vec::new());
            }

            let seen = set.activities.len();
            let replies: Vec<Activity> = set
                .activities
                .into_iter()
                .filter(|activity| self.is_bot_message(activity))
                .collect();

            if !replies.is_empty() {
                debug!(attempt, replies = replies.len(), "bot replied");
                return Ok(replies);
            }

            if attempt >= self.config.max_attempts {
                warn!(attempt, "giving up waiting for bot reply");
                return Err(ReplyError::Timeout {
                    conversation_id: session.conversation_id.clone(),
                    attempts: attempt,
                }
                .into());
            }

            debug!(attempt, activities = seen, "no bot message yet");
            tokio::time::sleep(self.config.interval()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botbridge_connector::testing::ScriptedBotClient;
    use botbridge_connector::{ActivitySet, ConnectorError, Token, Watermark};
    use botbridge_core::{ConversationId, SenderId};

    fn session() -> Session {
        Session::new(
            SenderId::from("+15551234567"),
            Token::new("token"),
            ConversationId::from("conv-1"),
        )
    }

    fn collector() -> ReplyCollector {
        ReplyCollector::new("Bot", PollConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn skips_non_bot_pages_and_threads_watermark() {
        let client = ScriptedBotClient::new();
        client.push_poll(ActivitySet::new(
            vec![Activity::relay_message("Hi")],
            "1",
        ));
        client.push_poll(ActivitySet::new(
            vec![Activity::message("Someone", "not the bot")],
            "2",
        ));
        client.push_poll(ActivitySet::new(
            vec![Activity::message("Bot", "Hello there")],
            "3",
        ));

        let mut session = session();
        session.watermark = Some(Watermark::new("0"));
        let started = tokio::time::Instant::now();

        let replies = collector()
            .collect(&client, &mut session)
            .await
            .expect("replies");

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text.as_deref(), Some("Hello there"));
        assert_eq!(
            client.polled_watermarks(),
            vec![
                Some(Watermark::new("0")),
                Some(Watermark::new("1")),
                Some(Watermark::new("2")),
            ]
        );
        assert_eq!(session.watermark, Some(Watermark::new("3")));
        assert_eq!(started.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_page_ends_without_sleeping() {
        let client = ScriptedBotClient::new();
        client.push_poll(ActivitySet::default());

        let mut session = session();
        let started = tokio::time::Instant::now();

        let replies = collector()
            .collect(&client, &mut session)
            .await
            .expect("replies");

        assert!(replies.is_empty());
        assert_eq!(client.polled_watermarks().len(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_only_bot_messages_from_mixed_page() {
        let client = ScriptedBotClient::new();
        let mut typing = Activity::message("Bot", "");
        typing.activity_type = "typing".to_string().into();
        client.push_poll(ActivitySet::new(
            vec![
                Activity::relay_message("Hi"),
                typing,
                Activity::message("Bot", "one"),
                Activity::message("bot", "wrong case"),
                Activity::message("Bot", "two"),
            ],
            "7",
        ));

        let replies = collector()
            .collect(&client, &mut session())
            .await
            .expect("replies");

        let texts: Vec<_> = replies.iter().filter_map(|a| a.text.as_deref()).collect();
        assert_eq!(texts, ["one", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_watermark_keeps_previous() {
        let client = ScriptedBotClient::new();
        client.push_poll(ActivitySet {
            activities: vec![Activity::message("Someone", "x")],
            watermark: None,
        });
        client.push_poll(ActivitySet::new(vec![Activity::message("Bot", "y")], "9"));

        let mut session = session();
        session.watermark = Some(Watermark::new("5"));
        collector()
            .collect(&client, &mut session)
            .await
            .expect("replies");

        assert_eq!(
            client.polled_watermarks(),
            vec![Some(Watermark::new("5")), Some(Watermark::new("5"))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn session_expiry_is_reported_not_fatal() {
        let client = ScriptedBotClient::new();
        client.push_poll_error(ConnectorError::SessionExpired {
            conversation_id: ConversationId::from("conv-1"),
        });

        let err = collector()
            .collect(&client, &mut session())
            .await
            .expect_err("should fail");

        assert_eq!(
            err.current_context(),
            &ReplyError::SessionExpired {
                conversation_id: ConversationId::from("conv-1")
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_is_poll_failure() {
        let client = ScriptedBotClient::new();
        client.push_poll_error(ConnectorError::Timeout);

        let err = collector()
            .collect(&client, &mut session())
            .await
            .expect_err("should fail");

        assert!(matches!(
            err.current_context(),
            ReplyError::PollFailed { attempt: 1, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let client = ScriptedBotClient::new();
        for n in 0..5 {
            client.push_poll(ActivitySet::new(
                vec![Activity::message("Someone", "chatter")],
                n.to_string(),
            ));
        }

        let collector = ReplyCollector::new(
            "Bot",
            PollConfig {
                interval_ms: 1000,
                max_attempts: 3,
            },
        );
        let err = collector
            .collect(&client, &mut session())
            .await
            .expect_err("should time out");

        assert!(matches!(
            err.current_context(),
            ReplyError::Timeout { attempts: 3, .. }
        ));
        assert_eq!(client.polled_watermarks().len(), 3);
    }
}
