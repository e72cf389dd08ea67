//! Activity types exchanged with the connector service.
//!
//! Field names follow the connector's camelCase JSON. Only the fields the
//! relay reads or writes are modelled; everything else is ignored on input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the synthetic user every relayed message is posted as.
pub const RELAY_USER_ID: &str = "userId";

/// Display name of the synthetic relay user.
pub const RELAY_USER_NAME: &str = "userName";

/// Locale attached to relayed messages.
pub const RELAY_LOCALE: &str = "en-US";

/// Text format attached to relayed messages.
pub const RELAY_TEXT_FORMAT: &str = "plain";

/// The kind of an activity.
///
/// Only messages matter to the relay; every other type is kept verbatim so it
/// can be logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    /// A chat message.
    Message,
    /// Typing indicators, events, conversation updates and the like.
    Other(String),
}

impl From<String> for ActivityType {
    fn from(value: String) -> Self {
        if value == "message" {
            Self::Message
        } else {
            Self::Other(value)
        }
    }
}

impl From<ActivityType> for String {
    fn from(value: ActivityType) -> Self {
        match value {
            ActivityType::Message => "message".to_string(),
            ActivityType::Other(other) => other,
        }
    }
}

/// The author of an activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A button offered alongside a bot message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAction {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl CardAction {
    /// Creates an action with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Quick replies attached to an activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedActions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<CardAction>>,
}

/// A single event within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub from: ChannelAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<SuggestedActions>,
}

impl Activity {
    /// Creates a message activity authored by `from_name`.
    #[must_use]
    pub fn message(from_name: impl Into<String>, text: impl Into<String>) -> Self {
        let from_name = from_name.into();
        Self {
            activity_type: ActivityType::Message,
            id: None,
            from: ChannelAccount {
                id: from_name.clone(),
                name: Some(from_name),
            },
            text: Some(text.into()),
            text_format: None,
            locale: None,
            suggested_actions: None,
        }
    }

    /// Creates the outbound message the relay posts on behalf of a sender.
    #[must_use]
    pub fn relay_message(text: impl Into<String>) -> Self {
        Self {
            activity_type: ActivityType::Message,
            id: None,
            from: ChannelAccount {
                id: RELAY_USER_ID.to_string(),
                name: Some(RELAY_USER_NAME.to_string()),
            },
            text: Some(text.into()),
            text_format: Some(RELAY_TEXT_FORMAT.to_string()),
            locale: Some(RELAY_LOCALE.to_string()),
            suggested_actions: None,
        }
    }

    /// Attaches suggested actions with the given titles.
    #[must_use]
    pub fn with_suggested_actions<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggested_actions = Some(SuggestedActions {
            actions: Some(titles.into_iter().map(CardAction::titled).collect()),
        });
        self
    }

    /// Returns true if this activity is a chat message.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.activity_type == ActivityType::Message
    }

    /// Returns true if the author's display name is exactly `name`.
    #[must_use]
    pub fn is_from(&self, name: &str) -> bool {
        self.from.name.as_deref() == Some(name)
    }

    /// Returns the suggested action list, if the activity carries one.
    #[must_use]
    pub fn suggested_action_list(&self) -> Option<&[CardAction]> {
        self.suggested_actions
            .as_ref()
            .and_then(|suggested| suggested.actions.as_deref())
    }
}

/// Cursor marking the last-seen position in a conversation's activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(String);

impl Watermark {
    /// Wraps a watermark returned by the connector.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw watermark, as sent back in the `watermark` query parameter.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of the activity feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySet {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<Watermark>,
}

impl ActivitySet {
    /// Creates a page of activities ending at `watermark`.
    #[must_use]
    pub fn new(activities: Vec<Activity>, watermark: impl Into<String>) -> Self {
        Self {
            activities,
            watermark: Some(Watermark::new(watermark)),
        }
    }
}
