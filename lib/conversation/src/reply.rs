//! Folding bot activities into the plain-text answer sent back to the channel.

use botbridge_connector::Activity;

/// Separates an activity's text from its suggested actions.
const ACTIONS_PREFIX: &str = "\t";

/// Separates suggested action titles from each other.
const ACTION_SEPARATOR: &str = " | ";

/// Formats bot replies as one plain-text string.
///
/// Activity texts are concatenated with no separator between activities.
/// An activity carrying suggested actions gets its action titles appended
/// right after its own text, as a tab followed by the titles joined with
/// `" | "`. Empty texts contribute nothing.
#[must_use]
pub fn format_reply(activities: &[Activity]) -> String {
    let mut reply = String::new();
    for activity in activities {
        if let Some(text) = activity.text.as_deref() {
            reply.push_str(text);
        }

        if let Some(actions) = activity.suggested_action_list() {
            let titles: Vec<&str> = actions
                .iter()
                .map(|action| action.title.as_deref().unwrap_or_default())
                .collect();
            reply.push_str(ACTIONS_PREFIX);
            reply.push_str(&titles.join(ACTION_SEPARATOR));
        }
    }
    reply
}
