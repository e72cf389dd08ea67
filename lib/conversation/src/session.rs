//! Sender sessions and the store that owns them.
//!
//! Every sender gets a slot guarded by an async mutex. A request holds its
//! sender's slot for as long as it talks to the connector, so two messages
//! from the same sender never race to open two conversations, and the
//! session's watermark is only ever advanced by one poller at a time. The
//! session stays in its slot while it is being worked on.
//! Requests from different senders never contend beyond the brief map lookup.

use crate::error::SessionError;
use botbridge_connector::{Token, Watermark};
use botbridge_core::{ConversationId, Result, SenderId, SessionId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// An active conversation on behalf of one sender.
#[derive(Debug, Clone)]
pub struct Session {
    /// Local identifier, used for logging.
    pub id: SessionId,
    /// The sender this session belongs to.
    pub sender: SenderId,
    /// Token the conversation was opened with.
    pub token: Token,
    /// Connector conversation id.
    pub conversation_id: ConversationId,
    /// Last watermark returned by the activity feed.
    pub watermark: Option<Watermark>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When a message was last relayed.
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session for a freshly opened conversation.
    #[must_use]
    pub fn new(sender: SenderId, token: Token, conversation_id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            sender,
            token,
            conversation_id,
            watermark: None,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Moves the watermark forward.
    ///
    /// A page without a watermark leaves the current one in place.
    pub fn advance_watermark(&mut self, watermark: Option<Watermark>) {
        if let Some(watermark) = watermark {
            self.watermark = Some(watermark);
        }
    }

    /// Records activity on the session.
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}

type Slot = Arc<Mutex<Option<Session>>>;

/// Exclusive access to one sender's slot.
///
/// Dropping the guard releases the sender.
pub struct SessionGuard {
    sender: SenderId,
    slot: OwnedMutexGuard<Option<Session>>,
}

impl SessionGuard {
    /// The sender's session, if one is live.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.slot.as_ref()
    }

    /// Mutable access to the sender's session, if one is live.
    ///
    /// Changes land in the store directly, so they survive even if the
    /// caller is cancelled halfway through.
    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.slot.as_mut()
    }

    /// Stores a new session for the sender.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the sender already has a session; the
    /// existing session is left untouched.
    pub fn insert(&mut self, session: Session) -> Result<&mut Session, SessionError> {
        if self.slot.is_some() {
            return Err(SessionError::AlreadyExists {
                sender: self.sender.clone(),
            }
            .into());
        }
        Ok(self.slot.insert(session))
    }

    /// Removes and returns the sender's session.
    pub fn take(&mut self) -> Option<Session> {
        self.slot.take()
    }

    /// Stores `session` for the sender, replacing any existing one.
    pub fn replace(&mut self, session: Session) -> &mut Session {
        self.slot.insert(session)
    }
}

/// Process-wide mapping from sender to session.
#[derive(Debug, Default)]
pub struct ConversationStore {
    slots: RwLock<HashMap<SenderId, Slot>>,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn existing_slot(&self, sender: &SenderId) -> Option<Slot> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sender)
            .cloned()
    }

    fn slot(&self, sender: &SenderId) -> Slot {
        if let Some(slot) = self.existing_slot(sender) {
            return slot;
        }
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(sender.clone())
            .or_default()
            .clone()
    }

    /// Locks the sender's slot, waiting for any in-flight request from the
    /// same sender to finish.
    pub async fn lock(&self, sender: &SenderId) -> SessionGuard {
        let slot = self.slot(sender).lock_owned().await;
        SessionGuard {
            sender: sender.clone(),
            slot,
        }
    }

    /// Returns a copy of the sender's session, if any.
    pub async fn get(&self, sender: &SenderId) -> Option<Session> {
        let slot = self.existing_slot(sender)?;
        let session = slot.lock().await.clone();
        session
    }

    /// Stores a session for a sender that has none.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the sender already has a session.
    pub async fn put(&self, sender: &SenderId, session: Session) -> Result<(), SessionError> {
        self.lock(sender).await.insert(session)?;
        Ok(())
    }

    /// Drops the sender's session, returning it.
    pub async fn remove(&self, sender: &SenderId) -> Option<Session> {
        let slot = self.existing_slot(sender)?;
        let session = slot.lock().await.take();
        session
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let slots: Vec<Slot> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut live = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                live += 1;
            }
        }
        live
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session_for(sender: &str, conversation: &str) -> Session {
        Session::new(
            SenderId::from(sender),
            Token::new("token"),
            ConversationId::from(conversation),
        )
    }

    #[tokio::test]
    async fn get_unknown_sender_is_none() {
        let store = ConversationStore::new();
        assert!(store.get(&SenderId::from("+1")).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = ConversationStore::new();
        let sender = SenderId::from("+15551234567");
        store
            .put(&sender, session_for("+15551234567", "conv-1"))
            .await
            .expect("stored");

        let session = store.get(&sender).await.expect("session");
        assert_eq!(session.conversation_id.as_str(), "conv-1");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn put_keeps_existing_session() {
        let store = ConversationStore::new();
        let sender = SenderId::from("+1");
        store
            .put(&sender, session_for("+1", "conv-1"))
            .await
            .expect("stored");

        let err = store
            .put(&sender, session_for("+1", "conv-2"))
            .await
            .expect_err("duplicate");
        assert_eq!(
            err.current_context(),
            &SessionError::AlreadyExists {
                sender: sender.clone()
            }
        );
        let session = store.get(&sender).await.expect("session");
        assert_eq!(session.conversation_id.as_str(), "conv-1");
    }

    #[tokio::test]
    async fn remove_clears_session() {
        let store = ConversationStore::new();
        let sender = SenderId::from("+1");
        store
            .put(&sender, session_for("+1", "conv-1"))
            .await
            .expect("stored");

        let removed = store.remove(&sender).await.expect("removed");
        assert_eq!(removed.conversation_id.as_str(), "conv-1");
        assert!(store.get(&sender).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn lock_serializes_same_sender() {
        let store = Arc::new(ConversationStore::new());
        let sender = SenderId::from("+1");

        let mut first = store.lock(&sender).await;

        let waiter = {
            let store = Arc::clone(&store);
            let sender = sender.clone();
            tokio::spawn(async move {
                let guard = store.lock(&sender).await;
                guard.session().map(|s| s.conversation_id.clone())
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        first.insert(session_for("+1", "conv-1")).expect("inserted");
        drop(first);

        let seen = waiter.await.expect("join");
        assert_eq!(seen, Some(ConversationId::from("conv-1")));
    }

    #[tokio::test]
    async fn different_senders_do_not_block() {
        let store = ConversationStore::new();
        let _a = store.lock(&SenderId::from("+1")).await;
        let other = SenderId::from("+2");
        let b = tokio::time::timeout(Duration::from_secs(1), store.lock(&other)).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn edits_through_guard_stay_in_store() {
        let store = ConversationStore::new();
        let sender = SenderId::from("+1");

        {
            let mut guard = store.lock(&sender).await;
            guard.replace(session_for("+1", "conv-1"));
            if let Some(session) = guard.session_mut() {
                session.advance_watermark(Some(Watermark::new("4")));
            }
        }

        let session = store.get(&sender).await.expect("session");
        assert_eq!(session.watermark, Some(Watermark::new("4")));

        store.lock(&sender).await.replace(session_for("+1", "conv-2"));
        let session = store.get(&sender).await.expect("session");
        assert_eq!(session.conversation_id.as_str(), "conv-2");
        assert_eq!(session.watermark, None);
    }

    #[test]
    fn watermark_only_moves_forward() {
        let mut session = session_for("+1", "conv-1");
        session.advance_watermark(Some(Watermark::new("3")));
        session.advance_watermark(None);
        assert_eq!(session.watermark, Some(Watermark::new("3")));

        session.advance_watermark(Some(Watermark::new("4")));
        assert_eq!(session.watermark, Some(Watermark::new("4")));
    }
}
