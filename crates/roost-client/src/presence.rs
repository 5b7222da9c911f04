//! Presence and typing state derived from topic deliveries.
//!
//! Both structures are pure derived state: the session feeds them decoded
//! presence and typing payloads, and the application queries them. They
//! never publish anything themselves.

use std::{collections::HashSet, time::Duration};

use roost_core::ExpiryMap;
use roost_proto::{
    UserId,
    payloads::{PresenceAction, PresenceUpdate},
};

/// Inbound typing indicators expire this long after the last signal, so a
/// peer that stops typing without sending a stop signal (crash, tab close)
/// does not stay "typing" forever.
pub const TYPING_EXPIRY: Duration = Duration::from_secs(3);

/// Set of participants currently present in a conversation.
#[derive(Debug, Clone, Default)]
pub struct PresenceRoster {
    online: HashSet<UserId>,
}

impl PresenceRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a presence update. Returns `true` if the set changed, so the
    /// caller can suppress duplicate change events.
    pub fn apply(&mut self, update: &PresenceUpdate) -> bool {
        match update.action {
            PresenceAction::Join => self.online.insert(update.user_id),
            PresenceAction::Leave => self.online.remove(&update.user_id),
        }
    }

    /// Whether `user_id` is present.
    #[must_use]
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.online.contains(&user_id)
    }

    /// Number of present participants.
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.online.len()
    }

    /// Drop all presence state.
    pub fn clear(&mut self) {
        self.online.clear();
    }
}

/// Per-user inbound typing indicators with automatic expiry.
#[derive(Debug, Clone)]
pub struct TypingTracker<I> {
    deadlines: ExpiryMap<UserId, I>,
}

impl<I: Copy + Ord> Default for TypingTracker<I> {
    fn default() -> Self {
        Self { deadlines: ExpiryMap::new() }
    }
}

impl<I: Copy + Ord> TypingTracker<I> {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a typing signal for `user_id` at `now`.
    ///
    /// A `true` signal starts or refreshes the user's expiry deadline; a
    /// `false` signal clears it. Returns `true` if the user's visible
    /// typing state changed.
    pub fn signal(&mut self, user_id: UserId, is_typing: bool, now: I) -> bool
    where
        I: std::ops::Add<Duration, Output = I>,
    {
        if is_typing {
            let was_typing = self.deadlines.contains(&user_id);
            self.deadlines.insert(user_id, now + TYPING_EXPIRY);
            !was_typing
        } else {
            self.deadlines.remove(&user_id)
        }
    }

    /// Whether `user_id` is currently typing.
    #[must_use]
    pub fn is_typing(&self, user_id: UserId) -> bool {
        self.deadlines.contains(&user_id)
    }

    /// Drain users whose indicators expired by `now`.
    pub fn expire(&mut self, now: I) -> Vec<UserId> {
        self.deadlines.expire(now)
    }

    /// Clear one user's indicator without a signal (departed participant).
    /// Returns whether an indicator was active.
    pub fn clear_user(&mut self, user_id: UserId) -> bool {
        self.deadlines.remove(&user_id)
    }

    /// Drop all typing state.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
