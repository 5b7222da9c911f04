//! Topic subscription registry.
//!
//! Tracks the client's desired subscription set independently of any live
//! transport. The registry is the source of truth after a reconnect: the
//! broker forgets server-side subscription state when the transport drops,
//! so the client replays this set, in creation order, before the
//! connection is reported usable again.

use roost_proto::{ConversationId, TopicKey};

/// Opaque handle identifying one registry entry.
///
/// Handles are unique for the lifetime of the registry and are never
/// reused, so a stale unsubscribe cannot remove a newer entry for the
/// same topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

#[derive(Debug, Clone)]
struct Entry {
    handle: SubscriptionHandle,
    key: TopicKey,
}

/// Insertion-ordered set of desired subscriptions.
///
/// Duplicate subscribes to the same topic are idempotent: the existing
/// handle is returned and the replay set is unchanged.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<Entry>,
    next_id: u64,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a desired subscription.
    ///
    /// Returns the entry's handle and whether a new entry was created.
    /// Subscribing to an already-registered topic returns the existing
    /// handle with `created == false`.
    pub fn subscribe(&mut self, key: TopicKey) -> (SubscriptionHandle, bool) {
        if let Some(entry) = self.entries.iter().find(|e| e.key == key) {
            return (entry.handle, false);
        }

        let handle = SubscriptionHandle(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { handle, key });
        (handle, true)
    }

    /// Remove a subscription by handle.
    ///
    /// Returns the removed topic, or `None` if the handle is unknown or
    /// already removed. Repeated unsubscribes are no-ops.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> Option<TopicKey> {
        let index = self.entries.iter().position(|e| e.handle == handle)?;
        Some(self.entries.remove(index).key)
    }

    /// Remove every subscription scoped to `conversation_id`.
    ///
    /// Returns the removed entries in creation order.
    pub fn remove_conversation(
        &mut self,
        conversation_id: ConversationId,
    ) -> Vec<(SubscriptionHandle, TopicKey)> {
        let mut removed = Vec::new();
        self.entries.retain(|e| {
            if e.key.conversation_id() == Some(conversation_id) {
                removed.push((e.handle, e.key));
                false
            } else {
                true
            }
        });
        removed
    }

    /// The full desired set, in creation order, for replay after a
    /// reconnect.
    #[must_use]
    pub fn replay(&self) -> Vec<(SubscriptionHandle, TopicKey)> {
        self.entries.iter().map(|e| (e.handle, e.key)).collect()
    }

    /// Whether `key` is currently registered.
    #[must_use]
    pub fn contains(&self, key: &TopicKey) -> bool {
        self.entries.iter().any(|e| e.key == *key)
    }

    /// Handle for `key`, if registered.
    #[must_use]
    pub fn handle_for(&self, key: &TopicKey) -> Option<SubscriptionHandle> {
        self.entries.iter().find(|e| e.key == *key).map(|e| e.handle)
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no subscriptions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Handles already issued stay invalid forever.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
