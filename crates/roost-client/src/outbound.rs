//! Outbound typing throttle.
//!
//! The UI raises a typing intent on every keystroke; publishing each one
//! would flood the typing topic. The throttle collapses repeated `true`
//! intents into a single start signal plus a refreshed auto-stop deadline,
//! publishes `false` immediately, and emits an automatic stop when the
//! user goes quiet without an explicit stop.

use std::time::Duration;

use roost_core::ExpiryTimer;

/// The throttle publishes an automatic stop this long after the last
/// typing intent. Matches the inbound expiry window so remote indicators
/// clear at the same moment the stop signal lands.
pub const TYPING_AUTO_STOP: Duration = Duration::from_secs(3);

/// Outbound typing signal decided by the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSend {
    /// Publish a typing-started signal.
    Start,
    /// Publish a typing-stopped signal.
    Stop,
}

/// Per-conversation outbound typing state.
#[derive(Debug, Clone)]
pub struct TypingThrottle<I> {
    active: bool,
    auto_stop: ExpiryTimer<I>,
}

impl<I: Copy + Ord> Default for TypingThrottle<I> {
    fn default() -> Self {
        Self { active: false, auto_stop: ExpiryTimer::new() }
    }
}

impl<I: Copy + Ord> TypingThrottle<I> {
    /// Create an idle throttle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a typing-started signal is outstanding.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Apply a local typing intent at `now`.
    ///
    /// Returns the signal to publish, if any. Repeated `true` intents
    /// while active only refresh the auto-stop deadline; a `false` intent
    /// always publishes a stop, active or not.
    pub fn set_typing(&mut self, is_typing: bool, now: I) -> Option<TypingSend>
    where
        I: std::ops::Add<Duration, Output = I>,
    {
        if is_typing {
            self.auto_stop.arm(now + TYPING_AUTO_STOP);
            if self.active {
                return None;
            }
            self.active = true;
            Some(TypingSend::Start)
        } else {
            self.auto_stop.cancel();
            self.active = false;
            Some(TypingSend::Stop)
        }
    }

    /// Check the auto-stop deadline at `now`.
    ///
    /// Returns [`TypingSend::Stop`] once when the user has gone quiet.
    pub fn tick(&mut self, now: I) -> Option<TypingSend> {
        if self.auto_stop.fire(now) && self.active {
            self.active = false;
            return Some(TypingSend::Stop);
        }
        None
    }

    /// Reset without publishing. Used when the session or transport goes
    /// away and a stop signal can no longer be delivered.
    pub fn reset(&mut self) {
        self.active = false;
        self.auto_stop.cancel();
    }
}
