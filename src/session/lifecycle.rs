//! Session lifecycle state machine.
//!
//! ```text
//! Unregistered --register--> Registered --EpisodeStart--> Active
//!                            ^   |  ^                      |  |
//!                            |   |  +----EpisodeFinish-----+  |
//!                            |   +--Unregister(retry)--+      |
//!                            +-------------------------+      |
//!                                                             |
//! Registered | Active --close / Unregister(no retry)--> Closed
//! ```

use std::fmt;

use crate::platform::EventKind;

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unregistered,
    Registered,
    /// Inside an episode.
    Active,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::Active => "active",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Tracks [`SessionState`] as registrations, events and closes happen.
///
/// `Closed` is terminal: nothing moves a closed session anywhere else.
#[derive(Debug)]
pub struct SessionLifecycle {
    state: SessionState,
}

impl SessionLifecycle {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SessionState::Unregistered,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session can still exchange messages with the platform.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Registered | SessionState::Active)
    }

    /// A registration (initial or reconnect) succeeded.
    pub fn on_registered(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Registered;
        }
    }

    /// Apply an event received from the platform.
    ///
    /// Unregister does not move the state; the adapter follows it with either
    /// a re-registration or a close.
    pub fn on_event(&mut self, kind: &EventKind) {
        self.state = match (self.state, kind) {
            (SessionState::Registered | SessionState::Active, EventKind::EpisodeStart { .. }) => {
                SessionState::Active
            }
            (SessionState::Active, EventKind::EpisodeFinish { .. }) => SessionState::Registered,
            (state, _) => state,
        };
    }

    pub fn on_closed(&mut self) {
        self.state = SessionState::Closed;
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
