//! Error type shared by the session adapter and the platform clients.

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T, E = ConnectorError> = std::result::Result<T, E>;

/// Everything that can go wrong while talking to the platform.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Initial or reconnect registration failed. Never retried.
    #[error("registration failed: {0}")]
    Registration(String),

    /// The platform unregistered the simulator and reconnecting is disabled.
    ///
    /// Callers should treat this as a normal shutdown signal.
    #[error("session terminated by platform: {reason}: {details}")]
    SessionTerminated { reason: String, details: String },

    /// `next_event` was called on an adapter whose session is already gone.
    #[error("session is closed")]
    SessionClosed,

    #[error("unknown event type: {0}")]
    UnknownEvent(String),

    #[error("invalid state at {path}: {kind} values are not supported")]
    InvalidState { path: String, kind: &'static str },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("platform returned {status}: {body}")]
    Platform { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConnectorError {
    /// Whether this error marks the orderly end of a session rather than a failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SessionTerminated { .. })
    }
}
