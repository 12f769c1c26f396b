//! The event descriptor handed to the simulation loop.
//!
//! Platform-only events (registration acknowledgements, unregister) never
//! reach the simulation; they are handled inside the adapter.

use serde::Serialize;
use serde_json::Value;

/// What the simulation should do next, as decided by the platform.
///
/// Returned by [`SessionAdapter::next_event`](super::SessionAdapter::next_event).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    /// Nothing to do; call again, optionally after `callback_time` seconds.
    Idle { callback_time: Option<f64> },
    /// Reset the simulation with this episode configuration.
    EpisodeStart { config: Value },
    /// Apply this action and advance one step.
    EpisodeStep { action: Value },
    /// The current episode is over.
    EpisodeFinish { reason: Option<String> },
}

impl SimEvent {
    /// Short kind label: `idle`, `start`, `act` or `finish`.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Idle { .. } => "idle",
            Self::EpisodeStart { .. } => "start",
            Self::EpisodeStep { .. } => "act",
            Self::EpisodeFinish { .. } => "finish",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn kind_labels() {
        assert_eq!(SimEvent::Idle { callback_time: None }.kind(), "idle");
        assert_eq!(SimEvent::EpisodeStart { config: json!({}) }.kind(), "start");
        assert_eq!(SimEvent::EpisodeStep { action: json!({}) }.kind(), "act");
        assert_eq!(SimEvent::EpisodeFinish { reason: None }.kind(), "finish");
    }

    #[test]
    fn serialises_with_kind_tag() {
        let event = SimEvent::EpisodeStep {
            action: json!({"command": 1.0}),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"kind": "episode_step", "action": {"command": 1.0}}));
    }
}
