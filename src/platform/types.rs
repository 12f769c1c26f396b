//! Wire types exchanged with the training platform.
//!
//! Field names follow the platform's camelCase JSON. Events arrive as a flat
//! object with a `type` tag and one optional body per event kind; they are
//! decoded through [`RawEvent`] into the strongly typed [`PlatformEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Description of the simulator sent at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorInterface {
    /// Simulator name shown by the platform.
    pub name: String,
    /// Seconds the platform waits for a state before dropping the session.
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Action/state/config schema metadata, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Value>,
    /// Filled in by the client from its configuration, never by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator_context: Option<String>,
}

/// Body of a successful session-creation response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub session_id: String,
}

/// Handle to a registered session, owned by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: String,
    pub registered_at: DateTime<Utc>,
}

impl SessionInfo {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            registered_at: Utc::now(),
        }
    }
}

impl From<RegistrationResponse> for SessionInfo {
    fn from(resp: RegistrationResponse) -> Self {
        Self::new(resp.session_id)
    }
}

// ---------------------------------------------------------------------------
// Advance
// ---------------------------------------------------------------------------

/// State payload sent on every advance call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorState {
    pub sequence_id: i64,
    pub state: Value,
    pub halted: bool,
}

/// An event received from the platform together with its sequence id.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformEvent {
    pub sequence_id: i64,
    pub kind: EventKind,
}

impl PlatformEvent {
    pub fn new(sequence_id: i64, kind: EventKind) -> Self {
        Self { sequence_id, kind }
    }
}

/// The kinds of event the platform can issue.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    RegisterSuccess,
    Idle { callback_time: Option<f64> },
    EpisodeStart { config: Value },
    EpisodeStep { action: Value },
    EpisodeFinish { reason: Option<String> },
    Unregister { reason: Option<String>, details: Option<String> },
    /// A `type` tag this connector does not understand.
    Unknown(String),
}

impl EventKind {
    /// The wire tag for this kind.
    pub fn type_name(&self) -> &str {
        match self {
            Self::RegisterSuccess => "RegisterSuccess",
            Self::Idle { .. } => "Idle",
            Self::EpisodeStart { .. } => "EpisodeStart",
            Self::EpisodeStep { .. } => "EpisodeStep",
            Self::EpisodeFinish { .. } => "EpisodeFinish",
            Self::Unregister { .. } => "Unregister",
            Self::Unknown(tag) => tag,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw wire form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdleBody {
    callback_time: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EpisodeStartBody {
    #[serde(default)]
    config: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EpisodeStepBody {
    #[serde(default)]
    action: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EpisodeFinishBody {
    reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UnregisterBody {
    reason: Option<String>,
    details: Option<String>,
}

/// An event exactly as the platform sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    sequence_id: i64,
    #[serde(default)]
    idle: Option<IdleBody>,
    #[serde(default)]
    episode_start: Option<EpisodeStartBody>,
    #[serde(default)]
    episode_step: Option<EpisodeStepBody>,
    #[serde(default)]
    episode_finish: Option<EpisodeFinishBody>,
    #[serde(default)]
    unregister: Option<UnregisterBody>,
}

impl From<RawEvent> for PlatformEvent {
    fn from(raw: RawEvent) -> Self {
        let empty = || Value::Object(Default::default());
        let kind = match raw.kind.as_str() {
            "RegisterSuccess" => EventKind::RegisterSuccess,
            "Idle" => EventKind::Idle {
                callback_time: raw.idle.unwrap_or_default().callback_time,
            },
            "EpisodeStart" => EventKind::EpisodeStart {
                config: raw
                    .episode_start
                    .and_then(|b| b.config)
                    .unwrap_or_else(empty),
            },
            "EpisodeStep" => EventKind::EpisodeStep {
                action: raw
                    .episode_step
                    .and_then(|b| b.action)
                    .unwrap_or_else(empty),
            },
            "EpisodeFinish" => EventKind::EpisodeFinish {
                reason: raw.episode_finish.unwrap_or_default().reason,
            },
            "Unregister" => {
                let body = raw.unregister.unwrap_or_default();
                EventKind::Unregister {
                    reason: body.reason,
                    details: body.details,
                }
            }
            _ => EventKind::Unknown(raw.kind),
        };
        Self::new(raw.sequence_id, kind)
    }
}
