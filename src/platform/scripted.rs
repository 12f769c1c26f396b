//! In-memory platform that replays a scripted sequence of events.
//!
//! [`ScriptedPlatform`] stands in for the real platform in tests and in the
//! binary's `--mock` mode. Every call it receives is recorded in a log that
//! stays readable through a [`ScriptHandle`] after the platform itself has
//! been moved into an adapter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};
use uuid::Uuid;

use super::client::PlatformClient;
use super::types::{EventKind, PlatformEvent, SessionInfo, SimulatorInterface, SimulatorState};
use crate::error::{ConnectorError, Result};

/// One call received by a [`ScriptedPlatform`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    CreateSession { name: String },
    Advance { session_id: String, state: SimulatorState },
    DeleteSession { session_id: String },
}

#[derive(Debug, Default)]
struct Shared {
    calls: Mutex<Vec<PlatformCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Shared {
    fn calls(&self) -> MutexGuard<'_, Vec<PlatformCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: PlatformCall) {
        self.calls().push(call);
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Read-only view of a scripted platform's call log.
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    shared: Arc<Shared>,
}

impl ScriptHandle {
    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.shared.calls().clone()
    }

    pub fn registrations(&self) -> usize {
        self.count(|c| matches!(c, PlatformCall::CreateSession { .. }))
    }

    pub fn advances(&self) -> usize {
        self.count(|c| matches!(c, PlatformCall::Advance { .. }))
    }

    pub fn deletions(&self) -> usize {
        self.count(|c| matches!(c, PlatformCall::DeleteSession { .. }))
    }

    /// Highest number of requests that were ever outstanding at once.
    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }

    fn count(&self, pred: impl Fn(&PlatformCall) -> bool) -> usize {
        self.shared.calls().iter().filter(|c| pred(c)).count()
    }
}

/// A platform double that answers advance calls from a fixed script.
///
/// Each scripted event is stamped with the incoming sequence id plus one.
/// Once the script runs out the platform unregisters the simulator.
#[derive(Debug)]
pub struct ScriptedPlatform {
    workspace: String,
    script: VecDeque<EventKind>,
    shared: Arc<Shared>,
    reject_registration: Option<String>,
    fail_deletes: bool,
}

impl ScriptedPlatform {
    pub fn new(events: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            workspace: "scripted".into(),
            script: events.into_iter().collect(),
            shared: Arc::new(Shared::default()),
            reject_registration: None,
            fail_deletes: false,
        }
    }

    /// A script of `episodes` episodes with `steps` steps each, driving a
    /// `command` action that alternates sign.
    pub fn demo(episodes: usize, steps: usize) -> Self {
        let mut events = vec![EventKind::RegisterSuccess, EventKind::Idle { callback_time: Some(0.0) }];
        for ep in 0..episodes {
            events.push(EventKind::EpisodeStart {
                config: json!({"initial_position": ep as f64 * 0.5, "initial_velocity": 0.0}),
            });
            for step in 0..steps {
                let command = if step % 2 == 0 { 0.5 } else { -0.5 };
                events.push(EventKind::EpisodeStep {
                    action: json!({"command": command}),
                });
            }
            events.push(EventKind::EpisodeFinish {
                reason: Some("Finished".into()),
            });
        }
        Self::new(events)
    }

    /// Make every registration fail with `message`, like a bad access key would.
    pub fn rejecting_registration(mut self, message: impl Into<String>) -> Self {
        self.reject_registration = Some(message.into());
        self
    }

    /// Start or stop refusing registrations on a platform already in use.
    pub fn set_rejecting_registration(&mut self, message: Option<String>) {
        self.reject_registration = message;
    }

    /// Make every delete call fail.
    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn handle(&self) -> ScriptHandle {
        ScriptHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    fn exhausted() -> EventKind {
        EventKind::Unregister {
            reason: Some("Finished".into()),
            details: Some("script exhausted".into()),
        }
    }
}

impl PlatformClient for ScriptedPlatform {
    fn workspace(&self) -> &str {
        &self.workspace
    }

    async fn create_session(&mut self, interface: &SimulatorInterface) -> Result<SessionInfo> {
        self.shared.record(PlatformCall::CreateSession {
            name: interface.name.clone(),
        });
        if let Some(message) = &self.reject_registration {
            return Err(ConnectorError::Platform {
                status: 401,
                body: message.clone(),
            });
        }
        Ok(SessionInfo::new(Uuid::new_v4().to_string()))
    }

    async fn advance(&mut self, session_id: &str, state: &SimulatorState) -> Result<PlatformEvent> {
        self.shared.enter();
        self.shared.record(PlatformCall::Advance {
            session_id: session_id.to_string(),
            state: state.clone(),
        });
        // Give any overlapping caller a chance to show up.
        tokio::task::yield_now().await;
        let kind = self.script.pop_front().unwrap_or_else(Self::exhausted);
        self.shared.leave();
        Ok(PlatformEvent::new(state.sequence_id + 1, kind))
    }

    async fn delete_session(&mut self, session_id: &str) -> Result<()> {
        self.shared.record(PlatformCall::DeleteSession {
            session_id: session_id.to_string(),
        });
        if self.fail_deletes {
            return Err(ConnectorError::Platform {
                status: 500,
                body: "delete failed".into(),
            });
        }
        Ok(())
    }
}

/// Shorthand for building scripted step events in tests and demos.
pub fn step(action: Value) -> EventKind {
    EventKind::EpisodeStep { action }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface() -> SimulatorInterface {
        SimulatorInterface {
            name: "scripted-sim".into(),
            timeout: 60,
            description: None,
            capabilities: None,
            simulator_context: None,
        }
    }

    fn state(sequence_id: i64) -> SimulatorState {
        SimulatorState {
            sequence_id,
            state: json!({}),
            halted: false,
        }
    }

    #[tokio::test]
    async fn replays_script_then_unregisters() {
        let mut platform = ScriptedPlatform::new([step(json!({"a": 1}))]);
        let session = platform.create_session(&iface()).await.unwrap();

        let first = platform.advance(&session.session_id, &state(1)).await.unwrap();
        assert_eq!(first.sequence_id, 2);
        assert_eq!(first.kind, step(json!({"a": 1})));

        let second = platform.advance(&session.session_id, &state(2)).await.unwrap();
        assert!(matches!(second.kind, EventKind::Unregister { .. }));
    }

    #[tokio::test]
    async fn handle_sees_calls_after_move() {
        let platform = ScriptedPlatform::new([]);
        let handle = platform.handle();
        let mut moved = platform;
        moved.create_session(&iface()).await.unwrap();
        moved.delete_session("s").await.unwrap();

        assert_eq!(handle.registrations(), 1);
        assert_eq!(handle.deletions(), 1);
        assert_eq!(handle.advances(), 0);
    }

    #[tokio::test]
    async fn rejection_and_failing_deletes() {
        let mut platform = ScriptedPlatform::new([])
            .rejecting_registration("bad key")
            .failing_deletes();
        assert!(platform.create_session(&iface()).await.is_err());
        assert!(platform.delete_session("s").await.is_err());
    }

    #[test]
    fn demo_script_shape() {
        let platform = ScriptedPlatform::demo(2, 3);
        let starts = platform
            .script
            .iter()
            .filter(|e| matches!(e, EventKind::EpisodeStart { .. }))
            .count();
        let steps = platform
            .script
            .iter()
            .filter(|e| matches!(e, EventKind::EpisodeStep { .. }))
            .count();
        assert_eq!(starts, 2);
        assert_eq!(steps, 6);
    }
}
