//! The canonical simulation loop.
//!
//! [`SimRunner`] drives a [`Simulation`] from a [`SessionAdapter`] by
//! repeatedly:
//!   1. reading the simulation's state,
//!   2. sending it with `next_event`,
//!   3. resetting or stepping the simulation according to the reply.
//!
//! The loop ends when the platform terminates the session, when an optional
//! episode budget is used up, or when a caller-supplied shutdown future
//! resolves. Closing the session is left to the caller.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use super::traits::Simulation;
use crate::platform::PlatformClient;
use crate::session::{SessionAdapter, SimEvent};

/// Longest idle pause the runner honours by default, in seconds.
pub const DEFAULT_IDLE_CAP_SECS: f64 = 5.0;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// The platform unregistered the simulator.
    Terminated { reason: String, details: String },
    /// The configured number of episodes finished.
    EpisodeBudget,
    /// The shutdown future resolved.
    Interrupted,
}

/// Counters collected over one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub episodes_started: usize,
    pub episodes_finished: usize,
    pub steps: usize,
    pub idles: usize,
    /// Registrations the adapter performed, reconnects included.
    pub registrations: usize,
    pub stop: StopReason,
}

/// Drives a simulation from platform events.
#[derive(Debug, Clone, Copy)]
pub struct SimRunner {
    max_episodes: Option<usize>,
    idle_cap: Duration,
}

impl SimRunner {
    pub fn new() -> Self {
        Self {
            max_episodes: None,
            idle_cap: Duration::from_secs_f64(DEFAULT_IDLE_CAP_SECS),
        }
    }

    /// Stop once this many episodes have finished.
    pub fn with_max_episodes(mut self, max_episodes: Option<usize>) -> Self {
        self.max_episodes = max_episodes;
        self
    }

    /// Upper bound on how long an idle event may pause the loop.
    pub fn with_idle_cap(mut self, idle_cap: Duration) -> Self {
        self.idle_cap = idle_cap;
        self
    }

    /// Run until the session terminates or the episode budget is used up.
    pub async fn run<C, S>(&self, adapter: &mut SessionAdapter<C>, sim: &mut S) -> Result<RunSummary>
    where
        C: PlatformClient,
        S: Simulation,
    {
        self.run_until(adapter, sim, std::future::pending::<()>()).await
    }

    /// Like [`run`](Self::run), but also stops when `shutdown` resolves.
    ///
    /// A request in flight when `shutdown` fires is abandoned.
    pub async fn run_until<C, S, F>(
        &self,
        adapter: &mut SessionAdapter<C>,
        sim: &mut S,
        shutdown: F,
    ) -> Result<RunSummary>
    where
        C: PlatformClient,
        S: Simulation,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut summary = RunSummary {
            episodes_started: 0,
            episodes_finished: 0,
            steps: 0,
            idles: 0,
            registrations: adapter.registrations(),
            stop: StopReason::EpisodeBudget,
        };
        let mut episode_steps = 0usize;

        loop {
            if self
                .max_episodes
                .is_some_and(|max| summary.episodes_finished >= max)
            {
                summary.stop = StopReason::EpisodeBudget;
                break;
            }

            let state = observe(sim);
            let outcome = tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!(sim = sim.name(), "shutdown requested");
                    summary.stop = StopReason::Interrupted;
                    break;
                }
                outcome = adapter.next_event(&state) => outcome,
            };

            match outcome {
                Ok(SimEvent::EpisodeStart { config }) => {
                    sim.reset(&config)
                        .await
                        .with_context(|| format!("{} failed to reset", sim.name()))?;
                    summary.episodes_started += 1;
                    episode_steps = 0;
                }
                Ok(SimEvent::EpisodeStep { action }) => {
                    sim.step(&action)
                        .await
                        .with_context(|| format!("{} failed to step", sim.name()))?;
                    summary.steps += 1;
                    episode_steps += 1;
                }
                Ok(SimEvent::EpisodeFinish { reason }) => {
                    summary.episodes_finished += 1;
                    tracing::info!(
                        episode = summary.episodes_finished,
                        steps = episode_steps,
                        reason = reason.as_deref().unwrap_or("-"),
                        "episode finished"
                    );
                }
                Ok(SimEvent::Idle { callback_time }) => {
                    summary.idles += 1;
                    if let Some(pause) = self.idle_pause(callback_time) {
                        tokio::time::sleep(pause).await;
                    }
                }
                Err(err) if err.is_terminal() => {
                    if let crate::ConnectorError::SessionTerminated { reason, details } = err {
                        summary.stop = StopReason::Terminated { reason, details };
                    }
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }

        summary.registrations = adapter.registrations();
        Ok(summary)
    }

    fn idle_pause(&self, callback_time: Option<f64>) -> Option<Duration> {
        let secs = callback_time.filter(|t| t.is_finite() && *t > 0.0)?;
        Some(Duration::try_from_secs_f64(secs).map_or(self.idle_cap, |d| d.min(self.idle_cap)))
    }
}

impl Default for SimRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// The simulation's state, with `halted` set when the simulation says so.
fn observe<S: Simulation>(sim: &S) -> Value {
    let mut state = sim.state();
    if sim.halted() {
        if let Value::Object(map) = &mut state {
            map.insert("halted".into(), Value::Bool(true));
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::platform::scripted::step;
    use crate::platform::{EventKind, PlatformCall, ScriptedPlatform};
    use crate::sim::point_mass::PointMass;

    /// Records every reset/step it receives.
    #[derive(Default)]
    struct RecordingSim {
        resets: Vec<Value>,
        actions: Vec<Value>,
        halted: bool,
    }

    impl Simulation for RecordingSim {
        async fn reset(&mut self, config: &Value) -> anyhow::Result<()> {
            self.resets.push(config.clone());
            Ok(())
        }

        async fn step(&mut self, action: &Value) -> anyhow::Result<()> {
            self.actions.push(action.clone());
            Ok(())
        }

        fn state(&self) -> Value {
            json!({"steps": self.actions.len()})
        }

        fn halted(&self) -> bool {
            self.halted
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn iface() -> Value {
        json!({"name": "runner-test", "timeout": 60})
    }

    fn runner() -> SimRunner {
        SimRunner::new().with_idle_cap(Duration::ZERO)
    }

    #[tokio::test]
    async fn runs_demo_script_to_termination() {
        let platform = ScriptedPlatform::demo(2, 4);
        let handle = platform.handle();
        let mut adapter = SessionAdapter::connect(platform, &iface(), false).await.unwrap();
        let mut sim = RecordingSim::default();

        let summary = runner().run(&mut adapter, &mut sim).await.unwrap();

        assert_eq!(summary.episodes_started, 2);
        assert_eq!(summary.episodes_finished, 2);
        assert_eq!(summary.steps, 8);
        assert_eq!(summary.idles, 1);
        assert_eq!(summary.registrations, 1);
        assert!(matches!(summary.stop, StopReason::Terminated { .. }));
        assert_eq!(sim.resets.len(), 2);
        assert_eq!(sim.actions[0], json!({"command": 0.5}));
        assert!(adapter.is_closed());
        assert_eq!(handle.deletions(), 0);
    }

    #[tokio::test]
    async fn huge_idle_callback_is_capped() {
        let platform = ScriptedPlatform::new([EventKind::Idle {
            callback_time: Some(1e20),
        }]);
        let mut adapter = SessionAdapter::connect(platform, &iface(), false).await.unwrap();
        let mut sim = PointMass::new();

        let summary = runner().run(&mut adapter, &mut sim).await.unwrap();

        assert_eq!(summary.idles, 1);
        assert!(matches!(summary.stop, StopReason::Terminated { .. }));
    }

    #[tokio::test]
    async fn episode_budget_stops_early() {
        let platform = ScriptedPlatform::demo(5, 2);
        let mut adapter = SessionAdapter::connect(platform, &iface(), false).await.unwrap();
        let mut sim = PointMass::new();

        let summary = runner()
            .with_max_episodes(Some(1))
            .run(&mut adapter, &mut sim)
            .await
            .unwrap();

        assert_eq!(summary.episodes_finished, 1);
        assert_eq!(summary.stop, StopReason::EpisodeBudget);
        assert!(!adapter.is_closed());
        adapter.close_connection().await;
    }

    #[tokio::test]
    async fn reconnect_is_transparent_to_the_loop() {
        let platform = ScriptedPlatform::new([
            EventKind::EpisodeStart { config: json!({}) },
            step(json!({"command": 1.0})),
            EventKind::Unregister {
                reason: Some("Error".into()),
                details: Some("platform restart".into()),
            },
            EventKind::EpisodeStart { config: json!({}) },
            step(json!({"command": -1.0})),
            EventKind::EpisodeFinish { reason: None },
        ]);
        let mut adapter = SessionAdapter::connect(platform, &iface(), true).await.unwrap();
        let mut sim = RecordingSim::default();

        let summary = runner()
            .with_max_episodes(Some(1))
            .run(&mut adapter, &mut sim)
            .await
            .unwrap();

        assert_eq!(summary.registrations, 2);
        assert_eq!(summary.episodes_started, 2);
        assert_eq!(summary.steps, 2);
        adapter.close_connection().await;
    }

    #[tokio::test]
    async fn shutdown_interrupts() {
        let platform = ScriptedPlatform::demo(3, 3);
        let handle = platform.handle();
        let mut adapter = SessionAdapter::connect(platform, &iface(), false).await.unwrap();
        let mut sim = RecordingSim::default();

        let summary = runner()
            .run_until(&mut adapter, &mut sim, std::future::ready(()))
            .await
            .unwrap();

        assert_eq!(summary.stop, StopReason::Interrupted);
        assert_eq!(handle.advances(), 0);
        adapter.close_connection().await;
    }

    #[tokio::test]
    async fn halted_simulation_reports_it() {
        let platform = ScriptedPlatform::new([EventKind::Idle { callback_time: None }]);
        let handle = platform.handle();
        let mut adapter = SessionAdapter::connect(platform, &iface(), false).await.unwrap();
        let mut sim = RecordingSim {
            halted: true,
            ..RecordingSim::default()
        };

        runner().run(&mut adapter, &mut sim).await.unwrap();

        let halted_flags: Vec<bool> = handle
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::Advance { state, .. } => Some(state.halted),
                _ => None,
            })
            .collect();
        assert!(!halted_flags.is_empty());
        assert!(halted_flags.iter().all(|h| *h));
    }

    #[test]
    fn idle_pause_is_capped_and_sane() {
        let runner = SimRunner::new().with_idle_cap(Duration::from_secs(2));
        assert_eq!(runner.idle_pause(None), None);
        assert_eq!(runner.idle_pause(Some(0.0)), None);
        assert_eq!(runner.idle_pause(Some(-1.0)), None);
        assert_eq!(runner.idle_pause(Some(f64::NAN)), None);
        assert_eq!(runner.idle_pause(Some(0.5)), Some(Duration::from_millis(500)));
        assert_eq!(runner.idle_pause(Some(30.0)), Some(Duration::from_secs(2)));
        assert_eq!(runner.idle_pause(Some(1e20)), Some(Duration::from_secs(2)));
        assert_eq!(runner.idle_pause(Some(f64::MAX)), Some(Duration::from_secs(2)));
    }
}
