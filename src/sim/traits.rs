//! The interface a simulation exposes to the runner.

use serde_json::Value;

/// A simulation that can be driven by platform events.
///
/// The runner resets it on every episode start, steps it on every action and
/// reads its state before each round-trip.
#[allow(async_fn_in_trait)]
pub trait Simulation {
    /// Start a new episode with the platform-provided configuration.
    async fn reset(&mut self, config: &Value) -> anyhow::Result<()>;

    /// Apply an action and advance by one step.
    async fn step(&mut self, action: &Value) -> anyhow::Result<()>;

    /// Current state as a JSON object of numbers, booleans, arrays and objects.
    fn state(&self) -> Value;

    /// Whether the simulation reached a state it cannot continue from.
    fn halted(&self) -> bool {
        false
    }

    /// Short name used in logs.
    fn name(&self) -> &str;
}
