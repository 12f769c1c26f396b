//! A one-dimensional point mass, the smallest useful thing to train on.
//!
//! The action is a force `command` in `[-1, 1]`; the state is position and
//! velocity. The simulation halts once the mass leaves `[-LIMIT, LIMIT]`.

use rand::Rng;
use serde_json::{json, Value};

use super::traits::Simulation;

/// Integration step in seconds.
pub const DT: f64 = 0.1;
/// Distance from the origin at which the simulation halts.
pub const LIMIT: f64 = 10.0;

#[derive(Debug, Clone, Default)]
pub struct PointMass {
    position: f64,
    velocity: f64,
    steps: u64,
}

impl PointMass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interface descriptor to register this simulation with.
    pub fn interface() -> Value {
        json!({
            "name": "point-mass",
            "timeout": 60,
            "description": "One-dimensional point mass pushed by a bounded force.",
            "capabilities": {
                "state": {"position": "number", "velocity": "number"},
                "action": {"command": {"type": "number", "min": -1.0, "max": 1.0}},
                "config": {"initial_position": "number", "initial_velocity": "number"}
            }
        })
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }
}

impl Simulation for PointMass {
    async fn reset(&mut self, config: &Value) -> anyhow::Result<()> {
        self.position = match config.get("initial_position").and_then(Value::as_f64) {
            Some(p) => p,
            None => rand::thread_rng().gen_range(-1.0..=1.0),
        };
        self.velocity = config
            .get("initial_velocity")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        self.steps = 0;
        tracing::debug!(position = self.position, velocity = self.velocity, "point mass reset");
        Ok(())
    }

    async fn step(&mut self, action: &Value) -> anyhow::Result<()> {
        let Some(command) = action.get("command").and_then(Value::as_f64) else {
            anyhow::bail!("action is missing a numeric `command`: {action}");
        };
        let force = command.clamp(-1.0, 1.0);
        self.velocity += force * DT;
        self.position += self.velocity * DT;
        self.steps += 1;
        Ok(())
    }

    fn state(&self) -> Value {
        json!({
            "position": self.position,
            "velocity": self.velocity,
            "steps": self.steps,
        })
    }

    fn halted(&self) -> bool {
        self.position.abs() > LIMIT
    }

    fn name(&self) -> &str {
        "point-mass"
    }
}
