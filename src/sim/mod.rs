//! Simulation-side abstractions.
//!
//! Every simulation implements the [`Simulation`] trait so that
//! [`SimRunner`] can drive it from platform events uniformly.
//!
//! Included simulations:
//! - **PointMass** ([`point_mass`]) -- a one-dimensional point mass pushed by
//!   a bounded force, used by the binary's demo run and by tests.

pub mod point_mass;
pub mod runner;
pub mod traits;

pub use point_mass::PointMass;
pub use runner::{RunSummary, SimRunner, StopReason};
pub use traits::Simulation;
