//! Session lifecycle management between a simulation and the platform.
//!
//! - [`adapter::SessionAdapter`] -- registers the simulator and turns
//!   platform events into [`SimEvent`]s, one round-trip at a time.
//! - [`event::SimEvent`] -- the tagged descriptor handed to the simulation.
//! - [`lifecycle`] -- the `Unregistered -> Registered -> Active -> Closed`
//!   state machine.
//! - [`validate`] -- local checks on interface descriptors and state payloads.

pub mod adapter;
pub mod event;
pub mod lifecycle;
pub mod validate;

pub use adapter::{ScopedFuture, SessionAdapter};
pub use event::SimEvent;
pub use lifecycle::{SessionLifecycle, SessionState};
pub use validate::{validate_interface, validate_state};
