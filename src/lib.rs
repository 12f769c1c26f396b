//! simlink: connects a simulation loop to a remote training platform.
//!
//! The platform issues session events (episode start, step, episode finish,
//! unregister); [`SessionAdapter`] turns them into [`SimEvent`]s the
//! simulation can act on and sends the simulation's state back, one
//! round-trip at a time.

pub mod config;
pub mod error;
pub mod platform;
pub mod session;
pub mod sim;

pub use error::{ConnectorError, Result};
pub use session::{SessionAdapter, SimEvent};
