//! Everything on the platform side of the connector.
//!
//! - [`types`] -- wire types for registration, state and events.
//! - [`client`] -- the [`PlatformClient`] trait and the REST-backed
//!   [`HttpPlatformClient`].
//! - [`scripted`] -- [`ScriptedPlatform`], an in-memory double that replays
//!   a fixed event script and records every call.

pub mod client;
pub mod scripted;
pub mod types;

pub use client::{HttpPlatformClient, PlatformClient};
pub use scripted::{PlatformCall, ScriptHandle, ScriptedPlatform};
pub use types::{EventKind, PlatformEvent, SessionInfo, SimulatorInterface, SimulatorState};
