//! The session adapter: one simulator, one platform session.
//!
//! [`SessionAdapter`] registers the simulator, then turns each call to
//! [`next_event`](SessionAdapter::next_event) into exactly one platform
//! round-trip (plus any internal ones the event requires), and hands back a
//! [`SimEvent`] the simulation can act on.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::event::SimEvent;
use super::lifecycle::{SessionLifecycle, SessionState};
use super::validate::{validate_interface, validate_state};
use crate::error::{ConnectorError, Result};
use crate::platform::{EventKind, PlatformClient, SessionInfo, SimulatorInterface, SimulatorState};

/// Future returned by the body of [`SessionAdapter::scoped`].
pub type ScopedFuture<'a, T, E> = Pin<Box<dyn Future<Output = std::result::Result<T, E>> + 'a>>;

/// Drives one simulator session against a [`PlatformClient`].
///
/// Every method that talks to the platform takes `&mut self`, so requests are
/// strictly sequential. Call [`close_connection`](Self::close_connection)
/// when done, or use [`scoped`](Self::scoped) to have it called for you.
#[derive(Debug)]
pub struct SessionAdapter<C> {
    client: C,
    interface: SimulatorInterface,
    retry: bool,
    session: Option<SessionInfo>,
    sequence_id: i64,
    lifecycle: SessionLifecycle,
    episode_config: Option<Value>,
    registrations: usize,
}

impl<C: PlatformClient> SessionAdapter<C> {
    /// Validate `descriptor` and register it with the platform.
    ///
    /// With `retry` set, a platform-initiated unregister is answered with a
    /// fresh registration instead of ending the session.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::Registration`] if the descriptor is unusable or the
    /// platform refuses it. Registration is never retried.
    pub async fn connect(client: C, descriptor: &Value, retry: bool) -> Result<Self> {
        let interface = validate_interface(descriptor)?;
        let mut adapter = Self {
            client,
            interface,
            retry,
            session: None,
            sequence_id: 1,
            lifecycle: SessionLifecycle::new(),
            episode_config: None,
            registrations: 0,
        };
        adapter.register().await?;
        Ok(adapter)
    }

    /// Connect, run `body` with the adapter, then close the connection.
    ///
    /// The connection is closed whether `body` succeeds or fails, and before
    /// its result is returned.
    ///
    /// ```no_run
    /// # async fn demo() -> anyhow::Result<()> {
    /// use serde_json::json;
    /// use simlink::platform::ScriptedPlatform;
    /// use simlink::session::SessionAdapter;
    ///
    /// let platform = ScriptedPlatform::demo(1, 5);
    /// let iface = json!({"name": "demo", "timeout": 60});
    /// let kind = SessionAdapter::scoped(platform, &iface, false, |adapter| {
    ///     Box::pin(async move {
    ///         let event = adapter.next_event(&json!({"x": 0.0})).await?;
    ///         Ok::<_, anyhow::Error>(event.kind())
    ///     })
    /// })
    /// .await?;
    /// assert_eq!(kind, "idle");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<T, E, F>(
        client: C,
        descriptor: &Value,
        retry: bool,
        body: F,
    ) -> std::result::Result<T, E>
    where
        E: From<ConnectorError>,
        F: for<'a> FnOnce(&'a mut Self) -> ScopedFuture<'a, T, E>,
    {
        let mut adapter = Self::connect(client, descriptor, retry).await?;
        let result = body(&mut adapter).await;
        adapter.close_connection().await;
        result
    }

    /// Send `state` to the platform and return what the simulation should do next.
    ///
    /// `RegisterSuccess` events are absorbed, as is an unregister when
    /// reconnecting is enabled; in both cases the same state is sent again.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::SessionTerminated`] when the platform unregisters
    ///   the simulator and `retry` is off. The session is closed afterwards.
    /// - [`ConnectorError::SessionClosed`] if the session is already closed.
    /// - [`ConnectorError::InvalidState`] if `state` holds unsupported values.
    /// - [`ConnectorError::UnknownEvent`] for an event type this crate does not know.
    /// - Transport and platform errors, unchanged.
    pub async fn next_event(&mut self, state: &Value) -> Result<SimEvent> {
        if !self.lifecycle.is_open() {
            return Err(ConnectorError::SessionClosed);
        }
        validate_state(state)?;
        let halted = state.get("halted").and_then(Value::as_bool).unwrap_or(false);

        loop {
            let session_id = self
                .session
                .as_ref()
                .map(|s| s.session_id.clone())
                .ok_or(ConnectorError::SessionClosed)?;
            let body = SimulatorState {
                sequence_id: self.sequence_id,
                state: state.clone(),
                halted,
            };

            let event = self.client.advance(&session_id, &body).await?;
            self.sequence_id = event.sequence_id;
            self.lifecycle.on_event(&event.kind);
            debug!(
                %session_id,
                sequence_id = event.sequence_id,
                event = event.kind.type_name(),
                "received event"
            );

            match event.kind {
                EventKind::RegisterSuccess => continue,
                EventKind::Idle { callback_time } => {
                    return Ok(SimEvent::Idle { callback_time });
                }
                EventKind::EpisodeStart { config } => {
                    info!(%session_id, "episode start");
                    self.episode_config = Some(config.clone());
                    return Ok(SimEvent::EpisodeStart { config });
                }
                EventKind::EpisodeStep { action } => {
                    return Ok(SimEvent::EpisodeStep { action });
                }
                EventKind::EpisodeFinish { reason } => {
                    info!(%session_id, reason = reason.as_deref().unwrap_or("-"), "episode finish");
                    self.episode_config = None;
                    return Ok(SimEvent::EpisodeFinish { reason });
                }
                EventKind::Unregister { reason, details } => {
                    let reason = reason.unwrap_or_default();
                    let details = details.unwrap_or_default();
                    info!(%session_id, %reason, %details, "session unregistered by the platform");

                    // The platform has already dropped the session.
                    self.session = None;
                    if !self.retry {
                        self.release();
                        return Err(ConnectorError::SessionTerminated { reason, details });
                    }
                    info!("re-registering");
                    if let Err(err) = self.register().await {
                        self.release();
                        return Err(err);
                    }
                }
                EventKind::Unknown(kind) => return Err(ConnectorError::UnknownEvent(kind)),
            }
        }
    }

    /// Unregister from the platform and release the session.
    ///
    /// Idempotent: only the first call on an open session talks to the
    /// platform. Never fails; a failed delete is logged and dropped.
    pub async fn close_connection(&mut self) {
        if let Some(session) = self.session.take() {
            match self.client.delete_session(&session.session_id).await {
                Ok(()) => info!(session_id = %session.session_id, "closed simulator session"),
                Err(err) => {
                    warn!(session_id = %session.session_id, %err, "failed to delete session; ignoring")
                }
            }
        }
        self.release();
    }

    async fn register(&mut self) -> Result<()> {
        let session = self
            .client
            .create_session(&self.interface)
            .await
            .map_err(|err| {
                if matches!(err, ConnectorError::Registration(_)) {
                    err
                } else {
                    ConnectorError::Registration(err.to_string())
                }
            })?;
        info!(
            session_id = %session.session_id,
            workspace = self.client.workspace(),
            name = %self.interface.name,
            "created simulator session"
        );
        self.session = Some(session);
        self.sequence_id = 1;
        self.episode_config = None;
        self.registrations += 1;
        self.lifecycle.on_registered();
        Ok(())
    }
}

impl<C> SessionAdapter<C> {
    fn release(&mut self) {
        self.session = None;
        self.episode_config = None;
        self.lifecycle.on_closed();
    }

    /// Id of the live session, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.state() == SessionState::Closed
    }

    pub fn retry(&self) -> bool {
        self.retry
    }

    pub fn interface(&self) -> &SimulatorInterface {
        &self.interface
    }

    /// Configuration of the running episode, cleared when it finishes.
    pub fn episode_config(&self) -> Option<&Value> {
        self.episode_config.as_ref()
    }

    /// Sequence id the next state will carry.
    pub fn sequence_id(&self) -> i64 {
        self.sequence_id
    }

    /// Successful registrations so far, reconnects included.
    pub fn registrations(&self) -> usize {
        self.registrations
    }
}

impl<C> Drop for SessionAdapter<C> {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            warn!(
                session_id = %session.session_id,
                "session adapter dropped without close_connection; platform session left open"
            );
        }
    }
}
