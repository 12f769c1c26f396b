//! The platform client seam and its HTTP implementation.
//!
//! [`HttpPlatformClient`] talks to the platform's REST API:
//! - `POST   {api_host}/v2/workspaces/{ws}/simulatorSessions`               -- register
//! - `POST   {api_host}/v2/workspaces/{ws}/simulatorSessions/{id}/advance`  -- send state, get event
//! - `DELETE {api_host}/v2/workspaces/{ws}/simulatorSessions/{id}`          -- unregister

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use tracing::debug;

use super::types::{
    PlatformEvent, RawEvent, RegistrationResponse, SessionInfo, SimulatorInterface,
    SimulatorState,
};
use crate::config::PlatformConfig;
use crate::error::{ConnectorError, Result};

/// Everything the session adapter needs from the platform.
///
/// Calls take `&mut self`, so a client can never have two requests in flight.
#[allow(async_fn_in_trait)]
pub trait PlatformClient {
    /// Workspace every request is scoped to.
    fn workspace(&self) -> &str;

    /// Register the simulator and open a new session.
    async fn create_session(&mut self, interface: &SimulatorInterface) -> Result<SessionInfo>;

    /// Send the current state and wait for the platform's next event.
    async fn advance(&mut self, session_id: &str, state: &SimulatorState) -> Result<PlatformEvent>;

    /// Unregister the session.
    async fn delete_session(&mut self, session_id: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// HTTP-backed client
// ---------------------------------------------------------------------------

/// A [`PlatformClient`] backed by the platform's REST API.
#[derive(Debug)]
pub struct HttpPlatformClient {
    api_host: String,
    workspace: String,
    access_key: String,
    simulator_context: Option<String>,
    http: reqwest::Client,
}

impl HttpPlatformClient {
    /// Build a client from configuration.
    ///
    /// Fails if the workspace or access key is missing.
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        if config.workspace.is_empty() {
            return Err(ConnectorError::Config(
                "workspace is not set (config file or SIM_WORKSPACE)".into(),
            ));
        }
        if config.access_key.is_empty() {
            return Err(ConnectorError::Config(
                "access key is not set (config file or SIM_ACCESS_KEY)".into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            api_host: config.api_host.trim_end_matches('/').to_string(),
            workspace: config.workspace.clone(),
            access_key: config.access_key.clone(),
            simulator_context: config.simulator_context.clone(),
            http,
        })
    }

    fn sessions_url(&self) -> String {
        format!(
            "{}/v2/workspaces/{}/simulatorSessions",
            self.api_host, self.workspace
        )
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/{}", self.sessions_url(), session_id)
    }
}

/// Turn a non-2xx response into [`ConnectorError::Platform`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ConnectorError::Platform {
        status: status.as_u16(),
        body,
    })
}

impl PlatformClient for HttpPlatformClient {
    fn workspace(&self) -> &str {
        &self.workspace
    }

    async fn create_session(&mut self, interface: &SimulatorInterface) -> Result<SessionInfo> {
        let mut body = interface.clone();
        body.simulator_context = self.simulator_context.clone();

        debug!(name = %body.name, workspace = %self.workspace, "registering simulator");
        let resp = self
            .http
            .post(self.sessions_url())
            .header(AUTHORIZATION, &self.access_key)
            .json(&body)
            .send()
            .await?;
        let registered: RegistrationResponse = check_status(resp).await?.json().await?;
        Ok(registered.into())
    }

    async fn advance(&mut self, session_id: &str, state: &SimulatorState) -> Result<PlatformEvent> {
        let resp = self
            .http
            .post(format!("{}/advance", self.session_url(session_id)))
            .header(AUTHORIZATION, &self.access_key)
            .json(state)
            .send()
            .await?;
        let raw: RawEvent = check_status(resp).await?.json().await?;
        Ok(raw.into())
    }

    async fn delete_session(&mut self, session_id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.session_url(session_id))
            .header(AUTHORIZATION, &self.access_key)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
