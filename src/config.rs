use serde::{Deserialize, Serialize};

/// Default platform endpoint when neither the config file nor `SIM_API_HOST` set one.
pub const DEFAULT_API_HOST: &str = "https://api.bon.ai";

/// Complete configuration for the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub platform: PlatformConfig,
    /// Re-register transparently when the platform unregisters the simulator.
    pub retry: bool,
    /// Log at `debug` instead of `info` unless `RUST_LOG` says otherwise.
    pub verbose: bool,
}

/// Connection settings for the training platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Base URL of the platform API (e.g. "https://api.bon.ai").
    pub api_host: String,
    /// Workspace the simulator registers into.
    pub workspace: String,
    /// Access key sent in the `Authorization` header.
    pub access_key: String,
    /// Opaque context string the platform hands to simulators it launches.
    pub simulator_context: Option<String>,
    /// Per-request timeout in seconds (default: 60).
    pub request_timeout_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            platform: PlatformConfig::default(),
            retry: false,
            verbose: false,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_host: String::new(),
            workspace: String::new(),
            access_key: String::new(),
            simulator_context: None,
            request_timeout_secs: 60,
        }
    }
}

impl PlatformConfig {
    /// Fill every unset field from the `SIM_*` environment variables.
    ///
    /// Values already present (e.g. from a config file) win over the environment.
    pub fn fill_from_env(&mut self) {
        self.fill_from(|key| std::env::var(key).ok());
    }

    fn fill_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.workspace.is_empty() {
            if let Some(ws) = lookup("SIM_WORKSPACE") {
                self.workspace = ws;
            }
        }
        if self.access_key.is_empty() {
            if let Some(key) = lookup("SIM_ACCESS_KEY") {
                self.access_key = key;
            }
        }
        if self.api_host.is_empty() {
            self.api_host = lookup("SIM_API_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string());
        }
        if self.simulator_context.is_none() {
            self.simulator_context = lookup("SIM_CONTEXT");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_offline_and_no_retry() {
        let config = ConnectorConfig::default();
        assert!(!config.retry);
        assert!(!config.verbose);
        assert_eq!(config.platform.request_timeout_secs, 60);
        assert!(config.platform.workspace.is_empty());
    }

    #[test]
    fn env_fills_missing_fields() {
        let vars = env(&[
            ("SIM_WORKSPACE", "ws-123"),
            ("SIM_ACCESS_KEY", "secret"),
            ("SIM_CONTEXT", "{\"deploymentMode\":\"Testing\"}"),
        ]);
        let mut platform = PlatformConfig::default();
        platform.fill_from(|k| vars.get(k).cloned());

        assert_eq!(platform.workspace, "ws-123");
        assert_eq!(platform.access_key, "secret");
        assert_eq!(platform.api_host, DEFAULT_API_HOST);
        assert!(platform.simulator_context.is_some());
    }

    #[test]
    fn file_values_win_over_env() {
        let vars = env(&[("SIM_WORKSPACE", "from-env"), ("SIM_API_HOST", "http://env")]);
        let mut platform = PlatformConfig {
            workspace: "from-file".into(),
            api_host: "http://file".into(),
            ..PlatformConfig::default()
        };
        platform.fill_from(|k| vars.get(k).cloned());

        assert_eq!(platform.workspace, "from-file");
        assert_eq!(platform.api_host, "http://file");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ConnectorConfig =
            serde_json::from_str(r#"{"retry": true, "platform": {"workspace": "w"}}"#).unwrap();
        assert!(config.retry);
        assert_eq!(config.platform.workspace, "w");
        assert_eq!(config.platform.request_timeout_secs, 60);
    }
}
