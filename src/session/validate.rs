//! Local checks on what the simulation hands to the connector.
//!
//! The interface descriptor is checked once at construction. Only a missing
//! or unusable `name` is fatal; softer problems are logged and defaulted so
//! the platform gets the final say. State payloads are checked on every call:
//! the platform only accepts trees of booleans, numbers, arrays and objects.

use serde_json::Value;
use tracing::warn;

use crate::error::{ConnectorError, Result};
use crate::platform::SimulatorInterface;

/// Timeout used when the descriptor does not carry a usable one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const KNOWN_KEYS: &[&str] = &["name", "timeout", "description", "capabilities"];

/// Turn a caller-supplied descriptor into a [`SimulatorInterface`].
pub fn validate_interface(descriptor: &Value) -> Result<SimulatorInterface> {
    let Some(map) = descriptor.as_object() else {
        return Err(ConnectorError::Registration(
            "interface descriptor must be a JSON object".into(),
        ));
    };

    let name = match map.get("name").and_then(Value::as_str).map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(ConnectorError::Registration(
                "interface descriptor needs a non-empty string `name`".into(),
            ))
        }
    };

    let timeout = match map.get("timeout") {
        Some(v) => match v.as_u64() {
            Some(t) if t > 0 => t,
            _ => {
                warn!(%name, timeout = %v, "timeout must be a positive integer; using default");
                DEFAULT_TIMEOUT_SECS
            }
        },
        None => {
            warn!(%name, "interface has no timeout; using default");
            DEFAULT_TIMEOUT_SECS
        }
    };

    let description = match map.get("description") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            warn!(%name, description = %other, "description is not a string; ignoring");
            None
        }
        None => None,
    };

    let capabilities = match map.get("capabilities") {
        Some(v @ Value::Object(_)) => Some(v.clone()),
        Some(other) => {
            warn!(%name, capabilities = %other, "capabilities is not an object; ignoring");
            None
        }
        None => None,
    };

    for key in map.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
        warn!(%name, key = %key, "unknown interface key; ignoring");
    }

    Ok(SimulatorInterface {
        name,
        timeout,
        description,
        capabilities,
        simulator_context: None,
    })
}

/// Check that a state payload only holds types the platform can carry.
///
/// The top level must be an object. Strings and nulls are rejected at any
/// depth; the error names the offending path, e.g. `$.pose[2]`.
pub fn validate_state(state: &Value) -> Result<()> {
    if !state.is_object() {
        return Err(ConnectorError::InvalidState {
            path: "$".into(),
            kind: kind_name(state),
        });
    }
    check_value(state, &mut String::from("$"))
}

fn check_value(value: &Value, path: &mut String) -> Result<()> {
    match value {
        Value::Bool(_) | Value::Number(_) => Ok(()),
        Value::Null | Value::String(_) => Err(ConnectorError::InvalidState {
            path: path.clone(),
            kind: kind_name(value),
        }),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{i}]"));
                check_value(item, path)?;
                path.truncate(len);
            }
            Ok(())
        }
        Value::Object(map) => {
            for (key, item) in map {
                let len = path.len();
                path.push('.');
                path.push_str(key);
                check_value(item, path)?;
                path.truncate(len);
            }
            Ok(())
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_supported_states() {
        let states = [
            json!({"accepted": 1}),
            json!({"accepted": 1.0}),
            json!({"accepted": [1.0, 2.0]}),
            json!({"accepted": true}),
            json!({"accepted": [true, false]}),
            json!({"accepted": {"dict": 1}}),
            json!({}),
        ];
        for state in &states {
            assert!(validate_state(state).is_ok(), "rejected {state}");
        }
    }

    #[test]
    fn rejects_strings_and_nulls_at_any_depth() {
        let cases = [
            (json!({"invalid": "string"}), "$.invalid", "string"),
            (json!({"invalid": [1, null]}), "$.invalid[1]", "null"),
            (json!({"invalid_nested": {"a": {"b": "x"}}}), "$.invalid_nested.a.b", "string"),
        ];
        for (state, want_path, want_kind) in cases {
            match validate_state(&state) {
                Err(ConnectorError::InvalidState { path, kind }) => {
                    assert_eq!(path, want_path);
                    assert_eq!(kind, want_kind);
                }
                other => panic!("expected InvalidState for {state}, got {other:?}"),
            }
        }
    }

    #[test]
    fn top_level_must_be_object() {
        let err = validate_state(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidState { kind: "array", .. }));
        assert!(validate_state(&json!(3.5)).is_err());
    }

    #[test]
    fn full_interface() {
        let iface = validate_interface(&json!({
            "name": "cartpole",
            "timeout": 30,
            "description": "balancing pole",
            "capabilities": {"action": {"command": "number"}}
        }))
        .unwrap();
        assert_eq!(iface.name, "cartpole");
        assert_eq!(iface.timeout, 30);
        assert_eq!(iface.description.as_deref(), Some("balancing pole"));
        assert!(iface.capabilities.is_some());
        assert!(iface.simulator_context.is_none());
    }

    #[test]
    fn soft_problems_are_defaulted() {
        let iface = validate_interface(&json!({
            "name": "  sim  ",
            "timeout": "soon",
            "capabilities": [1, 2],
            "extra": true
        }))
        .unwrap();
        assert_eq!(iface.name, "sim");
        assert_eq!(iface.timeout, DEFAULT_TIMEOUT_SECS);
        assert!(iface.capabilities.is_none());

        let iface = validate_interface(&json!({"name": "sim"})).unwrap();
        assert_eq!(iface.timeout, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn missing_name_is_a_registration_error() {
        for bad in [json!({}), json!({"name": ""}), json!({"name": 3}), json!("sim")] {
            let err = validate_interface(&bad).unwrap_err();
            assert!(matches!(err, ConnectorError::Registration(_)), "{bad}");
        }
    }
}
