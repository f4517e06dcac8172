//! Wire protocol between the host and the native bridge library.
//!
//! The host passes a [`BridgeRequest`] as a NUL-terminated JSON string and
//! receives a [`BridgeEnvelope`] back, also as JSON. Exactly one of `ok` and
//! `error` is set in a well-formed envelope.

use serde::{Deserialize, Serialize};

use crate::CommandOutput;

/// Envelope format version. Bumped on incompatible changes.
pub const PROTOCOL_VERSION: &str = "1";

/// Exported symbol that runs a request.
pub const SYMBOL_RUN: &str = "ardukit_bridge_run";
/// Exported symbol that releases strings returned by the bridge.
pub const SYMBOL_FREE: &str = "ardukit_bridge_free";
/// Exported symbol that reports the protocol version.
pub const SYMBOL_VERSION: &str = "ardukit_bridge_version";

// Bridge error codes
/// Request could not be decoded.
pub const ERROR_CODE_INVALID_INPUT: &str = "INVALID_INPUT";
/// The program could not be spawned.
pub const ERROR_CODE_SPAWN: &str = "SPAWN";
/// Waiting on or reading from the child failed.
pub const ERROR_CODE_WAIT: &str = "WAIT";
/// The program exceeded its timeout and was killed.
pub const ERROR_CODE_TIMEOUT: &str = "TIMEOUT";

/// A single program invocation sent to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    /// Absolute path of the program to run.
    pub program: String,
    /// Discrete argument tokens; never shell-interpreted.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Kill the child after this many milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Error payload returned by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeError {
    /// One of the `ERROR_CODE_*` constants.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl BridgeError {
    /// Create an error payload without a hint.
    #[must_use]
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            hint: None,
        }
    }
}

/// Structured response from the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeEnvelope {
    /// Protocol version of the responding bridge.
    pub version: String,
    /// Set when the program ran to completion (whatever its exit status).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<CommandOutput>,
    /// Set when the program could not be run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BridgeError>,
}

impl BridgeEnvelope {
    /// Envelope for a completed run.
    #[must_use]
    pub fn ok(output: CommandOutput) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            ok: Some(output),
            error: None,
        }
    }

    /// Envelope for a failed run.
    #[must_use]
    pub fn err(error: BridgeError) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            ok: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_shape() {
        let req = BridgeRequest {
            program: "/tmp/arduino-cli".to_string(),
            args: vec!["compile".to_string(), "--fqbn".to_string()],
            cwd: None,
            timeout_ms: Some(5000),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["timeoutMs"], 5000);
        assert!(json.get("cwd").is_none());
    }

    #[test]
    fn test_request_defaults() {
        let req: BridgeRequest = serde_json::from_str(r#"{"program":"x"}"#).unwrap();
        assert!(req.args.is_empty());
        assert_eq!(req.timeout_ms, None);
    }

    #[test]
    fn test_envelope_ok_omits_error() {
        let env = BridgeEnvelope::ok(CommandOutput::new("2.0.0", "", Some(0)));
        let json = serde_json::to_string(&env).unwrap();
        assert!(!json.contains("\"error\""));
        let parsed: BridgeEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn test_envelope_err() {
        let env = BridgeEnvelope::err(BridgeError::new(ERROR_CODE_SPAWN, "no such file"));
        assert_eq!(env.version, PROTOCOL_VERSION);
        assert!(env.ok.is_none());
        assert_eq!(env.error.unwrap().code, "SPAWN");
    }
}
