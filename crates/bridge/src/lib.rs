//! Native bridge library for ardukit
//!
//! Built as a `cdylib`, embedded next to the arduino-cli binary and loaded by
//! the host at runtime. It exposes a narrow C ABI:
//!
//! - `ardukit_bridge_run(request_json) -> envelope_json`
//! - `ardukit_bridge_version() -> version`
//! - `ardukit_bridge_free(ptr)` for every string returned by the two above
//!
//! Requests and envelopes are JSON, see [`ardukit_core::bridge`].

#![allow(unsafe_code)] // Required for the exported C ABI
#![allow(clippy::missing_safety_doc)] // Safety is documented inline

pub mod runner;

use ardukit_core::bridge::{
    BridgeEnvelope, BridgeError, BridgeRequest, ERROR_CODE_INVALID_INPUT, PROTOCOL_VERSION,
};
use std::ffi::{CStr, CString, c_char};

/// Decode a JSON request, run it, and encode the JSON envelope.
///
/// This is the safe core of [`ardukit_bridge_run`].
#[must_use]
pub fn handle_request(request_json: &str) -> String {
    let envelope = match serde_json::from_str::<BridgeRequest>(request_json) {
        Ok(request) => match runner::run(&request) {
            Ok(output) => BridgeEnvelope::ok(output),
            Err(error) => BridgeEnvelope::err(error),
        },
        Err(e) => BridgeEnvelope::err(BridgeError::new(
            ERROR_CODE_INVALID_INPUT,
            format!("invalid request JSON: {e}"),
        )),
    };
    encode(&envelope)
}

fn encode(envelope: &BridgeEnvelope) -> String {
    serde_json::to_string(envelope).unwrap_or_else(|e| {
        format!(
            r#"{{"version":"{PROTOCOL_VERSION}","error":{{"code":"{ERROR_CODE_INVALID_INPUT}","message":"cannot encode envelope: {}"}}}}"#,
            e.to_string().replace('"', "'")
        )
    })
}

fn into_raw(s: String) -> *mut c_char {
    // serde_json escapes NUL, so this only fails on a broken invariant
    CString::new(s).map_or(std::ptr::null_mut(), CString::into_raw)
}

/// Run one request.
///
/// # Safety
///
/// `request_json` must be null or a valid NUL-terminated string that stays
/// alive for the duration of the call. The returned pointer must be released
/// with [`ardukit_bridge_free`] and never freed any other way.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ardukit_bridge_run(request_json: *const c_char) -> *mut c_char {
    if request_json.is_null() {
        return into_raw(encode(&BridgeEnvelope::err(BridgeError::new(
            ERROR_CODE_INVALID_INPUT,
            "request pointer is null",
        ))));
    }

    // SAFETY: non-null and NUL-terminated per the caller contract above
    let raw = unsafe { CStr::from_ptr(request_json) };
    let response = match raw.to_str() {
        Ok(json) => handle_request(json),
        Err(e) => encode(&BridgeEnvelope::err(BridgeError::new(
            ERROR_CODE_INVALID_INPUT,
            format!("request is not UTF-8: {e}"),
        ))),
    };
    into_raw(response)
}

/// Protocol version implemented by this library.
///
/// The returned pointer must be released with [`ardukit_bridge_free`].
#[unsafe(no_mangle)]
pub extern "C" fn ardukit_bridge_version() -> *mut c_char {
    into_raw(PROTOCOL_VERSION.to_string())
}

/// Release a string returned by this library.
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by this library that
/// has not been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ardukit_bridge_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        // SAFETY: ptr came from CString::into_raw in this library and is freed once
        drop(unsafe { CString::from_raw(ptr) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { ardukit_bridge_free(ptr) };
        s
    }

    #[test]
    fn test_version_roundtrip() {
        assert_eq!(take(ardukit_bridge_version()), PROTOCOL_VERSION);
    }

    #[test]
    fn test_null_request() {
        let json = take(unsafe { ardukit_bridge_run(std::ptr::null()) });
        let env: BridgeEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(env.error.unwrap().code, ERROR_CODE_INVALID_INPUT);
    }

    #[test]
    fn test_invalid_json_request() {
        let env: BridgeEnvelope = serde_json::from_str(&handle_request("{not json")).unwrap();
        assert!(env.ok.is_none());
        let error = env.error.unwrap();
        assert_eq!(error.code, ERROR_CODE_INVALID_INPUT);
        assert!(error.message.contains("invalid request JSON"));
    }

    #[test]
    fn test_free_null_is_noop() {
        unsafe { ardukit_bridge_free(std::ptr::null_mut()) };
    }

    #[cfg(unix)]
    #[test]
    fn test_run_through_c_abi() {
        let request = serde_json::to_string(&BridgeRequest {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "echo 2.0.0".to_string()],
            cwd: None,
            timeout_ms: Some(10_000),
        })
        .unwrap();
        let c_request = CString::new(request).unwrap();

        let json = take(unsafe { ardukit_bridge_run(c_request.as_ptr()) });
        let env: BridgeEnvelope = serde_json::from_str(&json).unwrap();

        let output = env.ok.unwrap();
        assert_eq!(output.stdout(), "2.0.0");
        assert_eq!(output.exit_code(), Some(0));
        assert_eq!(env.version, PROTOCOL_VERSION);
    }
}
