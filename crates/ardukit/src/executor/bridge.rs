//! Native bridge backend.
//!
//! The bridge is a small `cdylib` shipped alongside arduino-cli. It is loaded
//! once per session and every call goes through a JSON request/envelope pair,
//! see [`ardukit_core::bridge`].

#![allow(unsafe_code)] // dlopen/dlsym and calls across the C ABI

use ardukit_core::bridge::{
    BridgeEnvelope, BridgeRequest, ERROR_CODE_SPAWN, ERROR_CODE_TIMEOUT, PROTOCOL_VERSION,
};
use ardukit_core::{CommandOutput, Error, Result};
use async_trait::async_trait;
use std::ffi::{CStr, CString, c_char};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

use super::{Executor, Invocation};

type RunFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type FreeFn = unsafe extern "C" fn(*mut c_char);
type VersionFn = unsafe extern "C" fn() -> *mut c_char;

/// A loaded native bridge library.
///
/// The library stays mapped until this value is dropped.
#[cfg_attr(not(unix), allow(dead_code))]
pub struct NativeBridge {
    path: PathBuf,
    #[cfg(unix)]
    handle: *mut libc::c_void,
    run: RunFn,
    free: FreeFn,
    version: String,
}

// SAFETY: the handle is only touched by Drop, and the exported functions
// keep no shared state between calls.
unsafe impl Send for NativeBridge {}
unsafe impl Sync for NativeBridge {}

impl std::fmt::Debug for NativeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBridge")
            .field("path", &self.path)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Owns a string returned by the bridge and frees it with the bridge's allocator.
struct BridgeString {
    ptr: *mut c_char,
    free: FreeFn,
}

impl BridgeString {
    fn to_owned_string(&self) -> Option<String> {
        if self.ptr.is_null() {
            return None;
        }
        // SAFETY: non-null pointers from the bridge are NUL-terminated and
        // live until we call `free` in Drop.
        let raw = unsafe { CStr::from_ptr(self.ptr) };
        Some(raw.to_string_lossy().into_owned())
    }
}

impl Drop for BridgeString {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: ptr came from this bridge and is freed exactly once.
            unsafe { (self.free)(self.ptr) };
        }
    }
}

impl NativeBridge {
    /// Load the bridge library at `path` and check its protocol version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeLoadFailure`] if the library cannot be opened,
    /// lacks one of the expected symbols, or speaks another protocol version.
    #[cfg(unix)]
    pub fn load(path: &Path) -> Result<Self> {
        use ardukit_core::bridge::{SYMBOL_FREE, SYMBOL_RUN, SYMBOL_VERSION};

        let path_c = CString::new(path.as_os_str().as_encoded_bytes())
            .map_err(|e| Error::bridge_load(path, e.to_string()))?;

        // SAFETY: path_c is a valid C string; dlopen has no other preconditions.
        let handle = unsafe { libc::dlopen(path_c.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(Error::bridge_load(
                path,
                format!("dlopen failed: {}", last_dl_error()),
            ));
        }

        let lookup = |name: &str| -> Result<*mut libc::c_void> {
            let name_c = CString::new(name).map_err(|e| Error::bridge_load(path, e.to_string()))?;
            // SAFETY: handle is a live dlopen handle, name_c a valid C string.
            let sym = unsafe { libc::dlsym(handle, name_c.as_ptr()) };
            if sym.is_null() {
                Err(Error::bridge_load(path, format!("missing symbol {name}")))
            } else {
                Ok(sym)
            }
        };

        let resolved: Result<Vec<_>> = [SYMBOL_RUN, SYMBOL_FREE, SYMBOL_VERSION]
            .into_iter()
            .map(lookup)
            .collect();
        let symbols = match resolved {
            Ok(symbols) => symbols,
            Err(e) => {
                // SAFETY: handle is live and not used after this point.
                unsafe { libc::dlclose(handle) };
                return Err(e);
            }
        };
        let (run_sym, free_sym, version_sym) = (symbols[0], symbols[1], symbols[2]);

        // SAFETY: the symbols are the bridge's exported functions, whose
        // signatures match these aliases.
        let (run, free, version_fn) = unsafe {
            (
                std::mem::transmute::<*mut libc::c_void, RunFn>(run_sym),
                std::mem::transmute::<*mut libc::c_void, FreeFn>(free_sym),
                std::mem::transmute::<*mut libc::c_void, VersionFn>(version_sym),
            )
        };

        // SAFETY: version takes no arguments and returns a string we own.
        let version = BridgeString {
            ptr: unsafe { version_fn() },
            free,
        }
        .to_owned_string()
        .unwrap_or_default();

        // From here on Drop unloads the library.
        let bridge = Self {
            path: path.to_path_buf(),
            handle,
            run,
            free,
            version,
        };

        if bridge.version != PROTOCOL_VERSION {
            return Err(Error::bridge_load(
                path,
                format!(
                    "protocol version mismatch: library speaks '{}', expected '{PROTOCOL_VERSION}'",
                    bridge.version
                ),
            ));
        }

        debug!(path = %path.display(), version = %bridge.version, "Loaded native bridge");
        Ok(bridge)
    }

    /// Load the bridge library at `path`.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::BridgeLoadFailure`]: dynamic loading is only
    /// implemented for unix hosts.
    #[cfg(not(unix))]
    pub fn load(path: &Path) -> Result<Self> {
        Err(Error::bridge_load(
            path,
            "native bridge loading is only supported on unix hosts",
        ))
    }

    /// Path the library was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Protocol version reported by the library.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Send one request and decode the envelope. Blocks until the child exits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bridge`] if the request cannot be encoded or the
    /// library returns nothing or malformed JSON.
    pub fn call(&self, request: &BridgeRequest) -> Result<BridgeEnvelope> {
        let json = serde_json::to_string(request)
            .map_err(|e| Error::bridge(format!("cannot encode request: {e}")))?;
        let json_c = CString::new(json)
            .map_err(|e| Error::bridge(format!("request contains NUL byte: {e}")))?;

        // SAFETY: json_c outlives the call; the result is freed by BridgeString.
        let response = BridgeString {
            ptr: unsafe { (self.run)(json_c.as_ptr()) },
            free: self.free,
        };

        let Some(text) = response.to_owned_string() else {
            error!(path = %self.path.display(), "Native bridge returned null");
            return Err(Error::bridge("native bridge returned no response"));
        };
        serde_json::from_str(&text).map_err(|e| {
            error!(response = %text, "Invalid envelope from native bridge");
            Error::bridge(format!("invalid envelope from native bridge: {e}"))
        })
    }
}

#[cfg(unix)]
impl Drop for NativeBridge {
    fn drop(&mut self) {
        // SAFETY: handle came from dlopen and no function pointers outlive self.
        if unsafe { libc::dlclose(self.handle) } != 0 {
            tracing::warn!(path = %self.path.display(), error = %last_dl_error(), "dlclose failed");
        }
    }
}

#[cfg(unix)]
fn last_dl_error() -> String {
    // SAFETY: dlerror returns null or a thread-local NUL-terminated string.
    let err = unsafe { libc::dlerror() };
    if err.is_null() {
        "unknown error".to_string()
    } else {
        // SAFETY: checked non-null above.
        unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned()
    }
}

/// Turn a bridge envelope into the executor's result.
fn envelope_into_output(envelope: BridgeEnvelope, invocation: &Invocation) -> Result<CommandOutput> {
    if envelope.version != PROTOCOL_VERSION {
        return Err(Error::bridge(format!(
            "unexpected envelope version '{}'",
            envelope.version
        )));
    }

    if let Some(bridge_error) = envelope.error {
        debug!(code = %bridge_error.code, message = %bridge_error.message, "Bridge reported error");
        return Err(match bridge_error.code.as_str() {
            ERROR_CODE_SPAWN => Error::execution(
                &invocation.program,
                std::io::Error::other(bridge_error.message),
            ),
            ERROR_CODE_TIMEOUT => Error::Timeout {
                program: invocation.program.clone(),
                timeout: invocation.timeout.unwrap_or_default(),
            },
            code => Error::bridge(format!("{code}: {}", bridge_error.message)),
        });
    }

    envelope
        .ok
        .ok_or_else(|| Error::bridge("bridge envelope has neither 'ok' nor 'error'"))
}

/// Runs invocations through a [`NativeBridge`] on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct BridgeExecutor {
    bridge: Arc<NativeBridge>,
}

impl BridgeExecutor {
    /// Executor backed by a loaded bridge.
    #[must_use]
    pub fn new(bridge: Arc<NativeBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Executor for BridgeExecutor {
    fn name(&self) -> &'static str {
        "bridge"
    }

    #[tracing::instrument(
        name = "bridge_run",
        skip_all,
        fields(program = %invocation.program.display(), command = %invocation.command_line()),
        level = "debug"
    )]
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let request = BridgeRequest {
            program: invocation.program.to_string_lossy().into_owned(),
            args: invocation.args.clone(),
            cwd: invocation
                .cwd
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned()),
            timeout_ms: invocation
                .timeout
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
        };

        let bridge = Arc::clone(&self.bridge);
        let envelope = tokio::task::spawn_blocking(move || bridge.call(&request))
            .await
            .map_err(|e| Error::bridge(format!("bridge task failed: {e}")))??;

        envelope_into_output(envelope, invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ardukit_core::bridge::{BridgeError, ERROR_CODE_INVALID_INPUT};
    use std::time::Duration;

    fn invocation() -> Invocation {
        Invocation::new("/tmp/ardukit_x/arduino-cli")
            .args(["compile", "--fqbn", "arduino:avr:uno", "Blink"])
            .timeout(Some(Duration::from_secs(30)))
    }

    #[test]
    fn test_ok_envelope_passes_output_through() {
        let env = BridgeEnvelope::ok(CommandOutput::new("done", "", Some(0)));
        let out = envelope_into_output(env, &invocation()).unwrap();
        assert_eq!(out.stdout(), "done");
    }

    #[test]
    fn test_non_zero_exit_is_still_ok() {
        let env = BridgeEnvelope::ok(CommandOutput::new("", "boom", Some(1)));
        let out = envelope_into_output(env, &invocation()).unwrap();
        assert_eq!(out.exit_code(), Some(1));
    }

    #[test]
    fn test_spawn_error_maps_to_execution_failure() {
        let env = BridgeEnvelope::err(BridgeError::new(ERROR_CODE_SPAWN, "No such file"));
        let err = envelope_into_output(env, &invocation()).unwrap_err();
        assert!(matches!(err, Error::ExecutionFailure { .. }));
    }

    #[test]
    fn test_timeout_error_maps_to_timeout() {
        let env = BridgeEnvelope::err(BridgeError::new(ERROR_CODE_TIMEOUT, "killed"));
        match envelope_into_output(env, &invocation()).unwrap_err() {
            Error::Timeout { timeout, .. } => assert_eq!(timeout, Duration::from_secs(30)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_other_codes_map_to_bridge_error() {
        let env = BridgeEnvelope::err(BridgeError::new(ERROR_CODE_INVALID_INPUT, "bad json"));
        let err = envelope_into_output(env, &invocation()).unwrap_err();
        assert!(matches!(err, Error::Bridge { .. }));
        assert!(err.to_string().contains("bad json"));
    }

    #[test]
    fn test_empty_envelope_is_rejected() {
        let env = BridgeEnvelope {
            version: PROTOCOL_VERSION.to_string(),
            ok: None,
            error: None,
        };
        assert!(matches!(
            envelope_into_output(env, &invocation()),
            Err(Error::Bridge { .. })
        ));
    }

    #[test]
    fn test_foreign_version_is_rejected() {
        let mut env = BridgeEnvelope::ok(CommandOutput::new("", "", Some(0)));
        env.version = "99".to_string();
        assert!(matches!(
            envelope_into_output(env, &invocation()),
            Err(Error::Bridge { .. })
        ));
    }

    #[test]
    fn test_load_missing_library() {
        let err = NativeBridge::load(Path::new("/nonexistent/libardukit_bridge.so")).unwrap_err();
        assert!(matches!(err, Error::BridgeLoadFailure { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_garbage_library() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("libardukit_bridge.so");
        std::fs::write(&path, b"not a shared object").unwrap();
        let err = NativeBridge::load(&path).unwrap_err();
        assert!(err.to_string().contains("libardukit_bridge.so"));
    }
}
