//! FFI bindings for Synheart Proctor
//!
//! C-compatible functions for embedding the engine in a host runtime. Strings are
//! null-terminated UTF-8; every string returned by this module must be freed by the
//! caller using `proctor_free_string`. Timestamps are Unix epoch milliseconds.
//!
//! The engine is polled rather than called back: incidents, warnings and violations
//! are buffered per handle and collected with `proctor_engine_drain_events`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, TimeZone, Utc};

use crate::config::ProctorConfig;
use crate::encoder::ReportEncoder;
use crate::engine::ProctoringEngine;
use crate::error::ProctorError;
use crate::observation::Observation;
use crate::sink::RecordingSink;
use crate::types::Disposition;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn millis_to_utc(at_ms: i64) -> Option<DateTime<Utc>> {
    let at = Utc.timestamp_millis_opt(at_ms).single();
    if at.is_none() {
        set_last_error("Timestamp out of range");
    }
    at
}

/// Integer code returned by `proctor_engine_ingest`
fn disposition_code(disposition: Disposition) -> i32 {
    match disposition {
        Disposition::Allow => 0,
        Disposition::Prevent => 1,
        Disposition::PreventAndClearClipboard => 2,
    }
}

// ============================================================================
// Engine API
// ============================================================================

/// Opaque handle to a ProctoringEngine
pub struct ProctorEngineHandle {
    engine: ProctoringEngine,
    events: RecordingSink,
    encoder: ReportEncoder,
}

/// Create a new engine from a JSON configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Returns a pointer that must be freed with `proctor_engine_free`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_new(
    config_json: *const c_char,
) -> *mut ProctorEngineHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        ProctorConfig::default()
    } else {
        let json_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match ProctorConfig::from_json(&json_str) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let events = RecordingSink::new();
    match ProctoringEngine::new(config, events.clone()) {
        Ok(engine) => Box::into_raw(Box::new(ProctorEngineHandle {
            engine,
            events,
            encoder: ReportEncoder::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine. Monitoring is stopped first.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `proctor_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_free(handle: *mut ProctorEngineHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Start monitoring.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `proctor_engine_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_start(handle: *mut ProctorEngineHandle, at_ms: i64) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }
    let Some(at) = millis_to_utc(at_ms) else {
        return -1;
    };

    (*handle).engine.start(at);
    0
}

/// Stop monitoring. Counters are kept until the engine is freed.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `proctor_engine_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_stop(handle: *mut ProctorEngineHandle) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    (*handle).engine.stop();
    0
}

/// Classify one JSON-encoded observation.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `proctor_engine_new`.
/// - `observation_json` must be a valid null-terminated C string.
/// - Returns 0 to allow the native event, 1 to prevent it, 2 to prevent it and clear
///   the clipboard payload; -1 on error.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_ingest(
    handle: *mut ProctorEngineHandle,
    at_ms: i64,
    observation_json: *const c_char,
) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }
    let Some(at) = millis_to_utc(at_ms) else {
        return -1;
    };

    let json_str = match cstr_to_string(observation_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid observation string pointer");
            return -1;
        }
    };

    let observation: Observation = match serde_json::from_str(&json_str) {
        Ok(observation) => observation,
        Err(e) => {
            set_last_error(&ProctorError::ParseError(format!("observation: {}", e)).to_string());
            return -1;
        }
    };

    disposition_code((*handle).engine.ingest(at, observation))
}

/// Disposition for a right-click menu: 1 while the guard is active, else 0.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `proctor_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_context_menu(handle: *const ProctorEngineHandle) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    disposition_code((*handle).engine.context_menu())
}

/// Fire every timed collector due at `at_ms`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `proctor_engine_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_tick(handle: *mut ProctorEngineHandle, at_ms: i64) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }
    let Some(at) = millis_to_utc(at_ms) else {
        return -1;
    };

    (*handle).engine.tick(at);
    0
}

/// Take buffered sink events as a JSON array.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `proctor_engine_new`.
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_drain_events(
    handle: *mut ProctorEngineHandle,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let events = (*handle).events.drain();
    match serde_json::to_string(&events) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Encode the session report as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `proctor_engine_new`.
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_report(
    handle: *const ProctorEngineHandle,
    at_ms: i64,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let Some(at) = millis_to_utc(at_ms) else {
        return ptr::null_mut();
    };

    let handle = &*handle;
    match handle.encoder.encode_to_json(&handle.engine, at) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Proctor functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Proctor function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn proctor_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Proctor function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn proctor_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Proctor library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn proctor_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkEvent;

    const T0: i64 = 1_705_327_200_000;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        proctor_free_string(ptr);
        s
    }

    unsafe fn ingest(handle: *mut ProctorEngineHandle, at_ms: i64, json: &str) -> i32 {
        let json = CString::new(json).unwrap();
        proctor_engine_ingest(handle, at_ms, json.as_ptr())
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        unsafe {
            let handle = proctor_engine_new(ptr::null());
            assert!(!handle.is_null());
            assert_eq!(proctor_engine_start(handle, T0), 0);

            assert_eq!(ingest(handle, T0 + 1_000, r#"{"kind":"visibility","hidden":true}"#), 0);
            assert_eq!(ingest(handle, T0 + 1_500, r#"{"kind":"visibility","hidden":false}"#), 0);
            assert_eq!(
                ingest(handle, T0 + 2_000, r#"{"kind":"clipboard","operation":"copy"}"#),
                2
            );
            assert_eq!(
                ingest(
                    handle,
                    T0 + 3_000,
                    r#"{"kind":"key","chord":{"key":"v","ctrl":true}}"#
                ),
                1
            );
            assert_eq!(proctor_engine_context_menu(handle), 1);
            assert_eq!(proctor_engine_tick(handle, T0 + 30_000), 0);

            let events: Vec<SinkEvent> =
                serde_json::from_str(&take_string(proctor_engine_drain_events(handle))).unwrap();
            let incidents = events
                .iter()
                .filter(|e| matches!(e, SinkEvent::Incident { .. }))
                .count();
            assert_eq!(incidents, 3);

            // Drained events are gone, but the report keeps the log
            let again = take_string(proctor_engine_drain_events(handle));
            assert_eq!(again, "[]");

            let report = take_string(proctor_engine_report(handle, T0 + 60_000));
            assert!(report.contains("\"tab_switch_count\": 1"));

            assert_eq!(proctor_engine_stop(handle), 0);
            assert_eq!(proctor_engine_context_menu(handle), 0);
            proctor_engine_free(handle);
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        unsafe {
            let config = CString::new(r#"{"frame_interval_ms": 0}"#).unwrap();
            let handle = proctor_engine_new(config.as_ptr());
            assert!(handle.is_null());

            let error = proctor_last_error();
            assert!(!error.is_null());
            let message = CStr::from_ptr(error).to_str().unwrap();
            assert!(message.contains("frame_interval_ms"));
        }
    }

    #[test]
    fn test_ffi_bad_observation() {
        unsafe {
            let handle = proctor_engine_new(ptr::null());
            proctor_engine_start(handle, T0);
            assert_eq!(ingest(handle, T0, r#"{"kind":"teleport"}"#), -1);
            let message = CStr::from_ptr(proctor_last_error()).to_str().unwrap();
            assert!(message.starts_with("Failed to parse input: observation"));
            proctor_engine_free(handle);
        }
    }

    #[test]
    fn test_ffi_null_handles() {
        unsafe {
            assert_eq!(proctor_engine_tick(ptr::null_mut(), T0), -1);
            assert!(proctor_engine_drain_events(ptr::null_mut()).is_null());
            proctor_engine_free(ptr::null_mut());
            proctor_free_string(ptr::null_mut());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = CStr::from_ptr(proctor_version()).to_str().unwrap();
            assert_eq!(version, env!("CARGO_PKG_VERSION"));
        }
    }
}
