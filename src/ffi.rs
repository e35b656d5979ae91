//! FFI bindings for gait-flux
//!
//! This module provides C-compatible functions for embedding the filter in
//! other runtimes. Strings are null-terminated. Returned strings are owned by
//! the caller and must be freed with `gait_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::classifier::classify;
use crate::config::{BandThresholds, GaitConfig};
use crate::pipeline::GaitProcessor;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Classify a frequency/energy pair with the default thresholds.
///
/// Returns 0 standing, 1 walking, 2 running, 3 sprinting, -1 unknown.
#[no_mangle]
pub extern "C" fn gait_classify(frequency: f64, energy: f64) -> i32 {
    classify(&BandThresholds::default(), frequency, energy) as i32
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a GaitProcessor
pub struct GaitProcessorHandle {
    processor: GaitProcessor,
}

/// Create a processor, optionally configured from JSON.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `gait_processor_free`.
/// - Returns NULL on an invalid configuration; call `gait_last_error`.
#[no_mangle]
pub unsafe extern "C" fn gait_processor_new(config_json: *const c_char) -> *mut GaitProcessorHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        GaitConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match GaitConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match GaitProcessor::with_config(config) {
        Ok(processor) => Box::into_raw(Box::new(GaitProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `gait_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn gait_processor_free(processor: *mut GaitProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Feed one transport message through a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `gait_processor_new`.
/// - `message_json` must be a valid null-terminated C string.
/// - Returns command JSON when the motion state changed; free it with `gait_free_string`.
/// - Returns NULL when there is nothing to broadcast. `gait_last_error` is NULL in that
///   case and set when the message was rejected.
#[no_mangle]
pub unsafe extern "C" fn gait_processor_ingest(
    processor: *mut GaitProcessorHandle,
    message_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let json = match cstr_to_string(message_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid message string pointer");
            return ptr::null_mut();
        }
    };

    match handle.processor.process_message(&json) {
        Ok(Some(command)) => string_to_cstr(&command),
        Ok(None) => ptr::null_mut(),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Clear a processor's history and last reported state.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `gait_processor_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn gait_processor_reset(processor: *mut GaitProcessorHandle) {
    if let Some(handle) = processor.as_mut() {
        handle.processor.reset();
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by gait-flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a gait-flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn gait_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next gait-flux call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn gait_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn gait_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(json: &str) -> CString {
        CString::new(json).unwrap()
    }

    #[test]
    fn test_ffi_classify() {
        assert_eq!(gait_classify(0.8, 250.0), 1);
        assert_eq!(gait_classify(1.5, 280.0), -1);
        assert_eq!(gait_classify(0.0, 900.0), 3);
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let processor = gait_processor_new(ptr::null());
            assert!(!processor.is_null());

            // Priming sample: nothing to broadcast, and no error
            let prime = message(r#"{"type":"gait","timestamp":0,"peak":10,"trough":0}"#);
            let result = gait_processor_ingest(processor, prime.as_ptr());
            assert!(result.is_null());
            assert!(gait_last_error().is_null());

            let first = message(r#"{"type":"gait","timestamp":1,"peak":10,"trough":0}"#);
            let result = gait_processor_ingest(processor, first.as_ptr());
            assert!(!result.is_null());
            let command = CStr::from_ptr(result).to_str().unwrap();
            assert!(command.contains("\"gait\":\"standing\""));
            assert!(command.contains("\"bpm\":60"));
            gait_free_string(result);

            // Same state: nothing to broadcast, and no error
            let second = message(r#"{"type":"gait","timestamp":2,"peak":10,"trough":0}"#);
            let result = gait_processor_ingest(processor, second.as_ptr());
            assert!(result.is_null());
            assert!(gait_last_error().is_null());

            gait_processor_reset(processor);
            assert!(gait_processor_ingest(processor, prime.as_ptr()).is_null());
            let result = gait_processor_ingest(processor, first.as_ptr());
            assert!(!result.is_null());
            gait_free_string(result);

            gait_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_config() {
        unsafe {
            let config = message(r#"{"max_history_window": 4}"#);
            let processor = gait_processor_new(config.as_ptr());
            assert!(!processor.is_null());
            assert_eq!((*processor).processor.config().max_history_window, 4);
            gait_processor_free(processor);

            let bad = message(r#"{"max_history_window": 0}"#);
            let processor = gait_processor_new(bad.as_ptr());
            assert!(processor.is_null());
            assert!(!gait_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let processor = gait_processor_new(ptr::null());

            let first = message(r#"{"type":"gait","timestamp":3,"peak":10,"trough":0}"#);
            assert!(gait_processor_ingest(processor, first.as_ptr()).is_null());

            let stale = message(r#"{"type":"gait","timestamp":2,"peak":10,"trough":0}"#);
            let result = gait_processor_ingest(processor, stale.as_ptr());
            assert!(result.is_null());

            let error = gait_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("does not follow"));

            let result = gait_processor_ingest(ptr::null_mut(), first.as_ptr());
            assert!(result.is_null());

            gait_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = gait_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
