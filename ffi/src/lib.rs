//! C-ABI wrapper around `ntlm-soap-core`.
//!
//! # Overview
//! Lets a host application written in any language with a C FFI use the
//! NTLM SOAP transport: create a transport from a JSON options object, send
//! envelopes, and read the diagnostics of the last exchange.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Options arrive as the same JSON object `ClientOptions` deserializes
//!   (`user`, `password`, `curlopts`, `strip_bad_chars`, `warn_on_bad_chars`).
//! - The C caller owns all returned pointers and must call the matching
//!   `ntlm_soap_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use ntlm_soap_core::{AuthenticatedSoapTransport, ClientOptions, SoapVersion, TransportConfig};

use types::*;

/// Why a C string argument could not be read.
enum ArgError {
    Null(&'static str),
    InvalidUtf8(&'static str),
}

impl ArgError {
    fn into_result(self) -> *mut FfiResult {
        match self {
            ArgError::Null(name) => FfiResult::null_arg(name),
            ArgError::InvalidUtf8(name) => FfiResult::invalid_utf8(name),
        }
    }
}

/// Borrow a C string argument as `&str`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn arg<'a>(ptr: *const c_char, name: &'static str) -> Result<&'a str, ArgError> {
    if ptr.is_null() {
        return Err(ArgError::Null(name));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| ArgError::InvalidUtf8(name))
}

fn build_transport(options_json: &str) -> ntlm_soap_core::Result<FfiTransport> {
    let options = ClientOptions::from_json(options_json)?;
    let config = TransportConfig::from_options(&options)?;
    Ok(FfiTransport {
        inner: AuthenticatedSoapTransport::new(config),
    })
}

// ---------------------------------------------------------------------------
// Transport lifecycle
// ---------------------------------------------------------------------------

/// Create a transport from a JSON options object.
///
/// Returns null if `options_json` is null, not valid JSON, or lacks a user
/// or password. Use `ntlm_soap_transport_new_checked` to learn why.
/// The caller must free the returned pointer with `ntlm_soap_transport_free`.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_transport_new(options_json: *const c_char) -> *mut FfiTransport {
    catch_unwind(|| {
        let Ok(json) = (unsafe { arg(options_json, "options_json") }) else {
            return std::ptr::null_mut();
        };
        match build_transport(json) {
            Ok(transport) => Box::into_raw(Box::new(transport)),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a transport, reporting failures through the returned result.
///
/// On success `*out` receives the transport. On failure `*out` is set to null
/// and the result describes the error. `out` must not be null.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_transport_new_checked(
    options_json: *const c_char,
    out: *mut *mut FfiTransport,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if out.is_null() {
            return FfiResult::null_arg("out");
        }
        unsafe { *out = std::ptr::null_mut() };
        let json = match unsafe { arg(options_json, "options_json") } {
            Ok(json) => json,
            Err(e) => return e.into_result(),
        };
        match build_transport(json) {
            Ok(transport) => {
                unsafe { *out = Box::into_raw(Box::new(transport)) };
                FfiResult::ok_empty()
            }
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in ntlm_soap_transport_new_checked"))
}

/// Free a transport and its connection handle. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_transport_free(transport: *mut FfiTransport) {
    if !transport.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(transport) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// POST `request` to `location` with SOAP action `action`.
///
/// `version` is the SOAP version (1 for 1.1, 2 for 1.2). Any other value
/// fails with `Configuration` before anything is sent or recorded, so the
/// transport's last-exchange state is left as it was. On success the
/// result's `body` holds the (sanitized) response body.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_perform_request(
    transport: *mut FfiTransport,
    request: *const c_char,
    location: *const c_char,
    action: *const c_char,
    version: i32,
    one_way: bool,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if transport.is_null() {
            return FfiResult::null_arg("transport");
        }
        let transport = unsafe { &mut *transport };
        let args = unsafe {
            (
                arg(request, "request"),
                arg(location, "location"),
                arg(action, "action"),
            )
        };
        let (request, location, action) = match args {
            (Ok(r), Ok(l), Ok(a)) => (r, l, a),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return e.into_result(),
        };
        let version = match SoapVersion::try_from(version) {
            Ok(v) => v,
            Err(e) => return FfiResult::from_error(e),
        };
        match transport
            .inner
            .perform_request(request, location, action, version, one_way)
        {
            Ok(body) => FfiResult::ok_body(body),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in ntlm_soap_perform_request"))
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// HTTP status of the last exchange, in the result's `response_code`.
///
/// Fails with `State` if no request has been made.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_response_code(transport: *const FfiTransport) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if transport.is_null() {
            return FfiResult::null_arg("transport");
        }
        let transport = unsafe { &*transport };
        match transport.inner.response_code() {
            Ok(code) => FfiResult::ok_response_code(code),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in ntlm_soap_response_code"))
}

/// Request headers of the last exchange, newline-separated with a trailing
/// newline. Returns null if `transport` is null. Free with
/// `ntlm_soap_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_last_request_headers(transport: *const FfiTransport) -> *mut c_char {
    with_transport(transport, |t| Some(t.last_request_headers()))
}

/// Raw response headers of the last exchange, or null when the last
/// exchange failed or none was made. Free with `ntlm_soap_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_last_response_headers(transport: *const FfiTransport) -> *mut c_char {
    with_transport(transport, |t| t.last_response_headers().map(str::to_string))
}

/// Body of the last response, or null when the last exchange failed or none
/// was made. Free with `ntlm_soap_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_last_response(transport: *const FfiTransport) -> *mut c_char {
    with_transport(transport, |t| t.last_response().map(str::to_string))
}

fn with_transport(
    transport: *const FfiTransport,
    f: impl FnOnce(&AuthenticatedSoapTransport) -> Option<String>,
) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if transport.is_null() {
            return std::ptr::null_mut();
        }
        let transport = unsafe { &*transport };
        f(&transport.inner).map_or(std::ptr::null_mut(), into_c_string)
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiResult` returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.body.is_null() {
            drop(unsafe { CString::from_raw(result.body) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ntlm_soap_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
