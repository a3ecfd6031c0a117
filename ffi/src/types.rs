//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! A single `FfiResult` envelope carries every outcome: an error category,
//! the engine's numeric code for transport failures, a message, the HTTP
//! status where one applies, and the response body. Conversion helpers live
//! here to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use ntlm_soap_core::{AuthenticatedSoapTransport, Error};

/// Opaque handle to a transport. C callers receive a pointer to this and
/// pass it back into every FFI function. Not thread-safe: use one handle per
/// thread.
pub struct FfiTransport {
    pub(crate) inner: AuthenticatedSoapTransport,
}

/// Error categories returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Configuration = 1,
    Transport = 2,
    State = 3,
    NullArg = 4,
    InvalidUtf8 = 5,
    Panic = 6,
}

/// Result envelope for fallible operations.
///
/// On success `error_code` is `Ok` and `error_message` is null. `body` is set
/// by `ntlm_soap_perform_request`, `response_code` by
/// `ntlm_soap_response_code`. On failure `error_message` is a C string and
/// `engine_code` holds the libcurl code for `Transport` errors.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub engine_code: i32,
    pub error_message: *mut c_char,
    pub response_code: u32,
    pub body: *mut c_char,
}

/// Convert to an owned C string, dropping interior NUL bytes.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let c = CString::new(s).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    c.into_raw()
}

impl FfiResult {
    fn boxed(self) -> *mut Self {
        Box::into_raw(Box::new(self))
    }

    fn empty(error_code: FfiErrorCode) -> Self {
        FfiResult {
            error_code,
            engine_code: 0,
            error_message: std::ptr::null_mut(),
            response_code: 0,
            body: std::ptr::null_mut(),
        }
    }

    pub(crate) fn ok_empty() -> *mut Self {
        Self::empty(FfiErrorCode::Ok).boxed()
    }

    pub(crate) fn ok_body(body: String) -> *mut Self {
        FfiResult {
            body: into_c_string(body),
            ..Self::empty(FfiErrorCode::Ok)
        }
        .boxed()
    }

    pub(crate) fn ok_response_code(code: u32) -> *mut Self {
        FfiResult {
            response_code: code,
            ..Self::empty(FfiErrorCode::Ok)
        }
        .boxed()
    }

    pub(crate) fn from_error(err: Error) -> *mut Self {
        let (error_code, engine_code) = match &err {
            Error::Configuration(_) => (FfiErrorCode::Configuration, 0),
            Error::Transport { code, .. } => (FfiErrorCode::Transport, *code),
            Error::State(_) => (FfiErrorCode::State, 0),
        };
        FfiResult {
            engine_code,
            error_message: into_c_string(err.to_string()),
            ..Self::empty(error_code)
        }
        .boxed()
    }

    fn failure(error_code: FfiErrorCode, msg: String) -> *mut Self {
        FfiResult {
            error_message: into_c_string(msg),
            ..Self::empty(error_code)
        }
        .boxed()
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, format!("null argument: {name}"))
    }

    pub(crate) fn invalid_utf8(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::InvalidUtf8, format!("argument is not UTF-8: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg.to_string())
    }
}
