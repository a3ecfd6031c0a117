//! Error types for the NTLM SOAP transport.
//!
//! # Design
//! Three failure classes reach the caller. `Configuration` is raised before
//! any network activity when credentials are missing. `Transport` is raised
//! when the HTTP exchange itself fails and carries the engine's numeric code
//! so callers can tell a refused connection from a TLS failure. `State` is
//! raised by diagnostic accessors that need a completed exchange.
//!
//! SOAP faults are not represented here: a response body that happens to be
//! a fault envelope is still a successful exchange at this layer.

use thiserror::Error;

/// Errors returned by the transport and the SOAP client seam.
#[derive(Error, Debug)]
pub enum Error {
    /// Required construction options are missing or inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The HTTP exchange failed below the SOAP layer.
    #[error("curl error {code}: {message}")]
    Transport { code: i32, message: String },

    /// A diagnostic accessor was called before any exchange happened.
    #[error("invalid state: {0}")]
    State(&'static str),
}

impl Error {
    /// The engine error code for transport failures.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failure reported by an HTTP engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        Error::Transport {
            code: e.code,
            message: e.message,
        }
    }
}
