//! HTTP execution engine abstraction.
//!
//! # Design
//! The transport never speaks HTTP itself. It asks an `HttpEngine` for a
//! handle bound to a URL, configures the handle with an `OptionSet`, and
//! executes it. The handle owns whatever connection state the engine keeps
//! (sockets, negotiated NTLM context), which is why the transport holds on
//! to it between calls to the same location.
//!
//! `RawResponse` mirrors what libcurl returns with header output enabled:
//! every header block the exchange produced (including `401` challenges and
//! `100 Continue`) followed by the final body, plus the byte length of the
//! header part as counted by the engine.

use crate::config::OptionSet;
use crate::error::EngineError;

/// Creates connection handles bound to a target URL.
pub trait HttpEngine {
    type Handle: EngineHandle;

    fn open(&mut self, location: &str) -> Result<Self::Handle, EngineError>;
}

/// A reusable, configured connection to one target.
pub trait EngineHandle {
    /// Apply options for the next exchange. Options not present in `options`
    /// keep whatever value the handle already has.
    fn configure(&mut self, options: &OptionSet) -> Result<(), EngineError>;

    /// Run one exchange synchronously and return the captured output.
    fn execute(&mut self) -> Result<RawResponse, EngineError>;

    /// Status code of the last executed exchange, `0` if none completed.
    fn response_code(&self) -> Result<u32, EngineError>;

    /// URL the last exchange ended up at.
    fn effective_url(&self) -> Result<Option<String>, EngineError>;
}

/// Raw engine output: header blocks followed by the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub raw: Vec<u8>,
    pub header_size: usize,
}

impl RawResponse {
    pub fn new(raw: impl Into<Vec<u8>>, header_size: usize) -> Self {
        Self {
            raw: raw.into(),
            header_size,
        }
    }

    /// Split into `(headers, body)` at the engine-reported header length.
    ///
    /// A header size past the end of the buffer yields an empty body. Bytes
    /// that are not valid UTF-8 are replaced.
    pub fn split(&self) -> (String, String) {
        let at = self.header_size.min(self.raw.len());
        let (headers, body) = self.raw.split_at(at);
        (
            String::from_utf8_lossy(headers).into_owned(),
            String::from_utf8_lossy(body).into_owned(),
        )
    }
}
