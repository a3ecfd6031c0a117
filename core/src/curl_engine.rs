//! libcurl-backed `HttpEngine`.
//!
//! libcurl performs the NTLM challenge/response itself when NTLM is among
//! the offered auth schemes, and keeps the authenticated connection alive
//! inside the easy handle. Reusing one `CurlHandle` across calls therefore
//! reuses both the socket and the negotiated session.

use std::time::Duration;

use curl::easy::{Auth, Easy2, Handler, HttpVersion as CurlHttpVersion, List, WriteError};
use tracing::trace;

use crate::config::{EngineOption, HttpVersion, OptionSet};
use crate::engine::{EngineHandle, HttpEngine, RawResponse};
use crate::error::EngineError;

/// Opens one libcurl easy handle per target.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurlEngine;

impl CurlEngine {
    pub fn new() -> Self {
        Self
    }
}

impl HttpEngine for CurlEngine {
    type Handle = CurlHandle;

    fn open(&mut self, location: &str) -> Result<CurlHandle, EngineError> {
        let mut easy = Easy2::new(Collector::default());
        easy.url(location).map_err(engine_error)?;
        Ok(CurlHandle {
            easy,
            include_header: false,
            status: 0,
            effective_url: None,
        })
    }
}

/// Buffers everything libcurl hands back and counts header bytes.
#[derive(Debug, Default)]
struct Collector {
    raw: Vec<u8>,
    header_size: usize,
}

impl Handler for Collector {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.raw.extend_from_slice(data);
        Ok(data.len())
    }

    fn header(&mut self, data: &[u8]) -> bool {
        self.header_size += data.len();
        true
    }
}

/// A libcurl easy handle plus the info captured from its last exchange.
pub struct CurlHandle {
    easy: Easy2<Collector>,
    include_header: bool,
    status: u32,
    effective_url: Option<String>,
}

impl std::fmt::Debug for CurlHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurlHandle")
            .field("status", &self.status)
            .field("effective_url", &self.effective_url)
            .finish_non_exhaustive()
    }
}

impl CurlHandle {
    fn apply(&mut self, option: &EngineOption) -> Result<(), curl::Error> {
        let easy = &mut self.easy;
        match option {
            EngineOption::SslVerifyPeer(on) => easy.ssl_verify_peer(*on),
            EngineOption::SslVerifyHost(on) => easy.ssl_verify_host(*on),
            // Output always lands in the collector buffer.
            EngineOption::ReturnTransfer(_) => Ok(()),
            EngineOption::HttpHeader(lines) => {
                let mut list = List::new();
                for line in lines {
                    list.append(line)?;
                }
                easy.http_headers(list)
            }
            EngineOption::HttpVersion(version) => easy.http_version(match version {
                HttpVersion::Http10 => CurlHttpVersion::V10,
                HttpVersion::Http11 => CurlHttpVersion::V11,
                HttpVersion::Http2 => CurlHttpVersion::V2,
            }),
            EngineOption::HttpAuth(schemes) => {
                let mut auth = Auth::new();
                auth.basic(schemes.basic).ntlm(schemes.ntlm);
                easy.http_auth(&auth)
            }
            EngineOption::UserPwd { user, password } => {
                easy.username(user)?;
                easy.password(password)
            }
            EngineOption::IncludeHeader(on) => {
                self.include_header = *on;
                easy.show_header(*on)
            }
            EngineOption::Post(on) => easy.post(*on),
            EngineOption::PostFields(body) => easy.post_fields_copy(body.as_bytes()),
            EngineOption::TimeoutMs(ms) => easy.timeout(Duration::from_millis(*ms)),
            EngineOption::ConnectTimeoutMs(ms) => easy.connect_timeout(Duration::from_millis(*ms)),
            EngineOption::Proxy(proxy) => easy.proxy(proxy),
            EngineOption::CaInfo(path) => easy.cainfo(path),
            EngineOption::FollowLocation(on) => easy.follow_location(*on),
            EngineOption::Verbose(on) => easy.verbose(*on),
        }
    }

    fn capture_info(&mut self) {
        self.status = self.easy.response_code().unwrap_or(0);
        self.effective_url = self
            .easy
            .effective_url()
            .ok()
            .flatten()
            .map(str::to_string);
    }
}

impl EngineHandle for CurlHandle {
    fn configure(&mut self, options: &OptionSet) -> Result<(), EngineError> {
        for option in options.iter() {
            self.apply(option).map_err(engine_error)?;
        }
        Ok(())
    }

    fn execute(&mut self) -> Result<RawResponse, EngineError> {
        let collector = self.easy.get_mut();
        collector.raw.clear();
        collector.header_size = 0;

        let outcome = self.easy.perform();
        self.capture_info();
        outcome.map_err(engine_error)?;

        let collector = self.easy.get_mut();
        let raw = std::mem::take(&mut collector.raw);
        let header_size = if self.include_header {
            collector.header_size
        } else {
            0
        };
        trace!(bytes = raw.len(), header_size, "curl exchange captured");
        Ok(RawResponse { raw, header_size })
    }

    fn response_code(&self) -> Result<u32, EngineError> {
        Ok(self.status)
    }

    fn effective_url(&self) -> Result<Option<String>, EngineError> {
        Ok(self.effective_url.clone())
    }
}

fn engine_error(err: curl::Error) -> EngineError {
    let message = err
        .extra_description()
        .unwrap_or_else(|| err.description())
        .to_string();
    let code = i32::try_from(err.code()).unwrap_or(i32::MAX);
    EngineError::new(code, message)
}
