//! SOAP-over-HTTP transport authenticating with NTLM or Basic credentials.
//!
//! # Design
//! `AuthenticatedSoapTransport` performs one POST per SOAP call through an
//! injected `HttpEngine`. It keeps exactly one connection handle, bound to
//! the location of the previous request; a request to the same location
//! reuses the handle (and with it the kept-alive, already authenticated
//! connection), any other location replaces it.
//!
//! The most recent request and response are recorded on the instance for
//! diagnostics. Both this record and the handle are plain `&mut self` state,
//! so one instance serves one caller at a time. Use separate instances for
//! concurrent calls.

use std::fmt;

use tracing::{debug, warn};

use crate::config::{AuthSchemes, EngineOption, HttpVersion, OptionSet, TransportConfig};
use crate::curl_engine::CurlEngine;
use crate::engine::{EngineHandle, HttpEngine};
use crate::error::{Error, Result};
use crate::sanitize::strip_bad_chars;
use crate::soap::{SoapTransport, SoapVersion};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("ntlm-soap/", env!("CARGO_PKG_VERSION"));

/// Response half of an exchange. Headers and body are recorded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResponse {
    pub headers: String,
    pub body: String,
}

/// Record of the most recent exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastExchange {
    pub request_body: String,
    pub request_headers: Vec<String>,
    /// `None` before the first response and after a failed exchange.
    pub response: Option<ExchangeResponse>,
}

struct Connection<H> {
    location: String,
    handle: H,
}

/// NTLM/Basic authenticating SOAP transport.
pub struct AuthenticatedSoapTransport<E: HttpEngine = CurlEngine> {
    config: TransportConfig,
    engine: E,
    connection: Option<Connection<E::Handle>>,
    last: LastExchange,
}

impl AuthenticatedSoapTransport<CurlEngine> {
    pub fn new(config: TransportConfig) -> Self {
        Self::with_engine(config, CurlEngine::new())
    }
}

impl<E: HttpEngine> AuthenticatedSoapTransport<E> {
    pub fn with_engine(config: TransportConfig, engine: E) -> Self {
        Self {
            config,
            engine,
            connection: None,
            last: LastExchange::default(),
        }
    }

    /// Request headers for a call to `action`, in wire order.
    ///
    /// `action` is inserted verbatim into the quoted `SOAPAction` value.
    pub fn build_headers(action: &str) -> Vec<String> {
        vec![
            "Method: POST".to_string(),
            "Connection: Keep-Alive".to_string(),
            format!("User-Agent: {USER_AGENT}"),
            "Content-Type: text/xml; charset=utf-8".to_string(),
            format!("SOAPAction: \"{action}\""),
            "Expect: 100-continue".to_string(),
        ]
    }

    /// Engine options for one exchange.
    ///
    /// Passthrough options are applied first; the protocol defaults and then
    /// the exchange-critical options overwrite any passthrough option of the
    /// same kind.
    pub fn engine_options(&self, headers: Vec<String>, request: &str) -> OptionSet {
        let mut options = self.config.transport_options().clone();

        options.set(EngineOption::SslVerifyPeer(true));
        options.set(EngineOption::ReturnTransfer(true));
        options.set(EngineOption::HttpHeader(headers));
        options.set(EngineOption::HttpVersion(HttpVersion::Http11));
        options.set(EngineOption::HttpAuth(AuthSchemes::BASIC_OR_NTLM));
        options.set(EngineOption::UserPwd {
            user: self.config.user().to_string(),
            password: self.config.password().to_string(),
        });

        options.set(EngineOption::IncludeHeader(true));
        options.set(EngineOption::Post(true));
        options.set(EngineOption::PostFields(request.to_string()));

        options
    }

    /// Send `request` to `location` and return the response body.
    ///
    /// `version` and `one_way` are accepted for the SOAP engine's calling
    /// convention; the exchange is identical for every combination and the
    /// body is always returned.
    pub fn perform_request(
        &mut self,
        request: &str,
        location: &str,
        action: &str,
        version: SoapVersion,
        one_way: bool,
    ) -> Result<String> {
        let headers = Self::build_headers(action);
        self.last.request_body = request.to_string();
        self.last.request_headers = headers.clone();

        let options = self.engine_options(headers, request);
        let handle = self.handle_for(location)?;

        debug!(location, action, ?version, one_way, "performing SOAP request");
        let outcome = handle
            .configure(&options)
            .and_then(|()| handle.execute());
        let raw = match outcome {
            Ok(raw) => raw,
            Err(e) => {
                self.last.response = None;
                return Err(e.into());
            }
        };

        let (headers, body) = raw.split();
        let body = self.clean_response(body);
        debug!(
            location,
            header_bytes = headers.len(),
            body_bytes = body.len(),
            "SOAP response received"
        );
        self.last.response = Some(ExchangeResponse {
            headers,
            body: body.clone(),
        });
        Ok(body)
    }

    /// Reuse the held handle when it is bound to `location`, otherwise
    /// replace it with a fresh one.
    fn handle_for(&mut self, location: &str) -> Result<&mut E::Handle> {
        let reusable = self
            .connection
            .as_ref()
            .is_some_and(|c| c.location == location);
        if reusable {
            debug!(location, "reusing connection handle");
        } else {
            debug!(location, "opening connection handle");
            // The previous handle stays in place until its replacement opens.
            let handle = match self.engine.open(location) {
                Ok(handle) => handle,
                Err(e) => {
                    self.last.response = None;
                    return Err(e.into());
                }
            };
            self.connection = Some(Connection {
                location: location.to_string(),
                handle,
            });
        }
        match self.connection.as_mut() {
            Some(connection) => Ok(&mut connection.handle),
            None => Err(Error::State("connection handle missing after open")),
        }
    }

    fn clean_response(&self, body: String) -> String {
        if !self.config.strip_bad_chars() {
            return body;
        }
        let (cleaned, count) = strip_bad_chars(&body);
        if count > 0 && self.config.warn_on_bad_chars() {
            warn!(
                count,
                "invalid characters were stripped from the XML SOAP response"
            );
        }
        cleaned
    }

    /// HTTP status code of the most recent exchange.
    pub fn response_code(&self) -> Result<u32> {
        let connection = self.connection.as_ref().ok_or(Error::State(
            "no connection handle has been initialized; no request has been made",
        ))?;
        Ok(connection.handle.response_code()?)
    }

    /// URL the most recent exchange ended up at, as reported by the engine.
    pub fn effective_url(&self) -> Result<Option<String>> {
        match &self.connection {
            Some(connection) => Ok(connection.handle.effective_url()?),
            None => Ok(None),
        }
    }

    /// Request headers of the most recent exchange, one per line.
    pub fn last_request_headers(&self) -> String {
        let mut out = self.last.request_headers.join("\n");
        out.push('\n');
        out
    }

    pub fn last_request(&self) -> &str {
        &self.last.request_body
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last.response.as_ref().map(|r| r.body.as_str())
    }

    pub fn last_response_headers(&self) -> Option<&str> {
        self.last.response.as_ref().map(|r| r.headers.as_str())
    }

    pub fn last_exchange(&self) -> &LastExchange {
        &self.last
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Location the held connection handle is bound to.
    pub fn connected_location(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.location.as_str())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: HttpEngine> SoapTransport for AuthenticatedSoapTransport<E> {
    fn do_request(
        &mut self,
        request: &str,
        location: &str,
        action: &str,
        version: SoapVersion,
        one_way: bool,
    ) -> Result<String> {
        self.perform_request(request, location, action, version, one_way)
    }
}

impl<E: HttpEngine> fmt::Debug for AuthenticatedSoapTransport<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedSoapTransport")
            .field("config", &self.config)
            .field("location", &self.connected_location())
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RawResponse;
    use crate::error::EngineError;

    /// Engine whose single handle replays a canned outcome.
    #[derive(Default)]
    struct StubEngine {
        outcome: Option<std::result::Result<RawResponse, EngineError>>,
    }

    struct StubHandle {
        outcome: std::result::Result<RawResponse, EngineError>,
        configured: Option<OptionSet>,
    }

    impl HttpEngine for StubEngine {
        type Handle = StubHandle;

        fn open(&mut self, _location: &str) -> std::result::Result<StubHandle, EngineError> {
            Ok(StubHandle {
                outcome: self
                    .outcome
                    .clone()
                    .unwrap_or_else(|| Ok(RawResponse::default())),
                configured: None,
            })
        }
    }

    impl EngineHandle for StubHandle {
        fn configure(&mut self, options: &OptionSet) -> std::result::Result<(), EngineError> {
            self.configured = Some(options.clone());
            Ok(())
        }

        fn execute(&mut self) -> std::result::Result<RawResponse, EngineError> {
            self.outcome.clone()
        }

        fn response_code(&self) -> std::result::Result<u32, EngineError> {
            Ok(200)
        }

        fn effective_url(&self) -> std::result::Result<Option<String>, EngineError> {
            Ok(None)
        }
    }

    fn transport(
        outcome: std::result::Result<RawResponse, EngineError>,
    ) -> AuthenticatedSoapTransport<StubEngine> {
        let config = TransportConfig::new("alice", "secret").unwrap();
        AuthenticatedSoapTransport::with_engine(
            config,
            StubEngine {
                outcome: Some(outcome),
            },
        )
    }

    #[test]
    fn headers_are_in_wire_order() {
        let headers = AuthenticatedSoapTransport::<StubEngine>::build_headers("urn:Do\"Thing");
        assert_eq!(
            headers,
            vec![
                "Method: POST",
                "Connection: Keep-Alive",
                "User-Agent: ntlm-soap/0.1.0",
                "Content-Type: text/xml; charset=utf-8",
                "SOAPAction: \"urn:Do\"Thing\"",
                "Expect: 100-continue",
            ]
        );
    }

    #[test]
    fn mandated_options_override_passthrough() {
        let config = TransportConfig::new("alice", "secret")
            .unwrap()
            .with_transport_options(
                OptionSet::new()
                    .with(EngineOption::TimeoutMs(1_000))
                    .with(EngineOption::SslVerifyPeer(false))
                    .with(EngineOption::IncludeHeader(false))
                    .with(EngineOption::Post(false))
                    .with(EngineOption::PostFields("ignored".to_string()))
                    .with(EngineOption::HttpAuth(AuthSchemes {
                        basic: true,
                        ntlm: false,
                    }))
                    .with(EngineOption::UserPwd {
                        user: "mallory".to_string(),
                        password: "x".to_string(),
                    }),
            );
        let transport = AuthenticatedSoapTransport::with_engine(config, StubEngine::default());
        let options = transport.engine_options(vec!["X: y".to_string()], "<req/>");

        let expect = [
            EngineOption::TimeoutMs(1_000),
            EngineOption::SslVerifyPeer(true),
            EngineOption::IncludeHeader(true),
            EngineOption::Post(true),
            EngineOption::PostFields("<req/>".to_string()),
            EngineOption::HttpAuth(AuthSchemes::BASIC_OR_NTLM),
            EngineOption::UserPwd {
                user: "alice".to_string(),
                password: "secret".to_string(),
            },
            EngineOption::ReturnTransfer(true),
            EngineOption::HttpHeader(vec!["X: y".to_string()]),
            EngineOption::HttpVersion(HttpVersion::Http11),
        ];
        for option in &expect {
            assert_eq!(options.get_kind(option), Some(option));
        }
        assert_eq!(options.len(), expect.len());
    }

    #[test]
    fn request_body_is_posted_verbatim() {
        let mut t = transport(Ok(RawResponse::new("HTTP/1.1 200 OK\r\n\r\n", 19)));
        let request = "<?xml version=\"1.0\"?>\n<a>&amp; é</a>";
        t.perform_request(request, "http://h/", "A", SoapVersion::V1_1, false)
            .unwrap();
        let handle = &t.connection.as_ref().unwrap().handle;
        let configured = handle.configured.as_ref().unwrap();
        assert_eq!(
            configured.get_kind(&EngineOption::PostFields(String::new())),
            Some(&EngineOption::PostFields(request.to_string()))
        );
        assert_eq!(t.last_request(), request);
    }

    #[test]
    fn failure_clears_previous_response() {
        let head = "HTTP/1.1 200 OK\r\n\r\n";
        let mut t = transport(Ok(RawResponse::new(format!("{head}<ok/>"), head.len())));
        t.perform_request("<a/>", "http://h/", "A", SoapVersion::V1_1, false)
            .unwrap();
        assert_eq!(t.last_response(), Some("<ok/>"));

        t.engine.outcome = Some(Err(EngineError::new(28, "timed out")));
        let err = t
            .perform_request("<b/>", "http://other/", "B", SoapVersion::V1_1, false)
            .unwrap_err();
        assert_eq!(err.code(), Some(28));
        assert!(t.last_response().is_none());
        assert!(t.last_response_headers().is_none());
        assert_eq!(t.last_request(), "<b/>");
    }

    #[test]
    fn sanitizing_can_be_disabled() {
        let head = "HTTP/1.1 200 OK\r\n\r\n";
        let raw = RawResponse::new(format!("{head}<a>&#x02;</a>"), head.len());
        let config = TransportConfig::new("alice", "secret")
            .unwrap()
            .with_strip_bad_chars(false);
        let mut t = AuthenticatedSoapTransport::with_engine(
            config,
            StubEngine {
                outcome: Some(Ok(raw)),
            },
        );
        let body = t
            .perform_request("<a/>", "http://h/", "A", SoapVersion::V1_1, false)
            .unwrap();
        assert_eq!(body, "<a>&#x02;</a>");
    }

    #[test]
    fn response_code_before_any_request_is_a_state_error() {
        let t = transport(Ok(RawResponse::default()));
        assert!(matches!(t.response_code(), Err(Error::State(_))));
        assert_eq!(t.effective_url().unwrap(), None);
    }

    #[test]
    fn last_request_headers_are_newline_terminated() {
        let mut t = transport(Ok(RawResponse::default()));
        assert_eq!(t.last_request_headers(), "\n");
        t.perform_request("<a/>", "http://h/", "Ping", SoapVersion::V1_2, true)
            .unwrap();
        let headers = t.last_request_headers();
        assert!(headers.starts_with("Method: POST\nConnection: Keep-Alive\n"));
        assert!(headers.contains("SOAPAction: \"Ping\"\n"));
        assert!(headers.ends_with("Expect: 100-continue\n"));
    }
}
