//! SOAP-over-HTTP transport with NTLM/Basic authentication.
//!
//! # Overview
//! A SOAP envelope engine hands this crate raw request envelopes and gets
//! raw response envelopes back. In between, `AuthenticatedSoapTransport`
//! builds the SOAP headers, supplies credentials to the HTTP engine (which
//! runs the NTLM handshake), reuses one connection handle per location,
//! splits the raw response, and optionally strips character references that
//! would make the response unparseable.
//!
//! # Design
//! - The HTTP engine is a trait (`HttpEngine`); `CurlEngine` drives libcurl.
//!   Tests substitute a scripted engine.
//! - The envelope engine reaches the transport through the `SoapTransport`
//!   trait, injected into `SoapClient`.
//! - Per-instance state (handle, last exchange) is `&mut self`: one instance
//!   per concurrent caller.

pub mod config;
pub mod curl_engine;
pub mod engine;
pub mod error;
pub mod sanitize;
pub mod soap;
pub mod transport;

pub use config::{AuthSchemes, ClientOptions, EngineOption, HttpVersion, OptionSet, TransportConfig};
pub use curl_engine::{CurlEngine, CurlHandle};
pub use engine::{EngineHandle, HttpEngine, RawResponse};
pub use error::{EngineError, Error, Result};
pub use soap::{NtlmSoapClient, SoapClient, SoapTransport, SoapVersion};
pub use transport::{AuthenticatedSoapTransport, ExchangeResponse, LastExchange};
