//! Seam between a SOAP envelope engine and the wire transport.
//!
//! # Design
//! The envelope engine (XML mapping, WSDL handling) lives outside this
//! crate. It produces request envelopes as strings and consumes response
//! envelopes as strings, and reaches the network only through a
//! `SoapTransport`. `SoapClient` is the thin carrier that holds the injected
//! transport together with the endpoint descriptor and call defaults.

use serde::{Deserialize, Serialize};

use crate::config::{ClientOptions, TransportConfig};
use crate::curl_engine::CurlEngine;
use crate::error::{Error, Result};
use crate::transport::AuthenticatedSoapTransport;

/// SOAP protocol version of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SoapVersion {
    #[default]
    #[serde(rename = "1.1")]
    V1_1 = 1,
    #[serde(rename = "1.2")]
    V1_2 = 2,
}

impl TryFrom<i32> for SoapVersion {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(SoapVersion::V1_1),
            2 => Ok(SoapVersion::V1_2),
            other => Err(Error::Configuration(format!(
                "unsupported SOAP version: {other}"
            ))),
        }
    }
}

/// Executes one SOAP exchange on behalf of an envelope engine.
pub trait SoapTransport {
    /// Send the envelope `request` to `location` with the given SOAP action
    /// and return the response envelope.
    fn do_request(
        &mut self,
        request: &str,
        location: &str,
        action: &str,
        version: SoapVersion,
        one_way: bool,
    ) -> Result<String>;
}

/// A SOAP client using the NTLM/Basic libcurl transport.
pub type NtlmSoapClient = SoapClient<AuthenticatedSoapTransport<CurlEngine>>;

/// Carries an injected transport plus endpoint defaults.
#[derive(Debug)]
pub struct SoapClient<T> {
    descriptor: Option<String>,
    location: Option<String>,
    version: SoapVersion,
    transport: T,
}

impl NtlmSoapClient {
    /// Build a client for `descriptor` (a WSDL location, or `None` for
    /// non-descriptor mode).
    ///
    /// Fails with a configuration error when credentials are missing, or when
    /// no descriptor is given and `options.location` is unset.
    pub fn new(descriptor: Option<&str>, options: ClientOptions) -> Result<Self> {
        let config = TransportConfig::from_options(&options)?;
        if descriptor.is_none() && options.location.is_none() {
            return Err(Error::Configuration(
                "a location is required when no service descriptor is given".to_string(),
            ));
        }
        let transport = AuthenticatedSoapTransport::new(config);
        Ok(SoapClient::with_transport(descriptor, &options, transport))
    }
}

impl<T: SoapTransport> SoapClient<T> {
    pub fn with_transport(descriptor: Option<&str>, options: &ClientOptions, transport: T) -> Self {
        Self {
            descriptor: descriptor.map(str::to_string),
            location: options.location.clone(),
            version: options.soap_version,
            transport,
        }
    }

    /// Send `envelope` to the configured location.
    pub fn call(&mut self, action: &str, envelope: &str) -> Result<String> {
        let location = self.location.clone().ok_or_else(|| {
            Error::Configuration("no service location configured".to_string())
        })?;
        self.call_at(&location, action, envelope)
    }

    /// Send `envelope` to an explicit location.
    pub fn call_at(&mut self, location: &str, action: &str, envelope: &str) -> Result<String> {
        self.transport
            .do_request(envelope, location, action, self.version, false)
    }

    /// Send `envelope` without using the response.
    pub fn notify_at(&mut self, location: &str, action: &str, envelope: &str) -> Result<()> {
        self.transport
            .do_request(envelope, location, action, self.version, true)
            .map(drop)
    }

    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn soap_version(&self) -> SoapVersion {
        self.version
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
