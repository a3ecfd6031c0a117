//! Construction options and engine option sets.
//!
//! # Design
//! `ClientOptions` is the loose, caller-facing options surface: every field
//! has a default so it can be deserialized from a partial JSON object the
//! way an embedding application would hand it over. `TransportConfig` is the
//! validated result; it only exists with non-empty credentials, so the
//! transport never has to re-check them at request time.
//!
//! Engine options are typed equivalents of the libcurl options the
//! transport sets. An `OptionSet` holds at most one option of each kind, so
//! applying a later option of the same kind replaces the earlier one. That
//! replacement is what the transport's two-phase merge relies on.

use std::fmt;
use std::mem;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::soap::SoapVersion;

/// HTTP protocol version requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpVersion {
    #[serde(rename = "1.0")]
    Http10,
    #[serde(rename = "1.1")]
    Http11,
    #[serde(rename = "2")]
    Http2,
}

/// Authentication schemes the engine may negotiate with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSchemes {
    pub basic: bool,
    pub ntlm: bool,
}

impl AuthSchemes {
    pub const BASIC_OR_NTLM: AuthSchemes = AuthSchemes {
        basic: true,
        ntlm: true,
    };
}

/// A single low-level engine setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineOption {
    SslVerifyPeer(bool),
    SslVerifyHost(bool),
    /// Capture the response into a buffer instead of writing it out.
    ReturnTransfer(bool),
    /// Raw `Name: value` request header lines, sent in order.
    HttpHeader(Vec<String>),
    HttpVersion(HttpVersion),
    HttpAuth(AuthSchemes),
    UserPwd { user: String, password: String },
    /// Keep the response header block at the front of the raw buffer.
    IncludeHeader(bool),
    Post(bool),
    PostFields(String),
    TimeoutMs(u64),
    ConnectTimeoutMs(u64),
    Proxy(String),
    CaInfo(PathBuf),
    FollowLocation(bool),
    Verbose(bool),
}

impl EngineOption {
    /// Whether both options configure the same engine setting.
    pub fn same_kind(&self, other: &EngineOption) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// Insertion-ordered engine options, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<EngineOption>", into = "Vec<EngineOption>")]
pub struct OptionSet {
    options: Vec<EngineOption>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing any existing option of the same kind in place.
    pub fn set(&mut self, option: EngineOption) {
        match self.options.iter_mut().find(|o| o.same_kind(&option)) {
            Some(slot) => *slot = option,
            None => self.options.push(option),
        }
    }

    pub fn with(mut self, option: EngineOption) -> Self {
        self.set(option);
        self
    }

    /// The option of the same kind as `probe`, if one is set.
    pub fn get_kind(&self, probe: &EngineOption) -> Option<&EngineOption> {
        self.options.iter().find(|o| o.same_kind(probe))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl FromIterator<EngineOption> for OptionSet {
    fn from_iter<I: IntoIterator<Item = EngineOption>>(iter: I) -> Self {
        let mut set = OptionSet::new();
        for option in iter {
            set.set(option);
        }
        set
    }
}

impl From<Vec<EngineOption>> for OptionSet {
    fn from(options: Vec<EngineOption>) -> Self {
        options.into_iter().collect()
    }
}

impl From<OptionSet> for Vec<EngineOption> {
    fn from(set: OptionSet) -> Self {
        set.options
    }
}

/// Options accepted when constructing a client.
///
/// Unset fields take their defaults: no credentials, no passthrough engine
/// options, bad-character stripping on, warnings off, SOAP 1.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub user: Option<String>,
    pub password: Option<String>,
    /// Passthrough engine options. Protocol-mandated options override these.
    #[serde(alias = "transport_options")]
    pub curlopts: OptionSet,
    pub strip_bad_chars: bool,
    /// Has no effect unless `strip_bad_chars` is set.
    pub warn_on_bad_chars: bool,
    /// Service endpoint. Required when no endpoint descriptor is given.
    pub location: Option<String>,
    pub soap_version: SoapVersion,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            curlopts: OptionSet::new(),
            strip_bad_chars: true,
            warn_on_bad_chars: false,
            location: None,
            soap_version: SoapVersion::V1_1,
        }
    }
}

impl ClientOptions {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Parse options from a JSON object, applying defaults for absent keys.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(format!("invalid options: {e}")))
    }
}

/// Validated transport configuration with non-empty credentials.
///
/// A credential counts as missing when it is absent or zero-length. Any
/// other string is accepted, including `"0"`, which PHP's `empty()` would
/// treat as missing.
#[derive(Clone)]
pub struct TransportConfig {
    user: String,
    password: String,
    transport_options: OptionSet,
    strip_bad_chars: bool,
    warn_on_bad_chars: bool,
}

impl TransportConfig {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Self::from_options(&ClientOptions::new(user, password))
    }

    pub fn from_options(options: &ClientOptions) -> Result<Self> {
        let (user, password) = match (options.user.as_deref(), options.password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                (user.to_string(), password.to_string())
            }
            _ => {
                return Err(Error::Configuration(
                    "a username and password is required".to_string(),
                ))
            }
        };
        Ok(Self {
            user,
            password,
            transport_options: options.curlopts.clone(),
            strip_bad_chars: options.strip_bad_chars,
            warn_on_bad_chars: options.warn_on_bad_chars,
        })
    }

    pub fn with_transport_options(mut self, options: OptionSet) -> Self {
        self.transport_options = options;
        self
    }

    pub fn with_strip_bad_chars(mut self, strip: bool) -> Self {
        self.strip_bad_chars = strip;
        self
    }

    pub fn with_warn_on_bad_chars(mut self, warn: bool) -> Self {
        self.warn_on_bad_chars = warn;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn transport_options(&self) -> &OptionSet {
        &self.transport_options
    }

    pub fn strip_bad_chars(&self) -> bool {
        self.strip_bad_chars
    }

    pub fn warn_on_bad_chars(&self) -> bool {
        self.warn_on_bad_chars
    }
}

impl TryFrom<ClientOptions> for TransportConfig {
    type Error = Error;

    fn try_from(options: ClientOptions) -> Result<Self> {
        Self::from_options(&options)
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("transport_options", &self.transport_options.len())
            .field("strip_bad_chars", &self.strip_bad_chars)
            .field("warn_on_bad_chars", &self.warn_on_bad_chars)
            .finish()
    }
}
