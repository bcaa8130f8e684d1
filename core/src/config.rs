//! Client configuration.
//!
//! # Design
//! `ClientConfig` is immutable once handed to a client. The external
//! configuration layer may decode it directly (serde keys match the keys the
//! service has always used: `host.url`, `api.version`, `account.login`,
//! `account.password`), or build it in code with the `with_*` setters.
//! TLS certificate verification is on unless explicitly disabled.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};

/// URI context every API path lives under.
pub const PATH_CONTEXT: &str = "/attask/api";

/// Default connect timeout for the HTTP transport.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[serde_as]
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "host.url")]
    host_url: String,
    #[serde(rename = "api.version", default)]
    api_version: Option<String>,
    #[serde(rename = "account.login", default)]
    login: String,
    #[serde(rename = "account.password", default)]
    password: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "connect_timeout_secs", default = "default_connect_timeout")]
    connect_timeout: Duration,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(rename = "timeout_secs")]
    timeout: Option<Duration>,
    #[serde(default = "default_verify_tls")]
    verify_tls: bool,
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_verify_tls() -> bool {
    true
}

impl ClientConfig {
    pub fn new(host_url: impl Into<String>) -> Self {
        Self {
            host_url: host_url.into(),
            api_version: None,
            login: String::new(),
            password: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: None,
            verify_tls: true,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Default credentials used by `login` when the caller passes none.
    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = login.into();
        self.password = password.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overall per-request timeout. Unset means no limit beyond the connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disables TLS certificate and hostname verification.
    ///
    /// Only meant for test instances with self-signed certificates.
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// Base URL every prepared URI is appended to:
    /// `<host>/attask/api[/v<version>]`, with one trailing slash dropped
    /// from the host.
    pub fn hostname(&self) -> String {
        let host = self.host_url.strip_suffix('/').unwrap_or(&self.host_url);
        let mut hostname = format!("{host}{PATH_CONTEXT}");
        if let Some(version) = &self.api_version {
            hostname.push_str("/v");
            hostname.push_str(version);
        }
        hostname
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host_url", &self.host_url)
            .field("api_version", &self.api_version)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}
