//! HTTP transport types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. The client builds an `HttpRequest`
//! and interprets an `HttpResponse`; the only code that touches the network
//! is a [`Transport`] implementation. [`UreqTransport`] is the blocking
//! default, and tests substitute a recording fake.

use std::fmt;

use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Result, WorkfrontError};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// The verb as sent on the wire and in the `method` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute: the client hostname followed by the prepared URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one HTTP exchange.
///
/// Implementations return non-2xx responses as data; only failures to
/// complete the exchange are errors.
pub trait Transport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a ureq agent.
///
/// The agent (and its connection pool) is owned by the transport and
/// released when the owning client is dropped.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Builds an agent from the connect/overall timeouts and TLS policy in
    /// `config`. Fails when the host URL is not an `http`/`https` URL.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let host = config.host_url();
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(WorkfrontError::TransportUnavailable(format!(
                "host URL must be http or https, got {host:?}"
            )));
        }

        let mut builder = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout()))
            .timeout_global(config.timeout());
        if !config.verify_tls() {
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }

        Ok(Self {
            agent: builder.build().new_agent(),
        })
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), headers).call(),
            HttpMethod::Post => with_headers(self.agent.post(url), headers).send_empty(),
            HttpMethod::Put => with_headers(self.agent.put(url), headers).send_empty(),
        };
        let mut response = result.map_err(|e| WorkfrontError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| WorkfrontError::Transport(e.to_string()))?;
        debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse { status, body })
    }
}
