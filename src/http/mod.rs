//! HTTP transport used by the resolvers.
//!
//! Resolvers talk to the network only through [`HttpFetch`], so tests can
//! substitute a canned in-memory responder.

use crate::config::HttpConfig;
use crate::{Error, Result};
use std::time::Duration;

/// A successful (2xx) response.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// URL after redirects.
    pub final_url: String,
    /// Status code.
    pub status: u16,
    /// `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns the body as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the body is not valid JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Parse {
            context: self.final_url.clone(),
            cause: format!("invalid JSON: {e}"),
        })
    }
}

/// Blocking GET transport.
pub trait HttpFetch: Send + Sync {
    /// Performs a GET request, following redirects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] on transport failure, timeout or a non-2xx
    /// status.
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport.
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    /// User agent sent with every request.
    pub const USER_AGENT: &'static str = concat!("frameart/", env!("CARGO_PKG_VERSION"));

    /// Creates a fetcher with the configured timeouts.
    #[must_use]
    pub fn new(config: HttpConfig) -> Self {
        Self {
            client: build_http_client(config),
        }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

impl HttpFetch for ReqwestFetcher {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        tracing::debug!(url = %url, "HTTP GET");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().map_err(|e| {
            let error_kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connect"
            } else if e.is_redirect() {
                "redirect"
            } else {
                "request"
            };
            tracing::warn!(url = %url, error = %e, error_kind = error_kind, "HTTP request failed");
            Error::Fetch {
                url: url.to_string(),
                cause: format!("{error_kind} error: {e}"),
            }
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "HTTP request returned error status");
            return Err(Error::Fetch {
                url: url.to_string(),
                cause: format!("status {status}"),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().map_err(|e| Error::Fetch {
            url: url.to_string(),
            cause: format!("body read error: {e}"),
        })?;

        Ok(HttpResponse {
            final_url,
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: HttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(ReqwestFetcher::USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10));
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}
