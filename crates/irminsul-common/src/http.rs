use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::error::IrminsulError;

/// Status line and body of one GET.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure to obtain any response at all.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("host not in allowlist: {0}")]
    Blocked(String),

    #[error("request failed: {0}")]
    Other(String),
}

/// The single network primitive the ingestion core needs:
/// `GET(url, headers) -> (status, body) | network_error`. No cookies or
/// session state carry over between calls.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, TransportError>;
}

/// A host-capped HTTP client that only talks to approved domains.
#[derive(Debug, Clone)]
pub struct GuardedClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl GuardedClient {
    /// Builds a client with the given allowlist, per-request timeout, and idle
    /// pool size per host.
    pub fn new(
        allowed_hosts: &[String],
        timeout: Duration,
        max_idle_per_host: usize,
    ) -> Result<Self, IrminsulError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .pool_max_idle_per_host(max_idle_per_host)
            .build()?;

        Ok(Self {
            client,
            allowlist: allowed_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
        })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_ascii_lowercase());
    }

    /// Validates if a URL is permitted under the current allowlist.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        // Exact match or a subdomain of an allowed domain
        self.allowlist
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
    }
}

#[async_trait]
impl HttpTransport for GuardedClient {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        if !self.is_allowed(url) {
            return Err(TransportError::Blocked(url.to_string()));
        }

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request.send().await.map_err(classify)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(classify)?;
        tracing::trace!(url, status, bytes = body.len(), "GET complete");

        Ok(HttpResponse { status, body })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
