// # HTTP IP Source
//
// This crate provides an HTTP-based IP source for recsync.
//
// ## Architecture
//
// Asks an external echo service (e.g. api.ipify.org, icanhazip.com) for the
// caller's public address. One request per call; the Poller decides how
// often to ask.

use recsync_core::traits::{IpSource, IpVersion};
use recsync_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default IP echo service, returns the address as plain text
pub const DEFAULT_IP_SERVICE: &str = "https://api.ipify.org";

/// Default HTTP timeout for lookups (10 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based IP source
#[derive(Debug)]
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// IP version to accept
    version: IpVersion,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    /// - `version`: Address family to accept
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the HTTP client cannot be built
    pub fn new(url: impl Into<String>, version: IpVersion) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            version,
            client,
        })
    }

    /// The echo service URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch current IP from HTTP service
    async fn fetch_ip(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "HTTP error from {}: {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

        parse_ip(&body, self.version)
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let ip = self.fetch_ip().await?;
        tracing::debug!("{} reported {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Parse an echo-service body into an address of the wanted family
fn parse_ip(body: &str, version: IpVersion) -> Result<IpAddr> {
    let text = body.trim();

    let ip: IpAddr = text
        .parse()
        .map_err(|_| Error::validation(format!("Invalid IP address: {:?}", text)))?;

    if !version.accepts(&ip) {
        let expected = match version {
            IpVersion::V4 => "IPv4",
            IpVersion::V6 => "IPv6",
            IpVersion::Both => "any address",
        };
        return Err(Error::validation(format!("Expected {}, got: {}", expected, ip)));
    }

    Ok(ip)
}
