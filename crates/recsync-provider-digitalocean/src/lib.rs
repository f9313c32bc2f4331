// # DigitalOcean Record Store
//
// This crate provides the DigitalOcean implementation of `RecordStore`.
//
// ## Behavior
//
// - One HTTP request per call, plus one per extra page when listing
// - Errors are returned to the caller as-is (no retry, no backoff)
// - Quota headers are read from every response, failed ones included
// - HTTP timeout configured (30 seconds)
// - No caching: the Syncer owns the cached record
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Store construction fails if the token is empty
//
// ## API Reference
//
// - DigitalOcean API v2: https://docs.digitalocean.com/reference/api/
// - List records: GET `/domains/:domain/records?page=N&per_page=200`
// - Update record: PUT `/domains/:domain/records/:record_id`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recsync_core::traits::{RateLimit, RecordListing, RecordStore, RemoteRecord};
use recsync_core::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// DigitalOcean API base URL
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com/v2";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page (the API maximum)
const PER_PAGE: u32 = 200;

const HEADER_LIMIT: &str = "ratelimit-limit";
const HEADER_REMAINING: &str = "ratelimit-remaining";
const HEADER_RESET: &str = "ratelimit-reset";

/// DigitalOcean DNS record store
///
/// Stateless between calls. The Syncer decides when to list and when to edit.
pub struct DigitalOceanStore {
    /// DigitalOcean API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DigitalOceanStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanStore")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// One page of `GET /domains/:domain/records`
#[derive(Debug, Deserialize)]
struct RecordsPage {
    domain_records: Vec<RemoteRecord>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Option<Pages>,
}

#[derive(Debug, Default, Deserialize)]
struct Pages {
    #[serde(default)]
    next: Option<String>,
}

/// Error body returned by the API on non-2xx responses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A response as received, before status mapping
#[derive(Debug)]
struct Exchange {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

/// Walks the pages of a record listing
///
/// `next` links are reduced to their page number and rebuilt on the
/// configured base URL. A page number that was already fetched ends the walk.
#[derive(Debug)]
struct Pager {
    base_url: String,
    domain: String,
    pending: Option<u32>,
    seen: HashSet<u32>,
    records: Vec<RemoteRecord>,
    rate_limit: Option<RateLimit>,
}

impl Pager {
    fn new(base_url: &str, domain: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            domain: domain.to_string(),
            pending: Some(1),
            seen: HashSet::new(),
            records: Vec::new(),
            rate_limit: None,
        }
    }

    fn page_url(&self, page: u32) -> String {
        format!(
            "{}/domains/{}/records?page={}&per_page={}",
            self.base_url, self.domain, page, PER_PAGE
        )
    }

    /// URL of the next page to fetch, if any
    fn next_url(&mut self) -> Option<String> {
        let page = self.pending.take()?;
        self.seen.insert(page);
        Some(self.page_url(page))
    }

    /// Take in a fetched page and work out which page comes next
    fn absorb(&mut self, page: RecordsPage, rate: RateLimit) -> Result<()> {
        self.records.extend(page.domain_records);
        self.rate_limit = Some(rate);

        let Some(next) = page.links.pages.and_then(|p| p.next) else {
            return Ok(());
        };

        let number = page_number(&next)?;
        if self.seen.contains(&number) {
            tracing::warn!(
                "Next page link for {} points back to page {}, stopping",
                self.domain,
                number
            );
            return Ok(());
        }

        self.pending = Some(number);
        Ok(())
    }

    fn finish(self) -> RecordListing {
        RecordListing {
            records: self.records,
            rate_limit: self.rate_limit,
        }
    }
}

/// Page number carried by a `links.pages.next` URL
fn page_number(link: &str) -> Result<u32> {
    let url = Url::parse(DIGITALOCEAN_API_BASE)
        .and_then(|base| base.join(link))
        .map_err(|e| Error::transport(format!("Unusable next page link {}: {}", link, e)))?;

    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .ok_or_else(|| Error::transport(format!("Next page link has no page number: {}", link)))
}

impl DigitalOceanStore {
    /// Create a new DigitalOcean store against the public API
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the token is empty or the HTTP client cannot be built
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();

        if api_token.is_empty() {
            return Err(Error::config("DigitalOcean API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: DIGITALOCEAN_API_BASE.to_string(),
            client,
        })
    }

    /// Point the store at another API root (a test server, a proxy)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The API root in use
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self, domain: &str, record_id: u64) -> String {
        format!("{}/domains/{}/records/{}", self.base_url, domain, record_id)
    }

    /// Send a request and collect what the response carried
    ///
    /// Only a request that never got a response fails here. Once a
    /// response arrived, its quota headers travel with any later error.
    async fn exchange(&self, request: RequestBuilder, context: &str) -> Result<Exchange> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::transport(format!("{}: {}", context, e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| {
            Error::transport(format!("{}: failed to read response: {}", context, e))
                .with_rate_limit(Some(parse_rate_limit(&headers)))
        })?;

        Ok(Exchange {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl RecordStore for DigitalOceanStore {
    /// List every record of the domain, following pagination
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /domains/example.com/records?page=1&per_page=200
    /// Authorization: Bearer <token>
    /// ```
    async fn list_records(&self, domain: &str) -> Result<RecordListing> {
        let mut pager = Pager::new(&self.base_url, domain);

        while let Some(url) = pager.next_url() {
            tracing::debug!("Listing records: {}", url);
            let context = format!("GET records for {}", domain);
            let exchange = self.exchange(self.client.get(&url), &context).await?;
            let (page, rate) = read_list_response(domain, &exchange)?;
            pager.absorb(page, rate)?;
        }

        let listing = pager.finish();
        tracing::debug!("Listed {} records for {}", listing.records.len(), domain);
        Ok(listing)
    }

    /// Replace the data of one record
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /domains/example.com/records/3352896
    /// {
    ///   "data": "1.2.3.4"
    /// }
    /// ```
    async fn edit_record(&self, domain: &str, record_id: u64, data: &str) -> Result<RateLimit> {
        let url = self.record_url(domain, record_id);
        tracing::debug!("Updating record {} of {} to {}", record_id, domain, data);

        let payload = serde_json::json!({ "data": data });
        let context = format!("PUT record {}", record_id);
        let exchange = self
            .exchange(self.client.put(&url).json(&payload), &context)
            .await?;

        let rate_limit = read_edit_response(record_id, &exchange)?;

        tracing::debug!(
            "Record {} updated ({} of {} requests left)",
            record_id,
            rate_limit.remaining,
            rate_limit.limit
        );
        Ok(rate_limit)
    }

    fn store_name(&self) -> &'static str {
        "digitalocean"
    }
}

/// Read the quota headers of a response
///
/// Missing or malformed numbers read as 0; a missing reset reads as `None`.
fn parse_rate_limit(headers: &HeaderMap) -> RateLimit {
    let number = |name: &str| -> Option<i64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    let count = |name: &str| -> u32 {
        number(name)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };

    RateLimit {
        limit: count(HEADER_LIMIT),
        remaining: count(HEADER_REMAINING),
        reset: number(HEADER_RESET).and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
    }
}

fn parse_records_page(body: &str) -> Result<RecordsPage> {
    Ok(serde_json::from_str(body)?)
}

/// Build a transport error from a non-2xx response
fn status_error(context: &str, exchange: &Exchange) -> Error {
    let body = if exchange.body.is_empty() {
        "Unable to read error response"
    } else {
        exchange.body.as_str()
    };

    Error::transport(format!("{}: {}", context, describe_failure(exchange.status, body)))
        .with_rate_limit(Some(parse_rate_limit(&exchange.headers)))
}

/// Map a list response to one page of records
fn read_list_response(domain: &str, exchange: &Exchange) -> Result<(RecordsPage, RateLimit)> {
    if exchange.status == StatusCode::NOT_FOUND {
        return Err(Error::not_found(format!("Domain not found: {}", domain)));
    }
    if !exchange.status.is_success() {
        return Err(status_error(&format!("GET records for {}", domain), exchange));
    }

    let page = parse_records_page(&exchange.body)?;
    Ok((page, parse_rate_limit(&exchange.headers)))
}

/// Map an edit response to the quota it reported
fn read_edit_response(record_id: u64, exchange: &Exchange) -> Result<RateLimit> {
    if !exchange.status.is_success() {
        return Err(status_error(&format!("PUT record {}", record_id), exchange));
    }
    Ok(parse_rate_limit(&exchange.headers))
}

/// Status plus the API's own message when the body carries one
fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            message: Some(message),
            id,
        }) => match id {
            Some(id) => format!("{} ({})", message, id),
            None => message,
        },
        _ => body.trim().to_string(),
    };

    match status.as_u16() {
        401 | 403 => format!("authentication failed, status {}: {}", status, detail),
        429 => format!("rate limit exceeded, status {}: {}", status, detail),
        500..=599 => format!("DigitalOcean server error, status {}: {}", status, detail),
        _ => format!("status {}: {}", status, detail),
    }
}
