//! HTTP search backend for the figshare v2 API.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{Map, Value};

use crate::backend::SearchBackend;
use crate::config::ApiConfig;
use crate::error::{CatalogError, Result};
use crate::filter::SearchQuery;
use crate::item::NativeItem;

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("figshare-oai-harvester/", env!("CARGO_PKG_VERSION"));

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Search results are ordered newest modification first.
const SEARCH_ORDER: &str = "modified_date";
const SEARCH_ORDER_DIRECTION: &str = "desc";

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` configured with the API timeout and user agent.
pub fn create_client(api: &ApiConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(api.timeout_secs))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Blocking figshare API client implementing [`SearchBackend`].
#[derive(Debug, Clone)]
pub struct FigshareClient {
    client: Client,
    base_url: String,
    authorization: Option<String>,
    max_attempts: u32,
}

impl FigshareClient {
    /// Create a client from API settings.
    ///
    /// A blank token means anonymous access.
    pub fn new(api: &ApiConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(api)?,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            authorization: api
                .token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| format!("token {t}")),
            max_attempts: api.retries.saturating_add(1),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request with retry logic.
    ///
    /// Uses exponential backoff for transient failures (network errors, 5xx
    /// responses). Any other response is returned to the caller as is.
    ///
    /// # Arguments
    /// * `build` - Builds a fresh request for each attempt
    fn send_with_retry(&self, build: impl Fn() -> RequestBuilder) -> Result<Response> {
        let mut last_error: Option<String> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1000ms, 2000ms
                let delay = RETRY_BASE_DELAY_MS * (1 << (attempt - 1).min(16));
                tracing::debug!(attempt, delay_ms = delay, "Retrying after delay");
                thread::sleep(Duration::from_millis(delay));
            }

            let mut request = build();
            if let Some(authorization) = &self.authorization {
                request = request.header(AUTHORIZATION, authorization);
            }

            match request.send() {
                Ok(response) => {
                    let status = response.status();

                    // Retry on server errors (5xx)
                    if status.is_server_error() {
                        tracing::warn!(
                            status = %status,
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            "Server error, will retry"
                        );
                        last_error = Some(format!("Server error: {status}"));
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    // Retry on connection/timeout errors
                    if e.is_connect() || e.is_timeout() {
                        tracing::warn!(
                            error = %e,
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            "Connection error, will retry"
                        );
                        last_error = Some(e.to_string());
                        continue;
                    }
                    // Other errors (like invalid URL) - don't retry
                    return Err(CatalogError::Http(e));
                }
            }
        }

        // All retries exhausted
        Err(CatalogError::RetriesExhausted {
            attempts: self.max_attempts,
            message: last_error.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Turn a non-success response into an upstream error carrying its body.
fn upstream_error(response: Response) -> CatalogError {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    tracing::error!(status = %status, body = %body, "figshare API request failed");
    CatalogError::Upstream(format!("{status}: {body}"))
}

/// Build the JSON body of an `/articles/search` request.
fn search_body(query: &SearchQuery, page: u32, page_size: usize) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("search_for".to_string(), Value::from(query.filter.clone()));
    body.insert("page".to_string(), Value::from(page));
    body.insert("page_size".to_string(), Value::from(page_size));
    body.insert("order".to_string(), Value::from(SEARCH_ORDER));
    body.insert(
        "order_direction".to_string(),
        Value::from(SEARCH_ORDER_DIRECTION),
    );
    for (key, value) in &query.params {
        body.insert(key.clone(), value.clone());
    }
    body
}

impl SearchBackend for FigshareClient {
    fn search(&self, query: &SearchQuery, page: u32, page_size: usize) -> Result<Vec<NativeItem>> {
        let url = self.url("/articles/search");
        let body = serde_json::to_vec(&search_body(query, page, page_size))?;
        tracing::debug!(url = %url, page, page_size, "Searching articles");

        let response = self.send_with_retry(|| {
            self.client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
        })?;
        if !response.status().is_success() {
            return Err(upstream_error(response));
        }

        let items: Vec<Value> = serde_json::from_slice(&response.bytes()?)?;
        Ok(items
            .into_iter()
            .filter_map(|value| {
                let item = NativeItem::from_value(value);
                if item.is_none() {
                    tracing::warn!("Ignoring non-object search result");
                }
                item
            })
            .collect())
    }

    fn article(&self, id: u64) -> Result<Option<NativeItem>> {
        let url = self.url(&format!("/articles/{id}"));
        tracing::debug!(url = %url, "Fetching article");

        let response = self.send_with_retry(|| self.client.get(&url))?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(id, "Article not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(upstream_error(response));
        }

        let value: Value = serde_json::from_slice(&response.bytes()?)?;
        NativeItem::from_value(value)
            .map(Some)
            .ok_or_else(|| CatalogError::Upstream(format!("article {id} is not a JSON object")))
    }
}
