//! Resumable listings over a page-based search API.
//!
//! figshare offers no cursor and no total count, so a listing is continued
//! whenever a page comes back full. Continuation state lives in memory only,
//! keyed by an opaque token whose prefix is the mint time in milliseconds;
//! purging expired tokens therefore needs nothing but the keys.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::backend::SearchBackend;
use crate::error::{CatalogError, Result};
use crate::filter::SearchQuery;
use crate::item::NativeItem;

/// Separates the mint time from the random part of a token.
pub const TOKEN_DELIMITER: char = '-';

/// Everything needed to fetch the next page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumptionState {
    pub query: SearchQuery,
    /// Page to fetch on resumption, starting at 1.
    pub next_page: u32,
    /// Metadata format the listing was requested in.
    pub schema_id: String,
    /// Mint time in milliseconds since the epoch.
    pub minted_at: i64,
}

/// A token handed to the harvester, with its expiry if the store has a TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumptionTicket {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Create a new token for a state minted at `now_ms`.
pub fn mint_token(now_ms: i64) -> String {
    format!("{now_ms}{TOKEN_DELIMITER}{}", Uuid::new_v4())
}

/// Recover the mint time embedded in a token.
///
/// # Examples
/// ```
/// use figshare_oai_harvester::resumption::{mint_token, token_minted_at};
///
/// let token = mint_token(1_600_000_000_000);
/// assert_eq!(token_minted_at(&token), Some(1_600_000_000_000));
/// assert_eq!(token_minted_at("garbage"), None);
/// ```
pub fn token_minted_at(token: &str) -> Option<i64> {
    token
        .split_once(TOKEN_DELIMITER)
        .and_then(|(millis, _)| millis.parse().ok())
}

/// Current time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Thread-safe map from token to continuation state.
///
/// Every operation takes the single lock, so a token can only be redeemed once
/// even when two requests race for it.
pub struct ResumptionStore {
    states: Mutex<HashMap<String, ResumptionState>>,
    ttl_ms: i64,
}

impl ResumptionStore {
    /// Create an empty store. A negative `ttl_ms` disables expiry.
    #[must_use]
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            ttl_ms,
        }
    }

    #[must_use]
    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ResumptionState>> {
        // The map stays consistent even if a holder panicked mid-operation.
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a state under a freshly minted token and return the token.
    pub fn insert(&self, state: ResumptionState) -> String {
        let mut states = self.lock();
        let mut token = mint_token(state.minted_at);
        while states.contains_key(&token) {
            token = mint_token(state.minted_at);
        }
        states.insert(token.clone(), state);
        token
    }

    /// Remove and return the state for `token`.
    pub fn take(&self, token: &str) -> Option<ResumptionState> {
        self.lock().remove(token)
    }

    /// Whether `token` is currently stored.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.lock().contains_key(token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Expiry instant for a token minted at `minted_at`, if tokens expire.
    #[must_use]
    pub fn expires_at(&self, minted_at: i64) -> Option<DateTime<Utc>> {
        if self.ttl_ms < 0 {
            return None;
        }
        DateTime::from_timestamp_millis(minted_at.saturating_add(self.ttl_ms))
    }

    /// Drop tokens older than the TTL, as of the current time.
    pub fn purge(&self) -> usize {
        self.purge_at(now_ms())
    }

    /// Drop tokens whose mint time plus TTL lies before `now_ms`.
    ///
    /// # Returns
    /// Number of tokens removed; always 0 when the TTL is negative
    pub fn purge_at(&self, now_ms: i64) -> usize {
        if self.ttl_ms < 0 {
            return 0;
        }
        let mut states = self.lock();
        let before = states.len();
        states.retain(|token, state| {
            let minted_at = token_minted_at(token).unwrap_or(state.minted_at);
            minted_at.saturating_add(self.ttl_ms) >= now_ms
        });
        let removed = before - states.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = states.len(), "Purged expired resumption tokens");
        }
        removed
    }
}

/// One fetched page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<NativeItem>,
    /// Set when the page was full and the listing may continue.
    pub ticket: Option<ResumptionTicket>,
    /// Metadata format of the listing.
    pub schema_id: String,
    /// Page number that was fetched.
    pub page: u32,
}

/// Drives a search backend page by page, minting and redeeming tokens.
pub struct Paginator {
    store: ResumptionStore,
    page_size: usize,
}

impl Paginator {
    /// Create a paginator; a page size of 0 is raised to 1 so an empty page
    /// can never count as full.
    #[must_use]
    pub fn new(page_size: usize, ttl_ms: i64) -> Self {
        if page_size == 0 {
            tracing::warn!("Page size of 0 is not usable, using 1");
        }
        Self {
            store: ResumptionStore::new(ttl_ms),
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn store(&self) -> &ResumptionStore {
        &self.store
    }

    /// Begin a listing: fetch the first page of `query`.
    pub fn start<B: SearchBackend + ?Sized>(
        &self,
        backend: &B,
        query: SearchQuery,
        schema_id: &str,
    ) -> Result<Page> {
        self.store.purge();
        self.fetch(backend, query, 1, schema_id)
    }

    /// Continue a listing from a previously issued token.
    ///
    /// The token is consumed whether or not the fetch succeeds.
    ///
    /// # Returns
    /// * `Ok(page)` for the stored next page
    /// * `Err(CatalogError::InvalidToken)` if the token is unknown, used, or expired
    pub fn resume<B: SearchBackend + ?Sized>(&self, backend: &B, token: &str) -> Result<Page> {
        self.store.purge();
        let Some(state) = self.store.take(token) else {
            tracing::warn!(token, "Unknown or expired resumption token");
            return Err(CatalogError::InvalidToken(token.to_string()));
        };
        self.fetch(backend, state.query, state.next_page, &state.schema_id)
    }

    fn fetch<B: SearchBackend + ?Sized>(
        &self,
        backend: &B,
        query: SearchQuery,
        page: u32,
        schema_id: &str,
    ) -> Result<Page> {
        tracing::debug!(page, page_size = self.page_size, filter = %query.filter, "Fetching search page");
        let items = backend.search(&query, page, self.page_size)?;
        tracing::debug!(page, count = items.len(), "Search page returned");

        // A full page is the only hint that more results may follow.
        let ticket = if items.len() == self.page_size {
            let minted_at = now_ms();
            let token = self.store.insert(ResumptionState {
                query,
                next_page: page + 1,
                schema_id: schema_id.to_string(),
                minted_at,
            });
            tracing::debug!(token = %token, next_page = page + 1, "Minted resumption token");
            Some(ResumptionTicket {
                token,
                expires_at: self.store.expires_at(minted_at),
            })
        } else {
            None
        };

        Ok(Page {
            items,
            ticket,
            schema_id: schema_id.to_string(),
            page,
        })
    }
}
