//! Catalog façade answering harvesting requests.
//!
//! [`Catalog`] ties the date normalizer, filter translator, paginator,
//! identifier factory and crosswalks together behind [`HarvestCatalog`],
//! the interface a protocol layer calls for each verb.

use crate::backend::SearchBackend;
use crate::config::CatalogConfig;
use crate::crosswalk::{Crosswalk, CrosswalkRegistry};
use crate::dates::{DateOptions, HarvestWindow};
use crate::error::{CatalogError, Result};
use crate::filter::translate;
use crate::identifiers::{datestamp_of, local_id_from_external, IdentifierFactory};
use crate::item::NativeItem;
use crate::resumption::{Page, Paginator};
use crate::types::{IdentifierList, MetadataFormat, Record, RecordHeader, RecordList};

/// Arguments of a fresh ListIdentifiers or ListRecords request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub from: Option<String>,
    pub until: Option<String>,
    /// Set restriction; accepted and ignored.
    pub set: Option<String>,
    pub metadata_prefix: String,
    /// Free text added to the search filter.
    pub query: Option<String>,
}

impl ListRequest {
    pub fn new(metadata_prefix: impl Into<String>) -> Self {
        Self {
            metadata_prefix: metadata_prefix.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn with_until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }

    #[must_use]
    pub fn with_set(mut self, set: impl Into<String>) -> Self {
        self.set = Some(set.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Operations a harvesting protocol layer needs from a repository.
///
/// Errors map onto protocol error codes through
/// [`CatalogError::oai_code`](crate::error::CatalogError::oai_code).
pub trait HarvestCatalog {
    /// Headers of the first page of records modified in the window.
    fn list_identifiers(&self, request: &ListRequest) -> Result<IdentifierList>;

    /// Next page of a ListIdentifiers listing.
    fn list_identifiers_resume(&self, token: &str) -> Result<IdentifierList>;

    /// First page of records modified in the window, rendered in the
    /// requested format.
    fn list_records(&self, request: &ListRequest) -> Result<RecordList>;

    /// Next page of a ListRecords listing.
    fn list_records_resume(&self, token: &str) -> Result<RecordList>;

    /// One record rendered in the requested format.
    fn get_record(&self, identifier: &str, metadata_prefix: &str) -> Result<Record>;

    /// Formats available for one record, or every supported format.
    ///
    /// A record that no format can disseminate is `CatalogError::NoMetadataFormats`.
    fn list_metadata_formats(&self, identifier: Option<&str>) -> Result<Vec<MetadataFormat>>;

    /// Set specs of the repository.
    fn list_sets(&self) -> Result<Vec<String>>;
}

/// A figshare-backed catalog.
///
/// Holds only immutable configuration and the resumption store, so one
/// instance can be shared between request threads.
pub struct Catalog<B: SearchBackend> {
    config: CatalogConfig,
    identifiers: IdentifierFactory,
    crosswalks: CrosswalkRegistry,
    paginator: Paginator,
    backend: B,
}

impl<B: SearchBackend> Catalog<B> {
    /// Create a catalog with the built-in `oai_dc` and `json` formats.
    ///
    /// # Errors
    /// * `CatalogError::Config` - repository identifier is empty
    /// * `CatalogError::Pattern` - a custom field pattern does not compile
    pub fn new(config: CatalogConfig, backend: B) -> Result<Self> {
        let config = config.validated()?;
        let crosswalks = CrosswalkRegistry::with_defaults(&config.dublin_core)?;
        tracing::debug!(
            repository = %config.repository_identifier,
            page_size = config.max_list_size,
            ttl_ms = config.token_ttl_ms,
            formats = ?crosswalks.schema_ids(),
            "Catalog created"
        );
        Ok(Self {
            identifiers: IdentifierFactory::new(config.repository_identifier.clone()),
            paginator: Paginator::new(config.max_list_size, config.token_ttl_ms),
            crosswalks,
            config,
            backend,
        })
    }

    /// Add or replace a metadata format.
    pub fn register_crosswalk(&mut self, prefix: impl Into<String>, crosswalk: impl Crosswalk + 'static) {
        self.crosswalks.register(prefix, crosswalk);
    }

    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    #[must_use]
    pub fn identifiers(&self) -> &IdentifierFactory {
        &self.identifiers
    }

    #[must_use]
    pub fn crosswalks(&self) -> &CrosswalkRegistry {
        &self.crosswalks
    }

    #[must_use]
    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn date_options(&self) -> DateOptions {
        DateOptions {
            granularity: self.config.granularity,
            max_year: self.config.max_year,
        }
    }

    fn ensure_schema(&self, prefix: &str) -> Result<()> {
        if self.crosswalks.has_schema(prefix) {
            Ok(())
        } else {
            Err(CatalogError::UnsupportedSchema(prefix.to_string()))
        }
    }

    /// Validate a fresh listing request and fetch its first page.
    fn start_listing(&self, request: &ListRequest) -> Result<Page> {
        self.ensure_schema(&request.metadata_prefix)?;
        if let Some(set) = &request.set {
            tracing::debug!(set = %set, "Set argument ignored, repository has no sets");
        }

        let window = HarvestWindow::from_args(
            request.from.as_deref(),
            request.until.as_deref(),
            &self.date_options(),
        )?;
        let query = translate(
            self.config.search_filter.as_deref(),
            window,
            request.query.as_deref().unwrap_or_default(),
            self.config.institution,
        );
        self.paginator
            .start(&self.backend, query, &request.metadata_prefix)
    }

    fn header_of(&self, item: &NativeItem) -> Result<RecordHeader> {
        Ok(RecordHeader::new(
            self.identifiers.identifier_of(item)?,
            datestamp_of(item),
        ))
    }

    fn identifier_page(&self, page: Page) -> IdentifierList {
        let headers = page
            .items
            .iter()
            .filter_map(|item| match self.header_of(item) {
                Ok(header) => Some(header),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping search result without identifier");
                    None
                }
            })
            .collect();
        IdentifierList {
            headers,
            ticket: page.ticket,
        }
    }

    /// Expand search summaries into full records.
    ///
    /// Records that vanished upstream or cannot be rendered in the listing's
    /// format are logged and left out; upstream failures abort the page.
    fn record_page(&self, page: Page) -> Result<RecordList> {
        let mut records = Vec::with_capacity(page.items.len());
        for summary in &page.items {
            let Some(id) = summary.id() else {
                tracing::warn!("Skipping search result without id");
                continue;
            };
            let Some(item) = self.backend.article(id)? else {
                tracing::error!(id, "Search result no longer exists upstream, skipping");
                continue;
            };
            match self.render_record(&item, &page.schema_id) {
                Ok(record) => records.push(record),
                Err(CatalogError::UnsupportedSchema(prefix)) => {
                    tracing::warn!(id, prefix = %prefix, "Record not available in format, skipping");
                }
                Err(CatalogError::MissingField(field)) => {
                    tracing::warn!(id, field, "Record is missing a header field, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        tracing::debug!(
            page = page.page,
            fetched = page.items.len(),
            rendered = records.len(),
            "Record page expanded"
        );
        Ok(RecordList {
            records,
            ticket: page.ticket,
        })
    }

    fn render_record(&self, item: &NativeItem, prefix: &str) -> Result<Record> {
        let header = self.header_of(item)?;
        let metadata = self.crosswalks.render(item, prefix)?;
        Ok(Record { header, metadata })
    }

    /// Fetch the full native record for an OAI identifier.
    fn fetch_item(&self, identifier: &str) -> Result<NativeItem> {
        let id = local_id_from_external(identifier).map_err(|e| {
            tracing::debug!(error = %e, "Identifier cannot name a record");
            CatalogError::RecordNotFound(identifier.to_string())
        })?;
        self.backend
            .article(id)?
            .ok_or_else(|| CatalogError::RecordNotFound(identifier.to_string()))
    }
}

impl<B: SearchBackend> HarvestCatalog for Catalog<B> {
    fn list_identifiers(&self, request: &ListRequest) -> Result<IdentifierList> {
        tracing::debug!(from = ?request.from, until = ?request.until, "ListIdentifiers");
        let page = self.start_listing(request)?;
        Ok(self.identifier_page(page))
    }

    fn list_identifiers_resume(&self, token: &str) -> Result<IdentifierList> {
        tracing::debug!(token, "ListIdentifiers resumed");
        let page = self.paginator.resume(&self.backend, token)?;
        Ok(self.identifier_page(page))
    }

    fn list_records(&self, request: &ListRequest) -> Result<RecordList> {
        tracing::debug!(from = ?request.from, until = ?request.until, "ListRecords");
        let page = self.start_listing(request)?;
        self.record_page(page)
    }

    fn list_records_resume(&self, token: &str) -> Result<RecordList> {
        tracing::debug!(token, "ListRecords resumed");
        let page = self.paginator.resume(&self.backend, token)?;
        self.record_page(page)
    }

    fn get_record(&self, identifier: &str, metadata_prefix: &str) -> Result<Record> {
        tracing::debug!(identifier, metadata_prefix, "GetRecord");
        self.ensure_schema(metadata_prefix)?;
        let item = self.fetch_item(identifier)?;
        self.render_record(&item, metadata_prefix)
    }

    fn list_metadata_formats(&self, identifier: Option<&str>) -> Result<Vec<MetadataFormat>> {
        let describe = |(prefix, crosswalk): (&str, &dyn Crosswalk)| MetadataFormat {
            prefix: prefix.to_string(),
            schema_location: crosswalk.schema_location().to_string(),
            namespace: crosswalk.namespace().to_string(),
        };

        match identifier {
            None => Ok(self
                .crosswalks
                .schema_ids()
                .into_iter()
                .filter_map(|prefix| self.crosswalks.get(prefix).map(|c| (prefix, c)))
                .map(describe)
                .collect()),
            Some(identifier) => {
                let item = self.fetch_item(identifier)?;
                let formats: Vec<_> = self.crosswalks.available_for(&item).map(describe).collect();
                if formats.is_empty() {
                    tracing::debug!(identifier, "Record has no available metadata formats");
                    return Err(CatalogError::NoMetadataFormats(identifier.to_string()));
                }
                Ok(formats)
            }
        }
    }

    fn list_sets(&self) -> Result<Vec<String>> {
        Err(CatalogError::NoSetHierarchy)
    }
}
