//! figshare OAI-PMH Harvester - Serve figshare articles as an OAI-PMH catalog.
//!
//! This crate adapts the figshare v2 search API to the catalog operations an
//! OAI-PMH provider needs: listing identifiers and records with date windows
//! and resumption tokens, fetching single records, and rendering articles as
//! Dublin Core or raw JSON. A command-line harvester drives the catalog to
//! write records to disk.
//!
//! # Example
//!
//! ```
//! use figshare_oai_harvester::config::CatalogConfig;
//! use figshare_oai_harvester::identifiers::IdentifierFactory;
//!
//! let config = CatalogConfig::new("figshare.com");
//! let ids = IdentifierFactory::new(&config.repository_identifier);
//! assert_eq!(ids.identifier_for(4689088), "oai:figshare.com:article/4689088");
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`catalog`]: The catalog service and its OAI-PMH operations
//! - [`config`]: Catalog configuration, defaults and YAML loading
//! - [`dates`]: Date argument parsing and harvest windows
//! - [`filter`]: Translation of a harvest window into a figshare search
//! - [`backend`]: The search backend seam
//! - [`http`]: figshare API client implementing the backend
//! - [`resumption`]: Resumption tokens and paging
//! - [`identifiers`]: OAI identifiers and datestamps
//! - [`item`]: Native figshare items
//! - [`crosswalk`]: Metadata formats (Dublin Core, JSON)
//! - [`xml`]: XML escaping, templates and element extraction
//! - [`types`]: Headers, records and listing pages
//! - [`error`]: Error types and Result alias
//! - [`cli`]: Command-line interface

pub mod backend;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod crosswalk;
pub mod dates;
pub mod error;
pub mod filter;
pub mod http;
pub mod identifiers;
pub mod item;
pub mod resumption;
pub mod types;
pub mod xml;

// Re-export the catalog service
pub use catalog::{Catalog, HarvestCatalog, ListRequest};

// Re-export commonly used items
pub use backend::SearchBackend;
pub use config::CatalogConfig;
pub use crosswalk::{Crosswalk, CrosswalkRegistry};
pub use error::{CatalogError, Result};
pub use http::FigshareClient;
pub use item::NativeItem;
pub use types::{IdentifierList, MetadataFormat, Record, RecordHeader, RecordList};
