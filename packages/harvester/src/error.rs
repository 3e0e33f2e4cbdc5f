//! Error types for the catalog.
//!
//! `CatalogError` covers both the protocol-visible failures (bad dates,
//! unknown tokens, unsupported formats, missing records) and the ambient
//! failures of the HTTP backend, configuration loading and file output.

use thiserror::Error;

/// Main error type for the catalog library.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Date argument does not match a supported granularity.
    #[error("Invalid date: '{0}'. Expected YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ")]
    InvalidGranularity(String),

    /// Resumption token is unknown, already used, or expired.
    #[error("Invalid or expired resumption token: '{0}'")]
    InvalidToken(String),

    /// Requested metadata format has no crosswalk, or the item is not eligible for it.
    #[error("Metadata format not supported: '{0}'")]
    UnsupportedSchema(String),

    /// Identifier does not resolve to a record.
    #[error("Record not found: '{0}'")]
    RecordNotFound(String),

    /// Identifier lacks the `<prefix>/<number>` structure.
    #[error("Malformed identifier: '{0}'")]
    MalformedIdentifier(String),

    /// Native item lacks a field required to build its header.
    #[error("Item is missing required field '{0}'")]
    MissingField(&'static str),

    /// The search backend reported a failure.
    #[error("Upstream search failed: {0}")]
    Upstream(String),

    /// The record exists but no metadata format can disseminate it.
    #[error("No metadata formats available for record: '{0}'")]
    NoMetadataFormats(String),

    /// The repository does not support sets.
    #[error("This repository does not support sets")]
    NoSetHierarchy,

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// All retry attempts exhausted.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// Configured custom field pattern is not a valid regex.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// OAI-PMH error code the hosting protocol layer should report.
    ///
    /// Returns `None` for failures that are not part of the protocol's error
    /// vocabulary; those are internal server errors.
    #[must_use]
    pub fn oai_code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidGranularity(_) => Some("badArgument"),
            Self::InvalidToken(_) => Some("badResumptionToken"),
            Self::UnsupportedSchema(_) => Some("cannotDisseminateFormat"),
            Self::RecordNotFound(_) | Self::MalformedIdentifier(_) => Some("idDoesNotExist"),
            Self::NoMetadataFormats(_) => Some("noMetadataFormats"),
            Self::NoSetHierarchy => Some("noSetHierarchy"),
            _ => None,
        }
    }

    /// Whether the failure came from the upstream API rather than the request.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_) | Self::Http(_) | Self::RetriesExhausted { .. }
        )
    }
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
