//! Configuration for the catalog and the figshare API backend.
//!
//! Configuration is read once from a YAML file (or built in code) and held
//! immutably by each [`Catalog`](crate::catalog::Catalog).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dates::Granularity;
use crate::error::{CatalogError, Result};

/// Base URL of the public figshare v2 API.
pub const FIGSHARE_API_URL: &str = "https://api.figshare.com/v2";

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Number of additional attempts after a transient transport failure.
pub const DEFAULT_RETRIES: u32 = 2;

/// Page size used when none is configured.
pub const DEFAULT_MAX_LIST_SIZE: usize = 10;

/// Largest page size the figshare search API handles comfortably.
pub const MAX_LIST_SIZE_LIMIT: usize = 20;

/// Resumption token lifetime when none is configured (one hour).
pub const DEFAULT_TOKEN_TTL_MS: i64 = 3_600_000;

/// Latest year the figshare search syntax accepts.
pub const DEFAULT_MAX_YEAR: i32 = 2999;

/// Catalog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Namespace used in OAI identifiers (`oai:<namespace>:article/<id>`).
    pub repository_identifier: String,

    /// Static search filter applied to every listing.
    #[serde(default)]
    pub search_filter: Option<String>,

    /// Restrict listings to one figshare institution.
    #[serde(default)]
    pub institution: Option<i64>,

    /// Records per page.
    #[serde(default = "default_max_list_size")]
    pub max_list_size: usize,

    /// Resumption token lifetime in milliseconds; negative means unlimited.
    #[serde(default = "default_token_ttl_ms")]
    pub token_ttl_ms: i64,

    /// Finest date granularity the repository advertises.
    #[serde(default)]
    pub granularity: Granularity,

    /// Dates beyond this year are clamped to its last instant.
    #[serde(default = "default_max_year")]
    pub max_year: i32,

    /// Dublin Core crosswalk settings.
    #[serde(default)]
    pub dublin_core: DublinCoreConfig,

    /// figshare API connection settings.
    #[serde(default)]
    pub api: ApiConfig,
}

/// Settings for the `oai_dc` crosswalk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DublinCoreConfig {
    /// Ordered custom field rules; the first matching rule wins.
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldConfig>,

    /// Template rendered once per downloadable file.
    #[serde(default)]
    pub files_format: Option<String>,

    /// Extra attributes appended to the `<oai_dc:dc>` root element.
    #[serde(default)]
    pub root_attributes: String,
}

/// One custom field rule: a full-match name pattern and its output template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldConfig {
    pub regex: String,
    pub format: String,
}

/// figshare API connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Personal token; only needed for private records.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
        }
    }
}

fn default_max_list_size() -> usize {
    DEFAULT_MAX_LIST_SIZE
}

fn default_token_ttl_ms() -> i64 {
    DEFAULT_TOKEN_TTL_MS
}

fn default_max_year() -> i32 {
    DEFAULT_MAX_YEAR
}

fn default_base_url() -> String {
    FIGSHARE_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    HTTP_TIMEOUT_SECS
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

impl CatalogConfig {
    /// Create a configuration with defaults for everything but the namespace.
    pub fn new(repository_identifier: impl Into<String>) -> Self {
        Self {
            repository_identifier: repository_identifier.into(),
            search_filter: None,
            institution: None,
            max_list_size: DEFAULT_MAX_LIST_SIZE,
            token_ttl_ms: DEFAULT_TOKEN_TTL_MS,
            granularity: Granularity::default(),
            max_year: DEFAULT_MAX_YEAR,
            dublin_core: DublinCoreConfig::default(),
            api: ApiConfig::default(),
        }
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a YAML configuration document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validated()
    }

    pub fn with_search_filter(mut self, filter: impl Into<String>) -> Self {
        self.search_filter = Some(filter.into());
        self
    }

    pub fn with_institution(mut self, institution: i64) -> Self {
        self.institution = Some(institution);
        self
    }

    pub fn with_max_list_size(mut self, max_list_size: usize) -> Self {
        self.max_list_size = max_list_size;
        self
    }

    pub fn with_token_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.token_ttl_ms = ttl_ms;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_custom_field(mut self, regex: impl Into<String>, format: impl Into<String>) -> Self {
        self.dublin_core.custom_fields.push(CustomFieldConfig {
            regex: regex.into(),
            format: format.into(),
        });
        self
    }

    pub fn with_files_format(mut self, format: impl Into<String>) -> Self {
        self.dublin_core.files_format = Some(format.into());
        self
    }

    pub fn with_root_attributes(mut self, attributes: impl Into<String>) -> Self {
        self.dublin_core.root_attributes = attributes.into();
        self
    }

    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    /// Normalize blank optional strings and clamp the page size.
    ///
    /// # Returns
    /// * `Ok(config)` with blank filters removed and `max_list_size` in `1..=20`
    /// * `Err(CatalogError::Config)` if the repository identifier is empty
    pub fn validated(mut self) -> Result<Self> {
        if self.repository_identifier.trim().is_empty() {
            return Err(CatalogError::Config(
                "repository_identifier must not be empty".to_string(),
            ));
        }

        self.search_filter = self
            .search_filter
            .take()
            .filter(|f| !f.trim().is_empty());
        self.dublin_core.files_format = self
            .dublin_core
            .files_format
            .take()
            .filter(|f| !f.trim().is_empty());
        if self.dublin_core.root_attributes.trim().is_empty() {
            self.dublin_core.root_attributes.clear();
        }

        if self.max_list_size > MAX_LIST_SIZE_LIMIT {
            tracing::info!(
                requested = self.max_list_size,
                limit = MAX_LIST_SIZE_LIMIT,
                "max_list_size over the limit is not advisable, clamping"
            );
            self.max_list_size = MAX_LIST_SIZE_LIMIT;
        } else if self.max_list_size == 0 {
            tracing::info!(
                default = DEFAULT_MAX_LIST_SIZE,
                "max_list_size of 0 is not usable, using default"
            );
            self.max_list_size = DEFAULT_MAX_LIST_SIZE;
        }

        Ok(self)
    }
}
