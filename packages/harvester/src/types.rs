//! Core data types returned by the catalog.
//!
//! These mirror the pieces of an OAI-PMH response the catalog is responsible
//! for: record headers, rendered records, listing pages, and the formats a
//! record can be disseminated in.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::resumption::ResumptionTicket;
use crate::xml::cdata_escape;

/// Header of one record: its OAI identifier and datestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// OAI identifier (e.g., "oai:figshare.com:article/4689088").
    pub identifier: String,

    /// Last modification datestamp; absent when the record carries no dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datestamp: Option<String>,
}

/// Characters that cannot appear in portable file names.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static FILE_NAME_UNSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\s.<>:"'/\\|?*]"#).expect("valid regex"));

impl RecordHeader {
    #[must_use]
    pub fn new(identifier: impl Into<String>, datestamp: Option<String>) -> Self {
        Self {
            identifier: identifier.into(),
            datestamp,
        }
    }

    /// Generate a file name for the record from its identifier.
    ///
    /// # Examples
    /// ```
    /// use figshare_oai_harvester::types::RecordHeader;
    ///
    /// let header = RecordHeader::new("oai:figshare.com:article/4689088", None);
    /// assert_eq!(header.to_file_name(), "oai_figshare_com_article_4689088.xml");
    /// ```
    #[must_use]
    pub fn to_file_name(&self) -> String {
        format!("{}.xml", FILE_NAME_UNSAFE.replace_all(&self.identifier, "_"))
    }

    /// Render the header element.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<header><identifier>");
        out.push_str(&cdata_escape(&self.identifier));
        out.push_str("</identifier>");
        if let Some(datestamp) = &self.datestamp {
            out.push_str("<datestamp>");
            out.push_str(&cdata_escape(datestamp));
            out.push_str("</datestamp>");
        }
        out.push_str("</header>");
        out
    }
}

/// A record rendered in one metadata format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub header: RecordHeader,

    /// Metadata fragment produced by the crosswalk.
    pub metadata: String,
}

impl Record {
    /// Render the whole record as a standalone XML document.
    ///
    /// # Examples
    /// ```
    /// use figshare_oai_harvester::types::{Record, RecordHeader};
    ///
    /// let record = Record {
    ///     header: RecordHeader::new("oai:repo:article/1", Some("2020-01-01".to_string())),
    ///     metadata: "<x/>".to_string(),
    /// };
    /// assert_eq!(
    ///     record.to_xml(),
    ///     "<record><header><identifier>oai:repo:article/1</identifier>\
    ///      <datestamp>2020-01-01</datestamp></header><metadata><x/></metadata></record>"
    /// );
    /// ```
    #[must_use]
    pub fn to_xml(&self) -> String {
        format!(
            "<record>{}<metadata>{}</metadata></record>",
            self.header.to_xml(),
            self.metadata
        )
    }
}

/// One page of a ListIdentifiers response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentifierList {
    pub headers: Vec<RecordHeader>,

    /// Present when the listing may continue.
    pub ticket: Option<ResumptionTicket>,
}

/// One page of a ListRecords response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordList {
    pub records: Vec<Record>,

    /// Present when the listing may continue.
    pub ticket: Option<ResumptionTicket>,
}

/// A metadata format a record can be disseminated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFormat {
    /// Metadata prefix (e.g., "oai_dc").
    pub prefix: String,

    /// Namespace URI followed by the schema URL.
    pub schema_location: String,

    /// Namespace URI.
    pub namespace: String,
}
