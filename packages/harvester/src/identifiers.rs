//! OAI identifiers and datestamps for native items.

use crate::error::{CatalogError, Result};
use crate::item::NativeItem;

/// Fixed segment between the namespace and the upstream id.
pub const ARTICLE_SEGMENT: &str = "article";

/// Builds and parses identifiers of the form `oai:<namespace>:article/<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierFactory {
    namespace: String,
}

impl IdentifierFactory {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// OAI identifier for an upstream id.
    #[must_use]
    pub fn identifier_for(&self, id: u64) -> String {
        format!("oai:{}:{ARTICLE_SEGMENT}/{id}", self.namespace)
    }

    /// OAI identifier for a native item.
    ///
    /// # Returns
    /// * `Ok(identifier)` when the item has a numeric `id`
    /// * `Err(CatalogError::MissingField("id"))` otherwise
    pub fn identifier_of(&self, item: &NativeItem) -> Result<String> {
        item.id()
            .map(|id| self.identifier_for(id))
            .ok_or(CatalogError::MissingField("id"))
    }
}

/// Upstream id encoded in an OAI identifier.
///
/// Takes the segment after the first `/`, up to the next `/`.
///
/// # Examples
/// ```
/// use figshare_oai_harvester::identifiers::local_id_from_external;
///
/// assert_eq!(local_id_from_external("oai:figshare.com:article/4689088").unwrap(), 4689088);
/// assert!(local_id_from_external("oai:figshare.com:article").is_err());
/// ```
pub fn local_id_from_external(identifier: &str) -> Result<u64> {
    identifier
        .split('/')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| CatalogError::MalformedIdentifier(identifier.to_string()))
}

/// Modification datestamp of a native item.
///
/// Prefers `timeline.revision`, then `published_date`. Values shorter than two
/// characters count as absent.
///
/// # Returns
/// The normalized datestamp, or `None` if the item carries neither field
pub fn datestamp_of(item: &NativeItem) -> Option<String> {
    item.nested_text("timeline", "revision")
        .filter(|d| d.len() >= 2)
        .or_else(|| item.text("published_date").filter(|d| d.len() >= 2))
        .map(normalize_datestamp)
}

/// Append a UTC marker to a date-time lacking one; dates pass unchanged.
///
/// # Examples
/// ```
/// use figshare_oai_harvester::identifiers::normalize_datestamp;
///
/// assert_eq!(normalize_datestamp("2020-01-02"), "2020-01-02");
/// assert_eq!(normalize_datestamp("2020-01-02T03:04:05"), "2020-01-02T03:04:05Z");
/// assert_eq!(normalize_datestamp("2020-01-02T03:04:05Z"), "2020-01-02T03:04:05Z");
/// ```
pub fn normalize_datestamp(date: &str) -> String {
    if date.len() > 10 && !date.ends_with('Z') {
        format!("{date}Z")
    } else {
        date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> NativeItem {
        NativeItem::from_value(value).unwrap()
    }

    #[test]
    fn test_identifier_of() {
        let factory = IdentifierFactory::new("melbourne.figshare.com");
        let id = factory.identifier_of(&item(json!({"id": 4689088}))).unwrap();
        assert_eq!(id, "oai:melbourne.figshare.com:article/4689088");
    }

    #[test]
    fn test_identifier_requires_numeric_id() {
        let factory = IdentifierFactory::new("repo");
        assert!(matches!(
            factory.identifier_of(&item(json!({"title": "x"}))),
            Err(CatalogError::MissingField("id"))
        ));
        assert!(factory.identifier_of(&item(json!({"id": "12"}))).is_err());
        assert!(factory.identifier_of(&item(json!({"id": -3}))).is_err());
    }

    #[test]
    fn test_local_id_round_trip() {
        let factory = IdentifierFactory::new("repo.example.org");
        let identifier = factory.identifier_for(987654321);
        assert_eq!(local_id_from_external(&identifier).unwrap(), 987654321);
    }

    #[test]
    fn test_local_id_malformed() {
        for bad in ["", "oai:repo:article", "oai:repo:article/", "oai:repo:article/abc"] {
            assert!(
                matches!(local_id_from_external(bad), Err(CatalogError::MalformedIdentifier(_))),
                "{bad} should be malformed"
            );
        }
    }

    #[test]
    fn test_datestamp_prefers_revision() {
        let it = item(json!({
            "timeline": {"revision": "2021-05-06T07:08:09"},
            "published_date": "2020-01-01T00:00:00Z"
        }));
        assert_eq!(datestamp_of(&it).as_deref(), Some("2021-05-06T07:08:09Z"));
    }

    #[test]
    fn test_datestamp_falls_back_to_published_date() {
        let it = item(json!({"timeline": {}, "published_date": "2020-01-01T00:00:00Z"}));
        assert_eq!(datestamp_of(&it).as_deref(), Some("2020-01-01T00:00:00Z"));

        let it = item(json!({"timeline": {"revision": ""}, "published_date": "2020-01-01"}));
        assert_eq!(datestamp_of(&it).as_deref(), Some("2020-01-01"));
    }

    #[test]
    fn test_datestamp_date_only_unchanged() {
        for date in ["2019-12-31", "2000-01-01", "1999-07-04"] {
            let it = item(json!({"published_date": date}));
            assert_eq!(datestamp_of(&it).as_deref(), Some(date));
        }
    }

    #[test]
    fn test_datestamp_absent() {
        assert_eq!(datestamp_of(&item(json!({"id": 1}))), None);
        assert_eq!(datestamp_of(&item(json!({"published_date": "x"}))), None);
    }

    #[test]
    fn test_normalize_datestamp_is_idempotent() {
        for date in ["2020-01-02T03:04:05", "2020-01-02T03:04:05Z", "2020-01-02"] {
            let once = normalize_datestamp(date);
            assert_eq!(normalize_datestamp(&once), once);
            assert!(once.matches('Z').count() <= 1);
        }
    }
}
