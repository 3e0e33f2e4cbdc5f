//! Translation of harvest requests into figshare search queries.
//!
//! The figshare search API accepts one free-text `search_for` string plus a
//! handful of body parameters. The upper date bound is only expressible in
//! the text (`:modified_before:`), the lower bound only as a parameter
//! (`modified_since`), so a window is split across both mechanisms.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::dates::HarvestWindow;

/// Search syntax field for the exclusive upper modification bound.
pub const MODIFIED_BEFORE_FIELD: &str = ":modified_before:";

/// Body parameter for the lower modification bound.
pub const MODIFIED_SINCE_PARAM: &str = "modified_since";

/// Body parameter restricting results to one institution.
pub const INSTITUTION_PARAM: &str = "institution";

/// A query ready to be sent, page by page, to the search backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Text for the `search_for` field.
    pub filter: String,
    /// Window the query was built from.
    pub window: HarvestWindow,
    /// Extra body parameters, sorted by name.
    pub params: BTreeMap<String, Value>,
}

/// Build a search query from the configured filter, a harvest window and
/// optional caller text.
///
/// # Arguments
/// * `static_filter` - Filter configured for the repository, if any
/// * `window` - Harvest date window
/// * `search_text` - Caller supplied free text; empty for none
/// * `institution` - Institution constraint, if configured
///
/// # Returns
/// A `SearchQuery` whose filter AND-combines the non-empty clauses in the
/// order static filter, caller text, date predicate; caller text is
/// parenthesized whenever another clause is present
///
/// # Examples
/// ```
/// use figshare_oai_harvester::dates::{normalize, DateOptions, HarvestWindow};
/// use figshare_oai_harvester::filter::translate;
///
/// let until = normalize("2022-07-02T00:00:00Z", true, &DateOptions::default()).unwrap();
/// let window = HarvestWindow { from: None, until };
/// let query = translate(Some(":group: Zoology"), window, "", None);
/// assert_eq!(
///     query.filter,
///     ":group: Zoology AND ( :modified_before: 02/07/2022T00:00:00Z )"
/// );
/// ```
pub fn translate(
    static_filter: Option<&str>,
    window: HarvestWindow,
    search_text: &str,
    institution: Option<i64>,
) -> SearchQuery {
    let date_predicate = window
        .until
        .map(|until| format!("{MODIFIED_BEFORE_FIELD} {}", until.to_search_string()));

    let static_filter = static_filter.filter(|f| !f.trim().is_empty());
    let search_text = Some(search_text).filter(|t| !t.trim().is_empty());
    let clause_count = [static_filter, search_text, date_predicate.as_deref()]
        .iter()
        .flatten()
        .count();

    // Caller text is grouped whenever it is combined, so its OR cannot
    // escape the AND.
    let grouped_text = search_text.map(|text| {
        if clause_count > 1 {
            format!("( {text} )")
        } else {
            text.to_string()
        }
    });

    let mut filter = String::new();
    if let Some(clause) = static_filter {
        filter.push_str(clause);
    }
    if let Some(text) = &grouped_text {
        if !filter.is_empty() {
            filter.push_str(" AND ");
        }
        filter.push_str(text);
    }
    if let Some(predicate) = &date_predicate {
        if !filter.is_empty() {
            filter.push_str(" AND ( ");
            filter.push_str(predicate);
            filter.push_str(" )");
        } else {
            filter.push_str(predicate);
        }
    }

    let mut params = BTreeMap::new();
    if let Some(from) = window.from {
        params.insert(
            MODIFIED_SINCE_PARAM.to_string(),
            Value::String(from.to_protocol_string()),
        );
    }
    if let Some(id) = institution {
        params.insert(INSTITUTION_PARAM.to_string(), Value::from(id));
    }

    tracing::debug!(filter = %filter, params = params.len(), "Translated search query");

    SearchQuery {
        filter,
        window,
        params,
    }
}
