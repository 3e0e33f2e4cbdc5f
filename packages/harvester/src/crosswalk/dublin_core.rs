//! Qualified Dublin Core (`oai_dc`) crosswalk.
//!
//! Output follows figshare's own OAI-PMH feed where the two overlap (DCMI type
//! before the figshare type, author ids in creator names) and adds
//! `dcterms` refinements linked with `rdf:resource` where figshare has the
//! data: ORCID/profile URIs, first online date, embargo, references and
//! funding.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::Crosswalk;
use crate::config::DublinCoreConfig;
use crate::error::{CatalogError, Result};
use crate::identifiers::{datestamp_of, normalize_datestamp};
use crate::item::{field_flag, field_text, field_u64, value_to_text, NativeItem};
use crate::xml::{attribute_escape, cdata_escape, format_name_value};

/// Metadata prefix of the Dublin Core crosswalk.
pub const OAI_DC_PREFIX: &str = "oai_dc";

/// Namespace URI of `oai_dc`.
pub const OAI_DC_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/oai_dc/";

const OAI_DC_SCHEMA_LOCATION: &str =
    "http://www.openarchives.org/OAI/2.0/oai_dc/ http://www.openarchives.org/OAI/2.0/oai_dc.xsd";

const ROOT_NAMESPACES: &str = concat!(
    "xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ",
    "xmlns:dc=\"http://purl.org/dc/elements/1.1/\" ",
    "xmlns:dcterms=\"http://purl.org/dc/terms/\" ",
    "xmlns:oai_dc=\"http://www.openarchives.org/OAI/2.0/oai_dc/\" ",
    "xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\"",
);

const DOI_RESOLVER: &str = "https://doi.org/";
const HANDLE_RESOLVER: &str = "https://hdl.handle.net/";
const ORCID_RESOLVER: &str = "https://orcid.org/";
const FIGSHARE_AUTHOR_URL: &str = "https://figshare.com/authors/_/";

const URI_TYPE: &str = " xsi:type=\"dcterms:URI\"";

/// Fields a record needs before it can be rendered.
const REQUIRED_FIELDS: [&str; 6] = [
    "title",
    "id",
    "description",
    "citation",
    "defined_type_name",
    "url_public_html",
];

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^10\.\d{4,9}/[-._;()/:a-zA-Z0-9]+$").expect("valid regex")
});

/// A compiled custom field rule.
#[derive(Debug, Clone)]
struct CustomFieldRule {
    pattern: Regex,
    template: String,
}

/// Dublin Core crosswalk with its configured templates.
#[derive(Debug, Clone)]
pub struct DublinCore {
    custom_fields: Vec<CustomFieldRule>,
    files_format: Option<String>,
    root_attributes: String,
}

impl DublinCore {
    /// Compile the crosswalk settings.
    ///
    /// Custom field patterns must match the whole field name.
    ///
    /// # Errors
    /// Returns `CatalogError::Pattern` if a pattern does not compile.
    pub fn from_config(config: &DublinCoreConfig) -> Result<Self> {
        let custom_fields = config
            .custom_fields
            .iter()
            .map(|rule| -> Result<CustomFieldRule> {
                Ok(CustomFieldRule {
                    pattern: Regex::new(&format!("^(?:{})$", rule.regex))?,
                    template: rule.format.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            custom_fields,
            files_format: config
                .files_format
                .clone()
                .filter(|f| !f.trim().is_empty()),
            root_attributes: config.root_attributes.trim().to_string(),
        })
    }

    fn render_identifiers(&self, out: &mut String, item: &NativeItem) {
        let doi = item.text("doi").map(|doi| with_resolver(doi, DOI_RESOLVER));
        let handle = item
            .text("handle")
            .map(|handle| with_resolver(handle, HANDLE_RESOLVER));
        let web_url = text_of(item.fields(), "url_public_html");

        if let Some(doi) = &doi {
            push_element(out, "dc:identifier", URI_TYPE, &cdata_escape(doi));
        }
        if let Some(handle) = &handle {
            push_element(out, "dc:identifier", URI_TYPE, &cdata_escape(handle));
        }
        if doi.is_none() && handle.is_none() {
            push_element(out, "dc:identifier", URI_TYPE, &cdata_escape(&web_url));
        }
        push_comment(out, "figshare link");
        push_element(out, "dc:relation", URI_TYPE, &cdata_escape(&web_url));
    }

    fn render_dates(&self, out: &mut String, item: &NativeItem) {
        if let Some(datestamp) = datestamp_of(item) {
            push_element(out, "dc:date", "", &cdata_escape(&datestamp));
        }
        if let Some(first_online) = item.nested_text("timeline", "firstOnline") {
            push_comment(out, "firstOnline");
            push_element(
                out,
                "dcterms:issued",
                "",
                &cdata_escape(&normalize_datestamp(first_online)),
            );
        }
        if item.flag("is_embargoed") {
            match item.text("embargo_date") {
                Some(until) => {
                    push_comment(out, "Embargoed until");
                    push_element(
                        out,
                        "dcterms:available",
                        "",
                        &cdata_escape(&normalize_datestamp(until)),
                    );
                }
                None => push_comment(out, "Embargoed indefinitely, restricted access"),
            }
        }
    }

    fn render_types(&self, out: &mut String, item: &NativeItem) {
        let type_name = text_of(item.fields(), "defined_type_name");
        let dcmi = dcmi_type(&type_name);
        push_element(out, "dc:type", " xsi:type=\"dcterms:DCMIType\"", dcmi);
        if !dcmi.eq_ignore_ascii_case(&type_name) {
            push_element(
                out,
                "dc:type",
                " xsi:type=\"figshare:types\"",
                &cdata_escape(&type_name),
            );
        }
    }

    fn render_relations(&self, out: &mut String, item: &NativeItem) {
        if let Some(title) = item.text("resource_title") {
            push_comment(out, "Resource Title in figshare");
            push_element(out, "dcterms:isReferencedBy", "", &cdata_escape(title));
        }
        if let Some(doi) = item.text("resource_doi") {
            push_comment(out, "Resource DOI in figshare");
            push_element(
                out,
                "dcterms:isReferencedBy",
                URI_TYPE,
                &cdata_escape(&with_resolver(doi, DOI_RESOLVER)),
            );
        }
        if let Some(license) = item.object("license") {
            if let Some(name) = field_text(license, "name") {
                push_element(out, "dc:rights", "", &cdata_escape(name));
            }
            if let Some(url) = field_text(license, "url") {
                push_element(out, "dc:rights", URI_TYPE, &cdata_escape(url));
            }
        }
    }

    fn render_creators(&self, out: &mut String, item: &NativeItem) {
        for author in item.list("authors").iter().filter_map(Value::as_object) {
            let id = field_u64(author, "id").filter(|id| *id > 0);
            let person_uri = match (field_text(author, "orcid_id"), id) {
                (Some(orcid), _) => Some(with_resolver(orcid, ORCID_RESOLVER)),
                (None, Some(id)) if field_flag(author, "is_active") => {
                    Some(format!("{FIGSHARE_AUTHOR_URL}{id}"))
                }
                _ => None,
            };
            let resource = person_uri
                .as_deref()
                .map(|uri| format!(" rdf:resource=\"{}\"", attribute_escape(uri)))
                .unwrap_or_default();

            let mut name = text_of(author, "full_name");
            if let Some(id) = id {
                name.push_str(&format!(" ({id})"));
            }
            push_element(out, "dc:creator", &resource, &cdata_escape(&name));

            if let Some(uri) = &person_uri {
                push_element(
                    out,
                    "dcterms:creator",
                    &format!(" refines=\"dc:creator\"{URI_TYPE}{resource}"),
                    &cdata_escape(uri),
                );
            }
        }
    }

    fn render_subjects(&self, out: &mut String, item: &NativeItem) {
        for title in item
            .list("categories")
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|category| field_text(category, "title"))
        {
            push_element(
                out,
                "dc:subject",
                " xsi:type=\"figshare:categories\"",
                &cdata_escape(title),
            );
        }
        for tag in item
            .list("tags")
            .iter()
            .filter_map(Value::as_str)
            .filter(|t| !t.is_empty())
        {
            push_element(out, "dc:subject", " xsi:type=\"figshare:tags\"", &cdata_escape(tag));
        }
    }

    fn render_references(&self, out: &mut String, item: &NativeItem) {
        for reference in item
            .list("references")
            .iter()
            .filter_map(Value::as_str)
            .filter(|r| !r.is_empty())
        {
            let reference = if DOI_PATTERN.is_match(reference) {
                format!("{DOI_RESOLVER}{reference}")
            } else {
                reference.to_string()
            };
            let attributes = if reference.starts_with("http") {
                URI_TYPE
            } else {
                ""
            };
            push_element(out, "dcterms:references", attributes, &cdata_escape(&reference));
        }
    }

    fn render_funding(&self, out: &mut String, item: &NativeItem) {
        let funding = item.list("funding_list");
        if funding.is_empty() {
            return;
        }
        push_comment(out, "funding_list in figshare");
        for fund in funding.iter().filter_map(Value::as_object) {
            let mut text = text_of(fund, "title");
            if let Some(code) = field_text(fund, "grant_code") {
                text.push_str(&format!(" ({code})"));
            }
            if let Some(funder) = field_text(fund, "funder_name") {
                text.push_str(&format!(", funded by {funder}"));
            }
            push_element(out, "dc:description.funding", "", &cdata_escape(&text));
        }
    }

    fn render_files(&self, out: &mut String, item: &NativeItem) {
        let Some(template) = &self.files_format else {
            return;
        };
        let files = item.list("files");
        if files.is_empty() {
            return;
        }
        push_comment(out, "files in figshare");
        for file in files.iter().filter_map(Value::as_object) {
            let Some(download_url) = field_text(file, "download_url") else {
                continue;
            };
            out.push_str(&format_name_value(
                template,
                &text_of(file, "name"),
                download_url,
                field_text(file, "computed_md5"),
            ));
            out.push('\n');
        }
    }

    fn render_custom_fields(&self, out: &mut String, item: &NativeItem) {
        if self.custom_fields.is_empty() {
            return;
        }
        let fields = item.list("custom_fields");
        if fields.is_empty() {
            return;
        }
        push_comment(out, "custom_fields in figshare");
        for field in fields.iter().filter_map(Value::as_object) {
            let Some(name) = field_text(field, "name") else {
                continue;
            };
            let Some(rule) = self.custom_fields.iter().find(|r| r.pattern.is_match(name)) else {
                continue;
            };
            let values = match field.get("value") {
                Some(Value::Array(values)) => values.iter().map(value_to_text).collect(),
                Some(value) => vec![value_to_text(value)],
                None => vec![String::new()],
            };
            for value in values {
                out.push_str(&format_name_value(&rule.template, name, &value, None));
                out.push('\n');
            }
        }
    }
}

impl Crosswalk for DublinCore {
    fn schema_location(&self) -> &str {
        OAI_DC_SCHEMA_LOCATION
    }

    fn namespace(&self) -> &str {
        OAI_DC_NAMESPACE
    }

    fn is_available_for(&self, item: &NativeItem) -> bool {
        REQUIRED_FIELDS.iter().all(|field| item.has(field))
    }

    fn render(&self, item: &NativeItem) -> Result<String> {
        if !self.is_available_for(item) {
            return Err(CatalogError::UnsupportedSchema(OAI_DC_PREFIX.to_string()));
        }
        tracing::debug!(id = ?item.id(), "Rendering oai_dc metadata");

        let mut out = String::with_capacity(4096);
        out.push_str("<oai_dc:dc ");
        out.push_str(ROOT_NAMESPACES);
        out.push_str(&format!(" xsi:schemaLocation=\"{OAI_DC_SCHEMA_LOCATION}\" "));
        out.push_str(&self.root_attributes);
        out.push_str(">\n");

        push_element(
            &mut out,
            "dc:title",
            "",
            &cdata_escape(&text_of(item.fields(), "title")),
        );
        self.render_identifiers(&mut out, item);
        self.render_dates(&mut out, item);
        push_element(
            &mut out,
            "dc:description",
            "",
            &cdata_escape(&text_of(item.fields(), "description")),
        );
        push_element(
            &mut out,
            "dcterms:bibliographicCitation",
            "",
            &cdata_escape(&text_of(item.fields(), "citation")),
        );
        self.render_types(&mut out, item);
        self.render_relations(&mut out, item);
        self.render_creators(&mut out, item);
        self.render_subjects(&mut out, item);
        self.render_references(&mut out, item);
        self.render_funding(&mut out, item);
        self.render_files(&mut out, item);
        self.render_custom_fields(&mut out, item);

        out.push_str("</oai_dc:dc>");
        Ok(out)
    }
}

/// DCMI type vocabulary term for a figshare item type.
///
/// Matching is case-insensitive; unknown types map to `Text`.
///
/// # Examples
/// ```
/// use figshare_oai_harvester::crosswalk::dcmi_type;
///
/// assert_eq!(dcmi_type("Dataset"), "Dataset");
/// assert_eq!(dcmi_type("figure"), "Image");
/// assert_eq!(dcmi_type("journal contribution"), "Text");
/// ```
pub fn dcmi_type(type_name: &str) -> &'static str {
    match type_name.to_lowercase().as_str() {
        "dataset" => "Dataset",
        "collection" => "Collection",
        "performance" | "event" => "Event",
        "figure" | "composition" => "Image",
        "media" => "Moving Image",
        "physical object" => "Physical Object",
        "service" => "Service",
        "software" => "Software",
        _ => "Text",
    }
}

/// Prefix a bare identifier with its resolver; URLs pass unchanged.
fn with_resolver(value: &str, resolver: &str) -> String {
    if value.starts_with("http") {
        value.to_string()
    } else {
        format!("{resolver}{value}")
    }
}

/// Field rendered as text; absent reads as empty.
fn text_of(fields: &Map<String, Value>, key: &str) -> String {
    fields.get(key).map(value_to_text).unwrap_or_default()
}

fn push_element(out: &mut String, tag: &str, attributes: &str, content: &str) {
    out.push('<');
    out.push_str(tag);
    out.push_str(attributes);
    out.push('>');
    out.push_str(content);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn push_comment(out: &mut String, text: &str) {
    out.push_str("<!-- ");
    out.push_str(text);
    out.push_str(" -->\n");
}
