//! XML utility functions for locating elements inside rendered records.

use roxmltree::{Document, Node};

use crate::error::Result;

/// Check if a node is an element with the given qualified name.
///
/// The prefix in `name` is resolved against the namespaces in scope at the
/// node, so any prefix bound to the same URI matches. An unprefixed name
/// matches elements in the default namespace.
///
/// # Arguments
/// * `node` - XML node
/// * `name` - Tag name, optionally prefixed (e.g., "dc:title")
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use figshare_oai_harvester::xml::has_qualified_name;
///
/// let xml = r#"<r xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>x</dc:title></r>"#;
/// let doc = Document::parse(xml).unwrap();
/// let title = doc.root_element().first_element_child().unwrap();
/// assert!(has_qualified_name(title, "dc:title"));
/// assert!(!has_qualified_name(title, "title"));
/// ```
pub fn has_qualified_name(node: Node<'_, '_>, name: &str) -> bool {
    if !node.is_element() {
        return false;
    }
    let (prefix, local) = match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    };
    if node.tag_name().name() != local {
        return false;
    }
    match (prefix, node.lookup_namespace_uri(prefix)) {
        (Some(_), None) => false,
        (_, uri) => node.tag_name().namespace() == uri,
    }
}

/// Find the first element in document order with the given qualified name.
///
/// # Arguments
/// * `doc` - Parsed document
/// * `name` - Qualified tag name, including any namespace prefix
///
/// # Returns
/// Matching element, or `None` if not found
pub fn find_element<'a, 'input>(doc: &'a Document<'input>, name: &str) -> Option<Node<'a, 'input>> {
    doc.descendants().find(|n| has_qualified_name(*n, name))
}

/// Extract an element, with its tags and everything inside, as source text.
///
/// # Arguments
/// * `xml` - Well-formed XML text
/// * `name` - Qualified tag name, including any namespace prefix
///
/// # Returns
/// * `Ok(Some(text))` - Source text of the first matching element
/// * `Ok(None)` - No element with that name
/// * `Err(CatalogError::XmlParse)` - `xml` is not well-formed
///
/// # Examples
/// ```
/// use figshare_oai_harvester::xml::extract_element;
///
/// let xml = "<record><header><identifier>oai:x:article/1</identifier></header></record>";
/// assert_eq!(
///     extract_element(xml, "header").unwrap().as_deref(),
///     Some("<header><identifier>oai:x:article/1</identifier></header>")
/// );
/// assert_eq!(extract_element(xml, "metadata").unwrap(), None);
/// ```
pub fn extract_element(xml: &str, name: &str) -> Result<Option<String>> {
    let doc = Document::parse(xml)?;
    Ok(find_element(&doc, name).map(|node| xml[node.range()].to_string()))
}

/// Extract the content between an element's start and end tags.
///
/// Content that is one CDATA section is unwrapped, joining any split `]]>`
/// back together. Anything else is returned as source text.
///
/// # Arguments
/// * `xml` - Well-formed XML text
/// * `name` - Qualified tag name, including any namespace prefix
///
/// # Returns
/// * `Ok(Some(text))` - Content of the first matching element, empty for
///   a self-closing element
/// * `Ok(None)` - No element with that name
/// * `Err(CatalogError::XmlParse)` - `xml` is not well-formed
///
/// # Examples
/// ```
/// use figshare_oai_harvester::xml::extract_element_content;
///
/// let xml = "<metadata><json><![CDATA[{\"a\":\"<b>\"}]]></json></metadata>";
/// assert_eq!(
///     extract_element_content(xml, "json").unwrap().as_deref(),
///     Some("{\"a\":\"<b>\"}")
/// );
/// ```
pub fn extract_element_content(xml: &str, name: &str) -> Result<Option<String>> {
    let doc = Document::parse(xml)?;
    let Some(node) = find_element(&doc, name) else {
        return Ok(None);
    };
    let element = &xml[node.range()];
    let Some(start_tag_end) = start_tag_end(element) else {
        return Ok(Some(String::new()));
    };
    let end_tag_start = element.rfind("</").unwrap_or(start_tag_end);
    let content = element
        .get(start_tag_end..end_tag_start)
        .unwrap_or_default();
    Ok(Some(unwrap_cdata(content)))
}

/// Byte offset just past the `>` closing the start tag, or `None` for a
/// self-closing element.
fn start_tag_end(element: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut previous = '\0';
    for (i, c) in element.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') if previous == '/' => return None,
            (None, '>') => return Some(i + 1),
            _ => {}
        }
        previous = c;
    }
    None
}

fn unwrap_cdata(content: &str) -> String {
    match content
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
    {
        Some(inner) => inner.replace("]]]]><![CDATA[>", "]]>"),
        None => content.to_string(),
    }
}
