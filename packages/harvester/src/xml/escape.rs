//! Escaping of free text for XML content, attributes, and element names.

use std::borrow::Cow;

const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

/// Make text safe as element content.
///
/// Text without markup characters or `]]>` passes unchanged. Otherwise the
/// text is wrapped in a CDATA section, splitting any embedded `]]>` so the
/// section stays well-formed.
///
/// # Examples
/// ```
/// use figshare_oai_harvester::xml::cdata_escape;
///
/// assert_eq!(cdata_escape("plain"), "plain");
/// assert_eq!(cdata_escape("<p>hi</p>"), "<![CDATA[<p>hi</p>]]>");
/// assert_eq!(cdata_escape("a]]>b<"), "<![CDATA[a]]]]><![CDATA[>b<]]>");
/// assert_eq!(cdata_escape("a ]]> b"), "<![CDATA[a ]]]]><![CDATA[> b]]>");
/// ```
pub fn cdata_escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '&']) && !text.contains(CDATA_END) {
        return Cow::Borrowed(text);
    }
    let inner = text.replace(CDATA_END, "]]]]><![CDATA[>");
    Cow::Owned(format!("{CDATA_START}{inner}{CDATA_END}"))
}

/// Make text safe inside a double- or single-quoted attribute value.
///
/// # Examples
/// ```
/// use figshare_oai_harvester::xml::attribute_escape;
///
/// assert_eq!(attribute_escape("a \"b\" & <c>"), "a &quot;b&quot; &amp; &lt;c&gt;");
/// assert_eq!(attribute_escape("line\nbreak"), "line&#xA;break");
/// ```
pub fn attribute_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
    out
}

/// Turn arbitrary text into a usable element name fragment.
///
/// Lower-cases the text and replaces everything but ASCII letters, digits
/// and `_` with `_`.
pub fn element_name_escape(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdata_escape_plain_text_borrowed() {
        assert!(matches!(cdata_escape("no markup here"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_cdata_escape_ampersand() {
        assert_eq!(cdata_escape("R&D"), "<![CDATA[R&D]]>");
    }

    #[test]
    fn test_cdata_escape_nested_end_parses() {
        let escaped = cdata_escape("<b>x]]>y</b>");
        let xml = format!("<root>{escaped}</root>");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(doc.root_element().text(), Some("<b>x]]>y</b>"));
    }

    #[test]
    fn test_cdata_escape_bare_end_marker_parses() {
        let escaped = cdata_escape("Results ]]> summary");
        assert!(escaped.starts_with(CDATA_START));
        let xml = format!("<root>{escaped}</root>");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(doc.root_element().text(), Some("Results ]]> summary"));
    }

    #[test]
    fn test_attribute_escape_round_trips_through_parser() {
        let value = "Tom's \"quoted\" <name> & co\r\n";
        let xml = format!("<root a=\"{}\"/>", attribute_escape(value));
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(doc.root_element().attribute("a"), Some(value));
    }

    #[test]
    fn test_element_name_escape() {
        assert_eq!(element_name_escape("Grant Number"), "grant_number");
        assert_eq!(element_name_escape("ANZSRC-FoR!"), "anzsrc_for_");
        assert_eq!(element_name_escape("snake_case1"), "snake_case1");
    }
}
