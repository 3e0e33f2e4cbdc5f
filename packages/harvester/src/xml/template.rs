//! Name/value templates used for configurable Dublin Core fragments.
//!
//! A template is XML text with `%PLACEHOLDER%` markers. Each marker names a
//! variable (`NAME`, `VALUE`, `VALUE2`) and optionally how to escape it:
//!
//! | suffix      | result                                   |
//! |-------------|------------------------------------------|
//! | (none)      | raw text                                 |
//! | `_CDATA`    | element content, CDATA wrapped if needed |
//! | `_ATTRIB`   | attribute value                          |
//! | `_ELEMENT`  | element name fragment (`NAME` only)      |

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::escape::{attribute_escape, cdata_escape, element_name_escape};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"%(NAME_ELEMENT|NAME_CDATA|NAME_ATTRIB|NAME|VALUE2_CDATA|VALUE2_ATTRIB|VALUE2|VALUE_CDATA|VALUE_ATTRIB|VALUE)%",
    )
    .expect("valid regex")
});

/// Fill a template with a name and one or two values.
///
/// Substitution happens in a single pass, so placeholder-like text inside a
/// substituted value is left alone. A missing `value2` substitutes as empty.
///
/// # Arguments
/// * `template` - Template text with `%...%` placeholders
/// * `name` - Value for the `NAME` placeholders
/// * `value` - Value for the `VALUE` placeholders
/// * `value2` - Value for the `VALUE2` placeholders, if any
///
/// # Examples
/// ```
/// use figshare_oai_harvester::xml::format_name_value;
///
/// let out = format_name_value(
///     "<dc:x name=\"%NAME_ATTRIB%\">%VALUE_CDATA%</dc:x>",
///     "Grant \"A\"",
///     "a < b",
///     None,
/// );
/// assert_eq!(out, "<dc:x name=\"Grant &quot;A&quot;\"><![CDATA[a < b]]></dc:x>");
/// ```
pub fn format_name_value(template: &str, name: &str, value: &str, value2: Option<&str>) -> String {
    let value2 = value2.unwrap_or_default();
    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "NAME" => name.to_string(),
            "NAME_ELEMENT" => element_name_escape(name),
            "NAME_CDATA" => cdata_escape(name).into_owned(),
            "NAME_ATTRIB" => attribute_escape(name),
            "VALUE" => value.to_string(),
            "VALUE_CDATA" => cdata_escape(value).into_owned(),
            "VALUE_ATTRIB" => attribute_escape(value),
            "VALUE2" => value2.to_string(),
            "VALUE2_CDATA" => cdata_escape(value2).into_owned(),
            "VALUE2_ATTRIB" => attribute_escape(value2),
            other => other.to_string(),
        })
        .into_owned()
}
