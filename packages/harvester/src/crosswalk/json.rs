//! Native JSON passthrough wrapped in a single XML element.

use super::Crosswalk;
use crate::error::Result;
use crate::item::NativeItem;
use crate::xml::cdata_escape;

/// Metadata prefix of the JSON passthrough crosswalk.
pub const JSON_PREFIX: &str = "json";

// There is no schema for JSON-in-XML; XML Schema itself stands in.
const JSON_SCHEMA_LOCATION: &str =
    "http://www.w3.org/2001/XMLSchema http://www.w3.org/2001/XMLSchema.xsd";

/// Passes the whole native record through as escaped JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPassthrough;

impl Crosswalk for JsonPassthrough {
    fn schema_location(&self) -> &str {
        JSON_SCHEMA_LOCATION
    }

    fn is_available_for(&self, _item: &NativeItem) -> bool {
        true
    }

    fn render(&self, item: &NativeItem) -> Result<String> {
        let json = item.to_json()?;
        Ok(format!(
            "<json:element xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
             xmlns:json=\"http://www.w3.org/2001/XMLSchema\" \
             xsi:schemaLocation=\"{JSON_SCHEMA_LOCATION}\" name=\"json\" type=\"xs:string\" >{}</json:element>",
            cdata_escape(&json)
        ))
    }
}
