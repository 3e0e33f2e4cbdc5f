//! XML helpers: escaping, name/value templates, and element extraction.

mod escape;
mod template;
mod utils;

pub use escape::{attribute_escape, cdata_escape, element_name_escape};
pub use template::format_name_value;
pub use utils::{
    extract_element, extract_element_content, find_element, has_qualified_name,
};
