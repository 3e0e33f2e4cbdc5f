//! Crosswalks from native figshare records to harvestable metadata schemas.
//!
//! Each schema is a [`Crosswalk`] trait object registered under its metadata
//! prefix in a [`CrosswalkRegistry`]. Crosswalks only carry configuration
//! fixed at construction, so one registry can serve every request.

mod dublin_core;
mod json;
mod registry;

pub use dublin_core::{dcmi_type, DublinCore, OAI_DC_NAMESPACE, OAI_DC_PREFIX};
pub use json::{JsonPassthrough, JSON_PREFIX};
pub use registry::CrosswalkRegistry;

use crate::error::Result;
use crate::item::NativeItem;

/// Mapping from native records to one metadata schema.
pub trait Crosswalk: Send + Sync {
    /// Namespace URI followed by the schema URL, space separated.
    fn schema_location(&self) -> &str;

    /// Namespace URI of the schema.
    ///
    /// Default implementation takes the first token of the schema location.
    fn namespace(&self) -> &str {
        let location = self.schema_location();
        location.split_whitespace().next().unwrap_or(location)
    }

    /// Check if the record carries enough fields to be rendered.
    fn is_available_for(&self, item: &NativeItem) -> bool;

    /// Render the record as a standalone XML fragment.
    ///
    /// Callers check [`Crosswalk::is_available_for`] first; rendering an
    /// ineligible record returns an error.
    fn render(&self, item: &NativeItem) -> Result<String>;
}
