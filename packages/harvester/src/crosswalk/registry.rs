//! Registry mapping metadata prefixes to crosswalks.

use super::{Crosswalk, DublinCore, JsonPassthrough, JSON_PREFIX, OAI_DC_PREFIX};
use crate::config::DublinCoreConfig;
use crate::error::{CatalogError, Result};
use crate::item::NativeItem;

/// Registry of crosswalks keyed by metadata prefix.
///
/// Keeps registration order, which is the order formats are advertised in.
pub struct CrosswalkRegistry {
    crosswalks: Vec<(String, Box<dyn Crosswalk>)>,
}

impl CrosswalkRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            crosswalks: Vec::new(),
        }
    }

    /// Registry with the built-in `oai_dc` and `json` crosswalks.
    ///
    /// # Errors
    /// Returns `CatalogError::Pattern` if a custom field regex does not compile.
    pub fn with_defaults(dublin_core: &DublinCoreConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(OAI_DC_PREFIX, DublinCore::from_config(dublin_core)?);
        registry.register(JSON_PREFIX, JsonPassthrough);
        Ok(registry)
    }

    /// Register a crosswalk, replacing any previous one for the same prefix.
    pub fn register(&mut self, prefix: impl Into<String>, crosswalk: impl Crosswalk + 'static) {
        let prefix = prefix.into();
        let crosswalk: Box<dyn Crosswalk> = Box::new(crosswalk);
        match self.crosswalks.iter_mut().find(|(p, _)| *p == prefix) {
            Some(slot) => slot.1 = crosswalk,
            None => self.crosswalks.push((prefix, crosswalk)),
        }
    }

    /// Get the crosswalk for a prefix.
    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&dyn Crosswalk> {
        self.crosswalks
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, c)| c.as_ref())
    }

    /// Check if a crosswalk is registered for a prefix.
    #[must_use]
    pub fn has_schema(&self, prefix: &str) -> bool {
        self.get(prefix).is_some()
    }

    /// Return all registered prefixes in registration order.
    #[must_use]
    pub fn schema_ids(&self) -> Vec<&str> {
        self.crosswalks.iter().map(|(p, _)| p.as_str()).collect()
    }

    /// Crosswalks able to render the given record, in registration order.
    pub fn available_for<'a>(
        &'a self,
        item: &'a NativeItem,
    ) -> impl Iterator<Item = (&'a str, &'a dyn Crosswalk)> + 'a {
        self.crosswalks
            .iter()
            .filter(move |(_, c)| c.is_available_for(item))
            .map(|(p, c)| (p.as_str(), c.as_ref()))
    }

    /// Render a record in the given schema.
    ///
    /// # Arguments
    /// * `item` - Native record
    /// * `prefix` - Metadata prefix
    ///
    /// # Returns
    /// * `Ok(xml)` - Rendered metadata fragment
    /// * `Err(CatalogError::UnsupportedSchema)` - Unknown prefix, or the
    ///   record lacks fields the schema needs
    pub fn render(&self, item: &NativeItem, prefix: &str) -> Result<String> {
        let crosswalk = self
            .get(prefix)
            .ok_or_else(|| CatalogError::UnsupportedSchema(prefix.to_string()))?;
        if !crosswalk.is_available_for(item) {
            return Err(CatalogError::UnsupportedSchema(prefix.to_string()));
        }
        crosswalk.render(item)
    }
}

impl Default for CrosswalkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CrosswalkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrosswalkRegistry")
            .field("schemas", &self.schema_ids())
            .finish()
    }
}
