//! The upstream search collaborator.

use crate::error::Result;
use crate::filter::SearchQuery;
use crate::item::NativeItem;

/// Access to the repository's native records.
///
/// Implementations own transport concerns (timeouts, retries, auth). Any
/// failure is reported as an error and is fatal for the current request.
pub trait SearchBackend: Send + Sync {
    /// Fetch one page of search results, newest modification first.
    ///
    /// `page` starts at 1. Returning fewer than `page_size` items signals the
    /// end of the listing.
    fn search(&self, query: &SearchQuery, page: u32, page_size: usize) -> Result<Vec<NativeItem>>;

    /// Fetch the full record for one upstream id; `Ok(None)` if it does not exist.
    fn article(&self, id: u64) -> Result<Option<NativeItem>>;
}

impl<B: SearchBackend + ?Sized> SearchBackend for &B {
    fn search(&self, query: &SearchQuery, page: u32, page_size: usize) -> Result<Vec<NativeItem>> {
        (**self).search(query, page, page_size)
    }

    fn article(&self, id: u64) -> Result<Option<NativeItem>> {
        (**self).article(id)
    }
}
