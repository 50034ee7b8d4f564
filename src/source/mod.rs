//! Item source abstraction layer.
//!
//! This module defines the [`ItemSource`] trait, the raw
//! [`RawItemDescriptor`] it yields, and the [`DisplayableRecord`] that
//! enrichment eventually turns it into.  Concrete sources live in
//! sub-modules ([`github`] for the ad board, [`songs`] for the song
//! catalog).
//!
//! ## For contributors: adding a new source
//!
//! 1. Create a new file in this directory (e.g. `videos.rs`).
//! 2. Define a struct holding its HTTP client and endpoint, and implement
//!    [`ItemSource`] for it.  Apply any naming/ownership filter *before*
//!    returning the page.
//! 3. Add `pub mod videos;` below.
//! 4. Pair it with an enricher and a bootstrap in [`crate::bootstrap`].
//!
//! The scheduler, de-duplication, and UI are all source-agnostic.

pub mod github;
mod record;
pub mod songs;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::SourceError;

pub use record::{newest_first, parse_timestamp, DisplayableRecord, MediaPayload, MediaRef};

/// One entry of a page listing, before enrichment.
///
/// Lives for a single batch cycle.  `hints` carries whatever the listing
/// already told us about the item (a song's name or thumbnail) so the
/// enricher does not have to fetch it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItemDescriptor {
    /// Unique per source.
    pub id: String,
    /// ISO-8601 update timestamp, opaque until compared.
    pub updated_at: String,
    /// Where the auxiliary data lives (a repository name, an audio URL).
    pub locator: String,
    pub hints: BTreeMap<String, String>,
}

impl RawItemDescriptor {
    pub fn new(
        id: impl Into<String>,
        updated_at: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            updated_at: updated_at.into(),
            locator: locator.into(),
            hints: BTreeMap::new(),
        }
    }

    /// Attach a listing-provided field; empty values are dropped.
    pub fn with_hint(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.hints.insert(key.to_string(), value);
        }
        self
    }

    pub fn hint(&self, key: &str) -> Option<&str> {
        self.hints.get(key).map(String::as_str)
    }

    /// Newest first, undated last, ties by descending identity.
    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        newest_first(&self.updated_at, &self.id, &other.updated_at, &other.id)
    }
}


/// One page of a paginated collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<RawItemDescriptor>,
    /// Entries the backend returned, before any filtering.  Zero means the
    /// collection is exhausted even when `items` was filtered down to nothing.
    pub received: usize,
    /// Whether another page is worth requesting.
    pub has_more: bool,
    /// Collection size, if the backend reports it.
    pub total: Option<u64>,
}

/// Decide whether another page exists.
///
/// An explicit flag from the backend is authoritative.  Without one, a page
/// that came back full (`received == page_size`, counted *before* any
/// filtering) implies there may be more.
pub fn more_available(explicit: Option<bool>, received: usize, page_size: usize) -> bool {
    explicit.unwrap_or(page_size > 0 && received >= page_size)
}

/// Trait that every item source must implement.
///
/// Sources are stateless between calls: the caller tracks the page number.
/// A page that received zero entries means "no more data" and is distinct
/// from an error.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Human-readable label shown in the status bar.
    fn name(&self) -> &str;

    /// Fetch page `page` (1-based).
    async fn fetch_page(&self, page: u32) -> Result<Page, SourceError>;
}
