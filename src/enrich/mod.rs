//! Enrichment: turning a [`RawItemDescriptor`] into a [`DisplayableRecord`].
//!
//! An enricher never fails past its own boundary.  Every auxiliary read that
//! goes wrong is logged and treated as "field absent"; a record that ends up
//! without a title is dropped by returning `None`.

pub mod github;
pub mod songs;

use async_trait::async_trait;

use crate::source::{DisplayableRecord, RawItemDescriptor};

#[async_trait]
pub trait ItemEnricher: Send + Sync {
    /// Build the displayable record for `descriptor`, or `None` when the
    /// required title could not be obtained.
    ///
    /// Called concurrently for every item of a page, so implementations
    /// must not hold locks across their reads.
    async fn enrich(&self, descriptor: &RawItemDescriptor) -> Option<DisplayableRecord>;
}

/// Trim `text` and map an empty result to `None`.
pub(crate) fn non_empty(text: impl AsRef<str>) -> Option<String> {
    let trimmed = text.as_ref().trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims_and_rejects_blank() {
        assert_eq!(non_empty("  Foo \n"), Some("Foo".to_string()));
        assert_eq!(non_empty("\n\t "), None);
    }
}
