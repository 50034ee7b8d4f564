//! The displayable record type shared by every catalog.
//!
//! `DisplayableRecord` is what an [`crate::enrich::ItemEnricher`] produces
//! from a [`super::RawItemDescriptor`] and what the renderer receives.  The
//! rest of the application (de-duplication, ordering, drawing) only ever
//! looks at this type.
//!
//! ## For contributors
//!
//! Adding a new catalog does **not** require touching this file unless the
//! catalog needs a field that cannot be expressed as a title, a description,
//! an action URL or a media reference.

use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;

/// A fully enriched item, ready to render.
///
/// ## Sorting
///
/// [`cmp_newest_first`](Self::cmp_newest_first) gives the
/// **reverse-chronological** order: newer records sort first, records
/// without a parseable timestamp sort last, and ties fall back to
/// descending identity.  It looks only at the timestamp and identity, so it
/// is a sort key rather than an [`Ord`] impl.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DisplayableRecord {
    /// Identity, unique per source.  Same value as the descriptor's.
    pub id: String,

    /// Headline.  Records without one are never produced.
    pub title: String,

    /// Optional longer text.
    pub description: Option<String>,

    /// Where activating the record should lead (visit URL, audio stream).
    pub action_url: Option<String>,

    /// Images, audio streams and the like, in display order.
    pub media: Vec<MediaRef>,

    /// The descriptor's update timestamp, untouched.
    pub updated_at: String,

    /// Short marker drawn next to the title (e.g. `#12` for `ad-12`).
    pub badge: Option<String>,
}

impl DisplayableRecord {
    /// Parsed form of [`updated_at`](Self::updated_at).
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated_at)
    }

    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        newest_first(&self.updated_at, &self.id, &other.updated_at, &other.id)
    }
}

/// A named piece of media attached to a record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MediaRef {
    pub name: String,
    pub payload: MediaPayload,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MediaPayload {
    /// Fetchable location.
    Url(String),
    /// Base64 bytes carried along with their MIME type.
    Inline { mime: String, base64: String },
}

impl MediaRef {
    pub fn url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: MediaPayload::Url(url.into()),
        }
    }

    pub fn inline(name: impl Into<String>, mime: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: MediaPayload::Inline {
                mime: mime.into(),
                base64: base64.into(),
            },
        }
    }

    /// A URL a viewer can load directly; inline payloads become `data:` URLs.
    pub fn resolvable_url(&self) -> String {
        match &self.payload {
            MediaPayload::Url(url) => url.clone(),
            MediaPayload::Inline { mime, base64 } => format!("data:{mime};base64,{base64}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamps: ISO-8601, kept opaque until something needs to compare them
// ---------------------------------------------------------------------------

/// Parse an ISO-8601 timestamp (full RFC 3339 or a bare `YYYY-MM-DD` date).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reverse-chronological comparison shared by descriptors and records.
pub fn newest_first(a_ts: &str, a_id: &str, b_ts: &str, b_id: &str) -> Ordering {
    // `b` first so that `Some(newer) > Some(older)` gives newest-first.
    // `None` is less than `Some(_)`, so unparseable timestamps sink.
    parse_timestamp(b_ts)
        .cmp(&parse_timestamp(a_ts))
        .then_with(|| b_id.cmp(a_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_record(id: &str, title: &str, updated_at: &str) -> DisplayableRecord {
        DisplayableRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            action_url: None,
            media: Vec::new(),
            updated_at: updated_at.to_string(),
            badge: None,
        }
    }

    #[test]
    fn sort_reverse_chronological() {
        let old = make_record("1", "Old", "2024-01-01T00:00:00Z");
        let mid = make_record("2", "Mid", "2025-06-15T12:00:00Z");
        let new = make_record("3", "New", "2026-01-01T00:00:00Z");

        let mut records = vec![old, new, mid];
        records.sort_by(DisplayableRecord::cmp_newest_first);

        assert_eq!(records[0].id, "3", "newest first");
        assert_eq!(records[1].id, "2");
        assert_eq!(records[2].id, "1", "oldest last");
    }

    #[test]
    fn undated_records_sort_after_dated() {
        let dated = make_record("1", "Dated", "2025-01-01T00:00:00Z");
        let undated = make_record("2", "Undated", "");

        let mut records = vec![undated, dated];
        records.sort_by(DisplayableRecord::cmp_newest_first);

        assert_eq!(records[0].id, "1", "dated record should come first");
        assert_eq!(records[1].id, "2", "undated record should come last");
    }

    #[test]
    fn same_timestamp_falls_back_to_identity() {
        let a = make_record("a", "A", "2025-06-01T12:00:00Z");
        let b = make_record("b", "B", "2025-06-01T12:00:00Z");
        assert_eq!(a.cmp_newest_first(&b), Ordering::Greater, "higher identity sorts first");
    }

    #[test]
    fn ordering_ties_do_not_imply_equality() {
        let a = make_record("a", "First title", "2025-06-01T12:00:00Z");
        let b = make_record("a", "Second title", "2025-06-01T12:00:00Z");
        assert_eq!(a.cmp_newest_first(&b), Ordering::Equal);
        assert_ne!(a, b);
    }

    #[test]
    fn parses_rfc3339_and_bare_dates() {
        assert_eq!(
            parse_timestamp("2024-01-02"),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2024-01-02T10:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 8, 30, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn inline_media_resolves_to_data_url() {
        let img = MediaRef::inline("banner.png", "image/png", "iVBORw0KGgo=");
        assert_eq!(img.resolvable_url(), "data:image/png;base64,iVBORw0KGgo=");

        let audio = MediaRef::url("audio", "https://cdn.example/a.mp3");
        assert_eq!(audio.resolvable_url(), "https://cdn.example/a.mp3");
    }
}
