//! Song catalog source: the song backend's paginated `/songs` listing.
//!
//! The backend has answered in two shapes over time: a bare JSON array, and
//! an envelope `{ "songs": [...], "hasMore": bool, "total": n }`.  Both are
//! accepted; the envelope's `hasMore` is authoritative when present.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{more_available, ItemSource, Page, RawItemDescriptor};
use crate::error::SourceError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SongListing {
    Envelope {
        songs: Vec<SongEntry>,
        #[serde(default, rename = "hasMore")]
        has_more: Option<bool>,
        #[serde(default)]
        total: Option<u64>,
    },
    Bare(Vec<SongEntry>),
}

#[derive(Debug, Default, Deserialize)]
struct SongEntry {
    #[serde(default, rename = "_id")]
    object_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default, rename = "audioProxy")]
    audio_proxy: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default, rename = "thumbnailProxy")]
    thumbnail_proxy: Option<String>,
    #[serde(default, rename = "createdAt")]
    created_at: Option<String>,
    #[serde(default, rename = "updatedAt")]
    updated_at: Option<String>,
}

impl SongEntry {
    fn into_descriptor(self) -> Option<RawItemDescriptor> {
        let audio = self.audio.or(self.audio_proxy).unwrap_or_default();
        let id = self
            .object_id
            .or(self.id)
            .filter(|id| !id.is_empty())
            .or_else(|| Some(audio.clone()).filter(|a| !a.is_empty()))?;
        let updated_at = self.created_at.or(self.updated_at).unwrap_or_default();

        Some(
            RawItemDescriptor::new(id, updated_at, audio)
                .with_hint("name", self.name.unwrap_or_default())
                .with_hint(
                    "thumbnail",
                    self.thumbnail.or(self.thumbnail_proxy).unwrap_or_default(),
                ),
        )
    }
}

/// Pages through the song backend.
pub struct SongSource {
    client: Client,
    endpoint: String,
    page_size: usize,
}

impl SongSource {
    pub fn new(client: Client, endpoint: impl Into<String>, page_size: usize) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            page_size: page_size.max(1),
        }
    }

    /// Turn a raw listing body into a [`Page`].  Pure, for tests.
    pub fn parse_listing(body: &str, page_size: usize) -> Result<Page, serde_json::Error> {
        let (entries, explicit_more, total) = match serde_json::from_str(body)? {
            SongListing::Envelope {
                songs,
                has_more,
                total,
            } => (songs, has_more, total),
            SongListing::Bare(songs) => (songs, None, None),
        };
        let received = entries.len();

        let items: Vec<_> = entries
            .into_iter()
            .filter_map(|entry| {
                let descriptor = entry.into_descriptor();
                if descriptor.is_none() {
                    warn!("skipping song without any identity");
                }
                descriptor
            })
            .collect();

        Ok(Page {
            items,
            received,
            has_more: more_available(explicit_more, received, page_size),
            total,
        })
    }
}

#[async_trait]
impl ItemSource for SongSource {
    fn name(&self) -> &str {
        "Songs"
    }

    async fn fetch_page(&self, page: u32) -> Result<Page, SourceError> {
        debug!(page, limit = self.page_size, "fetching song page");

        // `_t` defeats intermediary caches that reorder stale pages.
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("page", page.to_string()),
                ("limit", self.page_size.to_string()),
                ("_t", chrono::Utc::now().timestamp_millis().to_string()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(page, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(page, e))?;

        Self::parse_listing(&body, self.page_size).map_err(|e| SourceError::Decode {
            page,
            message: e.to_string(),
        })
    }
}
