//! Song enrichment.
//!
//! The song listing already carries everything we need, so enrichment is
//! local: derive a title when the backend stored none, guess the artist,
//! and route audio and thumbnail through the backend's streaming proxy.

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use super::{non_empty, ItemEnricher};
use crate::source::{DisplayableRecord, MediaRef, RawItemDescriptor};

/// Characters JavaScript's `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub struct SongEnricher {
    proxy_base: String,
}

impl SongEnricher {
    pub fn new(proxy_base: impl Into<String>) -> Self {
        Self {
            proxy_base: proxy_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{proxy_base}/{kind}?url=<encoded>`, unless `url` already is one.
    pub fn proxied(&self, kind: &str, url: &str) -> String {
        if url.contains(&format!("/{kind}?url=")) {
            return url.to_string();
        }
        format!(
            "{}/{kind}?url={}",
            self.proxy_base,
            utf8_percent_encode(url, COMPONENT)
        )
    }
}

#[async_trait]
impl ItemEnricher for SongEnricher {
    async fn enrich(&self, descriptor: &RawItemDescriptor) -> Option<DisplayableRecord> {
        let audio = descriptor.locator.as_str();

        let title = descriptor
            .hint("name")
            .and_then(|name| non_empty(name))
            .or_else(|| title_from_audio(audio));
        let Some(title) = title else {
            debug!(id = %descriptor.id, "song has neither a name nor an audio path");
            return None;
        };

        let mut media = Vec::new();
        let action_url = (!audio.is_empty()).then(|| self.proxied("audio", audio));
        if let Some(url) = &action_url {
            media.push(MediaRef::url("audio", url.clone()));
        }
        if let Some(thumbnail) = descriptor.hint("thumbnail") {
            media.push(MediaRef::url("thumbnail", self.proxied("thumbnail", thumbnail)));
        }

        Some(DisplayableRecord {
            id: descriptor.id.clone(),
            description: artist(&title),
            title,
            action_url,
            media,
            updated_at: descriptor.updated_at.clone(),
            badge: None,
        })
    }
}

/// Derive a title from an audio URL's file name.
///
/// `https://host/music/My%20Song.mp3?raw=1` → `My Song`.
pub fn title_from_audio(audio: &str) -> Option<String> {
    let path = audio.split('?').next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();

    let decoded = match percent_decode_str(file).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => file
            .replace("%20", " ")
            .replace("%2C", ",")
            .replace("%27", "'"),
    };
    non_empty(strip_extension(&decoded))
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => &name[..dot],
        _ => name,
    }
}

/// Best-effort artist from common title shapes.
///
/// `Artist - Song`, `Song by Artist`, `Artist (Live)`.
pub fn artist(title: &str) -> Option<String> {
    let candidate = if let Some((artist, _)) = title.split_once(" - ") {
        artist
    } else if let Some((_, artist)) = title.split_once(" by ") {
        artist.split(" by ").next().unwrap_or_default()
    } else if let Some((artist, _)) = title.split_once('(') {
        artist
    } else {
        return None;
    };
    non_empty(candidate)
}
