//! Ad enrichment from a repository's files.
//!
//! An ad repository holds `title.txt`, `description.txt`, `visit.txt` and
//! any number of images.  The contents API returns every file as base64 in
//! a JSON envelope; decoding is our job.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use percent_encoding::{utf8_percent_encode, AsciiSet, PercentEncode, CONTROLS};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{non_empty, ItemEnricher};
use crate::error::EnrichmentError;
use crate::source::github::GitHubAccess;
use crate::source::{DisplayableRecord, MediaRef, RawItemDescriptor};

const TITLE_FILE: &str = "title.txt";
const DESCRIPTION_FILE: &str = "description.txt";
const VISIT_FILE: &str = "visit.txt";

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
];

/// Characters that cannot appear raw in one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn segment(raw: &str) -> PercentEncode<'_> {
    utf8_percent_encode(raw, PATH_SEGMENT)
}

/// `/repos/{owner}/{repo}/contents[/{file}]` with each segment escaped.
fn contents_path(owner: &str, repo: &str, file: Option<&str>) -> String {
    match file {
        Some(file) => format!(
            "/repos/{}/{}/contents/{}",
            segment(owner),
            segment(repo),
            segment(file)
        ),
        None => format!("/repos/{}/{}/contents", segment(owner), segment(repo)),
    }
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

pub struct GitHubAdEnricher {
    client: Client,
    access: GitHubAccess,
}

impl GitHubAdEnricher {
    pub fn new(client: Client, access: GitHubAccess) -> Self {
        Self { client, access }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        repo: &str,
        path: &str,
        field: &str,
    ) -> Result<T, EnrichmentError> {
        let resp = self
            .access
            .get(&self.client, path)
            .send()
            .await
            .map_err(|e| EnrichmentError::from_reqwest(repo, field, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status {
                item: repo.to_string(),
                field: field.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json()
            .await
            .map_err(|e| EnrichmentError::from_reqwest(repo, field, e))
    }

    async fn list_files(&self, repo: &str) -> Result<Vec<String>, EnrichmentError> {
        let path = contents_path(&self.access.username, repo, None);
        let entries: Vec<ContentEntry> = self.get_json(repo, &path, "contents").await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.kind == "file")
            .map(|e| e.name)
            .collect())
    }

    /// Fetch one file and return its base64 payload with line breaks removed.
    async fn read_base64(&self, repo: &str, file: &str) -> Result<String, EnrichmentError> {
        let path = contents_path(&self.access.username, repo, Some(file));
        let data: FileContent = self.get_json(repo, &path, file).await?;

        if let Some(encoding) = data.encoding.as_deref().filter(|e| *e != "base64") {
            return Err(EnrichmentError::Decode {
                item: repo.to_string(),
                field: file.to_string(),
                message: format!("unsupported encoding `{encoding}`"),
            });
        }
        Ok(compact_base64(&data.content))
    }

    async fn read_text(&self, repo: &str, file: &str) -> Result<Option<String>, EnrichmentError> {
        let encoded = self.read_base64(repo, file).await?;
        let text = decode_text(&encoded).map_err(|message| EnrichmentError::Decode {
            item: repo.to_string(),
            field: file.to_string(),
            message,
        })?;
        Ok(non_empty(text))
    }

    /// A text field that may be missing: any failure means "absent".
    async fn optional_text(&self, repo: &str, files: &[String], file: &str) -> Option<String> {
        if !files.iter().any(|f| f == file) {
            return None;
        }
        match self.read_text(repo, file).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "ad text field unavailable");
                None
            }
        }
    }

    async fn optional_image(&self, repo: &str, file: &str) -> Option<MediaRef> {
        match self.read_base64(repo, file).await {
            Ok(encoded) if !encoded.is_empty() => Some(MediaRef::inline(file, mime_type(file), encoded)),
            Ok(_) => {
                warn!(repo, file, "ad image is empty");
                None
            }
            Err(e) => {
                warn!(error = %e, "ad image unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl ItemEnricher for GitHubAdEnricher {
    async fn enrich(&self, descriptor: &RawItemDescriptor) -> Option<DisplayableRecord> {
        let repo = descriptor.locator.as_str();

        let files = match self.list_files(repo).await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "cannot list ad repository");
                return None;
            }
        };

        let images = files.iter().filter(|f| is_image(f)).map(|f| self.optional_image(repo, f));

        let (title, description, visit, media) = futures::join!(
            self.optional_text(repo, &files, TITLE_FILE),
            self.optional_text(repo, &files, DESCRIPTION_FILE),
            self.optional_text(repo, &files, VISIT_FILE),
            join_all(images),
        );

        let Some(title) = title else {
            debug!(repo, "ad has no title, dropping");
            return None;
        };

        Some(DisplayableRecord {
            id: descriptor.id.clone(),
            title,
            description,
            action_url: visit,
            media: media.into_iter().flatten().collect(),
            updated_at: descriptor.updated_at.clone(),
            badge: descriptor.hint("badge").map(String::from),
        })
    }
}

fn extension(file: &str) -> Option<String> {
    file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

pub fn is_image(file: &str) -> bool {
    extension(file).is_some_and(|ext| IMAGE_TYPES.iter().any(|(e, _)| *e == ext))
}

/// MIME type by extension; unknown extensions are assumed JPEG.
pub fn mime_type(file: &str) -> &'static str {
    extension(file)
        .and_then(|ext| IMAGE_TYPES.iter().find(|(e, _)| *e == ext))
        .map_or("image/jpeg", |&(_, mime)| mime)
}

fn compact_base64(content: &str) -> String {
    content.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

fn decode_text(encoded: &str) -> Result<String, String> {
    let bytes = STANDARD.decode(encoded).map_err(|e| e.to_string())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
