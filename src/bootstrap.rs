//! Session bootstrap: everything a page view needs before its first fetch.
//!
//! A [`Bootstrap`] is called once per scheduler run.  It builds the HTTP
//! client, obtains whatever credentials the catalog requires, and returns a
//! [`Session`] pairing an [`ItemSource`] with its [`ItemEnricher`].  The
//! session is dropped when the run ends; nothing is cached globally.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{AdsConfig, SongsConfig};
use crate::enrich::github::GitHubAdEnricher;
use crate::enrich::songs::SongEnricher;
use crate::enrich::ItemEnricher;
use crate::error::BootstrapError;
use crate::source::github::{GitHubAccess, GitHubAdSource};
use crate::source::songs::SongSource;
use crate::source::ItemSource;

/// The collaborators one scheduler run talks to.
#[derive(Clone)]
pub struct Session {
    pub source: Arc<dyn ItemSource>,
    pub enricher: Arc<dyn ItemEnricher>,
}

#[async_trait]
pub trait Bootstrap: Send + Sync {
    async fn bootstrap(&self) -> Result<Session, BootstrapError>;
}

/// A session that needs no setup.
pub struct FixedSession(pub Session);

#[async_trait]
impl Bootstrap for FixedSession {
    async fn bootstrap(&self) -> Result<Session, BootstrapError> {
        Ok(self.0.clone())
    }
}

/// Shared client: every request is bounded by `timeout`.
///
/// GitHub rejects requests without a `User-Agent`, so one is always set.
pub fn http_client(timeout: Duration) -> Result<Client, BootstrapError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BootstrapError::Network(e.to_string()))
}

// ---------------------------------------------------------------------------
// Songs: public catalog, no credentials
// ---------------------------------------------------------------------------

pub struct SongBootstrap {
    config: SongsConfig,
    timeout: Duration,
}

impl SongBootstrap {
    pub fn new(config: SongsConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

#[async_trait]
impl Bootstrap for SongBootstrap {
    async fn bootstrap(&self) -> Result<Session, BootstrapError> {
        let client = http_client(self.timeout)?;
        Ok(Session {
            source: Arc::new(SongSource::new(
                client,
                self.config.endpoint.clone(),
                self.config.page_size,
            )),
            enricher: Arc::new(SongEnricher::new(self.config.proxy_base.clone())),
        })
    }
}

// ---------------------------------------------------------------------------
// Ads: GitHub credentials handed out by the backend
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CredentialResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    credentials: Option<GitHubAccess>,
    #[serde(default)]
    error: Option<String>,
}

pub struct CredentialBootstrap {
    config: AdsConfig,
    timeout: Duration,
}

impl CredentialBootstrap {
    pub fn new(config: AdsConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// `GET {backend_url}/api/credentials`.
    pub async fn fetch_access(&self, client: &Client) -> Result<GitHubAccess, BootstrapError> {
        let url = format!("{}/api/credentials", self.config.backend_url.trim_end_matches('/'));
        debug!(%url, "requesting credentials");

        let resp = client
            .get(&url)
            .send()
            .await
            .map_err(|e| BootstrapError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BootstrapError::Status {
                status: status.as_u16(),
            });
        }

        let body: CredentialResponse = resp
            .json()
            .await
            .map_err(|e| BootstrapError::Decode(e.to_string()))?;

        match body {
            CredentialResponse {
                success: true,
                credentials: Some(access),
                ..
            } => Ok(access),
            CredentialResponse { error, .. } => Err(BootstrapError::Rejected(
                error.unwrap_or_else(|| "no credentials in response".to_string()),
            )),
        }
    }
}

#[async_trait]
impl Bootstrap for CredentialBootstrap {
    async fn bootstrap(&self) -> Result<Session, BootstrapError> {
        let client = http_client(self.timeout)?;
        let access = self.fetch_access(&client).await?;
        info!(user = %access.username, "GitHub credentials loaded");

        Ok(Session {
            source: Arc::new(GitHubAdSource::new(
                client.clone(),
                access.clone(),
                self.config.name_prefix.clone(),
                self.config.per_page,
            )),
            enricher: Arc::new(GitHubAdEnricher::new(client, access)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ads_config(backend_url: String) -> AdsConfig {
        AdsConfig {
            backend_url,
            ..AdsConfig::default()
        }
    }

    #[tokio::test]
    async fn credentials_are_decoded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/credentials")
            .with_status(200)
            .with_body(
                r#"{"success": true, "credentials":
                    {"token": "abc", "apiBase": "https://api.github.com", "username": "musten"}}"#,
            )
            .create_async()
            .await;

        let bootstrap = CredentialBootstrap::new(ads_config(server.url()), Duration::from_secs(5));
        let access = bootstrap.fetch_access(&Client::new()).await.unwrap();

        assert_eq!(
            access,
            GitHubAccess {
                token: "abc".into(),
                api_base: "https://api.github.com".into(),
                username: "musten".into(),
            }
        );
    }

    #[tokio::test]
    async fn refusal_carries_the_backend_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/credentials")
            .with_status(200)
            .with_body(r#"{"success": false, "error": "token expired"}"#)
            .create_async()
            .await;

        let bootstrap = CredentialBootstrap::new(ads_config(server.url()), Duration::from_secs(5));
        let err = bootstrap.bootstrap().await.err().unwrap();

        assert_eq!(err, BootstrapError::Rejected("token expired".into()));
    }

    #[tokio::test]
    async fn server_error_is_a_bootstrap_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/credentials")
            .with_status(502)
            .create_async()
            .await;

        let bootstrap = CredentialBootstrap::new(ads_config(server.url()), Duration::from_secs(5));
        let err = bootstrap.bootstrap().await.err().unwrap();

        assert_eq!(err, BootstrapError::Status { status: 502 });
    }

    #[tokio::test]
    async fn song_bootstrap_needs_no_network() {
        let bootstrap = SongBootstrap::new(SongsConfig::default(), Duration::from_secs(5));
        let session = bootstrap.bootstrap().await.unwrap();
        assert_eq!(session.source.name(), "Songs");
    }
}
