//! Ad board source: private GitHub repositories named `ad-<n>`.
//!
//! Each ad lives in its own private repository under the ad account.  The
//! listing only tells us which repositories exist; their title, description,
//! visit URL and images are fetched later by
//! [`crate::enrich::github::GitHubAdEnricher`].

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

use super::{more_available, ItemSource, Page, RawItemDescriptor};
use crate::error::SourceError;

/// Credentials handed out by the credential endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubAccess {
    pub token: String,
    #[serde(rename = "apiBase")]
    pub api_base: String,
    pub username: String,
}

impl GitHubAccess {
    /// Authenticated GET against `api_base` + `path`.
    pub fn get(&self, client: &Client, path: &str) -> RequestBuilder {
        client
            .get(format!("{}{}", self.api_base.trim_end_matches('/'), path))
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github.v3+json")
    }
}

/// One entry of `GET /user/repos`.
#[derive(Debug, Deserialize)]
struct RepoListing {
    name: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Pages through the account's private repositories, keeping ads only.
pub struct GitHubAdSource {
    client: Client,
    access: GitHubAccess,
    /// Repository name prefix that marks an ad (normally `ad-`).
    prefix: String,
    per_page: usize,
}

impl GitHubAdSource {
    pub fn new(client: Client, access: GitHubAccess, prefix: impl Into<String>, per_page: usize) -> Self {
        Self {
            client,
            access,
            prefix: prefix.into(),
            per_page: per_page.max(1),
        }
    }

    /// Turn a raw `/user/repos` body into a [`Page`].
    ///
    /// Pure (no I/O) so the filter can be tested without a server.  Whether
    /// more pages exist is judged on the *unfiltered* count.
    pub fn parse_listing(body: &str, prefix: &str, per_page: usize) -> Result<Page, serde_json::Error> {
        let repos: Vec<RepoListing> = serde_json::from_str(body)?;
        let received = repos.len();

        let items = repos
            .into_iter()
            .filter(|repo| repo.private && !repo.fork && repo.name.starts_with(prefix))
            .map(|repo| {
                let badge = ad_number(&repo.name, prefix)
                    .map(|n| format!("#{n}"))
                    .unwrap_or_default();
                RawItemDescriptor::new(
                    repo.name.clone(),
                    repo.updated_at.unwrap_or_default(),
                    repo.name,
                )
                .with_hint("badge", badge)
            })
            .collect();

        Ok(Page {
            items,
            received,
            has_more: more_available(None, received, per_page),
            total: None,
        })
    }
}

/// `ad-12` → `Some(12)`.
pub fn ad_number(name: &str, prefix: &str) -> Option<u64> {
    name.strip_prefix(prefix)?.parse().ok()
}

#[async_trait]
impl ItemSource for GitHubAdSource {
    fn name(&self) -> &str {
        "Ads"
    }

    async fn fetch_page(&self, page: u32) -> Result<Page, SourceError> {
        debug!(page, per_page = self.per_page, "listing ad repositories");

        let resp = self
            .access
            .get(&self.client, "/user/repos")
            .query(&[
                ("type", "private".to_string()),
                ("page", page.to_string()),
                ("per_page", self.per_page.to_string()),
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

        Self::parse_listing(&body, &self.prefix, self.per_page).map_err(|e| SourceError::Decode {
            page,
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn access(api_base: String) -> GitHubAccess {
        GitHubAccess {
            token: "t0k3n".into(),
            api_base,
            username: "musten".into(),
        }
    }

    #[test]
    fn parse_listing_keeps_private_ad_repos_only() {
        let body = r#"[
            {"name": "ad-1", "private": true, "fork": false, "updated_at": "2024-01-02T00:00:00Z"},
            {"name": "ad-2", "private": false, "updated_at": "2024-01-03T00:00:00Z"},
            {"name": "ad-3", "private": true, "fork": true},
            {"name": "dotfiles", "private": true},
            {"name": "ad-14", "private": true, "updated_at": "2024-01-01T00:00:00Z"}
        ]"#;

        let page = GitHubAdSource::parse_listing(body, "ad-", 100).unwrap();
        let ids: Vec<_> = page.items.iter().map(|d| d.id.as_str()).collect();

        assert_eq!(ids, ["ad-1", "ad-14"]);
        assert_eq!(page.items[0].locator, "ad-1");
        assert_eq!(page.items[0].updated_at, "2024-01-02T00:00:00Z");
        assert_eq!(page.items[1].hint("badge"), Some("#14"));
        assert!(!page.has_more);
    }

    #[test]
    fn full_page_implies_more_even_when_filtered_away() {
        let body = r#"[
            {"name": "notes", "private": true},
            {"name": "blog", "private": true}
        ]"#;

        let page = GitHubAdSource::parse_listing(body, "ad-", 2).unwrap();
        assert!(page.items.is_empty());
        assert!(page.has_more);
    }

    #[test]
    fn ad_number_requires_numeric_suffix() {
        assert_eq!(ad_number("ad-7", "ad-"), Some(7));
        assert_eq!(ad_number("ad-new", "ad-"), None);
        assert_eq!(ad_number("blog", "ad-"), None);
    }

    #[tokio::test]
    async fn fetch_page_sends_credentials_and_paging() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/user/repos")
            .match_header("authorization", "token t0k3n")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "private".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("per_page".into(), "50".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"name": "ad-9", "private": true, "updated_at": "2024-05-01T00:00:00Z"}]"#)
            .create_async()
            .await;

        let source = GitHubAdSource::new(Client::new(), access(server.url()), "ad-", 50);
        let page = source.fetch_page(2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "ad-9");
    }

    #[tokio::test]
    async fn fetch_page_reports_http_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/user/repos")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let source = GitHubAdSource::new(Client::new(), access(server.url()), "ad-", 100);
        let err = source.fetch_page(1).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(err.page(), 1);
    }

    #[tokio::test]
    async fn fetch_page_reports_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/user/repos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let source = GitHubAdSource::new(Client::new(), access(server.url()), "ad-", 100);
        let err = source.fetch_page(1).await.unwrap_err();

        assert!(matches!(err, SourceError::Decode { page: 1, .. }));
    }

    #[test]
    fn name_is_ads() {
        let src = GitHubAdSource::new(Client::new(), access("http://x".into()), "ad-", 100);
        assert_eq!(src.name(), "Ads");
    }
}
