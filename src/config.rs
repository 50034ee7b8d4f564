use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::pacing::PacingPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub ads: AdsConfig,

    #[serde(default)]
    pub songs: SongsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-request timeout, in seconds, for every HTTP call.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingKind {
    Constant,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_pacing_kind")]
    pub kind: PacingKind,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_factor")]
    pub factor: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsConfig {
    /// Backend that hands out the GitHub credentials.
    #[serde(default = "default_ads_backend")]
    pub backend_url: String,

    #[serde(default = "default_ads_per_page")]
    pub per_page: usize,

    #[serde(default = "default_ads_prefix")]
    pub name_prefix: String,

    /// Stop after this many pages.  `0` means no limit.
    #[serde(default = "default_ads_max_pages")]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongsConfig {
    #[serde(default = "default_songs_endpoint")]
    pub endpoint: String,

    /// Base of the `/audio` and `/thumbnail` streaming proxy.
    #[serde(default = "default_songs_proxy")]
    pub proxy_base: String,

    #[serde(default = "default_songs_page_size")]
    pub page_size: usize,

    /// Stop after this many pages.  `0` or unset means no limit.
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        if !config_path.exists() {
            if explicit {
                anyhow::bail!("config file {} does not exist", config_path.display());
            }
            info!("No config file found, using defaults");
            return Ok(Config::default());
        }

        debug!("Loading config from {:?}", config_path);
        let contents = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        info!("Config loaded successfully");
        Ok(config)
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("musten-scroll").join("config.toml"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs.max(1))
    }

    pub fn pacing(&self) -> PacingPolicy {
        let delay = Duration::from_millis(self.pacing.delay_ms);
        match self.pacing.kind {
            PacingKind::Constant => PacingPolicy::Constant(delay),
            PacingKind::Exponential => PacingPolicy::Exponential {
                initial: delay,
                factor: self.pacing.factor,
                max: Duration::from_millis(self.pacing.max_delay_ms).max(delay),
            },
        }
    }
}

/// `Some(0)` is how a config file turns a default limit off.
fn page_limit(max_pages: Option<u32>) -> Option<u32> {
    max_pages.filter(|&max| max > 0)
}

impl AdsConfig {
    pub fn page_limit(&self) -> Option<u32> {
        page_limit(self.max_pages)
    }
}

impl SongsConfig {
    pub fn page_limit(&self) -> Option<u32> {
        page_limit(self.max_pages)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            kind: default_pacing_kind(),
            delay_ms: default_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            factor: default_factor(),
        }
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            backend_url: default_ads_backend(),
            per_page: default_ads_per_page(),
            name_prefix: default_ads_prefix(),
            max_pages: default_ads_max_pages(),
        }
    }
}

impl Default for SongsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_songs_endpoint(),
            proxy_base: default_songs_proxy(),
            page_size: default_songs_page_size(),
            max_pages: None,
        }
    }
}

// Default value functions
fn default_timeout() -> u64 { 10 }
fn default_pacing_kind() -> PacingKind { PacingKind::Constant }
fn default_delay_ms() -> u64 { 1000 }
fn default_max_delay_ms() -> u64 { 8000 }
fn default_factor() -> u32 { 2 }
fn default_ads_backend() -> String { "https://musten-y.onrender.com".to_string() }
fn default_ads_per_page() -> usize { 100 }
fn default_ads_prefix() -> String { "ad-".to_string() }
fn default_ads_max_pages() -> Option<u32> { Some(10) }
fn default_songs_endpoint() -> String { "https://musten-backend.onrender.com/songs".to_string() }
fn default_songs_proxy() -> String { "https://musten-backend.onrender.com".to_string() }
fn default_songs_page_size() -> usize { 20 }
