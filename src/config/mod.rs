// src/config/mod.rs
//! Service configuration.
//!
//! Lookup order for the config file:
//! 1) `$CAROUSEL_CONFIG_PATH` (must exist)
//! 2) `config/carousel.toml`
//! 3) `config/carousel.json`
//! 4) built-in defaults
//!
//! `CAROUSEL_BIND` and `CAROUSEL_BASE_URL` override the file afterwards.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::normalize::BodyPolicy;
use crate::rotation::RotationConfig;

pub const ENV_CONFIG_PATH: &str = "CAROUSEL_CONFIG_PATH";
pub const ENV_BIND: &str = "CAROUSEL_BIND";
pub const ENV_BASE_URL: &str = "CAROUSEL_BASE_URL";

pub const DEFAULT_TOML_PATH: &str = "config/carousel.toml";
pub const DEFAULT_JSON_PATH: &str = "config/carousel.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    pub rotation: RotationConfig,
    pub normalizer: BodyPolicy,
    pub sources: SourcesConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Call the backend API (and optionally Google News RSS).
    #[default]
    Http,
    /// Serve the bundled demo records; no network.
    Fixtures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub mode: SourceMode,
    pub base_url: String,
    pub breaking_path: String,
    pub news_path: String,
    pub quotes_path: String,
    /// Extra breaking-news source merged after the backend's own list.
    pub breaking_rss_url: Option<String>,
    pub timeout_secs: u64,
    pub limit: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Http,
            base_url: "http://localhost:8000/api".to_string(),
            breaking_path: "/breaking-news/".to_string(),
            news_path: "/news/".to_string(),
            quotes_path: "/stocks/".to_string(),
            breaking_rss_url: None,
            timeout_secs: 10,
            limit: 10,
        }
    }
}

impl SourcesConfig {
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl CarouselConfig {
    /// Load from an explicit path. TOML or JSON, chosen by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading carousel config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: Self = match ext.as_str() {
            "toml" => toml::from_str(&content).context("parsing carousel toml")?,
            "json" => serde_json::from_str(&content).context("parsing carousel json")?,
            other => bail!("unsupported config extension: {other:?}"),
        };
        Ok(cfg.sanitized())
    }

    /// Env path, then the two default paths, then built-in defaults; env
    /// overrides applied last.
    pub fn load_default() -> Result<Self> {
        let cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_TOML_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_TOML_PATH))?
        } else if Path::new(DEFAULT_JSON_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_JSON_PATH))?
        } else {
            Self::default()
        };
        Ok(cfg.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(bind) = non_empty_env(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(url) = non_empty_env(ENV_BASE_URL) {
            self.sources.base_url = url;
        }
        self
    }

    pub fn sanitized(mut self) -> Self {
        self.rotation = self.rotation.sanitized();
        self.normalizer = self.normalizer.sanitized();
        if self.sources.timeout_secs == 0 {
            self.sources.timeout_secs = SourcesConfig::default().timeout_secs;
        }
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
