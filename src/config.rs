//! TOML configuration for the mirror.
//!
//! ```toml
//! [remote]
//! base_url = "https://wiki.example.com"
//! # session_cookie_name = "JSESSIONID"
//! # session_env = "MIRROR_SESSION"
//!
//! [archive]
//! root = "./scraped_content"
//!
//! [listing]
//! page_size = 100
//!
//! [politeness]
//! item_delay_min = 1.0
//! item_delay_max = 5.0
//! ```
//!
//! The session credential itself is never read from this file; it comes
//! from the environment variable named by `remote.session_env`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::politeness::DelayBounds;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub remote: RemoteConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default = "default_cookie_name")]
    pub session_cookie_name: String,
    #[serde(default = "default_session_env")]
    pub session_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_cookie_name() -> String {
    "JSESSIONID".to_string()
}
fn default_session_env() -> String {
    "MIRROR_SESSION".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_root")]
    pub root: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: default_archive_root(),
            extension: default_extension(),
        }
    }
}

fn default_archive_root() -> PathBuf {
    PathBuf::from("scraped_content")
}
fn default_extension() -> String {
    "md".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_content_expand")]
    pub content_expand: String,
    #[serde(default = "default_detail_expand")]
    pub detail_expand: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            content_expand: default_content_expand(),
            detail_expand: default_detail_expand(),
        }
    }
}

fn default_page_size() -> usize {
    100
}
fn default_content_expand() -> String {
    "ancestors,version".to_string()
}
fn default_detail_expand() -> String {
    "body.view,ancestors".to_string()
}

/// Delay bounds in seconds for the three request call sites.
#[derive(Debug, Deserialize, Clone)]
pub struct PolitenessConfig {
    #[serde(default = "default_page_delay_min")]
    pub page_delay_min: f64,
    #[serde(default = "default_page_delay_max")]
    pub page_delay_max: f64,
    #[serde(default = "default_child_delay_min")]
    pub child_delay_min: f64,
    #[serde(default = "default_child_delay_max")]
    pub child_delay_max: f64,
    #[serde(default = "default_item_delay_min")]
    pub item_delay_min: f64,
    #[serde(default = "default_item_delay_max")]
    pub item_delay_max: f64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            page_delay_min: default_page_delay_min(),
            page_delay_max: default_page_delay_max(),
            child_delay_min: default_child_delay_min(),
            child_delay_max: default_child_delay_max(),
            item_delay_min: default_item_delay_min(),
            item_delay_max: default_item_delay_max(),
        }
    }
}

fn default_page_delay_min() -> f64 {
    0.5
}
fn default_page_delay_max() -> f64 {
    1.5
}
fn default_child_delay_min() -> f64 {
    0.2
}
fn default_child_delay_max() -> f64 {
    0.8
}
fn default_item_delay_min() -> f64 {
    1.0
}
fn default_item_delay_max() -> f64 {
    5.0
}

impl PolitenessConfig {
    /// All delays zero. Used by tests and dry runs.
    pub fn none() -> Self {
        Self {
            page_delay_min: 0.0,
            page_delay_max: 0.0,
            child_delay_min: 0.0,
            child_delay_max: 0.0,
            item_delay_min: 0.0,
            item_delay_max: 0.0,
        }
    }

    pub fn page_bounds(&self) -> DelayBounds {
        DelayBounds::new(self.page_delay_min, self.page_delay_max)
    }

    pub fn child_bounds(&self) -> DelayBounds {
        DelayBounds::new(self.child_delay_min, self.child_delay_max)
    }

    pub fn item_bounds(&self) -> DelayBounds {
        DelayBounds::new(self.item_delay_min, self.item_delay_max)
    }

    fn validate(&self) -> Result<()> {
        let pairs = [
            ("page_delay", self.page_delay_min, self.page_delay_max),
            ("child_delay", self.child_delay_min, self.child_delay_max),
            ("item_delay", self.item_delay_min, self.item_delay_max),
        ];
        for (name, min, max) in pairs {
            if !min.is_finite() || !max.is_finite() || min < 0.0 {
                bail!("politeness.{}_min/max must be finite and >= 0", name);
            }
            if min > max {
                bail!(
                    "politeness.{}_min ({}) must not exceed {}_max ({})",
                    name,
                    min,
                    name,
                    max
                );
            }
        }
        Ok(())
    }
}

impl Config {
    /// A config with defaults everywhere, pointing at `base_url` and
    /// archiving under `root`. Delays are disabled.
    pub fn minimal(base_url: &str, root: &Path) -> Self {
        Self {
            remote: RemoteConfig {
                base_url: base_url.to_string(),
                session_cookie_name: default_cookie_name(),
                session_env: default_session_env(),
                timeout_secs: default_timeout_secs(),
                user_agent: None,
            },
            archive: ArchiveConfig {
                root: root.to_path_buf(),
                extension: default_extension(),
            },
            listing: ListingConfig::default(),
            politeness: PolitenessConfig::none(),
        }
    }

    /// Read the session credential from the configured environment variable.
    pub fn session_credential(&self) -> Result<String> {
        let value = std::env::var(&self.remote.session_env).with_context(|| {
            format!(
                "{} environment variable not set (session credential)",
                self.remote.session_env
            )
        })?;
        if value.trim().is_empty() {
            bail!("{} is empty", self.remote.session_env);
        }
        Ok(value.trim().to_string())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.remote.base_url.trim().is_empty() {
        bail!("remote.base_url must not be empty");
    }

    if config.listing.page_size == 0 {
        bail!("listing.page_size must be > 0");
    }

    if config.archive.extension.is_empty() || config.archive.extension.contains('.') {
        bail!("archive.extension must be a bare extension such as \"md\"");
    }

    config.politeness.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_sections() {
        let cfg = parse_config("[remote]\nbase_url = \"https://wiki.example.com\"\n").unwrap();
        assert_eq!(cfg.remote.session_cookie_name, "JSESSIONID");
        assert_eq!(cfg.archive.root, PathBuf::from("scraped_content"));
        assert_eq!(cfg.listing.page_size, 100);
        assert_eq!(cfg.listing.content_expand, "ancestors,version");
        assert_eq!(cfg.politeness.item_delay_max, 5.0);
    }

    #[test]
    fn zero_page_size_rejected() {
        let err = parse_config(
            "[remote]\nbase_url = \"https://wiki.example.com\"\n[listing]\npage_size = 0\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn inverted_delay_bounds_rejected() {
        let err = parse_config(
            "[remote]\nbase_url = \"x\"\n[politeness]\nitem_delay_min = 3.0\nitem_delay_max = 1.0\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("item_delay"));
    }

    #[test]
    fn empty_base_url_rejected() {
        assert!(parse_config("[remote]\nbase_url = \"  \"\n").is_err());
    }
}
