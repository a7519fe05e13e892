//! Importer configuration
//!
//! Values come from the environment (a `.env` file is honoured by the
//! binary through dotenvy) and may be overridden by CLI flags.
//!
//! | Variable                   | Default                                   |
//! |----------------------------|-------------------------------------------|
//! | `PNC_URL`                  | `http://localhost:8080/pnc-rest/v2`       |
//! | `PNC_PAGE_SIZE`            | `200`                                     |
//! | `PNC_DEFAULT_SYSTEM_IMAGE` | see [`DEFAULT_SYSTEM_IMAGE`]              |
//! | `PNC_HTTP_TIMEOUT_SECS`    | `30`                                      |

use crate::error::{ImportError, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_PNC_URL: &str = "http://localhost:8080/pnc-rest/v2";

/// Builder image most configurations run on; not repeated in generated build blocks.
pub const DEFAULT_SYSTEM_IMAGE: &str = "builder-rhel-7-j11.0.11-9-mvn3.6.3-gradle7.0.2:1.0.6";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImporterConfig {
    pub pnc_url: String,
    pub page_size: u32,
    pub default_system_image: String,
    pub http_timeout: Duration,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            pnc_url: DEFAULT_PNC_URL.to_string(),
            page_size: pnc_client::MAX_PAGE_SIZE,
            default_system_image: DEFAULT_SYSTEM_IMAGE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ImporterConfig {
    /// Read the environment. Call [`ImporterConfig::validate`] once CLI
    /// overrides have been applied.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Only numeric values are
    /// checked here.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("PNC_URL") {
            config.pnc_url = url;
        }
        if let Some(size) = lookup("PNC_PAGE_SIZE") {
            config.page_size = parse_number("PNC_PAGE_SIZE", &size)?;
        }
        if let Some(image) = lookup("PNC_DEFAULT_SYSTEM_IMAGE") {
            config.default_system_image = image;
        }
        if let Some(secs) = lookup("PNC_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(parse_number("PNC_HTTP_TIMEOUT_SECS", &secs)?);
        }

        Ok(config)
    }

    pub fn with_pnc_url(mut self, url: impl Into<String>) -> Self {
        self.pnc_url = url.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.pnc_url)
            .map_err(|e| ImportError::Config(format!("PNC_URL '{}': {}", self.pnc_url, e)))?;
        if self.page_size == 0 || self.page_size > pnc_client::MAX_PAGE_SIZE {
            return Err(ImportError::Config(format!(
                "page size must be between 1 and {}, got {}",
                pnc_client::MAX_PAGE_SIZE,
                self.page_size
            )));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ImportError::Config(format!("{} must be a number, got '{}'", key, value)))
}
