//! HTTP implementation of [`PncClient`] over the PNC v2 REST API.

use crate::{PncClient, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use pnc_types::{Artifact, BuildConfiguration, Page, PageParameters};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct HttpClient {
    http: Client,
    base_url: Url,
}

impl HttpClient {
    /// Create a client for the API rooted at `base_url`, e.g.
    /// `https://pnc.example.com/pnc-rest/v2`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: normalize_base(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid endpoint path {}", path))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, query: Option<&PageParameters>) -> Result<T> {
        tracing::debug!(%url, "PNC GET");

        let mut request = self.http.get(url.clone()).header("Accept", "application/json");
        if let Some(params) = query {
            request = request.query(params);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "PNC API error {} for {}: {}",
                status,
                url,
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[async_trait]
impl PncClient for HttpClient {
    async fn search_artifacts(&self, params: &PageParameters) -> Result<Page<Artifact>> {
        let url = self.endpoint("artifacts")?;
        self.get(url, Some(params)).await
    }

    async fn get_build_configuration(&self, id: &str) -> Result<BuildConfiguration> {
        let url = self.endpoint(&format!("build-configs/{}", id))?;
        self.get(url, None).await
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn normalize_base(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).with_context(|| format!("Invalid PNC URL {}", base_url))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
