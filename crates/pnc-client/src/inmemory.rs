//! In-memory [`PncClient`] serving canned artifacts and build configurations.
//!
//! Used by tests and offline dry runs. Searches honour the
//! `identifier=like="%...%"` query produced by [`crate::identifier_search`]
//! and the requested page size; every request is recorded for inspection.

use crate::{identifier_fragment, PncClient, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use pnc_types::{Artifact, BuildConfiguration, Page, PageParameters};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryClient {
    artifacts: Vec<Artifact>,
    build_configurations: HashMap<String, BuildConfiguration>,
    searches: Mutex<Vec<PageParameters>>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_build_configuration(mut self, config: BuildConfiguration) -> Self {
        self.build_configurations.insert(config.id.clone(), config);
        self
    }

    /// Every search request received so far, oldest first.
    pub fn searches(&self) -> Vec<PageParameters> {
        self.searches
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PncClient for InMemoryClient {
    async fn search_artifacts(&self, params: &PageParameters) -> Result<Page<Artifact>> {
        if let Ok(mut searches) = self.searches.lock() {
            searches.push(params.clone());
        }

        let fragment = params.q.as_deref().and_then(identifier_fragment).unwrap_or("");
        let limit = if params.page_size == 0 {
            usize::MAX
        } else {
            params.page_size as usize
        };

        let content = self
            .artifacts
            .iter()
            .filter(|a| a.identifier.contains(fragment))
            .take(limit)
            .cloned()
            .collect();

        Ok(Page::single(content))
    }

    async fn get_build_configuration(&self, id: &str) -> Result<BuildConfiguration> {
        self.build_configurations
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("PNC API error 404 Not Found: build configuration {}", id))
    }
}
