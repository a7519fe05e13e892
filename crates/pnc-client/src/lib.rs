//! PncClient trait — the boundary between the importer and the PNC REST API.
//! The importer depends on this trait, never on reqwest directly.

pub mod http;
pub mod inmemory;

pub use http::HttpClient;
pub use inmemory::InMemoryClient;

use async_trait::async_trait;
use pnc_types::{Artifact, BuildConfiguration, Page, PageParameters};

pub type Result<T> = anyhow::Result<T>;

/// Largest page the service hands out in one response.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Newest builds first.
pub const SORT_BY_BUILD_START_DESC: &str = "sort=desc=build.startTime";

#[async_trait]
pub trait PncClient: Send + Sync {
    /// `GET /artifacts` with paging, sort and RSQL query parameters.
    async fn search_artifacts(&self, params: &PageParameters) -> Result<Page<Artifact>>;

    /// `GET /build-configs/{id}`.
    async fn get_build_configuration(&self, id: &str) -> Result<BuildConfiguration>;
}

/// Query for artifacts whose identifier contains `fragment`, newest build first.
pub fn identifier_search(fragment: &str, page_size: u32) -> PageParameters {
    PageParameters {
        page_index: 0,
        page_size,
        sort: Some(SORT_BY_BUILD_START_DESC.to_string()),
        q: Some(format!("identifier=like=\"%{}%\"", fragment)),
    }
}

/// Inverse of [`identifier_search`]: the fragment inside an `identifier=like` query.
pub fn identifier_fragment(q: &str) -> Option<&str> {
    q.strip_prefix("identifier=like=\"%")?.strip_suffix("%\"")
}
