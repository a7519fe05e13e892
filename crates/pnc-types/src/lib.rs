//! PNC Types - REST payloads of the build-tracking service
//!
//! Pure data carriers for the subset of the PNC v2 REST model that the
//! importer consumes. Every type is immutable once deserialized and is
//! composed rather than layered: an `Artifact` holds its `Build`, a `Build`
//! holds its repository, project and environment.
//!
//! ## Rules
//!
//! 1. **NO BUSINESS LOGIC** - filtering and validation live in the importer
//! 2. **LENIENT** - unknown JSON fields are ignored, optional fields default
//! 3. **camelCase** on the wire, snake_case in Rust

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// PAGINATION
// ============================================================================

/// One page of a collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub page_index: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap an in-memory result set as a single page.
    pub fn single(content: Vec<T>) -> Self {
        let len = content.len();
        Self {
            page_index: 0,
            page_size: len as u32,
            total_pages: 1,
            total_hits: len as u64,
            content,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Query parameters accepted by paged collection endpoints.
///
/// `q` uses the service's RSQL syntax, e.g. `identifier=like="%quarkus%"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParameters {
    pub page_index: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

// ============================================================================
// ARTIFACTS AND BUILDS
// ============================================================================

/// An artifact produced or consumed by a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub id: String,
    /// Maven-style coordinates, `group:artifact:type:version`
    pub identifier: String,
    #[serde(default)]
    pub purl: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    /// Build that produced the artifact; absent for imported artifacts
    #[serde(default)]
    pub build: Option<Build>,
}

/// Build record describing how and from which sources an artifact was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    #[serde(default)]
    pub id: String,
    /// Tag pushed by the build system, usually carrying vendor suffixes
    #[serde(default)]
    pub scm_tag: String,
    #[serde(default)]
    pub scm_revision: Option<String>,
    #[serde(default)]
    pub scm_repository: ScmRepository,
    #[serde(default)]
    pub build_config_revision: BuildConfigRevision,
    #[serde(default)]
    pub project: ProjectRef,
    #[serde(default)]
    pub environment: Environment,
}

/// Source repository registered with the build service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScmRepository {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub internal_url: Option<String>,
    /// Public clone URL
    #[serde(default)]
    pub external_url: String,
    #[serde(default)]
    pub pre_build_sync_enabled: Option<bool>,
}

/// Audited revision of a build configuration, as captured by a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfigRevision {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub rev: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub build_script: String,
    /// `MVN`, `GRADLE`, `NPM` or `SBT`
    #[serde(default)]
    pub build_type: String,
    #[serde(default)]
    pub scm_revision: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Build environment (builder image) a build ran in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub system_image_repository_url: Option<String>,
    #[serde(default)]
    pub system_image_id: Option<String>,
}

// ============================================================================
// BUILD CONFIGURATIONS
// ============================================================================

/// Current state of a build configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfiguration {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub build_script: Option<String>,
    #[serde(default)]
    pub project: ProjectRef,
    /// Dependency configurations keyed by id, in response order
    #[serde(default)]
    pub dependencies: DependencyMap,
}

/// Id → reference mapping that keeps the entries in the order the service
/// sent them. Ids are unique; inserting an existing id replaces its entry
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyMap {
    entries: Vec<(String, BuildConfigurationRef)>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, reference: BuildConfigurationRef) {
        let id = id.into();
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some((_, existing)) => *existing = reference,
            None => self.entries.push((id, reference)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&BuildConfigurationRef> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, reference)| reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &BuildConfigurationRef> {
        self.entries.iter().map(|(_, reference)| reference)
    }
}

impl Serialize for DependencyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, reference) in &self.entries {
            map.serialize_entry(id, reference)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DependencyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DependencyMapVisitor;

        impl<'de> Visitor<'de> for DependencyMapVisitor {
            type Value = DependencyMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of build configuration id to reference")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = DependencyMap::new();
                while let Some((id, reference)) =
                    access.next_entry::<String, BuildConfigurationRef>()?
                {
                    map.insert(id, reference);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(DependencyMapVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfigurationRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub build_script: Option<String>,
    #[serde(default)]
    pub build_type: Option<String>,
    #[serde(default)]
    pub scm_revision: Option<String>,
}
