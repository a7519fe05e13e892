//! Preconditions on the selected artifact's build record.
//!
//! Checked in order, first failure wins. Nothing touches git until an
//! artifact has passed.

use crate::error::{ImportError, Result};
use pnc_types::{Artifact, Build};

/// An artifact whose build record is complete enough to resolve sources from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArtifact {
    pub identifier: String,
    pub build: Build,
    pub scm_revision: String,
}

impl ResolvedArtifact {
    pub fn external_url(&self) -> &str {
        &self.build.scm_repository.external_url
    }

    pub fn scm_tag(&self) -> &str {
        &self.build.scm_tag
    }

    pub fn build_config_id(&self) -> &str {
        &self.build.build_config_revision.id
    }
}

pub fn validate(artifact: Artifact) -> Result<ResolvedArtifact> {
    let build = artifact.build.ok_or(ImportError::NoBuildInformation)?;
    let scm_revision = build
        .scm_revision
        .clone()
        .ok_or(ImportError::NoScmInformation)?;

    if build.scm_repository.pre_build_sync_enabled != Some(true) {
        return Err(ImportError::PreBuildSyncDisabled {
            url: build.scm_repository.external_url.clone(),
        });
    }

    Ok(ResolvedArtifact {
        identifier: artifact.identifier,
        build,
        scm_revision,
    })
}
