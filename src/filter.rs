//! Reduces an artifact search to the artifacts worth offering for selection.
//!
//! A single build publishes many artifacts (jar, sources, javadoc, pom...).
//! Only the manifest artifact of each build is kept so the operator picks a
//! build, not a file.

use pnc_types::Artifact;

/// Identifier marker of Maven manifest artifacts (`group:artifact:pom:version`).
pub const MANIFEST_MARKER: &str = ":pom:";

/// Keep artifacts that were built by PNC and are manifests, preserving order.
pub fn buildable_manifests(artifacts: Vec<Artifact>) -> Vec<Artifact> {
    artifacts.into_iter().filter(is_buildable_manifest).collect()
}

pub fn is_buildable_manifest(artifact: &Artifact) -> bool {
    artifact.build.is_some() && artifact.identifier.contains(MANIFEST_MARKER)
}

/// Label shown in the artifact chooser; flags repositories the import will refuse.
pub fn artifact_label(artifact: &Artifact) -> String {
    let sync_enabled = artifact
        .build
        .as_ref()
        .and_then(|b| b.scm_repository.pre_build_sync_enabled)
        .unwrap_or(false);

    if sync_enabled {
        artifact.identifier.clone()
    } else {
        format!("{} [no pre build sync]", artifact.identifier)
    }
}
