//! The `import` pipeline: search → select → validate → resolve → write.

use crate::config::ImporterConfig;
use crate::error::{ImportError, Result};
use crate::filter::{artifact_label, buildable_manifests};
use crate::fragments::{BuildBlock, ConfigFragmentWriter};
use crate::prompt::{choose, InteractivePrompt};
use crate::resolver::{ResolvedReference, SourceReferenceResolver};
use crate::scm::SourceControl;
use crate::validate::validate;
use pnc_client::{identifier_search, PncClient};
use std::path::Path;
use tokio::task::block_in_place;

/// What an import run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub artifact: String,
    pub reference: ResolvedReference,
    pub versioned_name: String,
}

pub struct Importer<'a> {
    client: &'a dyn PncClient,
    scm: &'a dyn SourceControl,
    config: &'a ImporterConfig,
}

impl<'a> Importer<'a> {
    pub fn new(
        client: &'a dyn PncClient,
        scm: &'a dyn SourceControl,
        config: &'a ImporterConfig,
    ) -> Self {
        Self {
            client,
            scm,
            config,
        }
    }

    /// Run one import for artifacts matching `fragment`, patching the files in `base_dir`.
    ///
    /// Nothing is written unless every lookup and selection succeeds.
    ///
    /// Prompting and git run synchronously inside `block_in_place`, so this
    /// must be driven by a multi-threaded runtime.
    pub async fn run(
        &self,
        prompt: &mut dyn InteractivePrompt,
        fragment: &str,
        base_dir: &Path,
    ) -> Result<ImportOutcome> {
        prompt.say("Searching for artifacts...");
        let params = identifier_search(fragment, self.config.page_size);
        let page = self.client.search_artifacts(&params).await?;
        tracing::info!(fragment, hits = page.content.len(), "artifact search finished");

        if page.is_empty() {
            return Err(ImportError::NotFound {
                fragment: fragment.to_string(),
            });
        }

        let artifact = block_in_place(|| {
            prompt.say("Please select the artifact to use as the base for the build:");
            let candidates = buildable_manifests(page.content);
            validate(choose(prompt, candidates, "artifacts", artifact_label)?)
        })?;

        let build_config = self
            .client
            .get_build_configuration(artifact.build_config_id())
            .await?;
        tracing::debug!(name = %build_config.name, "build configuration loaded");

        let block = BuildBlock::new(
            &artifact.build,
            &build_config,
            &self.config.default_system_image,
        );
        let reference = block_in_place(|| {
            let reference = SourceReferenceResolver::new(self.scm).resolve(
                prompt,
                artifact.external_url(),
                artifact.scm_tag(),
            )?;
            ConfigFragmentWriter::new(base_dir).write(&reference, artifact.external_url(), &block)?;
            Ok::<_, ImportError>(reference)
        })?;

        Ok(ImportOutcome {
            artifact: artifact.identifier,
            reference,
            versioned_name: block.versioned_name,
        })
    }
}
