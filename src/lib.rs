//! PNC importer
//!
//! Bootstraps downstream build configuration from an artifact that PNC has
//! already built: find the artifact, work out which upstream tag, commit and
//! branch it came from, and patch the operator's `upstream_sources.yml` and
//! `build-config.yaml` accordingly.
//!
//! ## Modules
//!
//! - [`filter`] - narrow search hits to one manifest artifact per build
//! - [`prompt`] - numbered interactive selection
//! - [`validate`] - build record preconditions
//! - [`scm`] - git capability (clone, refs, ancestry)
//! - [`resolver`] - tag / commit / branch resolution
//! - [`fragments`] - generated YAML and file patching
//! - [`import`] - the end-to-end pipeline

pub mod config;
pub mod error;
pub mod filter;
pub mod fragments;
pub mod import;
pub mod prompt;
pub mod resolver;
pub mod scm;
pub mod validate;

pub use config::ImporterConfig;
pub use error::{ImportError, Result};
pub use import::{ImportOutcome, Importer};
pub use prompt::{choose, ConsolePrompt, InteractivePrompt, ScriptedPrompt};
pub use resolver::{ResolvedReference, SourceReferenceResolver};
pub use scm::{GitCli, SourceControl};
