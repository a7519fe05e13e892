//! Typed failure model for an import run.
//!
//! Every variant is fatal for the current invocation. Malformed interactive
//! input never surfaces here; the chooser recovers from it by re-prompting.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The artifact search came back empty.
    #[error("No existing builds found for '{fragment}'")]
    NotFound { fragment: String },

    #[error("Could not proceed: no build information for selected artifact")]
    NoBuildInformation,

    #[error("Could not proceed: no SCM information for selected build")]
    NoScmInformation,

    #[error("Pre build sync not enabled for {url} in PNC, this is required")]
    PreBuildSyncDisabled { url: String },

    /// A disambiguation step was handed nothing to choose from.
    #[error("No {what} to choose from")]
    NoCandidates { what: String },

    /// A git invocation failed or produced output we could not read.
    #[error("git {operation} failed: {message}")]
    Scm { operation: String, message: String },

    #[error("PNC request failed: {0:#}")]
    Service(#[from] anyhow::Error),

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Console input could not be read (closed stdin included).
    #[error("Failed to read selection: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ImportError {
    pub fn scm(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scm {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures of the build-record preconditions checked before any git work.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoBuildInformation | Self::NoScmInformation | Self::PreBuildSyncDisabled { .. }
        )
    }
}
