//! Source-control capability
//!
//! The resolver only needs four primitives: clone a public repository into a
//! scratch location, enumerate its tags and branches, and answer commit
//! ancestry questions. [`GitCli`] provides them by driving the `git`
//! executable; tests substitute an in-memory history.

pub mod git_cli;

pub use git_cli::GitCli;

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const REFS_TAGS: &str = "refs/tags/";
pub const REFS_HEADS: &str = "refs/heads/";

/// A tag as listed by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    /// Full ref name, e.g. `refs/tags/1.2.0.Final`
    pub name: String,
    /// Object the ref points at (the tag object for annotated tags)
    pub object_id: String,
    /// Commit an annotated tag dereferences to
    pub peeled_id: Option<String>,
}

impl TagRef {
    pub fn lightweight(name: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_id: commit.into(),
            peeled_id: None,
        }
    }

    pub fn annotated(
        name: impl Into<String>,
        tag_object: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            object_id: tag_object.into(),
            peeled_id: Some(commit.into()),
        }
    }

    /// The commit this tag designates, peeled through annotated tag objects.
    pub fn commit(&self) -> &str {
        self.peeled_id.as_deref().unwrap_or(&self.object_id)
    }

    pub fn short_name(&self) -> &str {
        self.name.strip_prefix(REFS_TAGS).unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// Full ref name, e.g. `refs/heads/main`
    pub name: String,
    pub tip: String,
}

impl BranchRef {
    pub fn new(name: impl Into<String>, tip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tip: tip.into(),
        }
    }

    pub fn short_name(&self) -> &str {
        self.name.strip_prefix(REFS_HEADS).unwrap_or(&self.name)
    }
}

/// Handle on a local copy of a repository.
///
/// When created by a clone the copy lives in a private temporary directory
/// that is deleted when the handle is dropped.
#[derive(Debug)]
pub struct WorkingCopy {
    path: PathBuf,
    _scratch: Option<TempDir>,
}

impl WorkingCopy {
    /// Wrap an existing directory; nothing is deleted on drop.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _scratch: None,
        }
    }

    pub(crate) fn scratch(path: PathBuf, scratch: TempDir) -> Self {
        Self {
            path,
            _scratch: Some(scratch),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub trait SourceControl {
    fn clone_repository(&self, url: &str) -> Result<WorkingCopy>;

    fn list_tags(&self, repo: &WorkingCopy) -> Result<Vec<TagRef>>;

    fn list_branches(&self, repo: &WorkingCopy) -> Result<Vec<BranchRef>>;

    /// True when `commit` is `tip` or one of its ancestors.
    fn is_ancestor(&self, repo: &WorkingCopy, commit: &str, tip: &str) -> Result<bool>;
}
