//! [`SourceControl`] backed by the `git` executable.
//!
//! Clones are bare so that every branch of the remote shows up under
//! `refs/heads/` without a checkout.

use super::{BranchRef, SourceControl, TagRef, WorkingCopy};
use crate::error::{ImportError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const TAG_FORMAT: &str = "--format=%(refname)%00%(objectname)%00%(*objectname)";
const BRANCH_FORMAT: &str = "--format=%(refname)%00%(objectname)";

#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git binary instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn command(&self, repo: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = repo {
            cmd.arg("-C").arg(dir);
        }
        // Public repositories only; never block on a credential prompt.
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd
    }

    fn run<I, S>(&self, operation: &str, repo: Option<&Path>, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .command(repo)
            .args(args)
            .output()
            .map_err(|err| ImportError::scm(operation, err.to_string()))?;
        Ok(output)
    }

    fn run_checked<I, S>(&self, operation: &str, repo: Option<&Path>, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run(operation, repo, args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ImportError::scm(operation, stderr.trim().to_string()));
        }
        String::from_utf8(output.stdout)
            .map_err(|err| ImportError::scm(operation, format!("non UTF-8 output: {}", err)))
    }
}

impl SourceControl for GitCli {
    fn clone_repository(&self, url: &str) -> Result<WorkingCopy> {
        let scratch = tempfile::Builder::new()
            .prefix("public-checkout")
            .tempdir()
            .map_err(|err| ImportError::scm("clone", format!("cannot create temp dir: {}", err)))?;
        let dest = scratch.path().join("repo");

        tracing::info!(url, dest = %dest.display(), "cloning public repository");
        let args: [&OsStr; 6] = [
            "clone".as_ref(),
            "--bare".as_ref(),
            "--quiet".as_ref(),
            "--".as_ref(),
            url.as_ref(),
            dest.as_os_str(),
        ];
        self.run_checked("clone", None, args)?;

        Ok(WorkingCopy::scratch(dest, scratch))
    }

    fn list_tags(&self, repo: &WorkingCopy) -> Result<Vec<TagRef>> {
        let stdout = self.run_checked(
            "for-each-ref",
            Some(repo.path()),
            ["for-each-ref", TAG_FORMAT, "refs/tags"],
        )?;
        parse_tags(&stdout)
    }

    fn list_branches(&self, repo: &WorkingCopy) -> Result<Vec<BranchRef>> {
        let stdout = self.run_checked(
            "for-each-ref",
            Some(repo.path()),
            ["for-each-ref", BRANCH_FORMAT, "refs/heads"],
        )?;
        parse_branches(&stdout)
    }

    fn is_ancestor(&self, repo: &WorkingCopy, commit: &str, tip: &str) -> Result<bool> {
        let output = self.run(
            "merge-base",
            Some(repo.path()),
            ["merge-base", "--is-ancestor", commit, tip],
        )?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(ImportError::scm(
                "merge-base",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }
}

fn parse_tags(stdout: &str) -> Result<Vec<TagRef>> {
    stdout
        .lines()
        .filter(|l| !l.is_empty())
        .map(|line| {
            let mut fields = line.split('\0');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(object_id), peeled) if !object_id.is_empty() => Ok(TagRef {
                    name: name.to_string(),
                    object_id: object_id.to_string(),
                    peeled_id: peeled.filter(|p| !p.is_empty()).map(String::from),
                }),
                _ => Err(ImportError::scm(
                    "for-each-ref",
                    format!("unexpected tag line '{}'", line.replace('\0', " ")),
                )),
            }
        })
        .collect()
}

fn parse_branches(stdout: &str) -> Result<Vec<BranchRef>> {
    stdout
        .lines()
        .filter(|l| !l.is_empty())
        .map(|line| match line.split_once('\0') {
            Some((name, tip)) if !tip.is_empty() => Ok(BranchRef::new(name, tip)),
            _ => Err(ImportError::scm(
                "for-each-ref",
                format!("unexpected branch line '{}'", line.replace('\0', " ")),
            )),
        })
        .collect()
}
