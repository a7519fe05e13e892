//! Source reference resolution
//!
//! Maps a build record's tag string back to the public repository it was
//! built from:
//!
//! ```text
//! scm tag ──strip vendor suffix──▶ inferred tag
//!         ──match against repo tags (fallback: all tags)──▶ tag   (prompt if >1)
//!         ──peel──▶ commit
//!         ──branches whose tip descends from commit──▶ branch     (prompt if >1)
//! ```
//!
//! The clone is private to one resolution and is deleted when resolution
//! returns, on success or failure.

use crate::error::Result;
use crate::prompt::{choose, InteractivePrompt};
use crate::scm::{BranchRef, SourceControl, TagRef, WorkingCopy};
use regex::Regex;
use std::sync::LazyLock;

static DOT_VENDOR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.redhat.*").expect("valid regex"));
static DASH_VENDOR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-redhat.*").expect("valid regex"));

/// Exact upstream coordinates of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Tag name without `refs/tags/`
    pub tag: String,
    /// Full commit hash the tag points at
    pub commit: String,
    /// Branch name without `refs/heads/`
    pub branch: String,
}

/// Strip the downstream release suffix, `1.2.3.redhat-00001` → `1.2.3`.
pub fn infer_tag(scm_tag: &str) -> String {
    let stripped = DOT_VENDOR_SUFFIX.replace(scm_tag, "");
    DASH_VENDOR_SUFFIX.replace(&stripped, "").into_owned()
}

/// Tags containing `inferred`, or every tag when none does; sorted by ref name.
pub fn tag_candidates(all_tags: Vec<TagRef>, inferred: &str) -> Vec<TagRef> {
    let (mut matching, rest): (Vec<_>, Vec<_>) =
        all_tags.into_iter().partition(|t| t.name.contains(inferred));

    if matching.is_empty() {
        tracing::warn!(inferred, "no tag matches the build tag, offering all tags");
        matching = rest;
    }
    matching.sort_by(|a, b| a.name.cmp(&b.name));
    matching
}

pub struct SourceReferenceResolver<'a> {
    scm: &'a dyn SourceControl,
}

impl<'a> SourceReferenceResolver<'a> {
    pub fn new(scm: &'a dyn SourceControl) -> Self {
        Self { scm }
    }

    pub fn resolve(
        &self,
        prompt: &mut dyn InteractivePrompt,
        external_url: &str,
        scm_tag: &str,
    ) -> Result<ResolvedReference> {
        let inferred = infer_tag(scm_tag);
        tracing::info!(scm_tag, %inferred, external_url, "resolving source reference");

        let repo = self.scm.clone_repository(external_url)?;

        let tag = self.select_tag(prompt, &repo, &inferred)?;
        let commit = tag.commit().to_string();
        let branch = self.select_branch(prompt, &repo, &commit)?;

        let resolved = ResolvedReference {
            tag: tag.short_name().to_string(),
            commit,
            branch: branch.short_name().to_string(),
        };
        tracing::info!(
            tag = %resolved.tag,
            commit = %resolved.commit,
            branch = %resolved.branch,
            "source reference resolved"
        );
        Ok(resolved)
    }

    fn select_tag(
        &self,
        prompt: &mut dyn InteractivePrompt,
        repo: &WorkingCopy,
        inferred: &str,
    ) -> Result<TagRef> {
        let mut candidates = tag_candidates(self.scm.list_tags(repo)?, inferred);
        tracing::debug!(count = candidates.len(), "tag candidates");

        if candidates.len() == 1 {
            return Ok(candidates.remove(0));
        }
        prompt.say("Multiple potential tags found, please select the appropriate one:");
        choose(prompt, candidates, "tags", |t| t.name.clone())
    }

    fn select_branch(
        &self,
        prompt: &mut dyn InteractivePrompt,
        repo: &WorkingCopy,
        commit: &str,
    ) -> Result<BranchRef> {
        let mut candidates = Vec::new();
        for branch in self.scm.list_branches(repo)? {
            if self.scm.is_ancestor(repo, commit, &branch.tip)? {
                candidates.push(branch);
            }
        }
        tracing::debug!(count = candidates.len(), commit, "branches containing commit");

        if candidates.len() == 1 {
            return Ok(candidates.remove(0));
        }
        prompt.say("Multiple potential branches found, please select the appropriate one:");
        choose(prompt, candidates, "branches", |b| b.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;
    use crate::prompt::ScriptedPrompt;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Linear-history fake: each commit's ancestors are listed explicitly.
    #[derive(Default)]
    struct FakeScm {
        tags: Vec<TagRef>,
        branches: Vec<BranchRef>,
        ancestry: HashMap<String, HashSet<String>>,
        clones: Mutex<Vec<String>>,
    }

    impl FakeScm {
        fn tag(mut self, tag: TagRef) -> Self {
            self.tags.push(tag);
            self
        }

        fn branch(mut self, name: &str, tip: &str, history: &[&str]) -> Self {
            self.branches.push(BranchRef::new(format!("refs/heads/{}", name), tip));
            let ancestors = self.ancestry.entry(tip.to_string()).or_default();
            ancestors.insert(tip.to_string());
            ancestors.extend(history.iter().map(|c| c.to_string()));
            self
        }
    }

    impl SourceControl for FakeScm {
        fn clone_repository(&self, url: &str) -> Result<WorkingCopy> {
            self.clones.lock().unwrap().push(url.to_string());
            Ok(WorkingCopy::at("/fake"))
        }

        fn list_tags(&self, _repo: &WorkingCopy) -> Result<Vec<TagRef>> {
            Ok(self.tags.clone())
        }

        fn list_branches(&self, _repo: &WorkingCopy) -> Result<Vec<BranchRef>> {
            Ok(self.branches.clone())
        }

        fn is_ancestor(&self, _repo: &WorkingCopy, commit: &str, tip: &str) -> Result<bool> {
            Ok(self
                .ancestry
                .get(tip)
                .map(|a| a.contains(commit))
                .unwrap_or(false))
        }
    }

    fn names(tags: &[TagRef]) -> Vec<&str> {
        tags.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_infer_tag_strips_vendor_suffixes() {
        assert_eq!(infer_tag("2.7.5.Final-redhat-00001"), "2.7.5.Final");
        assert_eq!(infer_tag("1.2.3.redhat-00002"), "1.2.3");
        assert_eq!(infer_tag("v1.0.0"), "v1.0.0");
        assert_eq!(infer_tag("1.0-redhat"), "1.0");
    }

    #[test]
    fn test_candidates_filtered_and_sorted() {
        let all = vec![
            TagRef::lightweight("refs/tags/2.0.1", "c3"),
            TagRef::lightweight("refs/tags/1.0", "c0"),
            TagRef::lightweight("refs/tags/2.0", "c2"),
        ];
        let candidates = tag_candidates(all, "2.0");
        assert_eq!(names(&candidates), vec!["refs/tags/2.0", "refs/tags/2.0.1"]);
    }

    #[test]
    fn test_candidates_fall_back_to_all_tags() {
        let all = vec![
            TagRef::lightweight("refs/tags/b", "c1"),
            TagRef::lightweight("refs/tags/a", "c0"),
        ];
        let candidates = tag_candidates(all, "9.9.9");
        assert_eq!(names(&candidates), vec!["refs/tags/a", "refs/tags/b"]);
    }

    #[test]
    fn test_candidates_empty_only_without_tags() {
        assert!(tag_candidates(Vec::new(), "1.0").is_empty());
    }

    #[test]
    fn test_single_candidates_resolve_without_prompting() {
        let scm = FakeScm::default()
            .tag(TagRef::annotated("refs/tags/1.2.0", "tagobj", "c2"))
            .tag(TagRef::lightweight("refs/tags/0.9", "c0"))
            .branch("main", "c3", &["c0", "c1", "c2"])
            .branch("old", "c0", &[]);

        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        let resolved = SourceReferenceResolver::new(&scm)
            .resolve(&mut prompt, "https://github.com/x/y.git", "1.2.0.redhat-00001")
            .unwrap();

        assert_eq!(
            resolved,
            ResolvedReference {
                tag: "1.2.0".into(),
                commit: "c2".into(),
                branch: "main".into(),
            }
        );
        assert!(prompt.transcript().is_empty());
        assert_eq!(*scm.clones.lock().unwrap(), vec!["https://github.com/x/y.git"]);
    }

    #[test]
    fn test_peeled_id_wins_over_tag_object() {
        let scm = FakeScm::default()
            .tag(TagRef::annotated("refs/tags/1.0", "tag-object-id", "commit-id"))
            .branch("main", "commit-id", &[]);

        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        let resolved = SourceReferenceResolver::new(&scm)
            .resolve(&mut prompt, "u", "1.0")
            .unwrap();
        assert_eq!(resolved.commit, "commit-id");
    }

    #[test]
    fn test_branch_tip_at_commit_qualifies() {
        let scm = FakeScm::default()
            .tag(TagRef::lightweight("refs/tags/1.0", "c1"))
            .branch("release", "c1", &["c0"])
            .branch("unrelated", "x9", &["x8"]);

        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        let resolved = SourceReferenceResolver::new(&scm)
            .resolve(&mut prompt, "u", "1.0")
            .unwrap();
        assert_eq!(resolved.branch, "release");
    }

    #[test]
    fn test_multiple_tags_and_branches_prompt() {
        let scm = FakeScm::default()
            .tag(TagRef::lightweight("refs/tags/1.0.1", "c2"))
            .tag(TagRef::annotated("refs/tags/1.0", "t1", "c1"))
            .branch("main", "c5", &["c1", "c2", "c3", "c4"])
            .branch("1.0.x", "c2", &["c1"]);

        // tags: [1] refs/tags/1.0 [2] refs/tags/1.0.1 ; branches in listing order
        let mut prompt = ScriptedPrompt::new(["1", "2"]);
        let resolved = SourceReferenceResolver::new(&scm)
            .resolve(&mut prompt, "u", "1.0.redhat-1")
            .unwrap();

        assert_eq!(resolved.tag, "1.0");
        assert_eq!(resolved.commit, "c1");
        assert_eq!(resolved.branch, "1.0.x");

        let transcript = prompt.transcript();
        assert_eq!(
            transcript[0],
            "Multiple potential tags found, please select the appropriate one:"
        );
        assert_eq!(transcript[1], "[1] refs/tags/1.0");
        assert_eq!(transcript[2], "[2] refs/tags/1.0.1");
        assert!(transcript.contains(&"[1] refs/heads/main".to_string()));
        assert!(transcript.contains(&"Selected: refs/heads/1.0.x".to_string()));
    }

    #[test]
    fn test_no_tags_fails_fast() {
        let scm = FakeScm::default().branch("main", "c1", &[]);
        let mut prompt = ScriptedPrompt::new(["1"]);
        let err = SourceReferenceResolver::new(&scm)
            .resolve(&mut prompt, "u", "1.0")
            .unwrap_err();
        assert!(matches!(err, ImportError::NoCandidates { ref what } if what == "tags"));
    }

    #[test]
    fn test_commit_on_no_branch_fails_fast() {
        let scm = FakeScm::default()
            .tag(TagRef::lightweight("refs/tags/1.0", "dangling"))
            .branch("main", "c1", &["c0"]);
        let mut prompt = ScriptedPrompt::new(["1"]);
        let err = SourceReferenceResolver::new(&scm)
            .resolve(&mut prompt, "u", "1.0")
            .unwrap_err();
        assert!(matches!(err, ImportError::NoCandidates { ref what } if what == "branches"));
    }
}
