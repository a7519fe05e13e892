//! Generated configuration fragments
//!
//! Two files in the operator's config checkout are patched:
//!
//! - `upstream_sources.yml` gets one upstream record appended.
//! - `build-config.yaml` gets a version pin in its `#!` header block and a
//!   build entry right under `builds:`.
//!
//! Both files must already exist. A target missing its `#!` block or its
//! `builds:` key is left without the corresponding insertion; the rest of
//! the file is rewritten unchanged.

use crate::error::{ImportError, Result};
use crate::resolver::ResolvedReference;
use pnc_types::{Build, BuildConfiguration};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const UPSTREAM_SOURCES_FILE: &str = "upstream_sources.yml";
pub const BUILD_CONFIG_FILE: &str = "build-config.yaml";

const PIN_PREFIX: &str = "#!";
const BUILDS_KEY: &str = "builds:";

/// Template variable naming a pinned revision: `foo-bar-1.0` → `foo-bar-version`.
pub fn versioned_name(name: &str) -> String {
    match name.rfind('-') {
        Some(pos) => format!("{}-version", &name[..pos]),
        None => format!("{}-version", name),
    }
}

pub fn render_upstream_source(reference: &ResolvedReference, external_url: &str) -> String {
    format!(
        "- automerge: 'yes'\n  branch: {}\n  commit: {}\n  dest_formats:\n    branch:\n      gen_source_repos: true\n  update_policy:\n  - tagged\n  url: {}\n",
        reference.branch, reference.commit, external_url
    )
}

// ============================================================================
// BUILD BLOCK
// ============================================================================

/// Build entry inserted under `builds:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildBlock {
    pub versioned_name: String,
    pub project: String,
    pub scm_url: String,
    pub build_script: String,
    pub build_type: String,
    /// Only set when the build ran on a non-default image
    pub system_image_id: Option<String>,
    /// Versioned names of dependency configurations
    pub dependencies: Vec<String>,
}

impl BuildBlock {
    pub fn new(build: &Build, config: &BuildConfiguration, default_system_image: &str) -> Self {
        let project = if config.project.name.is_empty() {
            build.project.name.clone()
        } else {
            config.project.name.clone()
        };

        let system_image_id = build
            .environment
            .system_image_id
            .clone()
            .filter(|id| id != default_system_image);

        Self {
            versioned_name: versioned_name(&config.name),
            project,
            scm_url: build.scm_repository.external_url.clone(),
            build_script: build.build_config_revision.build_script.clone(),
            build_type: build.build_config_revision.build_type.clone(),
            system_image_id,
            dependencies: config
                .dependencies
                .values()
                .map(|dep| versioned_name(&dep.name))
                .collect(),
        }
    }

    /// `#!<versioned-name>=<tag>`
    pub fn pin_line(&self, tag: &str) -> String {
        format!("{}{}={}", PIN_PREFIX, self.versioned_name, tag)
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("  - name: \"{{{{ {} }}}}\"", self.versioned_name),
            format!("    project: {}", self.project),
            format!("    scmUrl: {}", self.scm_url),
            format!("    scmRevision: \"{{{{ {} }}}}\"", self.versioned_name),
            format!("    buildScript: {}", self.build_script),
            format!("    buildType: {}", self.build_type),
        ];
        if let Some(image) = &self.system_image_id {
            lines.push(format!("    systemImageId: {}", image));
        }
        if !self.dependencies.is_empty() {
            lines.push("    dependencies:".to_string());
            for dep in &self.dependencies {
                lines.push(format!("    - {{{{ \"{}\" }}}}", dep));
            }
        }
        lines
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    BeforePins,
    InPins,
    BeforeBuilds,
    Done,
}

/// Insert the version pin after the first `#!` block and the build entry
/// after the first `builds:` line that follows it.
pub fn insert_build_config(lines: Vec<String>, block: &BuildBlock, tag: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len() + 16);
    let mut scan = Scan::BeforePins;

    for line in lines {
        if scan == Scan::InPins && !line.starts_with(PIN_PREFIX) {
            out.push(block.pin_line(tag));
            scan = Scan::BeforeBuilds;
        }

        let is_builds = line == BUILDS_KEY;
        let starts_pins = line.starts_with(PIN_PREFIX);
        out.push(line);

        match scan {
            Scan::BeforePins if starts_pins => scan = Scan::InPins,
            Scan::BeforeBuilds if is_builds => {
                out.extend(block.lines());
                scan = Scan::Done;
            }
            _ => {}
        }
    }

    if scan != Scan::Done {
        tracing::warn!(?scan, "build config is missing an insertion marker");
    }
    out
}

// ============================================================================
// WRITER
// ============================================================================

pub struct ConfigFragmentWriter {
    base_dir: PathBuf,
}

impl ConfigFragmentWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn upstream_sources_path(&self) -> PathBuf {
        self.base_dir.join(UPSTREAM_SOURCES_FILE)
    }

    pub fn build_config_path(&self) -> PathBuf {
        self.base_dir.join(BUILD_CONFIG_FILE)
    }

    /// Patch both files, or neither.
    ///
    /// Both files are opened for writing before either is modified. If the
    /// build config cannot be rewritten, the upstream record is truncated
    /// off again.
    pub fn write(
        &self,
        reference: &ResolvedReference,
        external_url: &str,
        block: &BuildBlock,
    ) -> Result<()> {
        let upstream_path = self.upstream_sources_path();
        let build_config_path = self.build_config_path();

        let mut build_config = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&build_config_path)
            .map_err(|e| ImportError::io(&build_config_path, e))?;
        let existing = read_lines(&mut build_config, &build_config_path)?;

        let mut upstream = OpenOptions::new()
            .append(true)
            .open(&upstream_path)
            .map_err(|e| ImportError::io(&upstream_path, e))?;
        let upstream_len = upstream
            .metadata()
            .map_err(|e| ImportError::io(&upstream_path, e))?
            .len();

        let updated = insert_build_config(existing, block, &reference.tag);

        upstream
            .write_all(render_upstream_source(reference, external_url).as_bytes())
            .map_err(|e| ImportError::io(&upstream_path, e))?;
        tracing::info!(path = %upstream_path.display(), "appended upstream source");

        if let Err(e) = write_lines(&mut build_config, &updated) {
            if let Err(rollback) = upstream.set_len(upstream_len) {
                tracing::error!(
                    path = %upstream_path.display(),
                    error = %rollback,
                    "could not remove appended upstream source"
                );
            }
            return Err(ImportError::io(&build_config_path, e));
        }
        tracing::info!(path = %build_config_path.display(), "updated build config");
        Ok(())
    }
}

fn read_lines(file: &mut File, path: &Path) -> Result<Vec<String>> {
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| ImportError::io(path, e))?;
    Ok(content.lines().map(String::from).collect())
}

fn write_lines(file: &mut File, lines: &[String]) -> io::Result<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    file.seek(SeekFrom::Start(0))?;
    file.write_all(content.as_bytes())?;
    file.set_len(content.len() as u64)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn block() -> BuildBlock {
        BuildBlock {
            versioned_name: "foo-version".into(),
            project: "foo".into(),
            scm_url: "https://github.com/x/foo.git".into(),
            build_script: "mvn deploy".into(),
            build_type: "MVN".into(),
            system_image_id: None,
            dependencies: vec![],
        }
    }

    #[test]
    fn test_versioned_name() {
        assert_eq!(versioned_name("foo-bar-1.0"), "foo-bar-version");
        assert_eq!(versioned_name("foo"), "foo-version");
        assert_eq!(versioned_name("-x"), "-version");
    }

    #[test]
    fn test_upstream_source_layout() {
        let reference = ResolvedReference {
            tag: "1.2".into(),
            commit: "0123abcd".into(),
            branch: "main".into(),
        };
        assert_eq!(
            render_upstream_source(&reference, "https://github.com/x/foo.git"),
            "- automerge: 'yes'\n\
             \x20 branch: main\n\
             \x20 commit: 0123abcd\n\
             \x20 dest_formats:\n\
             \x20   branch:\n\
             \x20     gen_source_repos: true\n\
             \x20 update_policy:\n\
             \x20 - tagged\n\
             \x20 url: https://github.com/x/foo.git\n"
        );
    }

    #[test]
    fn test_pin_and_block_inserted() {
        let input = lines(&["#!existing=1.0", "other:", "builds:"]);
        let output = insert_build_config(input, &block(), "1.2");
        assert_eq!(
            output,
            lines(&[
                "#!existing=1.0",
                "#!foo-version=1.2",
                "other:",
                "builds:",
                "  - name: \"{{ foo-version }}\"",
                "    project: foo",
                "    scmUrl: https://github.com/x/foo.git",
                "    scmRevision: \"{{ foo-version }}\"",
                "    buildScript: mvn deploy",
                "    buildType: MVN",
            ])
        );
    }

    #[test]
    fn test_builds_directly_after_pins() {
        let input = lines(&["#!a=1", "builds:", "  - name: old"]);
        let output = insert_build_config(input.clone(), &block(), "2.0");

        assert_eq!(output.iter().filter(|l| l.as_str() == "#!foo-version=2.0").count(), 1);
        assert_eq!(output.iter().filter(|l| l.contains("{{ foo-version }}\"")).count(), 2);
        assert_eq!(output[1], "#!foo-version=2.0");
        assert_eq!(output[2], "builds:");
        assert_eq!(output.last().unwrap(), "  - name: old");

        // pure function of its inputs
        assert_eq!(insert_build_config(input, &block(), "2.0"), output);
    }

    #[test]
    fn test_lines_before_pins_pass_through() {
        let input = lines(&["product: x", "#!a=1", "#!b=2", "", "builds:", "builds:"]);
        let output = insert_build_config(input, &block(), "3");
        assert_eq!(output[0], "product: x");
        assert_eq!(output[3], "#!foo-version=3");
        assert_eq!(output[4], "");
        // only the first builds: is treated
        assert_eq!(output.iter().filter(|l| l.as_str() == "builds:").count(), 2);
        assert_eq!(output.last().unwrap(), "builds:");
    }

    #[test]
    fn test_missing_markers_leave_file_untouched() {
        let input = lines(&["product: x", "builds:"]);
        assert_eq!(insert_build_config(input.clone(), &block(), "1"), input);

        // pins but no builds key: only the pin lands
        let input = lines(&["#!a=1", "other:"]);
        assert_eq!(
            insert_build_config(input, &block(), "1"),
            lines(&["#!a=1", "#!foo-version=1", "other:"])
        );
    }

    #[test]
    fn test_pin_block_at_end_of_file_gets_no_pin() {
        let input = lines(&["x: 1", "#!a=1"]);
        assert_eq!(insert_build_config(input.clone(), &block(), "1"), input);
    }

    #[test]
    fn test_optional_image_and_dependencies() {
        let mut b = block();
        b.system_image_id = Some("builder:2.0".into());
        b.dependencies = vec!["bar-version".into(), "baz-version".into()];
        let block_lines = b.lines();
        assert_eq!(
            &block_lines[6..],
            &lines(&[
                "    systemImageId: builder:2.0",
                "    dependencies:",
                "    - {{ \"bar-version\" }}",
                "    - {{ \"baz-version\" }}",
            ])[..]
        );
    }

    #[test]
    fn test_build_block_from_records() {
        use pnc_types::{BuildConfigRevision, BuildConfigurationRef, Environment, ProjectRef, ScmRepository};

        let build = Build {
            id: "B".into(),
            scm_tag: "1.0".into(),
            scm_revision: Some("abc".into()),
            scm_repository: ScmRepository {
                external_url: "https://github.com/x/foo.git".into(),
                pre_build_sync_enabled: Some(true),
                ..Default::default()
            },
            build_config_revision: BuildConfigRevision {
                id: "42".into(),
                build_script: "mvn deploy".into(),
                build_type: "MVN".into(),
                ..Default::default()
            },
            project: ProjectRef {
                name: "build-project".into(),
                ..Default::default()
            },
            environment: Environment {
                system_image_id: Some("default:1".into()),
                ..Default::default()
            },
        };
        let mut config = BuildConfiguration {
            id: "42".into(),
            name: "foo-1.0".into(),
            description: None,
            build_script: None,
            project: ProjectRef {
                name: "config-project".into(),
                ..Default::default()
            },
            dependencies: Default::default(),
        };
        config.dependencies.insert(
            "7",
            BuildConfigurationRef {
                id: "7".into(),
                name: "bar-2.1".into(),
                ..Default::default()
            },
        );

        let block = BuildBlock::new(&build, &config, "default:1");
        assert_eq!(block.versioned_name, "foo-version");
        assert_eq!(block.project, "config-project");
        assert_eq!(block.system_image_id, None);
        assert_eq!(block.dependencies, vec!["bar-version".to_string()]);

        let block = BuildBlock::new(&build, &config, "other:9");
        assert_eq!(block.system_image_id.as_deref(), Some("default:1"));

        // dependency lines follow the mapping order, not the id order
        config.dependencies.insert(
            "10".to_string(),
            BuildConfigurationRef {
                id: "10".into(),
                name: "baz-3.0".into(),
                ..Default::default()
            },
        );
        config.dependencies.insert(
            "9".to_string(),
            BuildConfigurationRef {
                id: "9".into(),
                name: "qux-0.1".into(),
                ..Default::default()
            },
        );
        let block = BuildBlock::new(&build, &config, "default:1");
        assert_eq!(
            block.dependencies,
            vec!["bar-version", "baz-version", "qux-version"]
        );
    }

    #[test]
    fn test_writer_patches_both_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(UPSTREAM_SOURCES_FILE), "- existing: true\n").unwrap();
        fs::write(dir.path().join(BUILD_CONFIG_FILE), "#!a=1\nbuilds:\n").unwrap();

        let reference = ResolvedReference {
            tag: "1.2".into(),
            commit: "c0ffee".into(),
            branch: "main".into(),
        };
        let writer = ConfigFragmentWriter::new(dir.path());
        writer
            .write(&reference, "https://github.com/x/foo.git", &block())
            .unwrap();

        let upstream = fs::read_to_string(writer.upstream_sources_path()).unwrap();
        assert!(upstream.starts_with("- existing: true\n- automerge: 'yes'\n"));
        assert!(upstream.ends_with("  url: https://github.com/x/foo.git\n"));

        let build_config = fs::read_to_string(writer.build_config_path()).unwrap();
        assert!(build_config.starts_with("#!a=1\n#!foo-version=1.2\nbuilds:\n  - name: \"{{ foo-version }}\"\n"));
        assert!(build_config.ends_with("    buildType: MVN\n"));
    }

    #[test]
    fn test_writer_touches_nothing_when_a_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(UPSTREAM_SOURCES_FILE), "").unwrap();

        let reference = ResolvedReference {
            tag: "1".into(),
            commit: "c".into(),
            branch: "b".into(),
        };
        let writer = ConfigFragmentWriter::new(dir.path());
        let err = writer.write(&reference, "u", &block()).unwrap_err();

        assert!(matches!(err, ImportError::Io { .. }));
        assert_eq!(fs::read_to_string(writer.upstream_sources_path()).unwrap(), "");
    }

    fn reference() -> ResolvedReference {
        ResolvedReference {
            tag: "1".into(),
            commit: "c".into(),
            branch: "b".into(),
        }
    }

    #[test]
    fn test_writer_touches_nothing_when_build_config_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(UPSTREAM_SOURCES_FILE), "- existing: true\n").unwrap();
        fs::create_dir(dir.path().join(BUILD_CONFIG_FILE)).unwrap();

        let writer = ConfigFragmentWriter::new(dir.path());
        let err = writer.write(&reference(), "u", &block()).unwrap_err();

        assert!(matches!(err, ImportError::Io { ref path, .. } if path.ends_with(BUILD_CONFIG_FILE)));
        assert_eq!(
            fs::read_to_string(writer.upstream_sources_path()).unwrap(),
            "- existing: true\n"
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_writer_leaves_upstream_unchanged_when_build_config_is_read_only() {
        // procfs entries can be read but never rewritten, even by root
        let proc_version = Path::new("/proc/version");
        if !proc_version.exists() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(UPSTREAM_SOURCES_FILE), "").unwrap();
        std::os::unix::fs::symlink(proc_version, dir.path().join(BUILD_CONFIG_FILE)).unwrap();

        let writer = ConfigFragmentWriter::new(dir.path());
        let err = writer.write(&reference(), "u", &block()).unwrap_err();

        assert!(matches!(err, ImportError::Io { .. }));
        assert_eq!(fs::read_to_string(writer.upstream_sources_path()).unwrap(), "");
    }
}
