//! Artifact identity resolution
//!
//! Turns a short hyphen-joined artifact name such as `backend-ffi-opencl` or
//! `core-1.2` into an [`Identity`] bound to a directory of the project.
//!
//! Resolution rules:
//!
//! - a trailing `major.minor` token is the version, otherwise `1.0`
//! - the first segment names a directory of the root, literally or with an
//!   `s` appended (`backend` finds `backends/`)
//! - the remaining segments are a sub path of that directory and must exist
//! - a single segment with no matching directory has no path at all, which is
//!   how marker artifacts like `mac` are named
//! - without a sub path the short name is the whole requested name, version
//!   included

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::config::defaults::DEFAULT_ARTIFACT_VERSION;
use crate::error::IdentityError;

/// Fully qualified, path-bound identity of one artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    project: String,
    full_name: String,
    relative_name: String,
    base_name: String,
    short_name: String,
    version: String,
    path: Option<PathBuf>,
}

impl Identity {
    /// Name of the owning project
    pub fn project(&self) -> &str {
        &self.project
    }

    /// `<project>-<name>-<version>`, used for output file names
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The name the artifact was requested by
    pub fn relative_name(&self) -> &str {
        &self.relative_name
    }

    /// The requested name without its version suffix
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Registry key and generated-file stem
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Source directory, absent for virtual artifacts
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative_name)
    }
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+$").expect("valid version pattern"))
}

/// Split a trailing version token off `name`
fn split_version(name: &str) -> (&str, &str) {
    match name.rsplit_once('-') {
        Some((base, last)) if !base.is_empty() && version_pattern().is_match(last) => (base, last),
        _ => (name, DEFAULT_ARTIFACT_VERSION),
    }
}

/// Find `root/<segment>` or, failing that, `root/<segment>s`
fn resolve_base_dir(root: &Path, segment: &str) -> Option<PathBuf> {
    let literal = root.join(segment);
    if literal.is_dir() {
        return Some(literal);
    }
    let plural = root.join(format!("{segment}s"));
    plural.is_dir().then_some(plural)
}

/// Resolve `relative` against `root` for the project named `project`
pub fn resolve(root: &Path, project: &str, relative: &str) -> Result<Identity, IdentityError> {
    if relative.is_empty() {
        return Err(IdentityError::Empty);
    }

    let (base, version) = split_version(relative);
    let segments: Vec<&str> = base.split('-').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(IdentityError::EmptySegment {
            name: relative.to_string(),
        });
    }
    let base_dir = resolve_base_dir(root, segments[0]);

    let (short_name, path) = match base_dir {
        Some(dir) if segments.len() > 1 => {
            let tail = &segments[1..];
            let expected = dir.join(tail.join("/"));
            if !expected.is_dir() {
                return Err(IdentityError::MissingSubpath {
                    name: relative.to_string(),
                    path: expected,
                });
            }
            (tail.join("-"), Some(expected))
        }
        dir => (relative.to_string(), dir),
    };

    tracing::trace!(
        relative,
        short = %short_name,
        version,
        path = ?path,
        "resolved artifact identity"
    );

    Ok(Identity {
        project: project.to_string(),
        full_name: format!("{project}-{base}-{version}"),
        relative_name: relative.to_string(),
        base_name: base.to_string(),
        short_name,
        version: version.to_string(),
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root_with(dirs: &[&str]) -> TempDir {
        let root = TempDir::new().unwrap();
        for dir in dirs {
            std::fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        root
    }

    #[test]
    fn test_versioned_two_segment_name() {
        let root = root_with(&["a/b"]);
        let id = resolve(root.path(), "proj", "a-b-1.0").unwrap();

        assert_eq!(id.version(), "1.0");
        assert_eq!(id.short_name(), "b");
        assert_eq!(id.path(), Some(root.path().join("a/b").as_path()));
        assert_eq!(id.relative_name(), "a-b-1.0");
        assert_eq!(id.base_name(), "a-b");
        assert_eq!(id.full_name(), "proj-a-b-1.0");
    }

    #[test]
    fn test_unknown_single_word_has_no_path() {
        let root = root_with(&[]);
        let id = resolve(root.path(), "proj", "a").unwrap();

        assert_eq!(id.short_name(), "a");
        assert!(id.path().is_none());
        assert_eq!(id.version(), DEFAULT_ARTIFACT_VERSION);
    }

    #[test]
    fn test_pluralized_first_segment() {
        let root = root_with(&["backends/x"]);
        let id = resolve(root.path(), "proj", "backend-x").unwrap();

        assert_eq!(id.short_name(), "x");
        assert_eq!(id.path(), Some(root.path().join("backends/x").as_path()));
    }

    #[test]
    fn test_literal_directory_wins_over_plural() {
        let root = root_with(&["backend/x", "backends/x"]);
        let id = resolve(root.path(), "proj", "backend-x").unwrap();
        assert_eq!(id.path(), Some(root.path().join("backend/x").as_path()));
    }

    #[test]
    fn test_deep_name_joins_tail_segments() {
        let root = root_with(&["backends/ffi/opencl"]);
        let id = resolve(root.path(), "hat", "backend-ffi-opencl").unwrap();

        assert_eq!(id.short_name(), "ffi-opencl");
        assert_eq!(
            id.path(),
            Some(root.path().join("backends/ffi/opencl").as_path())
        );
        assert_eq!(id.full_name(), "hat-backend-ffi-opencl-1.0");
    }

    #[test]
    fn test_missing_subpath_is_fatal() {
        let root = root_with(&["backends"]);
        let err = resolve(root.path(), "proj", "backend-nope").unwrap_err();
        assert_eq!(
            err,
            IdentityError::MissingSubpath {
                name: "backend-nope".into(),
                path: root.path().join("backends/nope"),
            }
        );
    }

    #[test]
    fn test_single_existing_directory() {
        let root = root_with(&["core"]);
        let id = resolve(root.path(), "proj", "core-2.3").unwrap();

        assert_eq!(id.short_name(), "core-2.3");
        assert_eq!(id.base_name(), "core");
        assert_eq!(id.version(), "2.3");
        assert_eq!(id.path(), Some(root.path().join("core").as_path()));
    }

    #[test]
    fn test_versioned_marker_keeps_version_in_short_name() {
        let root = root_with(&[]);
        let id = resolve(root.path(), "proj", "mac-1.0").unwrap();

        assert_eq!(id.short_name(), "mac-1.0");
        assert_eq!(id.base_name(), "mac");
        assert_eq!(id.full_name(), "proj-mac-1.0");
        assert!(id.path().is_none());
    }

    #[test]
    fn test_empty_segments_rejected() {
        let root = root_with(&["core"]);
        for name in ["core-", "-core", "core--x", "-"] {
            assert_eq!(
                resolve(root.path(), "proj", name),
                Err(IdentityError::EmptySegment { name: name.into() }),
                "{name}"
            );
        }
    }

    #[test]
    fn test_multi_segment_without_base_dir_keeps_full_name() {
        let root = root_with(&[]);
        let id = resolve(root.path(), "proj", "cmake-info").unwrap();
        assert_eq!(id.short_name(), "cmake-info");
        assert!(id.path().is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        let root = root_with(&[]);
        assert_eq!(resolve(root.path(), "proj", ""), Err(IdentityError::Empty));
    }

    #[test]
    fn test_non_numeric_suffix_is_not_a_version() {
        let root = root_with(&[]);
        let id = resolve(root.path(), "proj", "lib-x1y2").unwrap();
        assert_eq!(id.version(), "1.0");
        assert_eq!(id.short_name(), "lib-x1y2");
    }

    #[test]
    fn test_bare_version_is_a_name() {
        let root = root_with(&[]);
        let id = resolve(root.path(), "proj", "2.0").unwrap();
        assert_eq!(id.short_name(), "2.0");
        assert_eq!(id.version(), "1.0");
    }

    #[test]
    fn test_case_is_not_normalized() {
        let root = root_with(&["core"]);
        let id = resolve(root.path(), "proj", "Core").unwrap();
        // On case-insensitive filesystems the directory may still match.
        assert_eq!(id.short_name(), "Core");
    }
}
