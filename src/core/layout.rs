//! Project filesystem layout
//!
//! The three roots every artifact action works against, plus the directory
//! helpers that report what they do.

use std::path::{Path, PathBuf};

use crate::config::defaults::{BUILD_DIR, CONF_DIR};
use crate::core::identity::Identity;
use crate::core::reporter::EventSink;
use crate::error::{FilesystemError, ProjectError};
use crate::infra::filesystem;

/// Root, build and conf directories of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    name: String,
    root: PathBuf,
    build: PathBuf,
    conf: PathBuf,
}

impl Layout {
    /// Layout rooted at an existing directory, named after that directory
    pub fn new(root: &Path) -> Result<Self, ProjectError> {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::named(root, name)
    }

    /// Layout rooted at an existing directory with an explicit project name
    pub fn named(root: &Path, name: impl Into<String>) -> Result<Self, ProjectError> {
        if !root.exists() {
            return Err(ProjectError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        Ok(Self {
            name: name.into(),
            root: root.to_path_buf(),
            build: root.join(BUILD_DIR),
            conf: root.join(CONF_DIR),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output directory for jars, classes and native libraries
    pub fn build(&self) -> &Path {
        &self.build
    }

    /// Configuration directory holding probe caches
    pub fn conf(&self) -> &Path {
        &self.conf
    }

    /// Create `path` and its parents if absent
    pub fn mkdir(&self, path: &Path) -> Result<(), FilesystemError> {
        if path.exists() {
            return Ok(());
        }
        filesystem::create_dir_all(path)
    }

    /// Delete `path` if present, without recreating it
    pub fn rmdir(&self, path: &Path) -> Result<(), FilesystemError> {
        filesystem::remove_all(path)
    }

    /// Delete the tree at `path` and recreate it empty, reporting both steps
    ///
    /// Nothing happens when `path` does not exist.
    pub fn clean_path(
        &self,
        sink: &dyn EventSink,
        origin: Option<&Identity>,
        path: &Path,
    ) -> Result<(), FilesystemError> {
        if !path.exists() {
            return Ok(());
        }
        filesystem::remove_all(path)?;
        sink.command(origin, &format!("rm -rf {}", path.display()));
        filesystem::create_dir_all(path)?;
        sink.command(origin, &format!("mkdir -p {}", path.display()));
        Ok(())
    }
}
