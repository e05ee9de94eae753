//! Dependency nodes and their capabilities
//!
//! A [`Dependency`] is an immutable graph node: an [`Identity`], the nodes it
//! depends on, and an explicit set of capabilities. The scheduler asks a node
//! for a capability (`as_buildable`, `is_available`, ...) rather than
//! inspecting its concrete type.
//!
//! Nodes are shared through [`DependencyRef`]; the same node may be a
//! dependency of many artifacts, and two separately constructed nodes are
//! distinct even when their identities are equal.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::identity::Identity;
use crate::core::layout::Layout;
use crate::core::reporter::EventSink;
use crate::error::{ActionError, FilesystemError};
use crate::infra::process::{command_line, ProcessOutput, ProcessRunner};

/// Shared handle to a dependency node
pub type DependencyRef = Arc<Dependency>;

/// Outcome of a build, clean or run action
pub type ActionResult = Result<(), ActionError>;

/// Something with a build step
pub trait Buildable: Send + Sync {
    fn build(&self, ctx: &ActionContext<'_>) -> ActionResult;

    fn clean(&self, ctx: &ActionContext<'_>) -> ActionResult;

    /// Paths this artifact writes; `clean` removes exactly these
    fn generated_paths(&self, _ctx: &ActionContext<'_>) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Something whose presence depends on the host
///
/// Availability is decided when the implementation is constructed and does
/// not change afterwards.
pub trait Optional: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Archive that can launch an entry point
pub trait ExecutableArchive: Send + Sync {
    /// Run `entry_point` with a classpath built from `ordered` (dependencies
    /// first, this artifact last) and pass `args` through
    fn run(
        &self,
        ctx: &ActionContext<'_>,
        entry_point: &str,
        ordered: &[DependencyRef],
        args: &[String],
    ) -> ActionResult;

    /// Archive file contributed to a classpath
    fn archive_path(&self, layout: &Layout, id: &Identity) -> PathBuf;

    /// Entry point used when the caller does not name one
    fn entry_point(&self) -> Option<&str> {
        None
    }
}

/// Immutable dependency graph node
pub struct Dependency {
    id: Identity,
    dependencies: Vec<DependencyRef>,
    buildable: Option<Box<dyn Buildable>>,
    optional: Option<Box<dyn Optional>>,
    archive: Option<Box<dyn ExecutableArchive>>,
}

impl Dependency {
    /// Start describing a node for `id`
    pub fn builder(id: Identity) -> DependencyBuilder {
        DependencyBuilder {
            node: Self {
                id,
                dependencies: Vec::new(),
                buildable: None,
                optional: None,
                archive: None,
            },
        }
    }

    pub fn id(&self) -> &Identity {
        &self.id
    }

    /// Direct dependencies in declaration order
    pub fn dependencies(&self) -> &[DependencyRef] {
        &self.dependencies
    }

    pub fn has_path(&self) -> bool {
        self.id.path().is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.id.path()
    }

    pub fn as_buildable(&self) -> Option<&dyn Buildable> {
        self.buildable.as_deref()
    }

    pub fn is_buildable(&self) -> bool {
        self.buildable.is_some()
    }

    pub fn is_optional(&self) -> bool {
        self.optional.is_some()
    }

    /// False only for optional nodes reporting themselves unavailable
    pub fn is_available(&self) -> bool {
        self.optional.as_ref().map_or(true, |o| o.is_available())
    }

    pub fn as_archive(&self) -> Option<&dyn ExecutableArchive> {
        self.archive.as_deref()
    }

    /// Only runnable archives can be executed
    pub fn is_executable(&self) -> bool {
        self.archive.is_some()
    }

    /// Capability names, for display
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut caps = Vec::new();
        if self.has_path() {
            caps.push("path");
        }
        if self.is_buildable() {
            caps.push("buildable");
        }
        if self.is_executable() {
            caps.push("executable");
        }
        if self.archive.is_some() {
            caps.push("runnable-archive");
        }
        if self.is_optional() {
            caps.push("optional");
        }
        caps
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("id", &self.id.relative_name())
            .field(
                "dependencies",
                &self
                    .dependencies
                    .iter()
                    .map(|d| d.id.relative_name())
                    .collect::<Vec<_>>(),
            )
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Builder for [`Dependency`]; nodes are frozen by [`DependencyBuilder::finish`]
pub struct DependencyBuilder {
    node: Dependency,
}

impl DependencyBuilder {
    /// Add direct dependencies; a node already present is not added twice
    #[must_use]
    pub fn depends_on<I>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = DependencyRef>,
    {
        for dep in deps {
            if !self.node.dependencies.iter().any(|d| Arc::ptr_eq(d, &dep)) {
                self.node.dependencies.push(dep);
            }
        }
        self
    }

    #[must_use]
    pub fn buildable(mut self, buildable: impl Buildable + 'static) -> Self {
        self.node.buildable = Some(Box::new(buildable));
        self
    }

    #[must_use]
    pub fn optional(mut self, optional: impl Optional + 'static) -> Self {
        self.node.optional = Some(Box::new(optional));
        self
    }

    #[must_use]
    pub fn archive(mut self, archive: impl ExecutableArchive + 'static) -> Self {
        self.node.archive = Some(Box::new(archive));
        self
    }

    pub fn finish(self) -> DependencyRef {
        Arc::new(self.node)
    }
}

/// Everything an action may touch while running for one node
pub struct ActionContext<'a> {
    pub node: &'a Dependency,
    pub layout: &'a Layout,
    pub sink: &'a dyn EventSink,
    pub runner: &'a ProcessRunner,
}

impl ActionContext<'_> {
    pub fn id(&self) -> &Identity {
        self.node.id()
    }

    /// Attribute a filesystem failure to this node
    pub fn fs_error(&self, source: FilesystemError) -> ActionError {
        ActionError::Filesystem {
            artifact: self.id().relative_name().to_string(),
            source,
        }
    }

    /// Configuration problem attributed to this node
    pub fn invalid(&self, message: impl Into<String>) -> ActionError {
        ActionError::Invalid {
            artifact: self.id().relative_name().to_string(),
            message: message.into(),
        }
    }

    pub fn mkdir(&self, path: &Path) -> ActionResult {
        self.layout.mkdir(path).map_err(|e| self.fs_error(e))
    }

    /// Delete and recreate `path`, reported against this node
    pub fn clean_path(&self, path: &Path) -> ActionResult {
        self.layout
            .clean_path(self.sink, Some(self.id()), path)
            .map_err(|e| self.fs_error(e))
    }

    /// Remove a generated file or tree, reported against this node
    pub fn remove_path(&self, path: &Path) -> ActionResult {
        if !path.exists() {
            return Ok(());
        }
        self.layout.rmdir(path).map_err(|e| self.fs_error(e))?;
        self.sink
            .command(Some(self.id()), &format!("rm -rf {}", path.display()));
        Ok(())
    }

    /// Run an external tool for this node
    ///
    /// The command line is echoed on the command channel and every output
    /// line is forwarded to `on_line`. A non-zero exit is returned as
    /// [`ActionError::Process`]; reporting it is left to the caller.
    pub fn exec_with<F>(
        &self,
        dir: &Path,
        argv: &[String],
        mut on_line: F,
    ) -> Result<ProcessOutput, ActionError>
    where
        F: FnMut(&str),
    {
        let command = command_line(argv);
        self.sink.command(Some(self.id()), &command);

        self.runner
            .run_streaming(dir, argv, |line| on_line(line))
            .and_then(|output| output.check(&command))
            .map_err(|source| ActionError::Process {
                artifact: self.id().relative_name().to_string(),
                source,
            })
    }

    /// [`ActionContext::exec_with`] forwarding output to the info channel
    pub fn exec(&self, dir: &Path, argv: &[String]) -> Result<ProcessOutput, ActionError> {
        self.exec_with(dir, argv, |line| self.sink.info(Some(self.id()), line))
    }
}
