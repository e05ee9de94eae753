//! Project registry and build orchestration
//!
//! A [`Project`] owns the artifact namespace, the filesystem layout and the
//! event sink. `build`, `clean` and `run` expand the requested artifacts,
//! order them, and invoke each node's action in that order on the calling
//! thread.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::defaults::DEFAULT_MAIN_CLASS;
use crate::core::dependency::{
    ActionContext, ActionResult, Buildable, Dependency, DependencyRef,
};
use crate::core::graph::{partition_available, Graph};
use crate::core::identity::{self, Identity};
use crate::core::layout::Layout;
use crate::core::reporter::EventSink;
use crate::error::{BldError, GraphError, IdentityError, ProjectError};
use crate::infra::process::ProcessRunner;

/// How a batch reacts to a failed action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Continue with artifacts that do not depend on a failed one
    pub keep_going: bool,
}

/// Ordered artifacts for one build request
#[derive(Debug, Clone)]
pub struct Plan {
    /// Artifacts that will be visited, dependencies first
    pub order: Vec<DependencyRef>,
    /// Artifacts excluded because an optional dependency is unavailable
    pub skipped: Vec<DependencyRef>,
}

/// Artifact registry for one project root
pub struct Project {
    layout: Layout,
    artifacts: IndexMap<String, DependencyRef>,
    sink: Box<dyn EventSink>,
    runner: ProcessRunner,
    options: BuildOptions,
}

impl Project {
    /// Project rooted at `root`, named after the directory
    pub fn new(root: &Path, sink: Box<dyn EventSink>) -> Result<Self, ProjectError> {
        Ok(Self::with_layout(Layout::new(root)?, sink))
    }

    pub fn with_layout(layout: Layout, sink: Box<dyn EventSink>) -> Self {
        Self {
            layout,
            artifacts: IndexMap::new(),
            sink,
            runner: ProcessRunner::new(),
            options: BuildOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn name(&self) -> &str {
        self.layout.name()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn root_path(&self) -> &Path {
        self.layout.root()
    }

    pub fn build_path(&self) -> &Path {
        self.layout.build()
    }

    pub fn conf_path(&self) -> &Path {
        self.layout.conf()
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    /// Resolve a project-relative name against this project's root
    pub fn id(&self, relative: &str) -> Result<Identity, IdentityError> {
        identity::resolve(self.layout.root(), self.layout.name(), relative)
    }

    /// Register `node` under its short name, replacing any previous entry
    pub fn register(&mut self, node: DependencyRef) -> DependencyRef {
        let key = node.id().short_name().to_string();
        if self.artifacts.insert(key.clone(), node.clone()).is_some() {
            tracing::warn!(artifact = %key, "replacing registered artifact");
        }
        node
    }

    pub fn get(&self, short_name: &str) -> Option<&DependencyRef> {
        self.artifacts.get(short_name)
    }

    /// Look up by short name, then by relative name with or without version
    pub fn resolve(&self, name: &str) -> Result<DependencyRef, ProjectError> {
        self.get(name)
            .or_else(|| {
                self.artifacts.values().find(|d| {
                    d.id().relative_name() == name || d.id().base_name() == name
                })
            })
            .cloned()
            .ok_or_else(|| ProjectError::UnknownArtifact {
                name: name.to_string(),
            })
    }

    pub fn resolve_all<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<DependencyRef>, ProjectError> {
        names.iter().map(|n| self.resolve(n.as_ref())).collect()
    }

    /// Registered artifacts in registration order
    pub fn artifacts(&self) -> impl Iterator<Item = &DependencyRef> {
        self.artifacts.values()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// `requests`, or every registered artifact when empty
    fn roots(&self, requests: &[DependencyRef]) -> Vec<DependencyRef> {
        if requests.is_empty() {
            self.artifacts.values().cloned().collect()
        } else {
            requests.to_vec()
        }
    }

    /// Dependency graph of `requests` (all artifacts when empty)
    pub fn graph(&self, requests: &[DependencyRef]) -> Result<Graph<DependencyRef>, GraphError> {
        Graph::expand(self.roots(requests))
    }

    /// Ordered, availability-pruned artifacts for `requests`
    pub fn plan(&self, requests: &[DependencyRef]) -> Result<Plan, GraphError> {
        let order = self.graph(requests)?.order();
        let (order, skipped) = partition_available(&order);
        Ok(Plan { order, skipped })
    }

    /// Build `requests` and their dependencies (everything when empty)
    pub fn build(&self, requests: &[DependencyRef]) -> Result<Vec<DependencyRef>, BldError> {
        self.build_with(requests, |_| {})
    }

    /// [`Project::build`], calling `on_step` after each visited artifact
    pub fn build_with<F>(
        &self,
        requests: &[DependencyRef],
        on_step: F,
    ) -> Result<Vec<DependencyRef>, BldError>
    where
        F: FnMut(&DependencyRef),
    {
        let plan = self.plan(requests)?;
        self.report_skipped(&plan.skipped);
        self.execute(&plan.order, "build", on_step, |b, ctx| b.build(ctx))?;
        Ok(plan.order)
    }

    /// Clean `requests` and their dependencies
    ///
    /// With an empty request every artifact is cleaned and the build
    /// directory is removed afterwards.
    pub fn clean(&self, requests: &[DependencyRef]) -> Result<Vec<DependencyRef>, BldError> {
        let order = self.graph(requests)?.order();
        self.execute(&order, "clean", |_| {}, |b, ctx| b.clean(ctx))?;
        if requests.is_empty() && self.build_path().exists() {
            self.layout.rmdir(self.build_path())?;
            self.sink
                .command(None, &format!("rm -rf {}", self.build_path().display()));
        }
        Ok(order)
    }

    /// Build `backend-<backend>` and `example-<example>`, then run the example
    pub fn run(&self, backend: &str, example: &str, args: &[String]) -> Result<(), BldError> {
        let backend = self.resolve_prefixed("backend", backend)?;
        let example = self.resolve_prefixed("example", example)?;

        if !backend.is_buildable() {
            return Err(missing(&backend, "buildable").into());
        }
        let Some(archive) = example.as_archive() else {
            return Err(missing(&example, "a runnable archive").into());
        };

        let order = self.build(&[backend.clone(), example.clone()])?;
        for wanted in [&backend, &example] {
            if !order.iter().any(|d| Arc::ptr_eq(d, wanted)) {
                return Err(ProjectError::Unavailable {
                    name: wanted.id().relative_name().to_string(),
                }
                .into());
            }
        }

        let entry_point = archive.entry_point().unwrap_or(DEFAULT_MAIN_CLASS);
        let ctx = self.context(&example);
        self.sink.progress(Some(example.id()), "running");
        archive.run(&ctx, entry_point, &order, args).map_err(|err| {
            self.sink.error(Some(example.id()), &err.to_string());
            BldError::from(err)
        })
    }

    fn resolve_prefixed(&self, prefix: &str, name: &str) -> Result<DependencyRef, ProjectError> {
        self.resolve(&format!("{prefix}-{name}"))
            .or_else(|_| self.resolve(name))
    }

    /// Create `path` if absent
    pub fn mkdir(&self, path: &Path) -> Result<(), BldError> {
        Ok(self.layout.mkdir(path)?)
    }

    /// Delete and recreate `path`, attributing the report to `origin`
    pub fn clean_path(&self, origin: Option<&Dependency>, path: &Path) -> Result<(), BldError> {
        Ok(self
            .layout
            .clean_path(self.sink(), origin.map(Dependency::id), path)?)
    }

    /// Delete `path` if present
    pub fn rmdir(&self, path: &Path) -> Result<(), BldError> {
        Ok(self.layout.rmdir(path)?)
    }

    fn context<'a>(&'a self, node: &'a Dependency) -> ActionContext<'a> {
        ActionContext {
            node,
            layout: &self.layout,
            sink: self.sink.as_ref(),
            runner: &self.runner,
        }
    }

    fn report_skipped(&self, skipped: &[DependencyRef]) {
        for node in skipped {
            let reason = if node.is_available() {
                "depends on an unavailable optional artifact"
            } else {
                "not available on this host"
            };
            tracing::info!(artifact = %node.id(), "skipped: {reason}");
            self.sink
                .warning(Some(node.id()), &format!("{} skipped: {reason}", node.id()));
        }
    }

    /// Invoke `action` on every buildable node of `order`, in order
    fn execute<F, A>(
        &self,
        order: &[DependencyRef],
        verb: &str,
        mut on_step: F,
        action: A,
    ) -> Result<(), BldError>
    where
        F: FnMut(&DependencyRef),
        A: Fn(&dyn Buildable, &ActionContext<'_>) -> ActionResult,
    {
        let mut failed: HashSet<*const Dependency> = HashSet::new();
        let mut failures = Vec::new();

        for node in order {
            let Some(buildable) = node.as_buildable() else {
                tracing::trace!(artifact = %node.id(), "no {verb} step");
                on_step(node);
                continue;
            };

            if node
                .dependencies()
                .iter()
                .any(|d| failed.contains(&Arc::as_ptr(d)))
            {
                failed.insert(Arc::as_ptr(node));
                self.sink.warning(
                    Some(node.id()),
                    &format!("{} {verb} skipped: a dependency failed", node.id()),
                );
                on_step(node);
                continue;
            }

            tracing::info!(artifact = %node.id(), "{verb}");
            if let Err(err) = action(buildable, &self.context(node)) {
                self.sink
                    .error(Some(node.id()), &format!("{verb} failed: {err}"));
                if !self.options.keep_going {
                    return Err(err.into());
                }
                failed.insert(Arc::as_ptr(node));
                failures.push(node.id().relative_name().to_string());
            }
            on_step(node);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ProjectError::Failures { failures }.into())
        }
    }
}

fn missing(node: &DependencyRef, capability: &str) -> ProjectError {
    ProjectError::MissingCapability {
        name: node.id().relative_name().to_string(),
        capability: capability.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::{ExecutableArchive, Optional};
    use crate::core::reporter::{Channel, RecordingSink};
    use crate::error::ActionError;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Shared log of `<verb> <name>` entries
    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorded {
        log: Log,
        fail_build: bool,
    }

    impl Buildable for Recorded {
        fn build(&self, ctx: &ActionContext<'_>) -> ActionResult {
            self.log
                .lock()
                .unwrap()
                .push(format!("build {}", ctx.id().short_name()));
            if self.fail_build {
                return Err(ctx.invalid("synthetic failure"));
            }
            Ok(())
        }

        fn clean(&self, ctx: &ActionContext<'_>) -> ActionResult {
            self.log
                .lock()
                .unwrap()
                .push(format!("clean {}", ctx.id().short_name()));
            let out = ctx.layout.build().join(ctx.id().short_name());
            ctx.remove_path(&out)
        }
    }

    struct Fixed(bool);

    impl Optional for Fixed {
        fn is_available(&self) -> bool {
            self.0
        }
    }

    struct Runnable {
        log: Log,
    }

    impl ExecutableArchive for Runnable {
        fn run(
            &self,
            _ctx: &ActionContext<'_>,
            entry_point: &str,
            ordered: &[DependencyRef],
            args: &[String],
        ) -> ActionResult {
            let names: Vec<&str> = ordered.iter().map(|d| d.id().short_name()).collect();
            self.log.lock().unwrap().push(format!(
                "run {entry_point} [{}] {}",
                names.join(","),
                args.join(" ")
            ));
            Ok(())
        }

        fn archive_path(&self, layout: &Layout, id: &Identity) -> PathBuf {
            layout.build().join(format!("{}.jar", id.full_name()))
        }

        fn entry_point(&self) -> Option<&str> {
            Some("demo.Main")
        }
    }

    struct Fixture {
        _root: TempDir,
        project: Project,
        sink: RecordingSink,
        log: Log,
    }

    impl Fixture {
        fn new(dirs: &[&str]) -> Self {
            Self::with_options(dirs, BuildOptions::default())
        }

        fn with_options(dirs: &[&str], options: BuildOptions) -> Self {
            let root = TempDir::new().unwrap();
            for dir in dirs {
                std::fs::create_dir_all(root.path().join(dir)).unwrap();
            }
            let sink = RecordingSink::new();
            let project = Project::new(root.path(), Box::new(sink.clone()))
                .unwrap()
                .with_options(options);
            Self {
                _root: root,
                project,
                sink,
                log: Log::default(),
            }
        }

        fn add(&mut self, name: &str, deps: &[&DependencyRef]) -> DependencyRef {
            self.add_failing(name, deps, false)
        }

        fn add_failing(&mut self, name: &str, deps: &[&DependencyRef], fail: bool) -> DependencyRef {
            let node = Dependency::builder(self.project.id(name).unwrap())
                .depends_on(deps.iter().map(|d| (*d).clone()))
                .buildable(Recorded {
                    log: self.log.clone(),
                    fail_build: fail,
                })
                .finish();
            self.project.register(node)
        }

        fn add_optional(&mut self, name: &str, available: bool) -> DependencyRef {
            let node = Dependency::builder(self.project.id(name).unwrap())
                .optional(Fixed(available))
                .finish();
            self.project.register(node)
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut fx = Fixture::new(&["backends/ffi/opencl"]);
        let node = fx.add("backend-ffi-opencl", &[]);

        assert!(Arc::ptr_eq(&fx.project.resolve("ffi-opencl").unwrap(), &node));
        assert!(Arc::ptr_eq(&fx.project.resolve("backend-ffi-opencl").unwrap(), &node));
        assert!(matches!(
            fx.project.resolve("nope"),
            Err(ProjectError::UnknownArtifact { .. })
        ));
    }

    #[test]
    fn test_versioned_artifact_keyed_by_full_relative_name() {
        let mut fx = Fixture::new(&["core"]);
        let node = fx.add("core-2.3", &[]);

        assert!(fx.project.get("core-2.3").is_some());
        assert!(fx.project.get("core").is_none());
        assert!(Arc::ptr_eq(&fx.project.resolve("core").unwrap(), &node));
    }

    #[test]
    fn test_build_runs_dependencies_first() {
        let mut fx = Fixture::new(&[]);
        let core = fx.add("core", &[]);
        let lib = fx.add("lib", &[&core]);
        fx.add("app", &[&lib]);

        let app = fx.project.resolve("app").unwrap();
        fx.project.build(&[app]).unwrap();

        assert_eq!(fx.log(), vec!["build core", "build lib", "build app"]);
    }

    #[test]
    fn test_empty_request_builds_everything() {
        let mut fx = Fixture::new(&[]);
        fx.add("one", &[]);
        fx.add("two", &[]);

        let order = fx.project.build(&[]).unwrap();

        assert_eq!(order.len(), 2);
        assert_eq!(fx.log(), vec!["build one", "build two"]);
    }

    #[test]
    fn test_each_request_invokes_actions_once() {
        let mut fx = Fixture::new(&[]);
        let core = fx.add("core", &[]);
        let left = fx.add("left", &[&core]);
        let right = fx.add("right", &[&core]);

        fx.project.build(&[left.clone(), right.clone()]).unwrap();
        fx.project.build(&[left, right]).unwrap();

        let builds_of_core = fx.log().iter().filter(|l| *l == "build core").count();
        assert_eq!(builds_of_core, 2);
        assert_eq!(fx.log().len(), 6);
    }

    #[test]
    fn test_unavailable_optional_prunes_dependents() {
        let mut fx = Fixture::new(&[]);
        let probe = fx.add_optional("probe", false);
        let native = fx.add("native", &[&probe]);
        let binding = fx.add("binding", &[&native]);
        let plain = fx.add("plain", &[]);

        let order = fx.project.build(&[binding, plain]).unwrap();

        let names: Vec<&str> = order.iter().map(|d| d.id().short_name()).collect();
        assert_eq!(names, vec!["plain"]);
        assert_eq!(fx.log(), vec!["build plain"]);
        assert_eq!(
            fx.sink.messages(Channel::Warning),
            vec![
                "probe skipped: not available on this host",
                "native skipped: depends on an unavailable optional artifact",
                "binding skipped: depends on an unavailable optional artifact",
            ]
        );
        let _ = native;
    }

    #[test]
    fn test_available_optional_is_ordered_but_not_built() {
        let mut fx = Fixture::new(&[]);
        let marker = fx.add_optional("linux", true);
        let lib = fx.add("lib", &[&marker]);

        let order = fx.project.build(&[lib]).unwrap();

        assert_eq!(order.len(), 2);
        assert_eq!(fx.log(), vec!["build lib"]);
    }

    #[test]
    fn test_failure_aborts_batch() {
        let mut fx = Fixture::new(&[]);
        let bad = fx.add_failing("bad", &[], true);
        let after = fx.add("after", &[]);

        let err = fx.project.build(&[bad, after]).unwrap_err();

        assert!(matches!(err, BldError::Action(ActionError::Invalid { .. })));
        assert_eq!(fx.log(), vec!["build bad"]);
        let errors = fx.sink.events();
        assert!(errors
            .iter()
            .any(|e| e.channel == Channel::Error && e.origin.as_deref() == Some("bad")));
    }

    #[test]
    fn test_keep_going_skips_only_dependents() {
        let mut fx = Fixture::with_options(&[], BuildOptions { keep_going: true });
        let bad = fx.add_failing("bad", &[], true);
        let child = fx.add("child", &[&bad]);
        let other = fx.add("other", &[]);

        let err = fx.project.build(&[child, other]).unwrap_err();

        match err {
            BldError::Project(ProjectError::Failures { failures }) => {
                assert_eq!(failures, vec!["bad".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fx.log(), vec!["build bad", "build other"]);
        assert_eq!(
            fx.sink.messages(Channel::Warning),
            vec!["child build skipped: a dependency failed"]
        );
    }

    #[test]
    fn test_clean_one_leaves_siblings() {
        let mut fx = Fixture::new(&[]);
        let x = fx.add("x", &[]);
        fx.add("y", &[]);
        let build = fx.project.build_path().to_path_buf();
        std::fs::create_dir_all(build.join("x")).unwrap();
        std::fs::create_dir_all(build.join("y")).unwrap();

        fx.project.clean(&[x]).unwrap();

        assert!(!build.join("x").exists());
        assert!(build.join("y").exists());
        assert_eq!(fx.log(), vec!["clean x"]);
    }

    #[test]
    fn test_clean_all_removes_build_root() {
        let mut fx = Fixture::new(&[]);
        fx.add("x", &[]);
        let build = fx.project.build_path().to_path_buf();
        std::fs::create_dir_all(build.join("stray")).unwrap();

        fx.project.clean(&[]).unwrap();

        assert!(!build.exists());
        assert_eq!(fx.log(), vec!["clean x"]);
    }

    #[test]
    fn test_run_builds_then_runs_with_ordered_classpath() {
        let mut fx = Fixture::new(&["backends/java", "examples/demo"]);
        let core = fx.add("core", &[]);
        let backend = fx.add("backend-java", &[&core]);
        let example = Dependency::builder(fx.project.id("example-demo").unwrap())
            .depends_on([core.clone()])
            .buildable(Recorded {
                log: fx.log.clone(),
                fail_build: false,
            })
            .archive(Runnable { log: fx.log.clone() })
            .finish();
        fx.project.register(example);
        let _ = backend;

        fx.project
            .run("java", "demo", &["--size".to_string(), "10".to_string()])
            .unwrap();

        assert_eq!(
            fx.log(),
            vec![
                "build core",
                "build java",
                "build demo",
                "run demo.Main [core,java,demo] --size 10",
            ]
        );
    }

    #[test]
    fn test_run_requires_runnable_example() {
        let mut fx = Fixture::new(&["backends/java", "examples/demo"]);
        fx.add("backend-java", &[]);
        fx.add("example-demo", &[]);

        let err = fx.project.run("java", "demo", &[]).unwrap_err();
        assert!(matches!(
            err,
            BldError::Project(ProjectError::MissingCapability { .. })
        ));
    }
}
