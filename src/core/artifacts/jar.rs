//! Java archives
//!
//! A jar artifact compiles `<path>/src/main/java` with `javac` against the
//! archives it depends on, then packs the classes (and
//! `src/main/resources`, when present) into `build/<full-name>.jar`.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::dependency::{
    ActionContext, ActionResult, Buildable, Dependency, DependencyBuilder, DependencyRef,
    ExecutableArchive,
};
use crate::core::graph::Graph;
use crate::core::identity::Identity;
use crate::core::layout::Layout;

#[cfg(windows)]
const CLASSPATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const CLASSPATH_SEPARATOR: &str = ":";

/// Options passed to `java` before the class path
pub const DEFAULT_JAVA_OPTS: &[&str] = &["--enable-preview", "--enable-native-access=ALL-UNNAMED"];

/// Options passed to `javac` before the output directory
pub const DEFAULT_JAVAC_OPTS: &[&str] = &["-g"];

/// Java archive artifact
#[derive(Debug, Clone)]
pub struct Jar {
    exclude: Vec<PathBuf>,
    main_class: Option<String>,
    javac_opts: Vec<String>,
    java_opts: Vec<String>,
}

impl Default for Jar {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            main_class: None,
            javac_opts: DEFAULT_JAVAC_OPTS.iter().map(|s| (*s).to_string()).collect(),
            java_opts: DEFAULT_JAVA_OPTS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl Jar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip these sources, given relative to the artifact directory
    #[must_use]
    pub fn with_exclude(mut self, exclude: Vec<PathBuf>) -> Self {
        self.exclude = exclude;
        self
    }

    #[must_use]
    pub fn with_main_class(mut self, main_class: Option<String>) -> Self {
        self.main_class = main_class;
        self
    }

    #[must_use]
    pub fn with_javac_opts(mut self, opts: Vec<String>) -> Self {
        self.javac_opts = opts;
        self
    }

    #[must_use]
    pub fn with_java_opts(mut self, opts: Vec<String>) -> Self {
        self.java_opts = opts;
        self
    }

    /// Give `builder` the buildable and runnable-archive capabilities
    pub fn attach(self, builder: DependencyBuilder) -> DependencyBuilder {
        builder.buildable(self.clone()).archive(self)
    }

    pub fn jar_file(layout: &Layout, id: &Identity) -> PathBuf {
        layout.build().join(format!("{}.jar", id.full_name()))
    }

    pub fn classes_dir(layout: &Layout, id: &Identity) -> PathBuf {
        layout.build().join(format!("{}.classes", id.full_name()))
    }

    pub fn source_dir(id: &Identity) -> Option<PathBuf> {
        id.path().map(|p| p.join("src/main/java"))
    }

    fn resource_dir(id: &Identity) -> Option<PathBuf> {
        id.path().map(|p| p.join("src/main/resources"))
    }

    /// `.java` files under `dir`, sorted, minus excluded ones
    pub fn collect_sources(&self, base: &Path, dir: &Path) -> Vec<PathBuf> {
        let excluded: Vec<PathBuf> = self.exclude.iter().map(|e| base.join(e)).collect();
        let mut sources: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| p.extension().is_some_and(|ext| ext == "java"))
            .filter(|p| !excluded.iter().any(|e| p.starts_with(e)))
            .collect();
        sources.sort();
        sources
    }

    /// Compile and pack; shared with generated-binding artifacts
    pub(crate) fn compile(&self, ctx: &ActionContext<'_>) -> ActionResult {
        let id = ctx.id();
        let (Some(base), Some(src)) = (id.path(), Self::source_dir(id)) else {
            return Err(ctx.invalid("jar artifacts need a source directory"));
        };
        if !src.is_dir() {
            ctx.sink.warning(
                Some(id),
                &format!("no java sources at {}", src.display()),
            );
            return Ok(());
        }

        let sources = self.collect_sources(base, &src);
        if sources.is_empty() {
            ctx.sink
                .warning(Some(id), &format!("no .java files under {}", src.display()));
            return Ok(());
        }

        let classes = Self::classes_dir(ctx.layout, id);
        ctx.mkdir(ctx.layout.build())?;
        ctx.clean_path(&classes)?;
        ctx.mkdir(&classes)?;

        let mut argv = vec![java_tool("javac")];
        argv.extend(self.javac_opts.iter().cloned());
        argv.extend(["-d".to_string(), classes.display().to_string()]);
        let deps = compile_classpath(ctx)?;
        if !deps.is_empty() {
            argv.push(format!("--class-path={deps}"));
        }
        argv.push(format!("--source-path={}", src.display()));
        argv.extend(sources.iter().map(|p| p.display().to_string()));

        ctx.exec_with(ctx.layout.root(), &argv, |line| report_diagnostic(ctx, line))?;

        let jar = Self::jar_file(ctx.layout, id);
        let mut argv = vec![
            java_tool("jar"),
            "--create".to_string(),
            "--file".to_string(),
            jar.display().to_string(),
            "-C".to_string(),
            classes.display().to_string(),
            ".".to_string(),
        ];
        if let Some(resources) = Self::resource_dir(id).filter(|r| r.is_dir()) {
            argv.extend([
                "-C".to_string(),
                resources.display().to_string(),
                ".".to_string(),
            ]);
        }
        ctx.exec(ctx.layout.root(), &argv)?;

        let plural = if sources.len() > 1 { "s" } else { "" };
        let jar_name = jar
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ctx.sink.progress(
            Some(id),
            &format!("compiled {} file{plural} to {jar_name}", sources.len()),
        );
        Ok(())
    }
}

impl Buildable for Jar {
    fn build(&self, ctx: &ActionContext<'_>) -> ActionResult {
        self.compile(ctx)
    }

    fn clean(&self, ctx: &ActionContext<'_>) -> ActionResult {
        for path in self.generated_paths(ctx) {
            ctx.remove_path(&path)?;
        }
        Ok(())
    }

    fn generated_paths(&self, ctx: &ActionContext<'_>) -> Vec<PathBuf> {
        vec![
            Self::classes_dir(ctx.layout, ctx.id()),
            Self::jar_file(ctx.layout, ctx.id()),
        ]
    }
}

impl ExecutableArchive for Jar {
    fn run(
        &self,
        ctx: &ActionContext<'_>,
        entry_point: &str,
        ordered: &[DependencyRef],
        args: &[String],
    ) -> ActionResult {
        let mut argv = vec![java_tool("java")];
        argv.extend(self.java_opts.iter().cloned());
        argv.extend([
            "--class-path".to_string(),
            classpath_with_self_last(ctx.layout, ctx.node, ordered),
            format!("-Djava.library.path={}", ctx.layout.build().display()),
            entry_point.to_string(),
        ]);
        argv.extend(args.iter().cloned());

        ctx.exec_with(ctx.layout.root(), &argv, |line| println!("{line}"))?;
        Ok(())
    }

    fn archive_path(&self, layout: &Layout, id: &Identity) -> PathBuf {
        Self::jar_file(layout, id)
    }

    fn entry_point(&self) -> Option<&str> {
        self.main_class.as_deref()
    }
}

/// `JAVA_HOME/bin/<tool>` when set, otherwise `<tool>` from `PATH`
fn java_tool(tool: &str) -> String {
    std::env::var_os("JAVA_HOME")
        .map(|home| PathBuf::from(home).join("bin").join(tool))
        .filter(|p| p.is_file())
        .map_or_else(|| tool.to_string(), |p| p.display().to_string())
}

/// Route a javac output line to the channel its severity suggests
fn report_diagnostic(ctx: &ActionContext<'_>, line: &str) {
    let origin = Some(ctx.id());
    if line.contains(": error:") {
        ctx.sink.error(origin, line);
    } else if line.contains(": warning:") {
        ctx.sink.warning(origin, line);
    } else if line.starts_with("Note:") {
        ctx.sink.note(origin, line);
    } else {
        ctx.sink.info(origin, line);
    }
}

/// Archives of the transitive dependencies, dependencies first
fn compile_classpath(ctx: &ActionContext<'_>) -> Result<String, crate::error::ActionError> {
    let order = Graph::expand(ctx.node.dependencies().iter().cloned())
        .map_err(|e| ctx.invalid(e.to_string()))?
        .order();
    Ok(classpath(ctx.layout, order.iter().map(|d| &**d)))
}

/// Join the archive paths of `entries` that are runnable archives
pub fn classpath<'a, I>(layout: &Layout, entries: I) -> String
where
    I: IntoIterator<Item = &'a Dependency>,
{
    entries
        .into_iter()
        .filter_map(|d| {
            d.as_archive()
                .map(|a| a.archive_path(layout, d.id()).display().to_string())
        })
        .collect::<Vec<_>>()
        .join(CLASSPATH_SEPARATOR)
}

/// [`classpath`] of `ordered` with `this` moved to the end
pub fn classpath_with_self_last(
    layout: &Layout,
    this: &Dependency,
    ordered: &[DependencyRef],
) -> String {
    let others = ordered
        .iter()
        .map(|d| &**d)
        .filter(|d| !std::ptr::eq(*d, this));
    classpath(layout, others.chain(std::iter::once(this)))
}
