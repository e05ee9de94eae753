//! Generated Java bindings
//!
//! A jextract artifact runs `jextract` over the header a CMake probe located,
//! writing Java sources into its own `src/main/java`, then compiles and packs
//! them like any other jar. The probe must also be one of its dependencies so
//! the artifact is pruned on hosts where the package is missing.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::artifacts::jar::Jar;
use crate::core::artifacts::probe::CMakeProbe;
use crate::core::dependency::{
    ActionContext, ActionResult, Buildable, DependencyBuilder, DependencyRef, ExecutableArchive,
};
use crate::core::identity::Identity;
use crate::core::layout::Layout;

/// jextract binding artifact
#[derive(Debug, Clone)]
pub struct JExtract {
    jar: Jar,
    provider: Arc<CMakeProbe>,
}

impl JExtract {
    pub fn new(provider: Arc<CMakeProbe>) -> Self {
        Self {
            jar: Jar::new(),
            provider,
        }
    }

    #[must_use]
    pub fn with_jar(mut self, jar: Jar) -> Self {
        self.jar = jar;
        self
    }

    pub fn provider(&self) -> &CMakeProbe {
        &self.provider
    }

    /// Give `builder` the buildable and runnable-archive capabilities
    pub fn attach(self, builder: DependencyBuilder) -> DependencyBuilder {
        builder.buildable(self.clone()).archive(self)
    }

    /// `jextract --target-package <short> --output <sources>` plus provider options
    pub fn command(&self, id: &Identity, output: &std::path::Path) -> Vec<String> {
        let mut argv = vec![
            "jextract".to_string(),
            "--target-package".to_string(),
            id.short_name().to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ];
        argv.extend(self.provider.jextract_opts());
        argv
    }
}

impl Buildable for JExtract {
    fn build(&self, ctx: &ActionContext<'_>) -> ActionResult {
        let id = ctx.id();
        let Some(sources) = Jar::source_dir(id) else {
            return Err(ctx.invalid("jextract artifacts need a source directory"));
        };
        ctx.mkdir(&sources)?;

        if let Some(flags) = self
            .provider
            .write_compiler_flags(ctx.layout.root())
            .map_err(|e| ctx.fs_error(e))?
        {
            tracing::debug!(path = %flags.display(), "wrote compiler flags");
        }

        ctx.sink.progress(Some(id), "extracting");
        ctx.exec_with(ctx.layout.root(), &self.command(id, &sources), |line| {
            ctx.sink.warning(Some(id), line);
        })?;

        self.jar.compile(ctx)
    }

    fn clean(&self, ctx: &ActionContext<'_>) -> ActionResult {
        self.jar.clean(ctx)
    }

    fn generated_paths(&self, ctx: &ActionContext<'_>) -> Vec<PathBuf> {
        self.jar.generated_paths(ctx)
    }
}

impl ExecutableArchive for JExtract {
    fn run(
        &self,
        ctx: &ActionContext<'_>,
        entry_point: &str,
        ordered: &[DependencyRef],
        args: &[String],
    ) -> ActionResult {
        self.jar.run(ctx, entry_point, ordered, args)
    }

    fn archive_path(&self, layout: &Layout, id: &Identity) -> PathBuf {
        Jar::jar_file(layout, id)
    }

    fn entry_point(&self) -> Option<&str> {
        self.jar.entry_point()
    }
}
