//! Native builds driven by CMake
//!
//! The source directory is the artifact's path and the build tree lives in
//! `<path>/build`. Every build reconfigures from scratch (`--fresh`) and
//! points the native outputs at the project's build directory through the
//! `HAT_TARGET` cache variable.

use std::path::{Path, PathBuf};

use crate::config::defaults::{CMAKE_BUILD_SUBDIR, CMAKE_TARGET_VARIABLE};
use crate::core::dependency::{ActionContext, ActionResult, Buildable};
use crate::error::ActionError;
use crate::infra::process::ProcessOutput;

/// Argument vectors for the CMake steps of one source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeInvocation {
    source_dir: PathBuf,
    build_dir: PathBuf,
}

impl CMakeInvocation {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        let build_dir = source_dir.join(CMAKE_BUILD_SUBDIR);
        Self {
            source_dir,
            build_dir,
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// `cmake --fresh -DHAT_TARGET=<target> -B <build> -S <source>`
    pub fn configure(&self, target: &Path) -> Vec<String> {
        vec![
            "cmake".to_string(),
            "--fresh".to_string(),
            format!("-D{CMAKE_TARGET_VARIABLE}={}", target.display()),
            "-B".to_string(),
            self.build_dir.display().to_string(),
            "-S".to_string(),
            self.source_dir.display().to_string(),
        ]
    }

    /// `cmake --build <build>`, optionally for one target
    pub fn build(&self, target: Option<&str>) -> Vec<String> {
        let mut argv = vec![
            "cmake".to_string(),
            "--build".to_string(),
            self.build_dir.display().to_string(),
        ];
        if let Some(target) = target {
            argv.extend(["--target".to_string(), target.to_string()]);
        }
        argv
    }

    /// Run `argv`, reporting the step on the progress channel
    pub fn step<F>(
        &self,
        ctx: &ActionContext<'_>,
        argv: &[String],
        on_line: F,
    ) -> Result<ProcessOutput, ActionError>
    where
        F: FnMut(&str),
    {
        if let Some(verb) = argv.get(1) {
            ctx.sink.progress(Some(ctx.id()), &format!("cmake {verb}"));
        }
        ctx.exec_with(ctx.layout.root(), argv, on_line)
    }
}

/// CMake-built native artifact
#[derive(Debug, Clone, Default)]
pub struct CMake;

impl CMake {
    pub fn new() -> Self {
        Self
    }

    fn invocation(ctx: &ActionContext<'_>) -> Result<CMakeInvocation, ActionError> {
        ctx.id()
            .path()
            .map(CMakeInvocation::new)
            .ok_or_else(|| ctx.invalid("cmake artifacts need a source directory"))
    }
}

impl Buildable for CMake {
    fn build(&self, ctx: &ActionContext<'_>) -> ActionResult {
        let cmake = Self::invocation(ctx)?;
        let info = |line: &str| ctx.sink.info(Some(ctx.id()), line);

        ctx.mkdir(ctx.layout.build())?;
        cmake.step(ctx, &cmake.configure(ctx.layout.build()), info)?;
        cmake.step(ctx, &cmake.build(None), info)?;
        Ok(())
    }

    fn clean(&self, ctx: &ActionContext<'_>) -> ActionResult {
        let cmake = Self::invocation(ctx)?;
        if !cmake.build_dir().is_dir() {
            tracing::debug!(artifact = %ctx.id(), "never configured, nothing to clean");
            return Ok(());
        }
        let info = |line: &str| ctx.sink.info(Some(ctx.id()), line);

        cmake.step(ctx, &cmake.configure(ctx.layout.build()), info)?;
        cmake.step(ctx, &cmake.build(Some("clean")), info)?;
        Ok(())
    }

    fn generated_paths(&self, ctx: &ActionContext<'_>) -> Vec<PathBuf> {
        Self::invocation(ctx)
            .map(|c| vec![c.build_dir().to_path_buf()])
            .unwrap_or_default()
    }
}
