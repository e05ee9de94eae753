//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod clean;
pub mod dot;
pub mod order;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::core::manifest::Manifest;
use crate::core::project::{BuildOptions, Project};
use crate::core::reporter::{EventSink, Preset, Reporter};

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build artifacts and their dependencies (everything when none are named)
    #[command(alias = "build")]
    Bld {
        /// Artifact names
        names: Vec<String>,
    },

    /// Remove generated outputs (and the build directory when none are named)
    Clean {
        /// Artifact names
        names: Vec<String>,
    },

    /// Build a backend and an example, then run the example
    Run {
        /// Backend name, with or without the `backend-` prefix
        backend: String,

        /// Example name, with or without the `example-` prefix
        example: String,

        /// Arguments passed to the example
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the dependency graph in Graphviz format
    Dot {
        /// Artifact names
        names: Vec<String>,
    },

    /// Print the build order, marking artifacts the host cannot build
    Order {
        /// Artifact names
        names: Vec<String>,

        /// Output in JSON format for scripting
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Execute the command
    pub fn run(self, session: &Session) -> Result<()> {
        match self {
            Self::Bld { names } => build::execute(session, &names),
            Self::Clean { names } => clean::execute(session, &names),
            Self::Run {
                backend,
                example,
                args,
            } => run::execute(session, &backend, &example, &args),
            Self::Dot { names } => dot::execute(session, &names),
            Self::Order { names, json } => order::execute(session, &names, json),
        }
    }
}

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Session {
    /// Project root
    pub root: PathBuf,
    /// Reporter preset chosen on the command line
    pub reporter: Option<Preset>,
    /// Continue past failed artifacts
    pub keep_going: bool,
    /// Suppress summaries
    pub quiet: bool,
}

impl Session {
    /// Load the manifest, create the project and register its artifacts
    pub fn open(&self) -> Result<Project> {
        self.open_with(|reporter| Box::new(reporter))
    }

    /// [`Session::open`], letting `sink` wrap the project's reporter
    pub fn open_with<F>(&self, sink: F) -> Result<Project>
    where
        F: FnOnce(Reporter) -> Box<dyn EventSink>,
    {
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("Project root not found: {}", self.root.display()))?;
        let manifest = Manifest::load(&root)
            .with_context(|| format!("Failed to load {}", Manifest::path(&root).display()))?;
        let layout = manifest.layout(&root)?;

        let preset = self.preset(&manifest);
        tracing::info!(project = layout.name(), root = %root.display(), %preset, "opening project");

        let mut project = Project::with_layout(layout, sink(Reporter::new(preset)))
            .with_options(BuildOptions {
                keep_going: self.keep_going,
            });
        manifest
            .register(&mut project)
            .context("Failed to register artifacts")?;
        Ok(project)
    }

    /// Command line first, then the manifest, then the default
    pub fn preset(&self, manifest: &Manifest) -> Preset {
        self.reporter
            .or(manifest.project.reporter)
            .unwrap_or_default()
    }
}
