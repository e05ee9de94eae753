//! Error types for bld
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Artifact name resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Empty relative name
    #[error("Artifact name cannot be empty")]
    Empty,

    /// The first segment resolved to a directory but the tail did not
    #[error("Artifact '{name}': base path exists but sub path does not: {path}")]
    MissingSubpath { name: String, path: PathBuf },

    /// Leading, trailing or doubled hyphen
    #[error("Artifact '{name}' has an empty name segment")]
    EmptySegment { name: String },
}

/// Dependency graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
}

/// External process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Empty argument vector
    #[error("No command given")]
    EmptyCommand,

    /// The program could not be started
    #[error("Failed to start '{command}' in '{dir}': {error}")]
    Spawn {
        command: String,
        dir: PathBuf,
        error: String,
    },

    /// The program ran but exited unsuccessfully
    #[error("'{command}' exited with status {}", status.map_or_else(|| "signal".to_string(), |s| s.to_string()))]
    Failed {
        command: String,
        status: Option<i32>,
    },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },
}

/// Failure of a single artifact action (build, clean, run)
#[derive(Error, Debug)]
pub enum ActionError {
    /// An external tool failed
    #[error("{artifact}: {source}")]
    Process {
        artifact: String,
        #[source]
        source: ProcessError,
    },

    /// Filesystem failure while preparing or packaging outputs
    #[error("{artifact}: {source}")]
    Filesystem {
        artifact: String,
        #[source]
        source: FilesystemError,
    },

    /// The artifact is misconfigured for the requested action
    #[error("{artifact}: {message}")]
    Invalid { artifact: String, message: String },
}

impl ActionError {
    /// Relative name of the artifact this failure is attributed to
    pub fn artifact(&self) -> &str {
        match self {
            Self::Process { artifact, .. }
            | Self::Filesystem { artifact, .. }
            | Self::Invalid { artifact, .. } => artifact,
        }
    }
}

/// Manifest (bld.toml) errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file missing
    #[error("Manifest not found at '{path}'")]
    NotFound { path: PathBuf },

    /// Manifest parse error
    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// Manifest or probe cache could not be read or written
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// Dependency names an artifact not declared earlier
    #[error("Artifact '{artifact}' depends on unknown artifact '{dependency}'")]
    UnknownDependency { artifact: String, dependency: String },

    /// Kind-specific key missing
    #[error("Artifact '{artifact}' of kind '{kind}' requires '{field}'")]
    MissingField {
        artifact: String,
        kind: String,
        field: String,
    },
}

/// Project registry errors
#[derive(Error, Debug)]
pub enum ProjectError {
    /// Project root missing
    #[error("Root path for project does not exist: {path}")]
    RootNotFound { path: PathBuf },

    /// Requested artifact not registered
    #[error("Unknown artifact '{name}'")]
    UnknownArtifact { name: String },

    /// Artifact lacks a capability required by the request
    #[error("Artifact '{name}' is not {capability}")]
    MissingCapability { name: String, capability: String },

    /// One or more actions failed while continuing past failures
    /// Requested artifact was pruned because something it needs is unavailable
    #[error("Artifact '{name}' is not available on this host")]
    Unavailable { name: String },

    #[error("{} artifact(s) failed: {}", failures.len(), failures.join(", "))]
    Failures { failures: Vec<String> },
}

/// Top-level bld error type
#[derive(Error, Debug)]
pub enum BldError {
    /// Identity error
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Process error
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Action error
    #[error("Action failed: {0}")]
    Action(#[from] ActionError),

    /// Manifest error
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Project error
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),
}
