//! Manifest (bld.toml) parsing and artifact registration
//!
//! The manifest declares the artifacts of a project in dependency order:
//!
//! ```toml
//! [project]
//! name = "hat"
//!
//! [[artifact]]
//! name = "core"
//! kind = "jar"
//!
//! [[artifact]]
//! name = "backend-ffi-opencl"
//! kind = "cmake"
//! deps = ["core"]
//! ```
//!
//! Dependencies may only name artifacts declared above them, which keeps
//! manifests acyclic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::defaults::MANIFEST_FILE;
use crate::core::artifacts::{
    CMake, CMakeProbe, FixedAvailability, HostMarker, HostOs, JExtract, Jar, ProbeSpec,
};
use crate::core::dependency::{Dependency, DependencyRef};
use crate::core::layout::Layout;
use crate::core::project::Project;
use crate::core::reporter::Preset;
use crate::error::{BldError, ManifestError, ProjectError};
use crate::infra::filesystem;

/// The project manifest (bld.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Project-level settings
    #[serde(default)]
    pub project: ProjectConfig,

    /// Artifacts, in declaration order
    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<ArtifactConfig>,
}

/// Project-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project name; defaults to the root directory name
    pub name: Option<String>,

    /// Reporter preset used unless the command line picks one
    pub reporter: Option<Preset>,

    /// Entry point for `run` when the example names none
    pub main_class: Option<String>,
}

/// Artifact kinds a manifest can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Jar,
    Cmake,
    CmakeProbe,
    Jextract,
    Mac,
    Linux,
    Windows,
    Opt,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jar => "jar",
            Self::Cmake => "cmake",
            Self::CmakeProbe => "cmake-probe",
            Self::Jextract => "jextract",
            Self::Mac => "mac",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Opt => "opt",
        }
    }
}

/// One `[[artifact]]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ArtifactConfig {
    /// Project-relative name, e.g. `backend-ffi-opencl`
    pub name: String,

    pub kind: ArtifactKind,

    /// Names of artifacts declared earlier
    #[serde(default)]
    pub deps: Vec<String>,

    /// Sources to skip (jar), relative to the artifact directory
    #[serde(default)]
    pub exclude: Vec<PathBuf>,

    /// Entry point (jar, jextract)
    pub main_class: Option<String>,

    /// Replaces the default `javac` options (jar, jextract)
    pub javac_opts: Option<Vec<String>>,

    /// Replaces the default `java` options used by `run` (jar, jextract)
    pub java_opts: Option<Vec<String>>,

    /// Package passed to `find_package` (cmake-probe)
    pub find: Option<String>,

    /// Variable deciding availability (cmake-probe); `<find>_FOUND` by default
    pub response: Option<String>,

    /// Extra variables to cache (cmake-probe)
    #[serde(default)]
    pub vars: Vec<String>,

    /// Header for jextract, relative to the include directory (cmake-probe)
    pub header: Option<String>,

    /// Probe supplying jextract options (jextract); first probe in `deps` otherwise
    pub provider: Option<String>,

    /// Fixed availability (opt)
    pub available: Option<bool>,
}

impl ArtifactConfig {
    fn missing(&self, field: &str) -> ManifestError {
        ManifestError::MissingField {
            artifact: self.name.clone(),
            kind: self.kind.as_str().to_string(),
            field: field.to_string(),
        }
    }

    fn jar(&self, default_main_class: Option<&String>) -> Jar {
        let mut jar = Jar::new()
            .with_exclude(self.exclude.clone())
            .with_main_class(self.main_class.clone().or_else(|| default_main_class.cloned()));
        if let Some(opts) = &self.javac_opts {
            jar = jar.with_javac_opts(opts.clone());
        }
        if let Some(opts) = &self.java_opts {
            jar = jar.with_java_opts(opts.clone());
        }
        jar
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl Manifest {
    /// Location of the manifest for `root`
    pub fn path(root: &Path) -> PathBuf {
        root.join(MANIFEST_FILE)
    }

    /// Load `bld.toml` from `root`
    pub fn load(root: &Path) -> Result<Self, ManifestError> {
        let path = Self::path(root);
        if !path.is_file() {
            return Err(ManifestError::NotFound { path });
        }
        let manifest: Self = filesystem::read_file(&path)?.parse()?;
        tracing::debug!(
            path = %path.display(),
            artifacts = manifest.artifacts.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// Layout for `root`, named by the manifest when it says so
    pub fn layout(&self, root: &Path) -> Result<Layout, ProjectError> {
        match &self.project.name {
            Some(name) => Layout::named(root, name.clone()),
            None => Layout::new(root),
        }
    }

    /// Register every declared artifact with `project`, in declaration order
    ///
    /// CMake probes run (or load their cache) here, so availability is known
    /// before any build starts.
    pub fn register(&self, project: &mut Project) -> Result<Vec<DependencyRef>, BldError> {
        let mut probes: HashMap<*const Dependency, Arc<CMakeProbe>> = HashMap::new();
        let mut registered = Vec::with_capacity(self.artifacts.len());

        for artifact in &self.artifacts {
            let id = project.id(&artifact.name)?;
            let mut deps = artifact
                .deps
                .iter()
                .map(|name| {
                    project
                        .resolve(name)
                        .map_err(|_| ManifestError::UnknownDependency {
                            artifact: artifact.name.clone(),
                            dependency: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let builder = Dependency::builder(id);
            let mut probe = None;
            let builder = match artifact.kind {
                ArtifactKind::Jar => artifact
                    .jar(self.project.main_class.as_ref())
                    .attach(builder),
                ArtifactKind::Cmake => builder.buildable(CMake::new()),
                ArtifactKind::CmakeProbe => {
                    let find = artifact.find.as_deref().ok_or_else(|| artifact.missing("find"))?;
                    let response = artifact
                        .response
                        .clone()
                        .unwrap_or_else(|| format!("{find}_FOUND"));
                    let spec = ProbeSpec::new(find, response)
                        .with_vars(artifact.vars.iter().cloned())
                        .with_header(artifact.header.clone());
                    let loaded = Arc::new(CMakeProbe::load_or_probe(
                        spec,
                        project.layout(),
                        project.runner(),
                        project.sink(),
                    )?);
                    probe = Some(loaded.clone());
                    builder.optional(loaded.as_ref().clone())
                }
                ArtifactKind::Jextract => {
                    let (provider_node, provider) =
                        Self::provider(artifact, project, &deps, &probes)?;
                    if !deps.iter().any(|d| Arc::ptr_eq(d, &provider_node)) {
                        deps.push(provider_node);
                    }
                    JExtract::new(provider)
                        .with_jar(artifact.jar(self.project.main_class.as_ref()))
                        .attach(builder)
                }
                ArtifactKind::Mac | ArtifactKind::Linux | ArtifactKind::Windows => {
                    let os = HostOs::from_kind(artifact.kind.as_str())
                        .ok_or_else(|| artifact.missing("kind"))?;
                    builder.optional(HostMarker::new(os))
                }
                ArtifactKind::Opt => {
                    let available = artifact.available.ok_or_else(|| artifact.missing("available"))?;
                    builder.optional(FixedAvailability(available))
                }
            };

            let node = project.register(builder.depends_on(deps).finish());
            if let Some(probe) = probe {
                probes.insert(Arc::as_ptr(&node), probe);
            }
            tracing::debug!(
                artifact = %node.id(),
                kind = artifact.kind.as_str(),
                deps = node.dependencies().len(),
                "registered artifact"
            );
            registered.push(node);
        }

        Ok(registered)
    }

    /// The probe a jextract artifact binds against
    fn provider(
        artifact: &ArtifactConfig,
        project: &Project,
        deps: &[DependencyRef],
        probes: &HashMap<*const Dependency, Arc<CMakeProbe>>,
    ) -> Result<(DependencyRef, Arc<CMakeProbe>), ManifestError> {
        let candidate = match &artifact.provider {
            Some(name) => {
                let node = project
                    .resolve(name)
                    .map_err(|_| ManifestError::UnknownDependency {
                        artifact: artifact.name.clone(),
                        dependency: name.clone(),
                    })?;
                probes.get(&Arc::as_ptr(&node)).map(|p| (node.clone(), p.clone()))
            }
            None => deps
                .iter()
                .find_map(|d| probes.get(&Arc::as_ptr(d)).map(|p| (d.clone(), p.clone()))),
        };
        candidate.ok_or_else(|| artifact.missing("provider"))
    }
}
