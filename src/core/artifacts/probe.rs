//! CMake package probes
//!
//! A probe asks CMake whether a package (`find_package(<find>)`) exists on
//! this host. It writes a throwaway `CMakeLists.txt` under
//! `conf/cmake-info/<find>/`, configures it, and scrapes the
//! `-- NAME=value` lines the script prints. Selected variables are cached in
//! `conf/cmake-info/<find>/properties`; once that file exists CMake is not
//! run again. Delete the file to re-probe.
//!
//! Availability is the truth value of the response variable, fixed when the
//! probe is loaded.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::defaults::{PROBE_DIR, PROBE_PROPERTIES_FILE};
use crate::core::artifacts::cmake::CMakeInvocation;
use crate::core::dependency::Optional;
use crate::core::layout::Layout;
use crate::core::reporter::EventSink;
use crate::error::FilesystemError;
use crate::infra::filesystem;
use crate::infra::process::{command_line, ProcessRunner};

const HOST_SYSTEM_NAME: &str = "CMAKE_HOST_SYSTEM_NAME";
const FRAMEWORK_DIRS: &str = "CMAKE_C_IMPLICIT_LINK_FRAMEWORK_DIRECTORIES";

/// What to look for and which variables to keep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSpec {
    find: String,
    response: String,
    vars: BTreeSet<String>,
    header: Option<String>,
}

impl ProbeSpec {
    /// Probe for `find`, available when `response` is true
    ///
    /// The response variable, host description and the usual
    /// `<find>_FOUND/_INCLUDE_DIRS/_LIBRARY/_VERSION_STRING` results are
    /// always kept.
    pub fn new(find: impl Into<String>, response: impl Into<String>) -> Self {
        let find = find.into();
        let response = response.into();
        let mut vars: BTreeSet<String> = [
            HOST_SYSTEM_NAME,
            "CMAKE_HOST_SYSTEM_PROCESSOR",
            FRAMEWORK_DIRS,
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
        for suffix in ["FOUND", "INCLUDE_DIRS", "LIBRARY", "VERSION_STRING"] {
            vars.insert(format!("{find}_{suffix}"));
        }
        vars.insert(response.clone());
        Self {
            find,
            response,
            vars,
            header: None,
        }
    }

    #[must_use]
    pub fn with_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vars.extend(vars.into_iter().map(Into::into));
        self
    }

    /// Header handed to jextract, relative to the include directory
    #[must_use]
    pub fn with_header(mut self, header: Option<String>) -> Self {
        self.header = header;
        self
    }

    pub fn find(&self) -> &str {
        &self.find
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    fn header(&self) -> String {
        self.header
            .clone()
            .unwrap_or_else(|| format!("{}.h", self.find.to_lowercase()))
    }
}

/// `-- NAME=value` lines printed by the probe script
fn variable_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-- *([A-Za-z_0-9]+)=(.*)$").expect("valid probe pattern"))
}

/// Parse one line of probe output
pub fn parse_variable(line: &str) -> Option<(&str, &str)> {
    let caps = variable_line().captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// CMake's notion of a true constant
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_uppercase().as_str(),
        "1" | "ON" | "YES" | "TRUE" | "Y"
    )
}

/// Result of probing one package, possibly read back from the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeProbe {
    spec: ProbeSpec,
    properties: BTreeMap<String, String>,
    available: bool,
}

impl CMakeProbe {
    /// Working directory of the probe for `find`
    pub fn probe_dir(layout: &Layout, find: &str) -> PathBuf {
        layout.conf().join(PROBE_DIR).join(find)
    }

    pub fn properties_path(layout: &Layout, find: &str) -> PathBuf {
        Self::probe_dir(layout, find).join(PROBE_PROPERTIES_FILE)
    }

    /// Script that loads the package and prints every CMake variable
    pub fn cmake_lists(find: &str) -> String {
        format!(
            "cmake_minimum_required(VERSION 3.22.1)\n\
             project(extractions)\n\
             find_package({find})\n\
             get_cmake_property(_variableNames VARIABLES)\n\
             foreach (_variableName ${{_variableNames}})\n   \
             message(STATUS \"${{_variableName}}=${{${{_variableName}}}}\")\n\
             endforeach()\n"
        )
    }

    /// Probe from already known properties
    pub fn from_properties(spec: ProbeSpec, properties: BTreeMap<String, String>) -> Self {
        let available = properties
            .get(&spec.response)
            .is_some_and(|v| is_truthy(v));
        Self {
            spec,
            properties,
            available,
        }
    }

    /// Read the cached properties, or run CMake and cache what it reports
    ///
    /// A missing `cmake` or a failed configure leaves the probe unavailable
    /// and nothing is cached.
    pub fn load_or_probe(
        spec: ProbeSpec,
        layout: &Layout,
        runner: &ProcessRunner,
        sink: &dyn EventSink,
    ) -> Result<Self, FilesystemError> {
        let cache = Self::properties_path(layout, &spec.find);
        if cache.is_file() {
            match toml::from_str::<BTreeMap<String, String>>(&filesystem::read_file(&cache)?) {
                Ok(properties) => {
                    tracing::debug!(find = %spec.find, path = %cache.display(), "probe cache hit");
                    return Ok(Self::from_properties(spec, properties));
                }
                Err(e) => {
                    tracing::warn!(path = %cache.display(), error = %e, "unreadable probe cache, probing again");
                }
            }
        }

        if runner.find_tool("cmake").is_none() {
            sink.warning(None, &format!("cmake not found, assuming {} is absent", spec.find));
            return Ok(Self::from_properties(spec, BTreeMap::new()));
        }

        let dir = Self::probe_dir(layout, &spec.find);
        let cmake = CMakeInvocation::new(&dir);
        filesystem::create_dir_all(cmake.build_dir())?;
        filesystem::write_file(&dir.join("CMakeLists.txt"), &Self::cmake_lists(&spec.find))?;

        let argv = cmake.configure(layout.build());
        sink.command(None, &command_line(&argv));
        sink.progress(None, &format!("probing for {}", spec.find));

        let mut properties = BTreeMap::new();
        let outcome = runner.run_streaming(layout.root(), &argv, |line| {
            if let Some((name, value)) = parse_variable(line) {
                if spec.vars.contains(name) {
                    properties.insert(name.to_string(), value.to_string());
                }
            }
        });

        match outcome {
            Ok(output) if output.success() => {
                let text = toml::to_string(&properties).map_err(|e| FilesystemError::WriteFile {
                    path: cache.clone(),
                    error: e.to_string(),
                })?;
                filesystem::write_file(&cache, &text)?;
                Ok(Self::from_properties(spec, properties))
            }
            Ok(output) => {
                sink.warning(
                    None,
                    &format!(
                        "probe for {} failed with status {:?}; treating it as absent",
                        spec.find, output.status
                    ),
                );
                Ok(Self::from_properties(spec, BTreeMap::new()))
            }
            Err(e) => {
                sink.warning(None, &format!("probe for {} failed: {e}", spec.find));
                Ok(Self::from_properties(spec, BTreeMap::new()))
            }
        }
    }

    pub fn spec(&self) -> &ProbeSpec {
        &self.spec
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn path_property(&self, key: &str) -> Option<&Path> {
        self.property(key).map(Path::new)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// jextract options for binding against this package
    ///
    /// Empty when the package is absent or the host is neither Darwin nor
    /// Linux.
    pub fn jextract_opts(&self) -> Vec<String> {
        if !self.available {
            return Vec::new();
        }
        let find = &self.spec.find;
        let header = self.spec.header();
        let class_name = Path::new(&header)
            .file_stem()
            .map(|s| format!("{}_h", s.to_string_lossy()))
            .unwrap_or_else(|| format!("{}_h", find.to_lowercase()));

        match self.property(HOST_SYSTEM_NAME) {
            Some("Darwin") => {
                let frameworks = self.property(FRAMEWORK_DIRS).unwrap_or("/Library/Frameworks");
                let header_file = Path::new(&header)
                    .file_name()
                    .map_or_else(|| header.clone(), |f| f.to_string_lossy().into_owned());
                vec![
                    "--library".to_string(),
                    format!(":/System/Library/Frameworks/{find}.framework/{find}"),
                    "--header-class-name".to_string(),
                    class_name,
                    format!("{frameworks}/{find}.framework/Headers/{header_file}"),
                ]
            }
            Some("Linux") => {
                let mut opts = Vec::new();
                if let Some(library) = self.property(&format!("{find}_LIBRARY")) {
                    opts.extend(["--library".to_string(), library.to_string()]);
                }
                opts.extend(["--include-dir".to_string(), "/usr/include/linux;/usr/include".to_string()]);
                let include = self
                    .property(&format!("{find}_INCLUDE_DIRS"))
                    .unwrap_or("/usr/include");
                opts.extend([
                    "--header-class-name".to_string(),
                    class_name,
                    format!("{include}/{header}"),
                ]);
                opts
            }
            _ => Vec::new(),
        }
    }

    /// Write `compile_flags.txt` into `dir` so editors find framework headers
    ///
    /// Only Darwin hosts need this; elsewhere nothing is written.
    pub fn write_compiler_flags(&self, dir: &Path) -> Result<Option<PathBuf>, FilesystemError> {
        if self.property(HOST_SYSTEM_NAME) != Some("Darwin") {
            return Ok(None);
        }
        let Some(frameworks) = self.property(FRAMEWORK_DIRS) else {
            return Ok(None);
        };
        let path = dir.join("compile_flags.txt");
        filesystem::write_file(&path, &format!("-F{frameworks}\n"))?;
        Ok(Some(path))
    }
}

impl Optional for CMakeProbe {
    fn is_available(&self) -> bool {
        self.available
    }
}
