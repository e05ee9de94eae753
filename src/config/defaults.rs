//! Default configuration values

/// Version assigned to artifacts whose name carries no `major.minor` suffix
pub const DEFAULT_ARTIFACT_VERSION: &str = "1.0";

/// Manifest file name looked up in the project root
pub const MANIFEST_FILE: &str = "bld.toml";

/// Build output directory, relative to the project root
pub const BUILD_DIR: &str = "build";

/// Configuration directory, relative to the project root
pub const CONF_DIR: &str = "conf";

/// Probe working directories live under `<conf>/<PROBE_DIR>/<find>`
pub const PROBE_DIR: &str = "cmake-info";

/// Name of the cached probe properties file
pub const PROBE_PROPERTIES_FILE: &str = "properties";

/// CMake build tree, relative to a native artifact's source directory
pub const CMAKE_BUILD_SUBDIR: &str = "build";

/// Cache variable telling a native build where to put its outputs
pub const CMAKE_TARGET_VARIABLE: &str = "HAT_TARGET";

/// Entry point used by `run` when neither the manifest nor the artifact names one
pub const DEFAULT_MAIN_CLASS: &str = "Main";

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
