//! Global constants used throughout depgen.
//!
//! Descriptor conventions, file names and concurrency defaults live here so
//! the magic strings are discoverable in one place.

/// Project configuration file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "depgen.toml";

/// Per-module build file declaring the build graph.
pub const BUILD_FILE_NAME: &str = "module.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV_VAR: &str = "DEPGEN_CONFIG";

/// Plugin descriptor location relative to a resource root.
pub const PLUGIN_DESCRIPTOR_PATH: &str = "META-INF/plugin.xml";

/// Comment marking a descriptor whose dependencies must not be generated.
pub const SKIP_GENERATION_MARKER: &str = "<!-- depgen: skip -->";

/// Name suffix of test content modules (`<module>._test`).
pub const TEST_MODULE_SUFFIX: &str = "._test";

/// Default prefix of library wrapper modules.
pub const DEFAULT_LIBRARY_MODULE_PREFIX: &str = "intellij.libraries.";

/// Fallback when `std::thread::available_parallelism()` fails.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Default fan-out for per-module jobs: twice the available cores.
pub fn default_max_parallel() -> usize {
    std::thread::available_parallelism().map(std::num::NonZero::get).unwrap_or(FALLBACK_CORE_COUNT)
        * 2
}

/// Whether `name` denotes a test content module.
pub fn is_test_module_name(name: &str) -> bool {
    name.ends_with(TEST_MODULE_SUFFIX)
}
