//! Compile-time build metadata exposed to CLI surfaces.

/// Semver package version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// VCS commit hash captured at build time.
pub const GIT_COMMIT: &str = env!("CODEBEAT_BUILD_GIT_HASH");

/// Build timestamp captured at compile time.
pub const BUILD_TIMESTAMP: &str = env!("CODEBEAT_BUILD_TIMESTAMP");

/// Render the banner suffix shown when the interactive loop starts.
pub fn startup_metadata_line() -> String {
    format!("v{VERSION} ({GIT_COMMIT}, built {BUILD_TIMESTAMP})")
}

/// Help trailer that surfaces build metadata in `codebeat --help`.
pub const HELP_BUILD_METADATA: &str = concat!(
    "Build metadata:\n  commit: ",
    env!("CODEBEAT_BUILD_GIT_HASH"),
    "\n  built: ",
    env!("CODEBEAT_BUILD_TIMESTAMP")
);
