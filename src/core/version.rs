//! Build metadata generated by build.rs

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Crate version from Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// One-line description used in startup logging
pub fn version_line() -> String {
    format!(
        "queuehop {} (built {}, {})",
        version(),
        build_time(),
        git_hash()
    )
}
