use chrono::Utc;
use std::error::Error;
use std::path::PathBuf;
use std::process::Command;

/// Short hash of HEAD, or "unknown" outside a git checkout
fn git_short_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = PathBuf::from(std::env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?);

    let generated = format!(
        "pub const BUILD_TIME: &str = {:?};\npub const GIT_HASH: &str = {:?};\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        git_short_hash(),
    );
    std::fs::write(out_dir.join("version.rs"), generated)?;

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=.git/HEAD");
    Ok(())
}
