use std::env;

/// Embeds the version string shown by `fat-inspector --version`.
///
/// CI release builds pass `RELEASE_VERSION`; local debug builds get a `-dev`
/// suffix so reports produced by unreleased binaries are easy to spot.
fn main() {
    println!("cargo:rerun-if-env-changed=RELEASE_VERSION");

    let release = env::var("RELEASE_VERSION").ok();
    let mut version = match &release {
        Some(v) => v.trim_start_matches('v').to_string(),
        None => env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into()),
    };
    if release.is_none() && env::var("PROFILE").as_deref() == Ok("debug") {
        version.push_str("-dev");
    }

    println!("cargo:rustc-env=APP_VERSION={version}");
}
