use std::env;

fn main() {
    // Release builds may override the crate version, e.g. with a git describe string
    let version = env::var("BUTTERFLY_VERSION_OVERRIDE")
        .or_else(|_| env::var("CARGO_PKG_VERSION"))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=BUTTERFLY_VERSION={version}");

    println!("cargo:rerun-if-env-changed=BUTTERFLY_VERSION_OVERRIDE");
    println!("cargo:rerun-if-changed=Cargo.toml");
}
