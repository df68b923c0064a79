// Embeds the package version as LALA_VERSION.
// CI can replace the patch segment through LALA_PATCH_VERSION.

use std::env;

fn main() {
    let version = env::var("CARGO_PKG_VERSION").expect("CARGO_PKG_VERSION not set");

    let (major_minor, patch) = version
        .rsplit_once('.')
        .unwrap_or_else(|| panic!("Invalid version format in Cargo.toml: {}", version));

    let patch = env::var("LALA_PATCH_VERSION").unwrap_or_else(|_| patch.to_string());

    println!("cargo:rustc-env=LALA_VERSION={}.{}", major_minor, patch);
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=LALA_PATCH_VERSION");
}
