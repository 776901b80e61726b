//! Build script for storefront crate.
//!
//! Fingerprints static assets (stylesheet and product page script) so they
//! can be served with immutable cache headers.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let static_dir = Path::new(&manifest_dir).join("static");

    fingerprint(&static_dir, "css", "main", "CSS_HASH");
    fingerprint(&static_dir, "js", "product", "JS_HASH");
}

/// Hash `{kind}/{stem}.{kind}` and copy it to `{kind}/derived/{stem}.{hash}.{kind}`.
///
/// Exposes the short hash to the crate as `env!(env_key)`.
fn fingerprint(static_dir: &Path, kind: &str, stem: &str, env_key: &str) {
    let source = static_dir.join(kind).join(format!("{stem}.{kind}"));
    println!("cargo:rerun-if-changed={}", source.display());

    let content = match fs::read(&source) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {}: {e}", source.display());
            println!("cargo:rustc-env={env_key}=");
            return;
        }
    };

    let digest = format!("{:x}", Sha256::digest(&content));
    let short_hash = &digest[..8];
    println!("cargo:rustc-env={env_key}={short_hash}");

    let derived_dir = static_dir.join(kind).join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived asset directory");
    fs::copy(
        &source,
        derived_dir.join(format!("{stem}.{short_hash}.{kind}")),
    )
    .expect("Failed to copy asset to derived directory");
}
