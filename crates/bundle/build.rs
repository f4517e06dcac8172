//! Build script that embeds the per-platform artifacts for the build target.
//!
//! Generates `$OUT_DIR/embedded.rs` containing a static table of
//! `(locator, bytes)` pairs, one per file under
//! `resources/{category}/{platform}-{arch}/`.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const CATEGORIES: [&str; 2] = ["arduino-cli", "native"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=ARDUKIT_EMBED_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set by cargo"));
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set by cargo"));
    let resources_root = env::var_os("ARDUKIT_EMBED_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| manifest_dir.join("resources"));
    println!("cargo:rerun-if-changed={}", resources_root.display());

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    let entries = match target_segment(&target_os, &target_arch) {
        Some(segment) => collect_entries(&resources_root, &segment),
        None => {
            println!(
                "cargo:warning=no embedded artifacts for unsupported target {target_os}-{target_arch}"
            );
            Vec::new()
        }
    };

    let mut generated = String::from(
        "/// Artifacts embedded for the build target, keyed by resource locator.\n\
         pub(crate) static EMBEDDED: &[(&str, &[u8])] = &[\n",
    );
    for (locator, path) in &entries {
        writeln!(
            generated,
            "    ({locator:?}, include_bytes!({:?})),",
            path.display().to_string()
        )
        .expect("writing to a String cannot fail");
    }
    generated.push_str("];\n");

    fs::write(out_dir.join("embedded.rs"), generated).expect("failed to write embedded.rs");
}

/// `{platform}-{arch}` directory name for a cargo target, matching the
/// runtime classification in `ardukit-core`.
fn target_segment(os: &str, arch: &str) -> Option<String> {
    let platform = match os {
        "windows" => "windows",
        "macos" => "macos",
        "linux" => "linux",
        _ => return None,
    };
    let arch = match arch {
        "x86_64" => "x86_64",
        "aarch64" => "aarch64",
        "arm" => "arm",
        _ => return None,
    };
    Some(format!("{platform}-{arch}"))
}

fn collect_entries(root: &Path, segment: &str) -> Vec<(String, PathBuf)> {
    let mut entries = Vec::new();
    for category in CATEGORIES {
        let dir = root.join(category).join(segment);
        println!("cargo:rerun-if-changed={}", dir.display());
        let Ok(read_dir) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in read_dir.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let absolute = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            entries.push((format!("{category}/{segment}/{name}"), absolute));
        }
    }
    entries.sort();
    entries
}
