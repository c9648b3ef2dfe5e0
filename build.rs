//! Embeds the ffmpeg payload for the target family, when one is available.
//!
//! Lookup order per payload: environment variable, then `assets/ffmpeg/`.
//! A missing payload is not an error: the runtime falls back to a bundled
//! or system ffmpeg.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn locate(env_var: &str, fallback: &Path) -> Option<PathBuf> {
    println!("cargo:rerun-if-env-changed={}", env_var);
    println!("cargo:rerun-if-changed={}", fallback.display());

    if let Ok(path) = env::var(env_var) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
        println!("cargo:warning={} points to a missing file: {}", env_var, path.display());
    }

    fallback.is_file().then(|| fallback.to_path_buf())
}

fn constant(name: &str, payload: Option<PathBuf>) -> String {
    match payload {
        Some(path) => format!(
            "pub(crate) const {}: Option<&[u8]> = Some(include_bytes!({:?}));\n",
            name,
            path.display().to_string()
        ),
        None => format!("pub(crate) const {}: Option<&[u8]> = None;\n", name),
    }
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let assets = manifest_dir.join("assets").join("ffmpeg");
    let family = env::var("CARGO_CFG_TARGET_FAMILY").unwrap_or_default();

    // Only the payload the target can execute is worth the binary size.
    let unix = if family.split(',').any(|f| f == "unix") {
        locate("CLIP2GIF_FFMPEG_UNIX", &assets.join("ffmpeg"))
    } else {
        None
    };
    let windows = if family.split(',').any(|f| f == "windows") {
        locate("CLIP2GIF_FFMPEG_WINDOWS", &assets.join("ffmpeg.exe"))
    } else {
        None
    };

    let mut generated = String::new();
    generated.push_str(&constant("UNIX_PAYLOAD", unix));
    generated.push_str(&constant("WINDOWS_PAYLOAD", windows));

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(out_dir.join("embedded_payloads.rs"), generated)
        .expect("failed to write embedded payload table");
}
