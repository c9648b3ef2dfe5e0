//! # Tool Path Resolver
//!
//! Finds an ffmpeg binary on disk when none was embedded at build time:
//! - Bundled next to the application (`tools/<platform>/ffmpeg`)
//! - Pointed to by an environment variable
//! - System-installed, on `PATH`

use crate::platform::{PayloadKind, Platform};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TOOL_NAME: &str = "ffmpeg";

/// Tool path resolver for bundled and system ffmpeg
pub struct ToolPathResolver {
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a new path resolver
    pub fn new() -> Self {
        Self {
            tools_dir: Self::detect_bundled_tools_dir(),
        }
    }

    /// Resolver rooted at an explicit tools directory
    pub fn with_tools_dir(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: Some(tools_dir.into()),
        }
    }

    /// Detect the bundled tools directory
    fn detect_bundled_tools_dir() -> Option<PathBuf> {
        // Strategy 1: explicit overrides
        for var in ["CLIP2GIF_TOOLS_DIR", "TOOLS_DIR"] {
            if let Ok(dir) = env::var(var) {
                let tools_path = PathBuf::from(dir);
                debug!("Checking {} environment variable: {:?}", var, tools_path);
                if tools_path.is_dir() {
                    return Some(tools_path);
                }
            }
        }

        // Strategy 2: next to the executable
        if let Ok(exe_path) = env::current_exe() {
            if let Some(app_dir) = exe_path.parent() {
                let possible_paths = [
                    app_dir.join("tools"),
                    app_dir.join("resources").join("tools"),
                ];

                for path in &possible_paths {
                    debug!("Checking bundled path: {:?}", path);
                    if path.is_dir() {
                        debug!("Found bundled tools directory: {:?}", path);
                        return Some(path.clone());
                    }
                }
            }
        }

        debug!("No bundled tools directory found");
        None
    }

    /// Resolve ffmpeg for the given payload kind: bundled first, then `PATH`
    pub fn resolve(&self, kind: PayloadKind) -> Option<PathBuf> {
        let platform = match (kind, Platform::current()) {
            (PayloadKind::Windows, _) => Platform::Windows,
            (PayloadKind::Unix, Ok(current)) if current.payload_kind() == PayloadKind::Unix => current,
            (PayloadKind::Unix, _) => Platform::Linux,
        };

        if let Some(ref tools_dir) = self.tools_dir {
            if let Some(bundled) = Self::bundled_tool_path(tools_dir, platform) {
                debug!("Using bundled ffmpeg: {:?}", bundled);
                return Some(bundled);
            }
        }

        // A system binary is only usable for the payload kind we run on
        if matches!(Platform::current(), Ok(current) if current.payload_kind() == kind) {
            if let Some(system_path) = Self::find_in_system_path() {
                debug!("Using system ffmpeg: {:?}", system_path);
                return Some(system_path);
            }
        }

        warn!("ffmpeg not found for {} targets", kind);
        None
    }

    /// Get the path of a bundled tool, if present
    fn bundled_tool_path(tools_dir: &Path, platform: Platform) -> Option<PathBuf> {
        let file_name = format!("{}{}", TOOL_NAME, platform.executable_suffix());

        // 1. Direct in platform folder: tools/{platform}/ffmpeg
        // 2. In tool-specific subfolder: tools/{platform}/ffmpeg/ffmpeg
        let candidates = [
            tools_dir.join(platform.tools_dir_name()).join(&file_name),
            tools_dir
                .join(platform.tools_dir_name())
                .join(TOOL_NAME)
                .join(&file_name),
        ];

        candidates.into_iter().find(|path| path.is_file())
    }

    /// Find an executable ffmpeg in system PATH (honours `PATHEXT` on Windows)
    fn find_in_system_path() -> Option<PathBuf> {
        Self::find_in_search_path(env::var_os("PATH"))
    }

    fn find_in_search_path(paths: Option<OsString>) -> Option<PathBuf> {
        which::which_in(TOOL_NAME, paths, Path::new(".")).ok()
    }

    /// Get a report of tool availability
    pub fn report(&self) -> String {
        let mut report = String::new();
        report.push_str("Tool Path Resolver Report\n");
        report.push_str(&format!("System: {}\n", Platform::system_info()));
        report.push_str(&format!("Bundled tools dir: {:?}\n", self.tools_dir));

        match Platform::current() {
            Ok(platform) => match self.resolve(platform.payload_kind()) {
                Some(path) => report.push_str(&format!("  ✅ {} -> {:?}\n", TOOL_NAME, path)),
                None => report.push_str(&format!(
                    "  ❌ {} (not found; bundle it under tools/{}/ or install it on PATH)\n",
                    TOOL_NAME,
                    platform.tools_dir_name()
                )),
            },
            Err(e) => report.push_str(&format!("  ❌ {}\n", e)),
        }

        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bundled_tool_direct_layout() {
        let temp_dir = TempDir::new().unwrap();
        let platform_dir = temp_dir.path().join("windows");
        std::fs::create_dir_all(&platform_dir).unwrap();
        std::fs::write(platform_dir.join("ffmpeg.exe"), b"MZ").unwrap();

        let resolver = ToolPathResolver::with_tools_dir(temp_dir.path());
        assert_eq!(
            resolver.resolve(PayloadKind::Windows),
            Some(platform_dir.join("ffmpeg.exe"))
        );
    }

    #[test]
    fn test_bundled_tool_subfolder_layout() {
        let temp_dir = TempDir::new().unwrap();
        let tool_dir = temp_dir.path().join("windows").join("ffmpeg");
        std::fs::create_dir_all(&tool_dir).unwrap();
        std::fs::write(tool_dir.join("ffmpeg.exe"), b"MZ").unwrap();

        let resolver = ToolPathResolver::with_tools_dir(temp_dir.path());
        assert_eq!(resolver.resolve(PayloadKind::Windows), Some(tool_dir.join("ffmpeg.exe")));
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_requires_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let candidate = temp_dir.path().join("ffmpeg");
        std::fs::write(&candidate, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&candidate, std::fs::Permissions::from_mode(0o644)).unwrap();

        let search_path = || Some(temp_dir.path().as_os_str().to_os_string());
        assert_eq!(ToolPathResolver::find_in_search_path(search_path()), None);

        std::fs::set_permissions(&candidate, std::fs::Permissions::from_mode(0o755)).unwrap();
        let found = ToolPathResolver::find_in_search_path(search_path()).unwrap();
        assert_eq!(
            found.canonicalize().unwrap(),
            candidate.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_report_mentions_tool() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = ToolPathResolver::with_tools_dir(temp_dir.path());
        let report = resolver.report();
        assert!(report.contains("ffmpeg"));
        assert!(report.contains("Bundled tools dir"));
    }
}
