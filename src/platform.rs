//! # Platform-specific utilities
//!
//! Questo modulo centralizza la logica cross-platform per il provisioning
//! di ffmpeg: quali sistemi operativi sono supportati, quale payload serve
//! a ciascuno e con quale suffisso va materializzato l'eseguibile.

use crate::error::ProvisionError;
use serde::Serialize;
use std::fmt;

/// Operating systems a provisioned ffmpeg can run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

/// Embedded binary flavours; the Unix-like targets share one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Unix,
    Windows,
}

impl Platform {
    /// Platform of the running process
    pub fn current() -> Result<Self, ProvisionError> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an operating-system identifier to a supported platform.
    ///
    /// Accepts the identifiers of `std::env::consts::OS`, plus `darwin`.
    pub fn from_os(os: &str) -> Result<Self, ProvisionError> {
        match os.to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::MacOs),
            "windows" => Ok(Self::Windows),
            _ => Err(ProvisionError::UnsupportedPlatform(os.to_string())),
        }
    }

    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            Self::Linux | Self::MacOs => PayloadKind::Unix,
            Self::Windows => PayloadKind::Windows,
        }
    }

    /// Suffix of the materialized executable
    pub fn executable_suffix(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Linux | Self::MacOs => "",
        }
    }

    /// Directory name used for bundled tools (`tools/<dir>/ffmpeg`)
    pub fn tools_dir_name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Get system information for debugging
    pub fn system_info() -> SystemInfo {
        SystemInfo {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tools_dir_name())
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => f.write_str("unix"),
            Self::Windows => f.write_str("windows"),
        }
    }
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.os, self.arch, self.family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_platforms() {
        assert_eq!(Platform::from_os("linux").unwrap(), Platform::Linux);
        assert_eq!(Platform::from_os("macos").unwrap(), Platform::MacOs);
        assert_eq!(Platform::from_os("darwin").unwrap(), Platform::MacOs);
        assert_eq!(Platform::from_os("windows").unwrap(), Platform::Windows);
    }

    #[test]
    fn test_unix_targets_share_payload() {
        assert_eq!(Platform::Linux.payload_kind(), PayloadKind::Unix);
        assert_eq!(Platform::MacOs.payload_kind(), PayloadKind::Unix);
        assert_eq!(Platform::Windows.payload_kind(), PayloadKind::Windows);
        assert_eq!(Platform::Windows.executable_suffix(), ".exe");
        assert_eq!(Platform::Linux.executable_suffix(), "");
    }

    #[test]
    fn test_unsupported_platform() {
        for os in ["freebsd", "plan9", "android", ""] {
            match Platform::from_os(os) {
                Err(ProvisionError::UnsupportedPlatform(name)) => assert_eq!(name, os),
                other => panic!("expected UnsupportedPlatform for {os:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_system_info() {
        let info = Platform::system_info();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
        assert!(!info.family.is_empty());
    }
}
