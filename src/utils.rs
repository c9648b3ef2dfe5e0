//! # Utility Functions Module
//!
//! Helpers for building external command lines without repeated
//! conversions at every call site.

use std::ffi::{OsStr, OsString};

/// Converts a single argument (string, path, ...) to an owned `OsString`.
pub fn os_arg<T>(item: &T) -> OsString
where
    T: AsRef<OsStr> + ?Sized,
{
    item.as_ref().to_os_string()
}

/// Converts an iterable of homogeneous arguments to `Vec<OsString>`.
///
/// # Example
/// ```rust,ignore
/// let args = to_os_args(["-i", "clip.mov"]);
/// ```
pub fn to_os_args<T, I>(items: I) -> Vec<OsString>
where
    T: AsRef<OsStr>,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| os_arg(&item)).collect()
}

/// Builds a `Vec<OsString>` from heterogeneous arguments.
///
/// Paths are passed through untouched, so non UTF-8 file names survive.
///
/// # Example
/// ```rust,ignore
/// use crate::args;
///
/// let filters = format!("{},palettegen", FILTERS);
/// let args = args!["-i", input_path, "-vf", filters, "-y", palette_path];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        ::std::vec![$($crate::utils::os_arg(&$item)),*]
    };
}
