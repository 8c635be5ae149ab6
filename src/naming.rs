//! File naming for fetched content.
//!
//! Two concerns live here: deriving a filesystem-safe name from a locator,
//! and resolving a destination path that does not collide with an existing
//! file. Neither function touches the filesystem beyond metadata lookups.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::Url;

/// Maximum number of numeric disambiguators tried before giving up.
pub const MAX_DISAMBIGUATORS: usize = 100;

/// Name used when a locator has no usable last path segment.
pub const FALLBACK_FILE_NAME: &str = "download.bin";

/// Errors from destination path resolution.
#[derive(Debug, Error)]
pub enum NamingError {
    /// Every disambiguated candidate already exists.
    #[error("no free file name for {path} after {attempts} attempts")]
    Exhausted {
        /// The desired destination path.
        path: PathBuf,
        /// Number of disambiguated names tried.
        attempts: usize,
    },

    /// A candidate path could not be inspected.
    #[error("cannot inspect {path}: {source}")]
    Io {
        /// The candidate path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The desired path has no file name component.
    #[error("destination {path} has no file name")]
    NoFileName {
        /// The offending path.
        path: PathBuf,
    },
}

/// Resolves a destination path that does not collide with an existing file.
///
/// Returns `desired` when nothing exists there. Otherwise tries
/// `stem_0.ext`, `stem_1.ext`, ... up to [`MAX_DISAMBIGUATORS`] candidates
/// and returns the first one that is free.
///
/// The function never creates a file, so calling it twice without an
/// intervening filesystem change yields the same path.
///
/// # Errors
///
/// Returns [`NamingError::Exhausted`] when every candidate is taken,
/// [`NamingError::NoFileName`] when `desired` ends in `..` or a root, and
/// [`NamingError::Io`] when a candidate cannot be inspected.
pub fn unique_destination(desired: &Path) -> Result<PathBuf, NamingError> {
    unique_destination_with_limit(desired, MAX_DISAMBIGUATORS)
}

/// Same as [`unique_destination`] with an explicit attempt bound.
///
/// # Errors
///
/// See [`unique_destination`].
pub fn unique_destination_with_limit(
    desired: &Path,
    max_attempts: usize,
) -> Result<PathBuf, NamingError> {
    if is_free(desired)? {
        return Ok(desired.to_path_buf());
    }

    let file_name = desired
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| NamingError::NoFileName {
            path: desired.to_path_buf(),
        })?;
    let (stem, ext) = split_extension(file_name);
    let dir = desired.parent().unwrap_or_else(|| Path::new(""));

    for index in 0..max_attempts {
        let candidate = dir.join(format!("{stem}_{index}{ext}"));
        if is_free(&candidate)? {
            return Ok(candidate);
        }
    }

    Err(NamingError::Exhausted {
        path: desired.to_path_buf(),
        attempts: max_attempts,
    })
}

/// True if nothing, not even a dangling symlink, occupies `path`.
fn is_free(path: &Path) -> Result<bool, NamingError> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(false),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(source) => Err(NamingError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Splits `name` into stem and extension (extension keeps its leading dot).
///
/// A leading dot alone does not start an extension: `.hidden` has none.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Derives the suggested file name from a locator's last path segment.
///
/// Trailing slashes are skipped, so `/photos/kitten/` yields `kitten`. The
/// segment is percent-decoded and sanitized. Locators with no non-empty
/// segment fall back to [`FALLBACK_FILE_NAME`].
#[must_use]
pub fn suggested_name_from_url(url: &Url) -> String {
    if let Some(segments) = url.path_segments()
        && let Some(last) = segments.rev().find(|segment| !segment.is_empty())
    {
        let decoded = urlencoding::decode(last)
            .map_or_else(|_| last.to_string(), std::borrow::Cow::into_owned);
        let sanitized = sanitize_file_name(&decoded);
        if !sanitized.trim_matches('_').is_empty() {
            return sanitized;
        }
    }
    FALLBACK_FILE_NAME.to_string()
}

/// Sanitizes a file name for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters) with `_`. Names that would
/// resolve to `.` or `..` have their dots replaced as well.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_plain_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_plain_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
