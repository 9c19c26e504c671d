//! Long-path prefixing for native calls
//!
//! Paths at or beyond [`MAX_PATH`] characters are rewritten with the
//! extended-length prefix so the native scan and open calls accept them.

use std::borrow::Cow;

/// Historical platform path length limit
pub const MAX_PATH: usize = 260;

/// Extended-length prefix for local paths
pub const LONG_LOCAL_PREFIX: &str = r"\\?\";

/// Extended-length prefix for network share paths
pub const LONG_UNC_PREFIX: &str = r"\\?\UNC\";

/// Network share lead-in
const UNC_LEAD: &str = r"\\";

/// Rewrite `path` into its long-safe form when it reaches the length limit.
pub fn to_long_safe_path(path: &str) -> Cow<'_, str> {
    if path.chars().count() < MAX_PATH || is_long_prefixed(path) {
        return Cow::Borrowed(path);
    }

    match path.strip_prefix(UNC_LEAD) {
        Some(share) => Cow::Owned(format!("{}{}", LONG_UNC_PREFIX, share)),
        None => Cow::Owned(format!("{}{}", LONG_LOCAL_PREFIX, path)),
    }
}

/// Strip either long-path prefix back to the conventional representation.
pub fn to_regular_path(path: &str) -> Cow<'_, str> {
    if let Some(share) = path.strip_prefix(LONG_UNC_PREFIX) {
        return Cow::Owned(format!("{}{}", UNC_LEAD, share));
    }
    match path.strip_prefix(LONG_LOCAL_PREFIX) {
        Some(local) => Cow::Borrowed(local),
        None => Cow::Borrowed(path),
    }
}

/// Whether `path` already carries an extended-length prefix
pub fn is_long_prefixed(path: &str) -> bool {
    path.starts_with(LONG_LOCAL_PREFIX)
}
