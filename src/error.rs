//! Error types and native error-code mapping

use thiserror::Error;

use crate::long_path::to_regular_path;

/// The operation completed successfully.
pub const ERROR_SUCCESS: u32 = 0;
/// The system cannot find the file specified.
pub const ERROR_FILE_NOT_FOUND: u32 = 2;
/// The system cannot find the path specified.
pub const ERROR_PATH_NOT_FOUND: u32 = 3;
/// Access is denied.
pub const ERROR_ACCESS_DENIED: u32 = 5;
/// There are no more files.
pub const ERROR_NO_MORE_FILES: u32 = 18;
/// The process cannot access the file because it is being used by another process.
pub const ERROR_SHARING_VIOLATION: u32 = 32;
/// The parameter is incorrect.
pub const ERROR_INVALID_PARAMETER: u32 = 87;

/// Error kinds that can occur during enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanErrorKind {
    /// File or directory not found
    NotFound,
    /// Permission denied when accessing a file or directory
    AccessDenied,
    /// The file is in use by another process
    SharingViolation,
    /// Any other native failure, carrying the original code
    NativeIoFailure(u32),
    /// Empty or whitespace path supplied to an entry point
    InvalidArgument,
}

/// Represents an error that occurred during enumeration
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ScanError {
    /// The kind of error
    pub kind: ScanErrorKind,
    /// The path where the error occurred, in regular (un-prefixed) form
    pub path: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl ScanError {
    /// Create a new scan error
    pub fn new(kind: ScanErrorKind, path: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(path: &str) -> Self {
        let path = to_regular_path(path).into_owned();
        let message = format!("Not found: {}", path);
        Self::new(ScanErrorKind::NotFound, Some(path), message)
    }

    /// Create an access denied error
    pub fn access_denied(path: &str) -> Self {
        let path = to_regular_path(path).into_owned();
        let message = format!("Access denied: {}", path);
        Self::new(ScanErrorKind::AccessDenied, Some(path), message)
    }

    /// Create a sharing violation error
    pub fn sharing_violation(path: &str) -> Self {
        let path = to_regular_path(path).into_owned();
        let message = format!("File is in use by another process: {}", path);
        Self::new(ScanErrorKind::SharingViolation, Some(path), message)
    }

    /// Create a generic native failure carrying the original code
    pub fn native(code: u32, path: &str) -> Self {
        let path = to_regular_path(path).into_owned();
        let message = format!("Native I/O failure (code {}): {}", code, path);
        Self::new(ScanErrorKind::NativeIoFailure(code), Some(path), message)
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::InvalidArgument, None, message)
    }

    /// Build an error from an [`std::io::Error`] raised for `path`
    pub fn from_io(err: &std::io::Error, path: &str) -> Self {
        match map_native_error(native_code(err), path) {
            Err(mapped) => mapped,
            Ok(()) => Self::native(ERROR_INVALID_PARAMETER, path),
        }
    }

    /// Native code carried by this error, if it has one
    pub fn code(&self) -> Option<u32> {
        match self.kind {
            ScanErrorKind::NativeIoFailure(code) => Some(code),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        let mut mapped = Self::from_io(&err, "");
        mapped.path = None;
        mapped.message = err.to_string();
        mapped
    }
}

/// Translate a native error code into the structured taxonomy.
///
/// A zero code is not an error.
pub fn map_native_error(code: u32, path: &str) -> Result<(), ScanError> {
    match code {
        ERROR_SUCCESS => Ok(()),
        ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => Err(ScanError::not_found(path)),
        ERROR_ACCESS_DENIED => Err(ScanError::access_denied(path)),
        ERROR_SHARING_VIOLATION => Err(ScanError::sharing_violation(path)),
        other => Err(ScanError::native(other, path)),
    }
}

/// Customer bit of a Win32 code; never set on a system-defined code.
pub const APPLICATION_ERROR_BIT: u32 = 1 << 29;

/// Native error code behind an I/O error.
///
/// Windows reports Win32 codes directly. Elsewhere the error kind is
/// translated onto the equivalent Win32 code, and an errno with no
/// equivalent is carried with [`APPLICATION_ERROR_BIT`] set so it cannot
/// alias a system code.
pub(crate) fn native_code(err: &std::io::Error) -> u32 {
    #[cfg(windows)]
    {
        if let Some(code) = err.raw_os_error() {
            return code as u32;
        }
    }

    match err.kind() {
        std::io::ErrorKind::NotFound => ERROR_PATH_NOT_FOUND,
        std::io::ErrorKind::PermissionDenied => ERROR_ACCESS_DENIED,
        std::io::ErrorKind::InvalidInput => ERROR_INVALID_PARAMETER,
        _ => err
            .raw_os_error()
            .map(|errno| APPLICATION_ERROR_BIT | errno as u32)
            .unwrap_or(ERROR_INVALID_PARAMETER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_code_is_success() {
        assert!(map_native_error(ERROR_SUCCESS, "C:\\data").is_ok());
    }

    #[test]
    fn test_not_found_codes() {
        for code in [ERROR_FILE_NOT_FOUND, ERROR_PATH_NOT_FOUND] {
            let err = map_native_error(code, "C:\\missing").unwrap_err();
            assert_eq!(err.kind, ScanErrorKind::NotFound);
            assert_eq!(err.path.as_deref(), Some("C:\\missing"));
        }
    }

    #[test]
    fn test_access_and_sharing() {
        let err = map_native_error(ERROR_ACCESS_DENIED, "C:\\secret").unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::AccessDenied);

        let err = map_native_error(ERROR_SHARING_VIOLATION, "C:\\locked.db").unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::SharingViolation);
    }

    #[test]
    fn test_generic_failure_keeps_code_and_regular_path() {
        let long = format!("C:\\{}", "x".repeat(300));
        let prefixed = format!("\\\\?\\{}", long);
        let err = map_native_error(1117, &prefixed).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::NativeIoFailure(1117));
        assert_eq!(err.code(), Some(1117));
        assert_eq!(err.path.as_deref(), Some(long.as_str()));
        assert!(err.message.contains("1117"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ScanError::from(io);
        assert_eq!(err.kind, ScanErrorKind::NotFound);
        assert!(err.path.is_none());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(ScanError::from_io(&io, "C:\\x").kind, ScanErrorKind::AccessDenied);
    }

    #[cfg(unix)]
    #[test]
    fn test_errno_does_not_alias_win32_codes() {
        // EIO and EPIPE share their numbers with ACCESS_DENIED and SHARING_VIOLATION.
        for errno in [5, 32] {
            let io = std::io::Error::from_raw_os_error(errno);
            let err = ScanError::from_io(&io, "/data/disk");
            let code = APPLICATION_ERROR_BIT | errno as u32;
            assert_eq!(err.kind, ScanErrorKind::NativeIoFailure(code));
            assert_eq!(err.path.as_deref(), Some("/data/disk"));
        }

        let io = std::io::Error::from_raw_os_error(2);
        assert_eq!(ScanError::from_io(&io, "/gone").kind, ScanErrorKind::NotFound);
        let io = std::io::Error::from_raw_os_error(13);
        assert_eq!(ScanError::from_io(&io, "/root").kind, ScanErrorKind::AccessDenied);
    }
}
