// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for extended attribute access
//!
//! Platform shims report a raw [`ShimError`]; [`translate`] turns it into the
//! caller-facing [`XattrError`] with the failing target attached.

use std::fmt;
use std::io;

use nix::errno::Errno;

/// Errno meaning "attribute absent" on this platform
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const ENOATTR: i32 = libc::ENODATA;
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
pub const ENOATTR: i32 = libc::ENOATTR;
// Attributes are files in the xattr directory, a missing one is ENOENT
#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub const ENOATTR: i32 = libc::ENOENT;
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "solaris",
    target_os = "illumos"
)))]
pub const ENOATTR: i32 = libc::ENOENT;

/// How a shim failure should be classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimErrorKind {
    /// The OS call failed; classify by errno
    Os,
    /// Rejected by platform policy before or instead of the OS call
    Unsupported,
}

/// Failure of one shim primitive: the errno plus its classification hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShimError {
    pub kind: ShimErrorKind,
    pub errno: i32,
}

impl ShimError {
    pub fn os(errno: i32) -> Self {
        Self {
            kind: ShimErrorKind::Os,
            errno,
        }
    }

    pub fn unsupported(errno: i32) -> Self {
        Self {
            kind: ShimErrorKind::Unsupported,
            errno,
        }
    }

    /// Capture the calling thread's errno right after a failed syscall.
    pub fn last() -> Self {
        Self::os(Errno::last() as i32)
    }
}

pub type ShimResult<T> = std::result::Result<T, ShimError>;

/// OS-level details carried by every classified failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsFailure {
    pub errno: i32,
    pub message: String,
    /// Path or descriptor the operation was addressed to
    pub target: Option<String>,
}

impl OsFailure {
    pub fn new(errno: i32, target: Option<String>) -> Self {
        Self {
            errno,
            message: Errno::from_raw(errno).desc().to_string(),
            target,
        }
    }
}

impl fmt::Display for OsFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Errno {}] {}", self.errno, self.message)?;
        if let Some(target) = &self.target {
            write!(f, ": '{}'", target)?;
        }
        Ok(())
    }
}

/// Error returned by every attribute operation
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum XattrError {
    #[error("attribute not found: {0}")]
    NotFound(OsFailure),
    #[error("permission denied: {0}")]
    PermissionDenied(OsFailure),
    #[error("unsupported: {0}")]
    Unsupported(OsFailure),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Os(OsFailure),
}

pub type Result<T> = std::result::Result<T, XattrError>;

impl XattrError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, XattrError::NotFound(_))
    }

    /// OS error code, absent for argument errors raised before any OS call
    pub fn errno(&self) -> Option<i32> {
        self.failure().map(|f| f.errno)
    }

    pub fn failure(&self) -> Option<&OsFailure> {
        match self {
            XattrError::NotFound(f)
            | XattrError::PermissionDenied(f)
            | XattrError::Unsupported(f)
            | XattrError::Os(f) => Some(f),
            XattrError::InvalidArgument(_) => None,
        }
    }
}

impl From<XattrError> for io::Error {
    fn from(err: XattrError) -> Self {
        let kind = match &err {
            XattrError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            other => other
                .errno()
                .map(|code| io::Error::from_raw_os_error(code).kind())
                .unwrap_or(io::ErrorKind::Other),
        };
        io::Error::new(kind, err)
    }
}

/// Classify a shim failure and attach the target it was addressed to.
pub fn translate(err: ShimError, target: Option<String>) -> XattrError {
    let failure = OsFailure::new(err.errno, target);
    if err.kind == ShimErrorKind::Unsupported {
        return XattrError::Unsupported(failure);
    }

    let errno = err.errno;
    if errno == ENOATTR {
        XattrError::NotFound(failure)
    } else if errno == libc::EACCES || errno == libc::EPERM {
        XattrError::PermissionDenied(failure)
    } else if errno == libc::ENOTSUP || errno == libc::EOPNOTSUPP {
        XattrError::Unsupported(failure)
    } else {
        XattrError::Os(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_not_found_code() {
        let err = translate(ShimError::os(ENOATTR), Some("/tmp/f".into()));
        assert!(err.is_not_found());
        assert_eq!(err.errno(), Some(ENOATTR));
    }

    #[test]
    fn test_permission_codes() {
        for code in [libc::EACCES, libc::EPERM] {
            let err = translate(ShimError::os(code), None);
            assert!(matches!(err, XattrError::PermissionDenied(_)));
        }
    }

    #[test]
    fn test_unsupported_kind_wins_over_errno() {
        // EPERM would otherwise be a permission failure
        let err = translate(ShimError::unsupported(libc::EPERM), None);
        assert!(matches!(err, XattrError::Unsupported(_)));

        let err = translate(ShimError::os(libc::ENOTSUP), None);
        assert!(matches!(err, XattrError::Unsupported(_)));
    }

    #[test]
    fn test_other_codes_are_os_failures() {
        let err = translate(ShimError::os(libc::ERANGE), None);
        assert!(matches!(err, XattrError::Os(_)));
        assert_eq!(err.errno(), Some(libc::ERANGE));
    }

    #[test]
    fn test_message_carries_target() {
        let err = translate(ShimError::os(libc::EBADF), Some("fd 42".into()));
        let failure = err.failure().unwrap();
        assert_eq!(failure.target.as_deref(), Some("fd 42"));
        assert!(!failure.message.is_empty());
        assert!(err.to_string().contains(&format!("[Errno {}]", libc::EBADF)));
        assert!(err.to_string().ends_with("'fd 42'"));
    }

    #[test]
    fn test_invalid_argument_has_no_errno() {
        let err = XattrError::InvalidArgument("Value must be bytes, str was passed.".into());
        assert_eq!(err.errno(), None);
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_io_error_conversion_keeps_kind() {
        let err = translate(ShimError::os(libc::EACCES), Some("/root/secret".into()));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
        assert!(io_err.to_string().contains("/root/secret"));
    }
}
