// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! What an attribute operation is addressed to

use std::ffi::CString;
use std::fmt;
use std::fs::File;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::error::{Result, XattrError};

/// A filesystem path or an open file descriptor.
///
/// Descriptor targets are borrowed: nothing in this crate closes them, the
/// caller keeps ownership for as long as it needs the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Path(PathBuf),
    Fd(RawFd),
}

impl Target {
    /// Target the descriptor exposed by `obj` (a `File`, socket, `OwnedFd`...).
    pub fn from_fd<F: AsRawFd + ?Sized>(obj: &F) -> Self {
        Target::Fd(obj.as_raw_fd())
    }

    pub fn is_fd(&self) -> bool {
        matches!(self, Target::Fd(_))
    }

    /// Encode the target for the syscall boundary.
    pub fn resolve(&self) -> Result<Resolved> {
        match self {
            Target::Path(path) => {
                let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
                    XattrError::InvalidArgument(format!(
                        "path contains an interior NUL byte: {}",
                        path.display()
                    ))
                })?;
                Ok(Resolved::Path(c_path))
            }
            Target::Fd(fd) => Ok(Resolved::Fd(*fd)),
        }
    }

    /// Short description used by [`std::fmt::Debug`] on accessors.
    pub(crate) fn flavor(&self) -> &'static str {
        match self {
            Target::Path(_) => "file",
            Target::Fd(_) => "fd",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Path(path) => write!(f, "{}", path.display()),
            Target::Fd(fd) => write!(f, "fd {}", fd),
        }
    }
}

/// Target in the form handed to a shim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Path(CString),
    Fd(RawFd),
}

impl From<PathBuf> for Target {
    fn from(path: PathBuf) -> Self {
        Target::Path(path)
    }
}

impl From<&Path> for Target {
    fn from(path: &Path) -> Self {
        Target::Path(path.to_path_buf())
    }
}

impl From<&PathBuf> for Target {
    fn from(path: &PathBuf) -> Self {
        Target::Path(path.clone())
    }
}

impl From<&str> for Target {
    fn from(path: &str) -> Self {
        Target::Path(PathBuf::from(path))
    }
}

impl From<String> for Target {
    fn from(path: String) -> Self {
        Target::Path(PathBuf::from(path))
    }
}

impl From<RawFd> for Target {
    fn from(fd: RawFd) -> Self {
        Target::Fd(fd)
    }
}

impl From<&File> for Target {
    fn from(file: &File) -> Self {
        Target::from_fd(file)
    }
}

impl From<BorrowedFd<'_>> for Target {
    fn from(fd: BorrowedFd<'_>) -> Self {
        Target::Fd(fd.as_raw_fd())
    }
}
