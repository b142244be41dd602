// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Linux implementation on top of the `*xattr` / `l*xattr` / `f*xattr` syscalls
//!
//! Names are passed through unchanged, so callers must supply the namespace
//! (`user.`, `trusted.`, ...). The kernel has no partial reads or writes and
//! no NOFOLLOW for descriptors; the policy table rejects both up front.

use std::ffi::{CStr, OsStr};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tracing::debug;

use super::policy::{Addressing, SetMode, LINUX};
use super::{buf_parts, check_size, check_status, Shim};
use crate::error::{ShimError, ShimResult};
use crate::options::Options;

/// Shim for Linux and Android
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxShim;

fn native_flags(mode: SetMode) -> libc::c_int {
    match mode {
        SetMode::Upsert => 0,
        SetMode::CreateOnly => libc::XATTR_CREATE,
        SetMode::ReplaceOnly => libc::XATTR_REPLACE,
    }
}

fn is_symlink(path: &CStr) -> bool {
    let path = Path::new(OsStr::from_bytes(path.to_bytes()));
    std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

impl Shim for LinuxShim {
    fn getxattr(
        &self,
        path: &CStr,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize> {
        LINUX.check_get(Addressing::Path, position, options)?;
        let (value, size) = buf_parts(buf);
        let rv = unsafe {
            if options.contains(Options::NOFOLLOW) {
                libc::lgetxattr(path.as_ptr(), name.as_ptr(), value, size)
            } else {
                libc::getxattr(path.as_ptr(), name.as_ptr(), value, size)
            }
        };
        check_size(rv)
    }

    fn fgetxattr(
        &self,
        fd: RawFd,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize> {
        LINUX.check_get(Addressing::Fd, position, options)?;
        let (value, size) = buf_parts(buf);
        let rv = unsafe { libc::fgetxattr(fd, name.as_ptr(), value, size) };
        check_size(rv)
    }

    fn setxattr(
        &self,
        path: &CStr,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()> {
        let args = LINUX.check_set(Addressing::Path, position, options)?;
        let flags = native_flags(args.mode);
        let rv = unsafe {
            if args.nofollow {
                libc::lsetxattr(
                    path.as_ptr(),
                    name.as_ptr(),
                    value.as_ptr().cast(),
                    value.len(),
                    flags,
                )
            } else {
                libc::setxattr(
                    path.as_ptr(),
                    name.as_ptr(),
                    value.as_ptr().cast(),
                    value.len(),
                    flags,
                )
            }
        };
        match check_status(rv) {
            // The kernel refuses user.* attributes on symlinks with EPERM
            Err(err) if args.nofollow && err.errno == libc::EPERM && is_symlink(path) => {
                debug!(
                    "lsetxattr refused on symlink {:?}: not supported by the kernel",
                    path
                );
                Err(ShimError::unsupported(libc::EPERM))
            }
            other => other,
        }
    }

    fn fsetxattr(
        &self,
        fd: RawFd,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()> {
        let args = LINUX.check_set(Addressing::Fd, position, options)?;
        let rv = unsafe {
            libc::fsetxattr(
                fd,
                name.as_ptr(),
                value.as_ptr().cast(),
                value.len(),
                native_flags(args.mode),
            )
        };
        check_status(rv)
    }

    fn removexattr(&self, path: &CStr, name: &CStr, options: Options) -> ShimResult<()> {
        LINUX.check_remove(Addressing::Path, options)?;
        let rv = unsafe {
            if options.contains(Options::NOFOLLOW) {
                libc::lremovexattr(path.as_ptr(), name.as_ptr())
            } else {
                libc::removexattr(path.as_ptr(), name.as_ptr())
            }
        };
        check_status(rv)
    }

    fn fremovexattr(&self, fd: RawFd, name: &CStr, options: Options) -> ShimResult<()> {
        LINUX.check_remove(Addressing::Fd, options)?;
        let rv = unsafe { libc::fremovexattr(fd, name.as_ptr()) };
        check_status(rv)
    }

    fn listxattr(
        &self,
        path: &CStr,
        buf: Option<&mut [u8]>,
        options: Options,
    ) -> ShimResult<usize> {
        LINUX.check_list(Addressing::Path, options)?;
        let (list, size) = buf_parts(buf);
        let rv = unsafe {
            if options.contains(Options::NOFOLLOW) {
                libc::llistxattr(path.as_ptr(), list.cast(), size)
            } else {
                libc::listxattr(path.as_ptr(), list.cast(), size)
            }
        };
        check_size(rv)
    }

    fn flistxattr(
        &self,
        fd: RawFd,
        buf: Option<&mut [u8]>,
        options: Options,
    ) -> ShimResult<usize> {
        LINUX.check_list(Addressing::Fd, options)?;
        let (list, size) = buf_parts(buf);
        let rv = unsafe { libc::flistxattr(fd, list.cast(), size) };
        check_size(rv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_native_flags() {
        assert_eq!(native_flags(SetMode::Upsert), 0);
        assert_eq!(native_flags(SetMode::CreateOnly), libc::XATTR_CREATE);
        assert_eq!(native_flags(SetMode::ReplaceOnly), libc::XATTR_REPLACE);
    }

    #[test]
    fn test_position_rejected_before_syscall() {
        // A path that cannot exist: reaching the kernel would yield ENOENT
        let path = CString::new("/nonexistent/xattr-core/position").unwrap();
        let name = CString::new("user.test").unwrap();
        let err = LinuxShim
            .setxattr(&path, &name, b"v", 7, Options::empty())
            .unwrap_err();
        assert_eq!(err, ShimError::unsupported(libc::EINVAL));
    }

    #[test]
    fn test_missing_path_reports_enoent() {
        let path = CString::new("/nonexistent/xattr-core/missing").unwrap();
        let name = CString::new("user.test").unwrap();
        let err = LinuxShim
            .getxattr(&path, &name, None, 0, Options::empty())
            .unwrap_err();
        assert_eq!(err, ShimError::os(libc::ENOENT));
    }
}
