// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Platform-specific syscall shims
//!
//! Each supported OS gets one [`Shim`] implementation with the same eight
//! primitives. [`NativeShim`] names the implementation for the build target;
//! the choice is made at compile time.

use std::ffi::CStr;
use std::os::fd::RawFd;
use std::ptr;

use crate::error::{ShimError, ShimResult};
use crate::options::Options;
use crate::target::Resolved;

pub mod policy;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod linux;

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub mod macos;

#[cfg(target_os = "freebsd")]
pub mod freebsd;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub mod solaris;

pub mod unsupported;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub type NativeShim = linux::LinuxShim;

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub type NativeShim = macos::DarwinShim;

#[cfg(target_os = "freebsd")]
pub type NativeShim = freebsd::FreeBsdShim;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub type NativeShim = solaris::SolarisShim;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "solaris",
    target_os = "illumos"
)))]
pub type NativeShim = unsupported::UnsupportedShim;

/// The eight xattr primitives with one normalized signature each.
///
/// `buf: None` is query mode: the call returns the size a buffer would need.
/// A buffer that is too small fails with `ERANGE`. Lists are always returned
/// as a concatenation of NUL-terminated names. Implementations never retry.
pub trait Shim {
    fn getxattr(
        &self,
        path: &CStr,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize>;

    fn fgetxattr(
        &self,
        fd: RawFd,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize>;

    fn setxattr(
        &self,
        path: &CStr,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()>;

    fn fsetxattr(
        &self,
        fd: RawFd,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()>;

    fn removexattr(&self, path: &CStr, name: &CStr, options: Options) -> ShimResult<()>;

    fn fremovexattr(&self, fd: RawFd, name: &CStr, options: Options) -> ShimResult<()>;

    fn listxattr(&self, path: &CStr, buf: Option<&mut [u8]>, options: Options)
        -> ShimResult<usize>;

    fn flistxattr(&self, fd: RawFd, buf: Option<&mut [u8]>, options: Options)
        -> ShimResult<usize>;

    fn get(
        &self,
        target: &Resolved,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize> {
        match target {
            Resolved::Path(path) => self.getxattr(path, name, buf, position, options),
            Resolved::Fd(fd) => self.fgetxattr(*fd, name, buf, position, options),
        }
    }

    fn set(
        &self,
        target: &Resolved,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()> {
        match target {
            Resolved::Path(path) => self.setxattr(path, name, value, position, options),
            Resolved::Fd(fd) => self.fsetxattr(*fd, name, value, position, options),
        }
    }

    fn remove(&self, target: &Resolved, name: &CStr, options: Options) -> ShimResult<()> {
        match target {
            Resolved::Path(path) => self.removexattr(path, name, options),
            Resolved::Fd(fd) => self.fremovexattr(*fd, name, options),
        }
    }

    fn list(
        &self,
        target: &Resolved,
        buf: Option<&mut [u8]>,
        options: Options,
    ) -> ShimResult<usize> {
        match target {
            Resolved::Path(path) => self.listxattr(path, buf, options),
            Resolved::Fd(fd) => self.flistxattr(*fd, buf, options),
        }
    }
}

/// Pointer/length pair for an optional output buffer (null in query mode).
#[allow(dead_code)]
pub(crate) fn buf_parts(buf: Option<&mut [u8]>) -> (*mut libc::c_void, usize) {
    match buf {
        Some(buf) => (buf.as_mut_ptr().cast(), buf.len()),
        None => (ptr::null_mut(), 0),
    }
}

/// Convert a byte-count return value, capturing errno on failure.
#[allow(dead_code)]
pub(crate) fn check_size(rv: libc::ssize_t) -> ShimResult<usize> {
    if rv < 0 {
        Err(ShimError::last())
    } else {
        Ok(rv as usize)
    }
}

/// Convert a status return value, capturing errno on failure.
#[allow(dead_code)]
pub(crate) fn check_status(rv: libc::c_int) -> ShimResult<()> {
    if rv < 0 {
        Err(ShimError::last())
    } else {
        Ok(())
    }
}
