// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Darwin implementation
//!
//! The macOS syscalls already have the normalized shape (position and
//! options on every call, `XATTR_NOFOLLOW` for symlinks), and our option bits
//! are the `<sys/xattr.h>` values, so this is a thin pass-through.

use std::ffi::CStr;
use std::os::fd::RawFd;

use super::policy::{Addressing, DARWIN};
use super::{buf_parts, check_size, check_status, Shim};
use crate::error::ShimResult;
use crate::options::Options;

/// Shim for macOS and iOS
#[derive(Debug, Clone, Copy, Default)]
pub struct DarwinShim;

fn native(options: Options) -> libc::c_int {
    options.bits() as libc::c_int
}

impl Shim for DarwinShim {
    fn getxattr(
        &self,
        path: &CStr,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize> {
        DARWIN.check_get(Addressing::Path, position, options)?;
        let (value, size) = buf_parts(buf);
        let rv = unsafe {
            libc::getxattr(
                path.as_ptr(),
                name.as_ptr(),
                value,
                size,
                position,
                native(options),
            )
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
        DARWIN.check_get(Addressing::Fd, position, options)?;
        let (value, size) = buf_parts(buf);
        let rv = unsafe {
            libc::fgetxattr(fd, name.as_ptr(), value, size, position, native(options))
        };
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
        DARWIN.check_set(Addressing::Path, position, options)?;
        let rv = unsafe {
            libc::setxattr(
                path.as_ptr(),
                name.as_ptr(),
                value.as_ptr().cast(),
                value.len(),
                position,
                native(options),
            )
        };
        check_status(rv)
    }

    fn fsetxattr(
        &self,
        fd: RawFd,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()> {
        DARWIN.check_set(Addressing::Fd, position, options)?;
        let rv = unsafe {
            libc::fsetxattr(
                fd,
                name.as_ptr(),
                value.as_ptr().cast(),
                value.len(),
                position,
                native(options),
            )
        };
        check_status(rv)
    }

    fn removexattr(&self, path: &CStr, name: &CStr, options: Options) -> ShimResult<()> {
        DARWIN.check_remove(Addressing::Path, options)?;
        let rv = unsafe { libc::removexattr(path.as_ptr(), name.as_ptr(), native(options)) };
        check_status(rv)
    }

    fn fremovexattr(&self, fd: RawFd, name: &CStr, options: Options) -> ShimResult<()> {
        DARWIN.check_remove(Addressing::Fd, options)?;
        let rv = unsafe { libc::fremovexattr(fd, name.as_ptr(), native(options)) };
        check_status(rv)
    }

    fn listxattr(
        &self,
        path: &CStr,
        buf: Option<&mut [u8]>,
        options: Options,
    ) -> ShimResult<usize> {
        DARWIN.check_list(Addressing::Path, options)?;
        let (list, size) = buf_parts(buf);
        let rv = unsafe { libc::listxattr(path.as_ptr(), list.cast(), size, native(options)) };
        check_size(rv)
    }

    fn flistxattr(
        &self,
        fd: RawFd,
        buf: Option<&mut [u8]>,
        options: Options,
    ) -> ShimResult<usize> {
        DARWIN.check_list(Addressing::Fd, options)?;
        let (list, size) = buf_parts(buf);
        let rv = unsafe { libc::flistxattr(fd, list.cast(), size, native(options)) };
        check_size(rv)
    }
}
