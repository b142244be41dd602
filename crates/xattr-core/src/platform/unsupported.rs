// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Stub implementation for platforms without kernel xattr support

use std::ffi::CStr;
use std::os::fd::RawFd;

use super::Shim;
use crate::error::{ShimError, ShimResult};
use crate::options::Options;

/// Shim that fails every primitive with `ENOTSUP`
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedShim;

fn unsupported<T>() -> ShimResult<T> {
    Err(ShimError::unsupported(libc::ENOTSUP))
}

impl Shim for UnsupportedShim {
    fn getxattr(
        &self,
        _path: &CStr,
        _name: &CStr,
        _buf: Option<&mut [u8]>,
        _position: u32,
        _options: Options,
    ) -> ShimResult<usize> {
        unsupported()
    }

    fn fgetxattr(
        &self,
        _fd: RawFd,
        _name: &CStr,
        _buf: Option<&mut [u8]>,
        _position: u32,
        _options: Options,
    ) -> ShimResult<usize> {
        unsupported()
    }

    fn setxattr(
        &self,
        _path: &CStr,
        _name: &CStr,
        _value: &[u8],
        _position: u32,
        _options: Options,
    ) -> ShimResult<()> {
        unsupported()
    }

    fn fsetxattr(
        &self,
        _fd: RawFd,
        _name: &CStr,
        _value: &[u8],
        _position: u32,
        _options: Options,
    ) -> ShimResult<()> {
        unsupported()
    }

    fn removexattr(&self, _path: &CStr, _name: &CStr, _options: Options) -> ShimResult<()> {
        unsupported()
    }

    fn fremovexattr(&self, _fd: RawFd, _name: &CStr, _options: Options) -> ShimResult<()> {
        unsupported()
    }

    fn listxattr(
        &self,
        _path: &CStr,
        _buf: Option<&mut [u8]>,
        _options: Options,
    ) -> ShimResult<usize> {
        unsupported()
    }

    fn flistxattr(
        &self,
        _fd: RawFd,
        _buf: Option<&mut [u8]>,
        _options: Options,
    ) -> ShimResult<usize> {
        unsupported()
    }
}
