// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! FreeBSD implementation on top of `extattr_*`
//!
//! The namespace is a separate argument, fixed here to the user namespace, so
//! names reach the kernel without a prefix. The kernel truncates silently
//! when a buffer is too small and has no create/replace flags; both are
//! emulated with a size query before the real call.

use std::ffi::CStr;
use std::os::fd::RawFd;
use std::ptr;

use tracing::trace;

use super::policy::{Addressing, SetMode, FREEBSD};
use super::{check_size, check_status, Shim};
use crate::error::{ShimError, ShimResult, ENOATTR};
use crate::names::convert_length_prefixed;
use crate::options::Options;

const NAMESPACE: libc::c_int = libc::EXTATTR_NAMESPACE_USER;

/// Shim for FreeBSD
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeBsdShim;

/// The object an `extattr_*` call family addresses
#[derive(Debug, Clone, Copy)]
enum Node<'a> {
    File(&'a CStr),
    Link(&'a CStr),
    Fd(RawFd),
}

impl<'a> Node<'a> {
    fn path(path: &'a CStr, options: Options) -> Self {
        if options.contains(Options::NOFOLLOW) {
            Node::Link(path)
        } else {
            Node::File(path)
        }
    }

    fn get(self, name: &CStr, data: *mut libc::c_void, nbytes: usize) -> libc::ssize_t {
        unsafe {
            match self {
                Node::File(p) => {
                    libc::extattr_get_file(p.as_ptr(), NAMESPACE, name.as_ptr(), data, nbytes)
                }
                Node::Link(p) => {
                    libc::extattr_get_link(p.as_ptr(), NAMESPACE, name.as_ptr(), data, nbytes)
                }
                Node::Fd(fd) => libc::extattr_get_fd(fd, NAMESPACE, name.as_ptr(), data, nbytes),
            }
        }
    }

    fn set(self, name: &CStr, value: &[u8]) -> libc::ssize_t {
        let data = value.as_ptr().cast();
        let nbytes = value.len();
        unsafe {
            match self {
                Node::File(p) => {
                    libc::extattr_set_file(p.as_ptr(), NAMESPACE, name.as_ptr(), data, nbytes)
                }
                Node::Link(p) => {
                    libc::extattr_set_link(p.as_ptr(), NAMESPACE, name.as_ptr(), data, nbytes)
                }
                Node::Fd(fd) => libc::extattr_set_fd(fd, NAMESPACE, name.as_ptr(), data, nbytes),
            }
        }
    }

    fn delete(self, name: &CStr) -> libc::c_int {
        unsafe {
            match self {
                Node::File(p) => libc::extattr_delete_file(p.as_ptr(), NAMESPACE, name.as_ptr()),
                Node::Link(p) => libc::extattr_delete_link(p.as_ptr(), NAMESPACE, name.as_ptr()),
                Node::Fd(fd) => libc::extattr_delete_fd(fd, NAMESPACE, name.as_ptr()),
            }
        }
    }

    fn list(self, data: *mut libc::c_void, nbytes: usize) -> libc::ssize_t {
        unsafe {
            match self {
                Node::File(p) => libc::extattr_list_file(p.as_ptr(), NAMESPACE, data, nbytes),
                Node::Link(p) => libc::extattr_list_link(p.as_ptr(), NAMESPACE, data, nbytes),
                Node::Fd(fd) => libc::extattr_list_fd(fd, NAMESPACE, data, nbytes),
            }
        }
    }
}

/// Query the size first so an undersized buffer fails with ERANGE instead of
/// being truncated.
fn read_sized(
    buf: Option<&mut [u8]>,
    call: impl Fn(*mut libc::c_void, usize) -> libc::ssize_t,
) -> ShimResult<usize> {
    let required = check_size(call(ptr::null_mut(), 0))?;
    match buf {
        None => Ok(required),
        Some(buf) if buf.len() < required => Err(ShimError::os(libc::ERANGE)),
        Some(buf) => check_size(call(buf.as_mut_ptr().cast(), buf.len())),
    }
}

fn get(node: Node<'_>, name: &CStr, buf: Option<&mut [u8]>) -> ShimResult<usize> {
    read_sized(buf, |data, nbytes| node.get(name, data, nbytes))
}

fn set(node: Node<'_>, name: &CStr, value: &[u8], mode: SetMode) -> ShimResult<()> {
    if mode != SetMode::Upsert {
        let exists = match check_size(node.get(name, ptr::null_mut(), 0)) {
            Ok(_) => true,
            Err(err) if err.errno == ENOATTR => false,
            Err(err) => return Err(err),
        };
        trace!(?mode, exists, "emulating create/replace with an existence check");
        match (mode, exists) {
            (SetMode::CreateOnly, true) => return Err(ShimError::os(libc::EEXIST)),
            (SetMode::ReplaceOnly, false) => return Err(ShimError::os(ENOATTR)),
            _ => {}
        }
    }
    // Success returns the number of bytes written
    check_size(node.set(name, value)).map(|_| ())
}

fn list(node: Node<'_>, buf: Option<&mut [u8]>) -> ShimResult<usize> {
    match buf {
        None => read_sized(None, |data, nbytes| node.list(data, nbytes)),
        Some(buf) => {
            let len = read_sized(Some(&mut *buf), |data, nbytes| node.list(data, nbytes))?;
            convert_length_prefixed(&mut buf[..len]);
            Ok(len)
        }
    }
}

impl Shim for FreeBsdShim {
    fn getxattr(
        &self,
        path: &CStr,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize> {
        FREEBSD.check_get(Addressing::Path, position, options)?;
        get(Node::path(path, options), name, buf)
    }

    fn fgetxattr(
        &self,
        fd: RawFd,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize> {
        FREEBSD.check_get(Addressing::Fd, position, options)?;
        get(Node::Fd(fd), name, buf)
    }

    fn setxattr(
        &self,
        path: &CStr,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()> {
        let args = FREEBSD.check_set(Addressing::Path, position, options)?;
        set(Node::path(path, options), name, value, args.mode)
    }

    fn fsetxattr(
        &self,
        fd: RawFd,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()> {
        let args = FREEBSD.check_set(Addressing::Fd, position, options)?;
        set(Node::Fd(fd), name, value, args.mode)
    }

    fn removexattr(&self, path: &CStr, name: &CStr, options: Options) -> ShimResult<()> {
        FREEBSD.check_remove(Addressing::Path, options)?;
        check_status(Node::path(path, options).delete(name))
    }

    fn fremovexattr(&self, fd: RawFd, name: &CStr, options: Options) -> ShimResult<()> {
        FREEBSD.check_remove(Addressing::Fd, options)?;
        check_status(Node::Fd(fd).delete(name))
    }

    fn listxattr(
        &self,
        path: &CStr,
        buf: Option<&mut [u8]>,
        options: Options,
    ) -> ShimResult<usize> {
        FREEBSD.check_list(Addressing::Path, options)?;
        list(Node::path(path, options), buf)
    }

    fn flistxattr(
        &self,
        fd: RawFd,
        buf: Option<&mut [u8]>,
        options: Options,
    ) -> ShimResult<usize> {
        FREEBSD.check_list(Addressing::Fd, options)?;
        list(Node::Fd(fd), buf)
    }
}
