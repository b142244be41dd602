// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Solaris / illumos implementation
//!
//! Extended attributes are regular files inside a hidden attribute directory
//! reached with `openat(fd, name, O_XATTR)`. Path-addressed calls open the
//! path first; every descriptor opened here is owned and closed on return.

use std::ffi::CStr;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use super::policy::{Addressing, SetMode, SOLARIS};
use super::Shim;
use crate::error::{ShimError, ShimResult};
use crate::options::Options;

/// Shim for Solaris and illumos
#[derive(Debug, Clone, Copy, Default)]
pub struct SolarisShim;

const ATTR_MODE: libc::c_uint = 0o644;

fn io_errno(err: io::Error) -> ShimError {
    ShimError::os(err.raw_os_error().unwrap_or(libc::EIO))
}

fn own(fd: libc::c_int) -> ShimResult<OwnedFd> {
    if fd < 0 {
        Err(ShimError::last())
    } else {
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }
}

/// Open `path` to reach its attribute directory. Links carry no attributes
/// here, so a no-follow open of a symlink is Unsupported.
fn open_path(path: &CStr, options: Options) -> ShimResult<OwnedFd> {
    let nofollow = options.contains(Options::NOFOLLOW);
    let mut flags = libc::O_RDONLY;
    if nofollow {
        flags |= libc::O_NOFOLLOW;
    }
    own(unsafe { libc::open(path.as_ptr(), flags) })
        .map_err(|err| SOLARIS.symlink_failure(err, nofollow))
}

/// Attribute names are single path components inside the attribute directory.
fn check_name(name: &CStr) -> ShimResult<()> {
    if name.to_bytes().contains(&b'/') {
        return Err(ShimError::os(libc::EINVAL));
    }
    Ok(())
}

fn open_attr(fd: RawFd, name: &CStr, flags: libc::c_int) -> ShimResult<OwnedFd> {
    check_name(name)?;
    own(unsafe { libc::openat(fd, name.as_ptr(), flags | libc::O_XATTR, ATTR_MODE) })
}

fn open_attr_dir(fd: RawFd) -> ShimResult<OwnedFd> {
    own(unsafe { libc::openat(fd, c".".as_ptr(), libc::O_RDONLY | libc::O_XATTR) })
}

fn read_attr(fd: RawFd, name: &CStr, buf: Option<&mut [u8]>) -> ShimResult<usize> {
    let mut file = File::from(open_attr(fd, name, libc::O_RDONLY)?);
    let size = file.metadata().map_err(io_errno)?.len() as usize;
    let Some(buf) = buf else {
        return Ok(size);
    };
    if buf.len() < size {
        return Err(ShimError::os(libc::ERANGE));
    }

    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_errno(e)),
        }
    }
    Ok(filled)
}

fn write_attr(
    fd: RawFd,
    name: &CStr,
    value: &[u8],
    mode: SetMode,
    nofollow: bool,
) -> ShimResult<()> {
    let mut flags = libc::O_TRUNC;
    flags |= match mode {
        SetMode::ReplaceOnly => libc::O_RDWR,
        SetMode::CreateOnly => libc::O_WRONLY | libc::O_CREAT | libc::O_EXCL,
        SetMode::Upsert => libc::O_WRONLY | libc::O_CREAT,
    };
    if nofollow {
        flags |= libc::O_NOFOLLOW;
    }
    let mut file = File::from(open_attr(fd, name, flags)?);
    file.write_all(value).map_err(io_errno)
}

fn remove_attr(fd: RawFd, name: &CStr) -> ShimResult<()> {
    check_name(name)?;
    let dir = open_attr_dir(fd)?;
    let rv = unsafe { libc::unlinkat(dir.as_raw_fd(), name.as_ptr(), 0) };
    if rv < 0 {
        return Err(ShimError::last());
    }
    Ok(())
}

/// Closes the directory stream (and the descriptor it adopted) on drop.
struct DirStream(*mut libc::DIR);

impl Drop for DirStream {
    fn drop(&mut self) {
        unsafe {
            libc::closedir(self.0);
        }
    }
}

/// Concatenate the attribute directory entries as NUL-terminated names.
fn list_attrs(fd: RawFd, buf: Option<&mut [u8]>) -> ShimResult<usize> {
    let raw = open_attr_dir(fd)?.into_raw_fd();
    let dirp = unsafe { libc::fdopendir(raw) };
    if dirp.is_null() {
        let err = ShimError::last();
        unsafe { libc::close(raw) };
        return Err(err);
    }
    let stream = DirStream(dirp);

    let mut names = Vec::new();
    loop {
        let entry = unsafe { libc::readdir(stream.0) };
        if entry.is_null() {
            break;
        }
        let name = unsafe { CStr::from_ptr((*entry).d_name.as_ptr()) };
        let bytes = name.to_bytes();
        if bytes == b"." || bytes == b".." {
            continue;
        }
        names.extend_from_slice(bytes);
        names.push(0);
    }
    drop(stream);

    match buf {
        None => Ok(names.len()),
        Some(buf) if buf.len() < names.len() => Err(ShimError::os(libc::ERANGE)),
        Some(buf) => {
            buf[..names.len()].copy_from_slice(&names);
            Ok(names.len())
        }
    }
}

impl Shim for SolarisShim {
    fn getxattr(
        &self,
        path: &CStr,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize> {
        SOLARIS.check_get(Addressing::Path, position, options)?;
        let fd = open_path(path, options)?;
        read_attr(fd.as_raw_fd(), name, buf)
    }

    fn fgetxattr(
        &self,
        fd: RawFd,
        name: &CStr,
        buf: Option<&mut [u8]>,
        position: u32,
        options: Options,
    ) -> ShimResult<usize> {
        SOLARIS.check_get(Addressing::Fd, position, options)?;
        read_attr(fd, name, buf)
    }

    fn setxattr(
        &self,
        path: &CStr,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()> {
        let args = SOLARIS.check_set(Addressing::Path, position, options)?;
        let fd = open_path(path, options)?;
        write_attr(fd.as_raw_fd(), name, value, args.mode, args.nofollow)
    }

    fn fsetxattr(
        &self,
        fd: RawFd,
        name: &CStr,
        value: &[u8],
        position: u32,
        options: Options,
    ) -> ShimResult<()> {
        let args = SOLARIS.check_set(Addressing::Fd, position, options)?;
        write_attr(fd, name, value, args.mode, false)
    }

    fn removexattr(&self, path: &CStr, name: &CStr, options: Options) -> ShimResult<()> {
        SOLARIS.check_remove(Addressing::Path, options)?;
        let fd = open_path(path, options)?;
        remove_attr(fd.as_raw_fd(), name)
    }

    fn fremovexattr(&self, fd: RawFd, name: &CStr, options: Options) -> ShimResult<()> {
        SOLARIS.check_remove(Addressing::Fd, options)?;
        remove_attr(fd, name)
    }

    fn listxattr(
        &self,
        path: &CStr,
        buf: Option<&mut [u8]>,
        options: Options,
    ) -> ShimResult<usize> {
        SOLARIS.check_list(Addressing::Path, options)?;
        let fd = open_path(path, options)?;
        list_attrs(fd.as_raw_fd(), buf)
    }

    fn flistxattr(
        &self,
        fd: RawFd,
        buf: Option<&mut [u8]>,
        options: Options,
    ) -> ShimResult<usize> {
        SOLARIS.check_list(Addressing::Fd, options)?;
        list_attrs(fd, buf)
    }
}
