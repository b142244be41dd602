// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Filesystem extended attributes with one API on every platform
//!
//! Linux, macOS, FreeBSD and Solaris all store named byte strings next to a
//! file's contents, but each exposes them through a different syscall family
//! with different flags, naming rules and error codes. This crate hides those
//! differences behind:
//!
//! - [`Xattr`], an accessor bound to a path or open file descriptor, with the
//!   dictionary-like operations of [`XattrMap`];
//! - four free functions ([`getxattr`], [`setxattr`], [`removexattr`],
//!   [`listxattr`]) for one-off calls;
//! - the [`platform::Shim`] trait and its per-OS implementations.
//!
//! Values are opaque bytes. Nothing is cached; every call hits the OS.

#![cfg(unix)]

pub mod accessor;
pub mod error;
pub mod names;
pub mod options;
pub mod platform;
pub mod target;

pub use accessor::{AttrValue, Xattr, XattrMap, RESIZE_RETRIES};
pub use error::{OsFailure, Result, XattrError, ENOATTR};
pub use options::{
    Options, XATTR_CREATE, XATTR_FINDERINFO_NAME, XATTR_MAXNAMELEN, XATTR_NOFOLLOW,
    XATTR_NOSECURITY, XATTR_REPLACE, XATTR_RESOURCEFORK_NAME,
};
pub use platform::{NativeShim, Shim};
pub use target::Target;

/// Read one attribute. `symlink` addresses a symbolic link itself instead of
/// the file it points to.
pub fn getxattr(target: impl Into<Target>, name: &str, symlink: bool) -> Result<Vec<u8>> {
    Xattr::new(target)?.get_with(name, Options::nofollow_if(symlink))
}

/// Write one attribute; `options` may carry [`Options::CREATE`] or
/// [`Options::REPLACE`].
pub fn setxattr<'v>(
    target: impl Into<Target>,
    name: &str,
    value: impl Into<AttrValue<'v>>,
    options: Options,
    symlink: bool,
) -> Result<()> {
    Xattr::new(target)?.set_with(name, value, options | Options::nofollow_if(symlink))
}

pub fn removexattr(target: impl Into<Target>, name: &str, symlink: bool) -> Result<()> {
    Xattr::new(target)?.remove_with(name, Options::nofollow_if(symlink))
}

pub fn listxattr(target: impl Into<Target>, symlink: bool) -> Result<Vec<String>> {
    Xattr::new(target)?.list_with(Options::nofollow_if(symlink))
}
