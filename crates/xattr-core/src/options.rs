// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Option flags and well-known attribute names

use bitflags::bitflags;

bitflags! {
    /// Flags accepted by every attribute operation.
    ///
    /// The bit values match the Darwin `<sys/xattr.h>` constants so they can be
    /// handed to the macOS syscalls unchanged; other platforms translate them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Options: u32 {
        /// Act on a symbolic link itself instead of its target
        const NOFOLLOW = 0x0001;
        /// Fail if the attribute already exists
        const CREATE = 0x0002;
        /// Fail if the attribute does not exist
        const REPLACE = 0x0004;
        /// Bypass authorization checking
        const NOSECURITY = 0x0008;
    }
}

/// Don't follow symbolic links
pub const XATTR_NOFOLLOW: Options = Options::NOFOLLOW;

/// Set the value, fail if the attribute already exists
pub const XATTR_CREATE: Options = Options::CREATE;

/// Set the value, fail if the attribute does not exist
pub const XATTR_REPLACE: Options = Options::REPLACE;

/// Bypass authorization checking (e.g. when doing auth-related work)
pub const XATTR_NOSECURITY: Options = Options::NOSECURITY;

/// Maximum attribute name length documented by Darwin
pub const XATTR_MAXNAMELEN: usize = 127;

/// Finder metadata blob (Darwin only)
pub const XATTR_FINDERINFO_NAME: &str = "com.apple.FinderInfo";

/// Resource fork (Darwin only)
pub const XATTR_RESOURCEFORK_NAME: &str = "com.apple.ResourceFork";

impl Options {
    /// Convenience for the `symlink` flag of the one-shot functions.
    pub fn nofollow_if(symlink: bool) -> Self {
        if symlink {
            Options::NOFOLLOW
        } else {
            Options::empty()
        }
    }
}
