// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Per-platform option and position rules
//!
//! Every shim validates its arguments against one of these tables before
//! touching the OS. The tables are plain data so the rules for all platforms
//! are compiled and tested everywhere, not only on the platform they govern.

use crate::error::{ShimError, ShimResult};
use crate::options::Options;

/// How an operation addresses its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    Path,
    Fd,
}

/// Create/replace semantics requested for a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    Upsert,
    CreateOnly,
    ReplaceOnly,
}

/// Validated write arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetArgs {
    pub nofollow: bool,
    pub mode: SetMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub platform: &'static str,
    /// Nonzero positions are handed to the OS instead of being rejected
    pub supports_position: bool,
    /// Options reach the OS unchecked; the kernel does its own validation
    pub passthrough_options: bool,
    /// NOFOLLOW is meaningful on descriptor-addressed operations
    pub fd_nofollow: bool,
    /// Symbolic links can carry attributes of their own
    pub symlink_attrs: bool,
}

pub const DARWIN: Policy = Policy {
    platform: "darwin",
    supports_position: true,
    passthrough_options: true,
    fd_nofollow: true,
    symlink_attrs: true,
};

pub const LINUX: Policy = Policy {
    platform: "linux",
    supports_position: false,
    passthrough_options: false,
    fd_nofollow: false,
    symlink_attrs: true,
};

pub const FREEBSD: Policy = Policy {
    platform: "freebsd",
    supports_position: false,
    passthrough_options: false,
    fd_nofollow: false,
    symlink_attrs: true,
};

pub const SOLARIS: Policy = Policy {
    platform: "solaris",
    supports_position: false,
    passthrough_options: false,
    fd_nofollow: false,
    symlink_attrs: false,
};

fn reject() -> ShimError {
    ShimError::unsupported(libc::EINVAL)
}

impl Policy {
    fn check_position(&self, position: u32) -> ShimResult<()> {
        if position != 0 && !self.supports_position {
            return Err(reject());
        }
        Ok(())
    }

    fn check_nofollow(&self, addressing: Addressing, nofollow: bool) -> ShimResult<()> {
        if nofollow && addressing == Addressing::Fd && !self.fd_nofollow {
            return Err(reject());
        }
        Ok(())
    }

    /// Options for get, remove and list: nothing or exactly NOFOLLOW.
    fn check_read_options(&self, addressing: Addressing, options: Options) -> ShimResult<()> {
        if self.passthrough_options {
            return Ok(());
        }
        if !(options.is_empty() || options == Options::NOFOLLOW) {
            return Err(reject());
        }
        self.check_nofollow(addressing, options.contains(Options::NOFOLLOW))
    }

    pub fn check_get(
        &self,
        addressing: Addressing,
        position: u32,
        options: Options,
    ) -> ShimResult<()> {
        self.check_position(position)?;
        self.check_read_options(addressing, options)
    }

    /// Without symlink attributes a no-follow remove has nothing to act on,
    /// whatever the path names.
    pub fn check_remove(&self, addressing: Addressing, options: Options) -> ShimResult<()> {
        self.check_read_options(addressing, options)?;
        let nofollow = options.contains(Options::NOFOLLOW);
        if nofollow && !self.passthrough_options && !self.symlink_attrs {
            return Err(reject());
        }
        Ok(())
    }

    pub fn check_list(&self, addressing: Addressing, options: Options) -> ShimResult<()> {
        self.check_read_options(addressing, options)
    }

    /// Writes accept NOFOLLOW plus at most one of CREATE or REPLACE.
    pub fn check_set(
        &self,
        addressing: Addressing,
        position: u32,
        options: Options,
    ) -> ShimResult<SetArgs> {
        self.check_position(position)?;
        let nofollow = options.contains(Options::NOFOLLOW);
        let rest = options - Options::NOFOLLOW;
        let mode = if rest == Options::CREATE {
            SetMode::CreateOnly
        } else if rest == Options::REPLACE {
            SetMode::ReplaceOnly
        } else if rest.is_empty() || self.passthrough_options {
            SetMode::Upsert
        } else {
            return Err(reject());
        };
        if !self.passthrough_options {
            self.check_nofollow(addressing, nofollow)?;
        }
        Ok(SetArgs { nofollow, mode })
    }

    /// Reclassify the `ELOOP` a no-follow open reports for a symlink on
    /// platforms where links carry no attributes.
    pub fn symlink_failure(&self, err: ShimError, nofollow: bool) -> ShimError {
        if nofollow && !self.symlink_attrs && err == ShimError::os(libc::ELOOP) {
            ShimError::unsupported(libc::ELOOP)
        } else {
            err
        }
    }
}
