// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Attribute name rules: namespace prefixing and list decoding
//!
//! FreeBSD stores user attributes without a namespace prefix (the namespace is
//! a separate syscall argument), while Linux and Darwin names carry it
//! inline. The accessor presents FreeBSD names with a synthetic `user.`
//! prefix; these functions are the only place that conversion happens.

use std::borrow::Cow;
use std::ffi::CString;

use crate::error::{Result, XattrError};

/// Namespace prefix exposed for FreeBSD user attributes
pub const USER_PREFIX: &str = "user.";

/// Whether the running platform stores names without the `user.` prefix.
pub const STRIPS_USER_PREFIX: bool = cfg!(target_os = "freebsd");

/// Name as passed to the syscall for a caller-supplied name.
pub fn to_syscall_name(name: &str) -> Cow<'_, str> {
    syscall_name_for(name, STRIPS_USER_PREFIX)
}

/// Name as shown to callers for a syscall-level name.
pub fn to_public_name(raw: &str) -> Cow<'_, str> {
    public_name_for(raw, STRIPS_USER_PREFIX)
}

pub(crate) fn syscall_name_for(name: &str, strip_prefix: bool) -> Cow<'_, str> {
    if strip_prefix {
        if let Some(bare) = name.strip_prefix(USER_PREFIX) {
            return Cow::Borrowed(bare);
        }
    }
    Cow::Borrowed(name)
}

pub(crate) fn public_name_for(raw: &str, add_prefix: bool) -> Cow<'_, str> {
    if add_prefix {
        Cow::Owned(format!("{USER_PREFIX}{raw}"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Encode a name for the syscall boundary.
pub fn encode(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| {
        XattrError::InvalidArgument(format!(
            "attribute name contains an interior NUL byte: {:?}",
            name
        ))
    })
}

/// Split a NUL-terminated name concatenation, dropping the trailing empty
/// segment.
pub fn split_raw(buf: &[u8]) -> Vec<Vec<u8>> {
    let mut names: Vec<Vec<u8>> = buf.split(|&b| b == 0).map(<[u8]>::to_vec).collect();
    if names.last().is_some_and(Vec::is_empty) {
        names.pop();
    }
    names
}

/// Decode raw names as UTF-8 and apply the public prefix rule.
pub fn decode_list(raw: Vec<Vec<u8>>) -> Result<Vec<String>> {
    raw.into_iter()
        .map(|bytes| match String::from_utf8(bytes) {
            Ok(name) => Ok(to_public_name(&name).into_owned()),
            Err(e) => Err(XattrError::InvalidArgument(format!(
                "attribute name is not valid UTF-8: {:?}",
                String::from_utf8_lossy(e.as_bytes())
            ))),
        })
        .collect()
}

/// Convert a FreeBSD length-prefixed name list into NUL-terminated form in
/// place. The total length is unchanged: each length byte becomes a
/// terminator.
pub fn convert_length_prefixed(buf: &mut [u8]) {
    let mut offset = 0;
    while offset < buf.len() {
        let len = buf[offset] as usize;
        let end = (offset + 1 + len).min(buf.len());
        buf.copy_within(offset + 1..end, offset);
        buf[end - 1] = 0;
        offset = end;
    }
}
