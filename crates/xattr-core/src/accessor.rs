// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The attribute accessor bound to one target
//!
//! [`Xattr`] owns nothing but its binding: a target, default options and the
//! shim to call. Every operation is an independent request against OS state.
//! The mapping-style behavior lives in the [`XattrMap`] trait.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::error::{translate, Result, ShimError, ShimErrorKind, ShimResult, XattrError};
use crate::names;
use crate::options::Options;
use crate::platform::{NativeShim, Shim};
use crate::target::{Resolved, Target};

/// Extra size-query/fetch rounds allowed when a value keeps growing between
/// the query and the fetch.
pub const RESIZE_RETRIES: usize = 3;

/// Value handed to a write.
///
/// Only bytes can be stored; the `Text` variant exists so that passing text by
/// mistake is reported as [`XattrError::InvalidArgument`] before any OS call
/// rather than being silently encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue<'a> {
    Bytes(Cow<'a, [u8]>),
    Text(Cow<'a, str>),
}

impl<'a> AttrValue<'a> {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Bytes(_) => "bytes",
            AttrValue::Text(_) => "str",
        }
    }

    pub fn into_bytes(self) -> Result<Cow<'a, [u8]>> {
        match self {
            AttrValue::Bytes(bytes) => Ok(bytes),
            other => Err(XattrError::InvalidArgument(format!(
                "Value must be bytes, {} was passed.",
                other.type_name()
            ))),
        }
    }
}

impl<'a> From<&'a [u8]> for AttrValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        AttrValue::Bytes(Cow::Borrowed(value))
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for AttrValue<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        AttrValue::Bytes(Cow::Borrowed(value.as_slice()))
    }
}

impl<'a> From<&'a Vec<u8>> for AttrValue<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        AttrValue::Bytes(Cow::Borrowed(value.as_slice()))
    }
}

impl From<Vec<u8>> for AttrValue<'static> {
    fn from(value: Vec<u8>) -> Self {
        AttrValue::Bytes(Cow::Owned(value))
    }
}

impl<'a> From<&'a str> for AttrValue<'a> {
    fn from(value: &'a str) -> Self {
        AttrValue::Text(Cow::Borrowed(value))
    }
}

impl From<String> for AttrValue<'static> {
    fn from(value: String) -> Self {
        AttrValue::Text(Cow::Owned(value))
    }
}

/// Extended attributes of one path or file descriptor.
///
/// ```no_run
/// use xattr_core::{Xattr, XattrMap};
///
/// let attrs = Xattr::new("/tmp/report.txt")?;
/// attrs.set("user.origin", b"https://example.com")?;
/// assert!(attrs.contains("user.origin")?);
/// for name in attrs.keys()? {
///     println!("{name}");
/// }
/// # Ok::<(), xattr_core::XattrError>(())
/// ```
pub struct Xattr<S: Shim = NativeShim> {
    target: Target,
    resolved: Resolved,
    options: Options,
    shim: S,
}

impl Xattr<NativeShim> {
    pub fn new(target: impl Into<Target>) -> Result<Self> {
        Self::with_options(target, Options::empty())
    }

    /// `options` are OR-ed into every call made through this accessor.
    pub fn with_options(target: impl Into<Target>, options: Options) -> Result<Self> {
        Self::with_shim(target, options, NativeShim::default())
    }
}

impl<S: Shim> Xattr<S> {
    pub fn with_shim(target: impl Into<Target>, options: Options, shim: S) -> Result<Self> {
        let target = target.into();
        let resolved = target.resolve()?;
        Ok(Self {
            target,
            resolved,
            options,
            shim,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn options(&self) -> Options {
        self.options
    }

    fn fail(&self, err: ShimError) -> XattrError {
        debug!("xattr call on {} failed: {:?}", self.target, err);
        translate(err, Some(self.target.to_string()))
    }

    /// Run the query-then-fetch protocol, re-querying when the fetch reports
    /// that the buffer became too small.
    fn read_sized(
        &self,
        op: &str,
        mut call: impl FnMut(Option<&mut [u8]>) -> ShimResult<usize>,
    ) -> Result<Vec<u8>> {
        for attempt in 0..=RESIZE_RETRIES {
            let size = call(None).map_err(|e| self.fail(e))?;
            trace!("{} on {}: query returned {} bytes", op, self.target, size);
            if size == 0 {
                return Ok(Vec::new());
            }

            let mut buf = vec![0u8; size];
            match call(Some(&mut buf)) {
                Ok(len) => {
                    buf.truncate(len);
                    return Ok(buf);
                }
                Err(err) if err.kind == ShimErrorKind::Os && err.errno == libc::ERANGE => {
                    debug!(
                        "{} on {}: size changed after query (attempt {})",
                        op,
                        self.target,
                        attempt + 1
                    );
                }
                Err(err) => return Err(self.fail(err)),
            }
        }

        warn!(
            "{} on {}: size kept changing after {} retries",
            op, self.target, RESIZE_RETRIES
        );
        Err(self.fail(ShimError::os(libc::ERANGE)))
    }

    /// Read `name`; fails with [`XattrError::NotFound`] when absent.
    pub fn get_with(&self, name: &str, options: Options) -> Result<Vec<u8>> {
        let c_name = names::encode(&names::to_syscall_name(name))?;
        let options = options | self.options;
        self.read_sized("get", |buf| {
            self.shim.get(&self.resolved, &c_name, buf, 0, options)
        })
    }

    pub fn set_with<'v>(
        &self,
        name: &str,
        value: impl Into<AttrValue<'v>>,
        options: Options,
    ) -> Result<()> {
        let value = value.into().into_bytes()?;
        let c_name = names::encode(&names::to_syscall_name(name))?;
        self.shim
            .set(&self.resolved, &c_name, &value, 0, options | self.options)
            .map_err(|e| self.fail(e))
    }

    pub fn remove_with(&self, name: &str, options: Options) -> Result<()> {
        let c_name = names::encode(&names::to_syscall_name(name))?;
        self.shim
            .remove(&self.resolved, &c_name, options | self.options)
            .map_err(|e| self.fail(e))
    }

    /// Names as the syscalls report them: undecoded and, on FreeBSD, without
    /// the synthetic `user.` prefix.
    pub fn list_raw_with(&self, options: Options) -> Result<Vec<Vec<u8>>> {
        let options = options | self.options;
        let buf = self.read_sized("list", |buf| self.shim.list(&self.resolved, buf, options))?;
        Ok(names::split_raw(&buf))
    }

    pub fn list_raw(&self) -> Result<Vec<Vec<u8>>> {
        self.list_raw_with(Options::empty())
    }

    pub fn list_with(&self, options: Options) -> Result<Vec<String>> {
        names::decode_list(self.list_raw_with(options)?)
    }
}

impl<S: Shim> fmt::Display for Xattr<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Path(path) => write!(f, "<xattr file='{}'>", path.display()),
            Target::Fd(fd) => write!(f, "<xattr fd={}>", fd),
        }
    }
}

impl<S: Shim> fmt::Debug for Xattr<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Xattr")
            .field(self.target.flavor(), &self.target)
            .field("options", &self.options)
            .finish()
    }
}

/// Dictionary-like view of a set of extended attributes.
///
/// Implementors provide the four primitives; everything else is derived from
/// them. Only the lookups that ask for it (`get_opt`, `get_or`, `contains`,
/// `setdefault`) turn a missing attribute into a value.
pub trait XattrMap {
    fn get(&self, name: &str) -> Result<Vec<u8>>;

    fn set<'v, V: Into<AttrValue<'v>>>(&self, name: &str, value: V) -> Result<()>;

    fn remove(&self, name: &str) -> Result<()>;

    fn list(&self) -> Result<Vec<String>>;

    fn get_opt(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match self.get(name) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The stored value, or `default` when the attribute is absent. A present
    /// but empty value is returned as-is.
    fn get_or(&self, name: &str, default: Vec<u8>) -> Result<Vec<u8>> {
        Ok(self.get_opt(name)?.unwrap_or(default))
    }

    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.get_opt(name)?.is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.list()
    }

    fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn items(&self) -> Result<Vec<(String, Vec<u8>)>> {
        self.list()?
            .into_iter()
            .map(|name| {
                let value = self.get(&name)?;
                Ok((name, value))
            })
            .collect()
    }

    fn values(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.items()?.into_iter().map(|(_, value)| value).collect())
    }

    fn to_map(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        Ok(self.items()?.into_iter().collect())
    }

    /// Write each pair in order, stopping at the first failure.
    fn update<'v, I, K, V>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue<'v>>,
    {
        for (name, value) in pairs {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Remove every listed attribute. Not atomic: names that disappear in the
    /// meantime are skipped, names added in the meantime survive.
    fn clear(&self) -> Result<()> {
        for name in self.list()? {
            match self.remove(&name) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn setdefault(&self, name: &str, default: Vec<u8>) -> Result<Vec<u8>> {
        match self.get_opt(name)? {
            Some(value) => Ok(value),
            None => {
                self.set(name, default.as_slice())?;
                Ok(default)
            }
        }
    }
}

impl<S: Shim> XattrMap for Xattr<S> {
    fn get(&self, name: &str) -> Result<Vec<u8>> {
        self.get_with(name, Options::empty())
    }

    fn set<'v, V: Into<AttrValue<'v>>>(&self, name: &str, value: V) -> Result<()> {
        self.set_with(name, value, Options::empty())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.remove_with(name, Options::empty())
    }

    fn list(&self) -> Result<Vec<String>> {
        self.list_with(Options::empty())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ENOATTR;
    use std::cell::{Cell, RefCell};
    use std::ffi::CStr;
    use std::os::fd::RawFd;

    /// In-memory shim following the Linux conventions, with hooks to simulate
    /// a concurrent writer growing a value between query and fetch.
    #[derive(Default)]
    pub(crate) struct MemoryShim {
        attrs: RefCell<BTreeMap<Vec<u8>, Vec<u8>>>,
        /// Number of upcoming size queries after which the value grows
        grow_after_query: Cell<usize>,
        /// Same, for the name list: each query adds a new attribute
        grow_list_after_query: Cell<usize>,
        pub calls: Cell<usize>,
    }

    impl MemoryShim {
        fn read(&self, name: &CStr, buf: Option<&mut [u8]>) -> ShimResult<usize> {
            self.calls.set(self.calls.get() + 1);
            let mut attrs = self.attrs.borrow_mut();
            let value = attrs
                .get_mut(name.to_bytes())
                .ok_or(ShimError::os(ENOATTR))?;
            match buf {
                None => {
                    let size = value.len();
                    if self.grow_after_query.get() > 0 {
                        self.grow_after_query.set(self.grow_after_query.get() - 1);
                        value.push(b'+');
                    }
                    Ok(size)
                }
                Some(buf) if buf.len() < value.len() => Err(ShimError::os(libc::ERANGE)),
                Some(buf) => {
                    buf[..value.len()].copy_from_slice(value);
                    Ok(value.len())
                }
            }
        }

        fn write(&self, name: &CStr, value: &[u8], options: Options) -> ShimResult<()> {
            self.calls.set(self.calls.get() + 1);
            let mut attrs = self.attrs.borrow_mut();
            let exists = attrs.contains_key(name.to_bytes());
            if options.contains(Options::CREATE) && exists {
                return Err(ShimError::os(libc::EEXIST));
            }
            if options.contains(Options::REPLACE) && !exists {
                return Err(ShimError::os(ENOATTR));
            }
            attrs.insert(name.to_bytes().to_vec(), value.to_vec());
            Ok(())
        }

        fn delete(&self, name: &CStr) -> ShimResult<()> {
            self.calls.set(self.calls.get() + 1);
            self.attrs
                .borrow_mut()
                .remove(name.to_bytes())
                .map(|_| ())
                .ok_or(ShimError::os(ENOATTR))
        }

        fn names(&self, buf: Option<&mut [u8]>) -> ShimResult<usize> {
            self.calls.set(self.calls.get() + 1);
            let mut list = Vec::new();
            for name in self.attrs.borrow().keys() {
                list.extend_from_slice(name);
                list.push(0);
            }
            match buf {
                None => {
                    let pending = self.grow_list_after_query.get();
                    if pending > 0 {
                        self.grow_list_after_query.set(pending - 1);
                        let name = format!("user.late{}", pending);
                        let name = names::to_syscall_name(&name).into_owned().into_bytes();
                        self.attrs.borrow_mut().insert(name, Vec::new());
                    }
                    Ok(list.len())
                }
                Some(buf) if buf.len() < list.len() => Err(ShimError::os(libc::ERANGE)),
                Some(buf) => {
                    buf[..list.len()].copy_from_slice(&list);
                    Ok(list.len())
                }
            }
        }
    }

    impl Shim for MemoryShim {
        fn getxattr(
            &self,
            _path: &CStr,
            name: &CStr,
            buf: Option<&mut [u8]>,
            _position: u32,
            _options: Options,
        ) -> ShimResult<usize> {
            self.read(name, buf)
        }

        fn fgetxattr(
            &self,
            _fd: RawFd,
            name: &CStr,
            buf: Option<&mut [u8]>,
            _position: u32,
            _options: Options,
        ) -> ShimResult<usize> {
            self.read(name, buf)
        }

        fn setxattr(
            &self,
            _path: &CStr,
            name: &CStr,
            value: &[u8],
            _position: u32,
            options: Options,
        ) -> ShimResult<()> {
            self.write(name, value, options)
        }

        fn fsetxattr(
            &self,
            _fd: RawFd,
            name: &CStr,
            value: &[u8],
            _position: u32,
            options: Options,
        ) -> ShimResult<()> {
            self.write(name, value, options)
        }

        fn removexattr(&self, _path: &CStr, name: &CStr, _options: Options) -> ShimResult<()> {
            self.delete(name)
        }

        fn fremovexattr(&self, _fd: RawFd, name: &CStr, _options: Options) -> ShimResult<()> {
            self.delete(name)
        }

        fn listxattr(
            &self,
            _path: &CStr,
            buf: Option<&mut [u8]>,
            _options: Options,
        ) -> ShimResult<usize> {
            self.names(buf)
        }

        fn flistxattr(
            &self,
            _fd: RawFd,
            buf: Option<&mut [u8]>,
            _options: Options,
        ) -> ShimResult<usize> {
            self.names(buf)
        }
    }

    fn memory_xattr() -> Xattr<MemoryShim> {
        Xattr::with_shim("/virtual/file", Options::empty(), MemoryShim::default()).unwrap()
    }

    #[test]
    fn test_concrete_scenario() {
        let x = memory_xattr();
        assert!(x.list().unwrap().is_empty());
        x.set("user.k1", b"v1").unwrap();
        x.set("user.k2", b"v2").unwrap();
        let mut names = x.list().unwrap();
        names.sort();
        assert_eq!(names, vec!["user.k1", "user.k2"]);
        assert_eq!(x.get("user.k1").unwrap(), b"v1");
        x.remove("user.k1").unwrap();
        assert_eq!(x.list().unwrap(), vec!["user.k2"]);
    }

    #[test]
    fn test_text_value_rejected_before_shim_call() {
        let x = memory_xattr();
        let err = x.set("user.abc", "abc").unwrap_err();
        assert_eq!(
            err,
            XattrError::InvalidArgument("Value must be bytes, str was passed.".into())
        );
        assert_eq!(x.shim.calls.get(), 0);
        assert!(!x.contains("user.abc").unwrap());
    }

    #[test]
    fn test_resize_race_converges() {
        let x = memory_xattr();
        x.set("user.grow", b"abc").unwrap();
        x.shim.grow_after_query.set(2);
        assert_eq!(x.get("user.grow").unwrap(), b"abc++");
    }

    #[test]
    fn test_resize_race_gives_up() {
        let x = memory_xattr();
        x.set("user.grow", b"abc").unwrap();
        x.shim.grow_after_query.set(RESIZE_RETRIES + 1);
        let err = x.get("user.grow").unwrap_err();
        assert!(matches!(err, XattrError::Os(_)));
        assert_eq!(err.errno(), Some(libc::ERANGE));
    }

    #[test]
    fn test_list_resize_race_converges() {
        let x = memory_xattr();
        x.set("user.a", b"1").unwrap();
        x.shim.grow_list_after_query.set(2);
        assert_eq!(
            x.list().unwrap(),
            vec!["user.a", "user.late1", "user.late2"]
        );
    }

    #[test]
    fn test_list_resize_race_gives_up() {
        let x = memory_xattr();
        x.set("user.a", b"1").unwrap();
        x.shim.grow_list_after_query.set(RESIZE_RETRIES + 1);
        let err = x.list().unwrap_err();
        assert!(matches!(err, XattrError::Os(_)));
        assert_eq!(err.errno(), Some(libc::ERANGE));
    }

    #[test]
    fn test_undecodable_names_only_listed_raw() {
        let x = memory_xattr();
        x.shim
            .attrs
            .borrow_mut()
            .insert(vec![b'u', b'.', 0xff], b"v".to_vec());

        assert!(matches!(
            x.list().unwrap_err(),
            XattrError::InvalidArgument(_)
        ));
        assert_eq!(x.list_raw().unwrap(), vec![vec![b'u', b'.', 0xff]]);
        assert_eq!(
            x.list_raw_with(Options::NOFOLLOW).unwrap(),
            x.list_raw().unwrap()
        );
    }

    #[test]
    fn test_missing_attribute() {
        let x = memory_xattr();
        assert!(x.get("user.none").unwrap_err().is_not_found());
        assert!(x.remove("user.none").unwrap_err().is_not_found());
        assert!(x.remove("user.none").unwrap_err().is_not_found());
        assert_eq!(x.get_or("user.none", b"dflt".to_vec()).unwrap(), b"dflt");
        assert_eq!(x.get_opt("user.none").unwrap(), None);
    }

    #[test]
    fn test_default_ignored_for_empty_value() {
        let x = memory_xattr();
        x.set("user.empty", b"").unwrap();
        assert_eq!(x.get_or("user.empty", b"dflt".to_vec()).unwrap(), b"");
        assert!(x.contains("user.empty").unwrap());
    }

    #[test]
    fn test_mapping_helpers() {
        let x = memory_xattr();
        x.update([("user.a", b"1".as_slice()), ("user.b", b"2".as_slice())])
            .unwrap();
        assert_eq!(x.len().unwrap(), 2);
        assert_eq!(
            x.items().unwrap(),
            vec![
                ("user.a".to_string(), b"1".to_vec()),
                ("user.b".to_string(), b"2".to_vec())
            ]
        );
        assert_eq!(x.values().unwrap(), vec![b"1".to_vec(), b"2".to_vec()]);
        assert_eq!(x.setdefault("user.a", b"x".to_vec()).unwrap(), b"1");
        assert_eq!(x.setdefault("user.c", b"3".to_vec()).unwrap(), b"3");
        assert_eq!(x.to_map().unwrap().get("user.c").map(Vec::as_slice), Some(&b"3"[..]));
        x.clear().unwrap();
        assert!(x.is_empty().unwrap());
    }

    #[test]
    fn test_create_and_replace_options() {
        let x = memory_xattr();
        assert!(x
            .set_with("user.r", b"v", Options::REPLACE)
            .unwrap_err()
            .is_not_found());
        x.set_with("user.r", b"v", Options::CREATE).unwrap();
        let err = x.set_with("user.r", b"w", Options::CREATE).unwrap_err();
        assert_eq!(err.errno(), Some(libc::EEXIST));
        x.set_with("user.r", b"w", Options::REPLACE).unwrap();
        assert_eq!(x.get("user.r").unwrap(), b"w");
    }

    #[test]
    fn test_display_and_errors_name_target() {
        let x = memory_xattr();
        assert_eq!(x.to_string(), "<xattr file='/virtual/file'>");
        let err = x.get("user.none").unwrap_err();
        assert_eq!(
            err.failure().and_then(|f| f.target.as_deref()),
            Some("/virtual/file")
        );

        let fd = Xattr::with_shim(7, Options::NOFOLLOW, MemoryShim::default()).unwrap();
        assert_eq!(fd.to_string(), "<xattr fd=7>");
        assert_eq!(fd.options(), Options::NOFOLLOW);
    }

    #[test]
    fn test_nul_in_name_rejected() {
        let x = memory_xattr();
        assert!(matches!(
            x.get("user.a\0b"),
            Err(XattrError::InvalidArgument(_))
        ));
    }
}
