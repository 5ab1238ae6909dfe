//! uid/gid to name resolution
//!
//! Dumps carry numeric ids; the tree keys aggregates by textual user and
//! group names. Lookups go through the OS user database once per distinct
//! id and are cached for the rest of the build, with the numeric id as a
//! string when the database has no entry. The database itself sits behind
//! [`NameSource`] so tests can substitute a fixed table.

use std::collections::HashMap;
use std::ffi::CStr;

/// Source of user and group names for numeric ids.
pub trait NameSource {
    /// Resolve a uid to a user name, `None` when unknown.
    fn user_name(&self, uid: u64) -> Option<String>;

    /// Resolve a gid to a group name, `None` when unknown.
    fn group_name(&self, gid: u64) -> Option<String>;
}

/// Buffer for `getpwuid_r`/`getgrgid_r` string results.
const NAME_BUF_LEN: usize = 16 * 1024;

/// [`NameSource`] backed by the system password and group databases.
#[derive(Debug, Default)]
pub struct SystemNameSource;

impl NameSource for SystemNameSource {
    fn user_name(&self, uid: u64) -> Option<String> {
        let uid = libc::uid_t::try_from(uid).ok()?;
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut buf = vec![0 as libc::c_char; NAME_BUF_LEN];
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        let rc = unsafe {
            libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
        };
        if rc != 0 || result.is_null() {
            return None;
        }
        let name = unsafe { CStr::from_ptr(pwd.pw_name) };
        name.to_str().ok().map(str::to_string)
    }

    fn group_name(&self, gid: u64) -> Option<String> {
        let gid = libc::gid_t::try_from(gid).ok()?;
        let mut grp: libc::group = unsafe { std::mem::zeroed() };
        let mut buf = vec![0 as libc::c_char; NAME_BUF_LEN];
        let mut result: *mut libc::group = std::ptr::null_mut();

        let rc = unsafe {
            libc::getgrgid_r(gid, &mut grp, buf.as_mut_ptr(), buf.len(), &mut result)
        };
        if rc != 0 || result.is_null() {
            return None;
        }
        let name = unsafe { CStr::from_ptr(grp.gr_name) };
        name.to_str().ok().map(str::to_string)
    }
}

/// Caching wrapper around a [`NameSource`].
///
/// Every outcome is cached, including the numeric-string fallback, so each
/// distinct id costs at most one database call per build.
pub struct IdentityCache {
    source: Box<dyn NameSource + Send>,
    users: HashMap<u64, String>,
    groups: HashMap<u64, String>,
}

impl IdentityCache {
    /// Cache over the system databases.
    pub fn system() -> Self {
        Self::with_source(Box::new(SystemNameSource))
    }

    /// Cache over an arbitrary source.
    pub fn with_source(source: Box<dyn NameSource + Send>) -> Self {
        Self {
            source,
            users: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// User name for a uid.
    pub fn user(&mut self, uid: u64) -> &str {
        self.users
            .entry(uid)
            .or_insert_with(|| {
                self.source
                    .user_name(uid)
                    .unwrap_or_else(|| uid.to_string())
            })
            .as_str()
    }

    /// Group name for a gid.
    pub fn group(&mut self, gid: u64) -> &str {
        self.groups
            .entry(gid)
            .or_insert_with(|| {
                self.source
                    .group_name(gid)
                    .unwrap_or_else(|| gid.to_string())
            })
            .as_str()
    }

    /// Distinct uids seen so far.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Distinct gids seen so far.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache")
            .field("users", &self.users.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fixed-table source that counts how often it is consulted.
    struct CountingSource {
        users: HashMap<u64, String>,
        calls: Arc<AtomicUsize>,
    }

    impl CountingSource {
        fn new(users: &[(u64, &str)]) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                users: users
                    .iter()
                    .map(|(id, name)| (*id, name.to_string()))
                    .collect(),
                calls: calls.clone(),
            };
            (source, calls)
        }
    }

    impl NameSource for CountingSource {
        fn user_name(&self, uid: u64) -> Option<String> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.users.get(&uid).cloned()
        }

        fn group_name(&self, _gid: u64) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_known_id_resolves_and_caches() {
        let (source, calls) = CountingSource::new(&[(1000, "alice")]);
        let mut cache = IdentityCache::with_source(Box::new(source));

        assert_eq!(cache.user(1000), "alice");
        assert_eq!(cache.user(1000), "alice");
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unknown_id_falls_back_to_numeric_and_caches() {
        let (source, calls) = CountingSource::new(&[]);
        let mut cache = IdentityCache::with_source(Box::new(source));

        assert_eq!(cache.user(4242), "4242");
        assert_eq!(cache.user(4242), "4242");
        // The miss was cached too: one database consultation only.
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(cache.user_count(), 1);
    }

    #[test]
    fn test_group_fallback() {
        let (source, _calls) = CountingSource::new(&[]);
        let mut cache = IdentityCache::with_source(Box::new(source));
        assert_eq!(cache.group(77), "77");
    }
}
