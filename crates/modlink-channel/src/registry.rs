//! Owner-token table.
//!
//! Endpoints never store the address of a Rust object. They store a token,
//! and the dispatch trampoline resolves it here. Tokens are never reused, so
//! a stale token resolves to nothing instead of to someone else's channel.
//!
//! Each compiled unit linking this crate has its own table; a token is only
//! meaningful to the unit that issued it, which is also the unit whose
//! trampoline is written next to it in the endpoint.

use std::collections::HashMap;
use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use crate::input::InputInner;

/// Identity of the input channel currently owning an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerToken(NonZeroUsize);

impl OwnerToken {
    pub fn get(self) -> usize {
        self.0.get()
    }

    /// The pointer-sized form stored in [`Endpoint::owner_token`](crate::Endpoint::owner_token).
    pub fn as_ptr(self) -> *mut c_void {
        ptr::without_provenance_mut(self.0.get())
    }

    pub fn from_ptr(raw: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(raw.addr()).map(Self)
    }
}

static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);

static OWNERS: LazyLock<Mutex<HashMap<OwnerToken, Arc<InputInner>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn owners() -> MutexGuard<'static, HashMap<OwnerToken, Arc<InputInner>>> {
    OWNERS.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn next_token() -> OwnerToken {
    loop {
        let value = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        if let Some(value) = NonZeroUsize::new(value) {
            return OwnerToken(value);
        }
    }
}

pub(crate) fn insert(token: OwnerToken, inner: Arc<InputInner>) {
    owners().insert(token, inner);
}

pub(crate) fn lookup(token: OwnerToken) -> Option<Arc<InputInner>> {
    owners().get(&token).cloned()
}

pub(crate) fn remove(token: OwnerToken) -> Option<Arc<InputInner>> {
    owners().remove(&token)
}

/// Whether `token` still identifies a live input channel in this unit.
pub fn is_registered(token: OwnerToken) -> bool {
    owners().contains_key(&token)
}

/// Number of input channels registered in this unit.
pub fn registered_count() -> usize {
    owners().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_non_zero() {
        let a = next_token();
        let b = next_token();
        assert_ne!(a, b);
        assert_ne!(a.get(), 0);
    }

    #[test]
    fn token_pointer_roundtrip() {
        let token = next_token();
        assert_eq!(OwnerToken::from_ptr(token.as_ptr()), Some(token));
        assert_eq!(OwnerToken::from_ptr(ptr::null_mut()), None);
    }

    #[test]
    fn unknown_token_is_not_registered() {
        let token = next_token();
        assert!(!is_registered(token));
        assert!(lookup(token).is_none());
        assert!(remove(token).is_none());
    }
}
