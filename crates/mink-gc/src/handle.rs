//! Shared-reference handles with pointer identity.
//!
//! A [`GcRef<T>`] is the canonical way to hold a model object: cloning the
//! handle aliases the same underlying value, and the value is dropped when the
//! last handle goes away. Identity (`ptr_eq`) is the identity the object model
//! uses for prototype-chain membership and cycle checks.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Shared-ownership handle to a heap value.
///
/// Clones alias; the value lives while any handle does.
pub struct GcRef<T> {
    inner: Arc<T>,
}

impl<T> GcRef<T> {
    /// Allocate a new value and return the first handle to it.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Whether two handles alias the same value.
    pub fn ptr_eq(&self, other: &GcRef<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Raw address of the value, usable as an identity key.
    pub fn as_ptr(&self) -> *const T {
        Arc::as_ptr(&self.inner)
    }

    /// Downgrade to a non-owning handle.
    pub fn downgrade(&self) -> WeakRef<T> {
        WeakRef {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live strong handles (including this one).
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T> Clone for GcRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Deref for GcRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for GcRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GcRef").field(&self.inner).finish()
    }
}

/// Non-owning handle; does not keep the value alive.
pub struct WeakRef<T> {
    inner: Weak<T>,
}

impl<T> WeakRef<T> {
    /// Upgrade back to an owning handle, if the value is still alive.
    pub fn upgrade(&self) -> Option<GcRef<T>> {
        self.inner.upgrade().map(|inner| GcRef { inner })
    }

    /// Whether the value has been dropped.
    pub fn is_dead(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

impl<T> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRef")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
