//! Middleware specific storage.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use tracing::trace;

use super::BoxError;

/// Key-value store of data belonging to an IBC middleware.
///
/// Library users should namespace the keys utilized by each
/// middleware, to avoid key conflicts.
pub trait Store {
    /// Read some value from the store. Absent keys yield `None`.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError>;

    /// Write some value to the store.
    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), BoxError>;

    /// Remove a key from the store. Removing an absent key is not an error.
    fn delete(&mut self, key: &str) -> Result<(), BoxError>;
}

impl<S: Store + ?Sized> Store for &mut S {
    #[inline]
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        (**self).read(key)
    }

    #[inline]
    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), BoxError> {
        (**self).write(key, value)
    }

    #[inline]
    fn delete(&mut self, key: &str) -> Result<(), BoxError> {
        (**self).delete(key)
    }
}

/// Store implementation whose keys are namespaced.
#[derive(Debug)]
pub struct NamespacedStore<'namespace, S> {
    namespace: &'namespace str,
    store: S,
}

impl<'namespace, S> NamespacedStore<'namespace, S> {
    /// Create a new namespace key-value store, wrapping an
    /// existing store implementation.
    pub const fn new(namespace: &'namespace str, store: S) -> Self {
        Self { namespace, store }
    }

    /// Return the namespace of this [`NamespacedStore`].
    pub fn namespace(&self) -> &'namespace str {
        self.namespace
    }

    /// Return a reference to the inner store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Return a mutable reference to the inner store.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.store
    }

    #[inline]
    fn key(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }
}

impl<S: Store> Store for NamespacedStore<'_, S> {
    #[inline]
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        self.store.read(&self.key(key))
    }

    #[inline]
    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), BoxError> {
        let key = self.key(key);
        self.store.write(&key, value)
    }

    #[inline]
    fn delete(&mut self, key: &str) -> Result<(), BoxError> {
        let key = self.key(key);
        self.store.delete(&key)
    }
}

/// Writes recorded by a [`CachedStore`], detached from the store
/// they were read against.
///
/// A `None` entry records a deletion.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingWrites {
    ops: BTreeMap<String, Option<Vec<u8>>>,
}

impl PendingWrites {
    /// Check if no writes were recorded.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of distinct keys touched.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Iterate over the recorded operations, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&[u8]>)> {
        self.ops
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    /// Apply every recorded operation onto `store`, in key order.
    ///
    /// Failures are returned as soon as they occur, leaving the
    /// operations applied so far in `store`. Callers must revert the
    /// enclosing transaction if this method errors.
    pub fn apply<S: Store + ?Sized>(self, store: &mut S) -> Result<(), BoxError> {
        trace!(writes = self.ops.len(), "Applying pending writes");
        for (key, op) in self.ops {
            match op {
                Some(value) => store.write(&key, &value)?,
                None => store.delete(&key)?,
            }
        }
        Ok(())
    }
}

/// Overlay of pending writes on top of a read-only parent store.
///
/// Reads are served from the overlay first, falling through to the
/// parent. Writes never reach the parent. Committing means taking the
/// [`PendingWrites`] out with [`CachedStore::into_pending_writes`] and
/// applying them; discarding means dropping the overlay.
pub struct CachedStore<'parent> {
    parent: &'parent dyn Store,
    writes: PendingWrites,
}

impl<'parent> CachedStore<'parent> {
    /// Create an empty overlay over `parent`.
    pub fn new(parent: &'parent dyn Store) -> Self {
        Self {
            parent,
            writes: PendingWrites::default(),
        }
    }

    /// Return the writes recorded so far.
    pub fn pending_writes(&self) -> &PendingWrites {
        &self.writes
    }

    /// Release the borrow on the parent store, keeping the
    /// recorded writes.
    pub fn into_pending_writes(self) -> PendingWrites {
        self.writes
    }
}

impl fmt::Debug for CachedStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedStore")
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

impl Store for CachedStore<'_> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        match self.writes.ops.get(key) {
            Some(op) => Ok(op.clone()),
            None => self.parent.read(key),
        }
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), BoxError> {
        trace!(key, "Caching write");
        self.writes.ops.insert(key.into(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), BoxError> {
        trace!(key, "Caching delete");
        self.writes.ops.insert(key.into(), None);
        Ok(())
    }
}
