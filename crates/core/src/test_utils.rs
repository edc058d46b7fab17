use alloc::borrow::ToOwned;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::BoxError;
use crate::store::{NamespacedStore, Store};

/// In-memory [`Store`], to be used by tests.
#[derive(Default, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MockStore {
    pub btreemap: BTreeMap<String, Vec<u8>>,
    /// Keys whose writes fail.
    pub rejected_keys: BTreeSet<String>,
}

impl MockStore {
    pub const fn namespaced(self, namespace: &str) -> NamespacedStore<'_, Self> {
        NamespacedStore::new(namespace, self)
    }

    /// Hash of the whole store, used to compare snapshots of state.
    pub fn state_hash(&self) -> u64 {
        use core::hash::{Hash, Hasher};

        // FNV-1a over the derived `Hash` impl keeps this usable without std
        struct Fnv(u64);

        impl Hasher for Fnv {
            fn finish(&self) -> u64 {
                self.0
            }

            fn write(&mut self, bytes: &[u8]) {
                for byte in bytes {
                    self.0 ^= u64::from(*byte);
                    self.0 = self.0.wrapping_mul(0x100000001b3);
                }
            }
        }

        let mut hasher = Fnv(0xcbf29ce484222325);
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl Store for MockStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        Ok(self.btreemap.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), BoxError> {
        if self.rejected_keys.contains(key) {
            return Err(format!("write to {key} rejected").into());
        }
        self.btreemap.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), BoxError> {
        self.btreemap.remove(key);
        Ok(())
    }
}
