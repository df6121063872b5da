use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::store::{KeyValueStore, StoreError};

/// In-process store, optionally limited to a number of bytes.
///
/// Size is counted as key length plus value length, in UTF-8 bytes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: RefCell::default(),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn used_bytes(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }

    /// Snapshot of all entries, sorted by key
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            let replaced = self
                .entries
                .borrow()
                .get(key)
                .map_or(0, |old| key.len() + old.len());
            let remaining = quota.saturating_sub(self.used_bytes() - replaced);
            let needed = key.len() + value.len();
            if needed > remaining {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_owned(),
                    needed,
                    remaining,
                });
            }
        }

        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.len(), 2);

        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(!store.contains_key("a"));
        assert_eq!(store.entries(), vec![("b".to_owned(), "2".to_owned())]);
    }

    #[test]
    fn quota_counts_replaced_entries_once() {
        let store = MemoryStore::with_quota(8);
        store.set("key", "12345").unwrap();
        assert_eq!(store.used_bytes(), 8);

        // Replacing frees the old value first
        store.set("key", "54321").unwrap();

        match store.set("other", "x") {
            Err(StoreError::QuotaExceeded {
                key,
                needed,
                remaining,
            }) => {
                assert_eq!(key, "other");
                assert_eq!(needed, 6);
                assert_eq!(remaining, 0);
            }
            other => panic!("Expected quota error, got {:?}", other),
        }
        assert_eq!(store.get("key").unwrap().as_deref(), Some("54321"));
    }
}
