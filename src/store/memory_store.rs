//! An in-memory store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::{
    store::{StoreConfiguration, StorePlugin, StorePluginCreateError},
    Bytes, ListableStoreTraits, MaybeBytes, ReadableStoreTraits, StorageError, Store, StoreKey,
    StoreKeys, StoreKeysPrefixes, StorePrefix, StorePrefixes, StoreTraits, WritableStoreTraits,
};

/// An in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: RwLock<BTreeMap<StoreKey, Bytes>>,
}

impl MemoryStore {
    /// Create a new memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadableStoreTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map.get(key).cloned())
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map.get(key).map(|entry| entry.len() as u64))
    }
}

impl WritableStoreTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        let mut data_map = self.data_map.write();
        data_map.insert(key.clone(), value);
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let mut data_map = self.data_map.write();
        data_map.remove(key);
        Ok(())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        let mut data_map = self.data_map.write();
        data_map.retain(|key, _| !key.has_prefix(prefix));
        Ok(())
    }
}

impl ListableStoreTraits for MemoryStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map.keys().cloned().collect())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map
            .keys()
            .filter(|&key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let mut keys: StoreKeys = vec![];
        let mut prefixes: StorePrefixes = vec![];
        let data_map = self.data_map.read();
        for key in data_map.keys() {
            if key.has_prefix(prefix) {
                let key_strip = key.as_str().strip_prefix(prefix.as_str()).unwrap();
                let components: Vec<_> = key_strip.split('/').collect();
                if components.len() > 1 {
                    let prefix = StorePrefix::new(prefix.as_str().to_string() + components[0] + "/")?;
                    if !prefixes.contains(&prefix) {
                        prefixes.push(prefix);
                    }
                } else {
                    keys.push(key.clone());
                }
            }
        }
        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }

    fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map
            .iter()
            .filter(|(key, _)| key.has_prefix(prefix))
            .map(|(_, value)| value.len() as u64)
            .sum())
    }
}

impl StoreTraits for MemoryStore {
    /// Reconstructing a memory store from its configuration yields a new empty store;
    /// the contents of a live memory store are not part of its configuration.
    fn create_configuration(&self) -> Option<StoreConfiguration> {
        Some(StoreConfiguration::new("memory"))
    }
}

fn is_name_memory(name: &str) -> bool {
    name.eq("memory")
}

fn create_store_memory(
    _configuration: &StoreConfiguration,
) -> Result<Store, StorePluginCreateError> {
    Ok(std::sync::Arc::new(MemoryStore::new()))
}

inventory::submit! {
    StorePlugin::new("memory", is_name_memory, create_store_memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_test;

    #[test]
    fn memory() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryStore::new();
        store_test::store_write(&store)?;
        store_test::store_read(&store)?;
        store_test::store_list(&store)?;
        Ok(())
    }

    #[test]
    fn list_dir() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryStore::new();
        store.set(&"a/b".try_into()?, vec![0].into())?;
        store.set(&"a/c/d".try_into()?, vec![0].into())?;
        store.set(&"a/c/e".try_into()?, vec![0].into())?;
        let list_dir = store.list_dir(&StorePrefix::new("a/")?)?;
        assert_eq!(list_dir.keys(), &[StoreKey::new("a/b")?]);
        assert_eq!(list_dir.prefixes(), &[StorePrefix::new("a/c/")?]);
        Ok(())
    }
}
