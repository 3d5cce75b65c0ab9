//! A storage adapter which logs store method calls.

use std::{io::Write, sync::Arc};

use itertools::Itertools;
use parking_lot::Mutex;

use crate::{
    store::StoreConfiguration, Bytes, ListableStoreTraits, MaybeBytes, ReadableStoreTraits,
    StorageError, StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix, StoreTraits,
    WritableStoreTraits,
};

/// The usage log storage adapter. Logs store method calls.
///
/// It is intended to aid in debugging and optimising performance by revealing storage
/// access patterns.
///
/// ### Example (log to stdout)
/// ```rust
/// # use std::sync::Arc;
/// # use parking_lot::Mutex;
/// # use sharded_store::store::MemoryStore;
/// # use sharded_store::storage_adapter::usage_log::UsageLogStorageAdapter;
/// let store = Arc::new(MemoryStore::new());
/// let log_writer = Arc::new(Mutex::new(std::io::stdout()));
/// let store = Arc::new(UsageLogStorageAdapter::new(store, log_writer, || {
///     chrono::Utc::now().format("[%T%.3f] ").to_string()
/// }));
/// ````
///
/// Applying store methods with the above [`UsageLogStorageAdapter`] prints outputs like:
/// ```text
/// [23:41:19.885] set(data/temperature/3.0, len=140) -> Ok(())
/// [23:41:19.887] get(data/temperature/3.0) -> len=Ok(140)
/// [23:41:19.891] list_dir() -> (keys:[], prefixes:[data/])
/// [23:41:19.892] list() -> [data/temperature/3.0, data/temperature/4.0]
/// ```
pub struct UsageLogStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    handle: Arc<Mutex<dyn Write + Send + Sync>>,
    prefix_func: fn() -> String,
}

impl<TStorage: ?Sized> core::fmt::Debug for UsageLogStorageAdapter<TStorage> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        writeln!(f, "usage log")
    }
}

impl<TStorage: ?Sized> UsageLogStorageAdapter<TStorage> {
    /// Create a new usage log storage adapter.
    pub fn new(
        storage: Arc<TStorage>,
        handle: Arc<Mutex<dyn Write + Send + Sync>>,
        prefix_func: fn() -> String,
    ) -> Self {
        Self {
            storage,
            handle,
            prefix_func,
        }
    }
}

impl<TStorage: ?Sized + ReadableStoreTraits> ReadableStoreTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let result = self.storage.get(key);
        writeln!(
            self.handle.lock(),
            "{}get({key}) -> len={:?}",
            (self.prefix_func)(),
            result.as_ref().map(|v| v.as_ref().map_or(0, Bytes::len))
        )?;
        result
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let result = self.storage.size_key(key);
        writeln!(
            self.handle.lock(),
            "{}size_key({key}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn contains(&self, key: &StoreKey) -> Result<bool, StorageError> {
        let result = self.storage.contains(key);
        writeln!(
            self.handle.lock(),
            "{}contains({key}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }
}

impl<TStorage: ?Sized + ListableStoreTraits> ListableStoreTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let result = self.storage.list();
        writeln!(
            self.handle.lock(),
            "{}list() -> [{}]",
            (self.prefix_func)(),
            result.as_ref().unwrap_or(&vec![]).iter().format(", ")
        )?;
        result
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let result = self.storage.list_prefix(prefix);
        writeln!(
            self.handle.lock(),
            "{}list_prefix({prefix}) -> [{}]",
            (self.prefix_func)(),
            result.as_ref().unwrap_or(&vec![]).iter().format(", ")
        )?;
        result
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let result = self.storage.list_dir(prefix);
        writeln!(
            self.handle.lock(),
            "{}list_dir({prefix}) -> (keys:[{}], prefixes:[{}])",
            (self.prefix_func)(),
            result.as_ref().map_or(String::new(), |skp| skp
                .keys()
                .iter()
                .format(", ")
                .to_string()),
            result.as_ref().map_or(String::new(), |skp| skp
                .prefixes()
                .iter()
                .format(", ")
                .to_string()),
        )?;
        result
    }

    fn size(&self) -> Result<u64, StorageError> {
        let result = self.storage.size();
        writeln!(
            self.handle.lock(),
            "{}size() -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError> {
        let result: Result<u64, StorageError> = self.storage.size_prefix(prefix);
        writeln!(
            self.handle.lock(),
            "{}size_prefix({prefix}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }
}

impl<TStorage: ?Sized + WritableStoreTraits> WritableStoreTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        let len = value.len();
        let result = self.storage.set(key, value);
        writeln!(
            self.handle.lock(),
            "{}set({key}, len={}) -> {result:?}",
            (self.prefix_func)(),
            len
        )?;
        result
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let result = self.storage.erase(key);
        writeln!(
            self.handle.lock(),
            "{}erase({key}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn erase_values(&self, keys: &[StoreKey]) -> Result<(), StorageError> {
        let result = self.storage.erase_values(keys);
        writeln!(
            self.handle.lock(),
            "{}erase_values([{}]) -> {result:?}",
            (self.prefix_func)(),
            keys.iter().format(", ")
        )?;
        result
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        let result = self.storage.erase_prefix(prefix);
        writeln!(
            self.handle.lock(),
            "{}erase_prefix({prefix}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }
}

impl<TStorage: ?Sized + StoreTraits> StoreTraits for UsageLogStorageAdapter<TStorage> {
    /// An adapter wraps live state, it has no configuration.
    fn create_configuration(&self) -> Option<StoreConfiguration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn logs_method_calls() -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(Mutex::new(Vec::<u8>::new()));
        let adapter =
            UsageLogStorageAdapter::new(store, log.clone(), || "> ".to_string());

        adapter.set(&"a/b".try_into()?, vec![0, 1].into())?;
        adapter.get(&"a/b".try_into()?)?;
        adapter.list()?;

        let log = String::from_utf8(log.lock().clone())?;
        assert!(log.contains("> set(a/b, len=2) -> Ok(())"));
        assert!(log.contains("> get(a/b) -> len=Ok(2)"));
        assert!(log.contains("> list() -> [a/b]"));
        Ok(())
    }
}
