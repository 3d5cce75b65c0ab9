//! A filesystem store.

use std::{
    collections::HashMap,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use walkdir::WalkDir;

use crate::{
    store::{StoreConfiguration, StorePlugin, StorePluginCreateError},
    Bytes, ListableStoreTraits, MaybeBytes, ReadableStoreTraits, StorageError, Store, StoreKey,
    StoreKeyError, StoreKeys, StoreKeysPrefixes, StorePrefix, StorePrefixes, StoreTraits,
    WritableStoreTraits,
};

/// A synchronous filesystem store.
///
/// Keys are mapped to paths below a base directory, with one file per key.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    sort: bool,
    readonly: bool,
    files: Mutex<HashMap<StoreKey, Arc<RwLock<()>>>>,
}

impl FilesystemStore {
    /// Create a new filesystem store at a given `base_path`.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_path`:
    ///   - is not valid, or
    ///   - it points to an existing file rather than a directory.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }

        let readonly = if base_path.exists() {
            // the path already exists, check if it is read only
            let md = std::fs::metadata(&base_path).map_err(FilesystemStoreCreateError::IOError)?;
            md.permissions().readonly()
        } else {
            // the path does not exist, so try and create it. If this succeeds, the filesystem is not read only
            std::fs::create_dir_all(&base_path).map_err(FilesystemStoreCreateError::IOError)?;
            std::fs::remove_dir(&base_path)?;
            false
        };

        Ok(Self {
            base_path,
            sort: false,
            readonly,
            files: Mutex::default(),
        })
    }

    /// Makes the store sort directories/files when walking.
    #[must_use]
    pub const fn sorted(mut self) -> Self {
        self.sort = true;
        self
    }

    /// Maps a [`StoreKey`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        let mut path = self.base_path.clone();
        if !key.as_str().is_empty() {
            path.push(key.as_str());
        }
        path
    }

    /// Maps a filesystem [`PathBuf`] to a [`StoreKey`].
    fn fspath_to_key(&self, path: &Path) -> Result<StoreKey, StoreKeyError> {
        let path = pathdiff::diff_paths(path, &self.base_path)
            .ok_or_else(|| StoreKeyError::from(path.to_str().unwrap_or_default().to_string()))?;
        let path_str = path.to_string_lossy();
        StoreKey::new(path_str)
    }

    /// Maps a [`StorePrefix`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn prefix_to_fs_path(&self, prefix: &StorePrefix) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(prefix.as_str());
        path
    }

    fn get_file_mutex(&self, key: &StoreKey) -> Arc<RwLock<()>> {
        let mut files = self.files.lock();
        files
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone()
    }
}

impl ReadableStoreTraits for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let file = self.get_file_mutex(key);
        let _lock = file.read();

        match std::fs::read(self.key_to_fspath(key)) {
            Ok(bytes) => Ok(Some(bytes.into())),
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    Ok(None)
                } else {
                    Err(err.into())
                }
            }
        }
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let key_path = self.key_to_fspath(key);
        std::fs::metadata(key_path).map_or_else(|_| Ok(None), |metadata| Ok(Some(metadata.len())))
    }
}

impl WritableStoreTraits for FilesystemStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        let file = self.get_file_mutex(key);
        let _lock = file.write();

        // Create directories
        let key_path = self.key_to_fspath(key);
        if let Some(parent) = key_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(key_path)?;
        file.write_all(&value)?;

        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        let file = self.get_file_mutex(key);
        let _lock = file.write();

        let key_path = self.key_to_fspath(key);
        let result = std::fs::remove_file(key_path);
        if let Err(err) = result {
            match err.kind() {
                std::io::ErrorKind::NotFound => Ok(()),
                _ => Err(err.into()),
            }
        } else {
            Ok(())
        }
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        let _lock = self.files.lock(); // lock all operations

        let prefix_path = self.prefix_to_fs_path(prefix);
        let result = std::fs::remove_dir_all(prefix_path);
        if let Err(err) = result {
            match err.kind() {
                std::io::ErrorKind::NotFound => Ok(()),
                _ => Err(err.into()),
            }
        } else {
            Ok(())
        }
    }
}

impl ListableStoreTraits for FilesystemStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        Ok(WalkDir::new(&self.base_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|v| v.path().is_file())
            .filter_map(|v| self.fspath_to_key(v.path()).ok())
            .collect())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Ok(WalkDir::new(self.prefix_to_fs_path(prefix))
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|v| v.path().is_file())
            .filter_map(|v| self.fspath_to_key(v.path()).ok())
            .collect())
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let prefix_path = self.prefix_to_fs_path(prefix);
        let mut keys: StoreKeys = vec![];
        let mut prefixes: StorePrefixes = vec![];
        let dir = std::fs::read_dir(prefix_path);
        if let Ok(dir) = dir {
            for entry in dir {
                let entry = entry?;
                let fs_path = entry.path();
                let path = fs_path.file_name().unwrap_or_default();
                let path = path.to_string_lossy();
                if fs_path.is_dir() {
                    prefixes.push(StorePrefix::new(
                        prefix.as_str().to_string() + &path + "/",
                    )?);
                } else {
                    keys.push(StoreKey::new(prefix.as_str().to_owned() + &path)?);
                }
            }
        }
        if self.sort {
            keys.sort();
            prefixes.sort();
        }

        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }

    fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError> {
        let mut size = 0;
        for key in self.list_prefix(prefix)? {
            if let Some(size_key) = self.size_key(&key)? {
                size += size_key;
            }
        }
        Ok(size)
    }
}

impl StoreTraits for FilesystemStore {
    fn create_configuration(&self) -> Option<StoreConfiguration> {
        let mut configuration = StoreConfiguration::new("filesystem");
        configuration.configuration.insert(
            "base_path".to_string(),
            self.base_path.to_str()?.to_string().into(),
        );
        Some(configuration)
    }
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The path is not valid on this system.
    #[error("base path {0} is not valid")]
    InvalidBasePath(PathBuf),
}

/// Create `count` filesystem stores suitable as the array shards of a sharded store.
///
/// Shard `i` is stored in the `<base_path>/<i>` directory.
///
/// # Errors
/// Returns a [`FilesystemStoreCreateError`] if any shard store cannot be created.
pub fn array_shard_filesystem_stores<P: AsRef<Path>>(
    base_path: P,
    count: usize,
) -> Result<Vec<Store>, FilesystemStoreCreateError> {
    let base_path = base_path.as_ref();
    (0..count)
        .map(|index| {
            let store = FilesystemStore::new(base_path.join(index.to_string()))?;
            Ok(Arc::new(store) as Store)
        })
        .collect()
}

fn is_name_filesystem(name: &str) -> bool {
    name.eq("filesystem")
}

fn create_store_filesystem(
    configuration: &StoreConfiguration,
) -> Result<Store, StorePluginCreateError> {
    let base_path = configuration
        .configuration
        .get("base_path")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| StorePluginCreateError::InvalidConfiguration {
            name: configuration.name.clone(),
            error: "a base_path string is required".to_string(),
        })?;
    let store = FilesystemStore::new(base_path).map_err(|err| {
        StorePluginCreateError::InvalidConfiguration {
            name: configuration.name.clone(),
            error: err.to_string(),
        }
    })?;
    Ok(Arc::new(store))
}

inventory::submit! {
    StorePlugin::new("filesystem", is_name_filesystem, create_store_filesystem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_test;
    use std::error::Error;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?.sorted();
        store_test::store_write(&store)?;
        store_test::store_read(&store)?;
        store_test::store_list(&store)?;
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn array_shard_stores() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let stores = array_shard_filesystem_stores(path.path(), 3)?;
        assert_eq!(stores.len(), 3);
        stores[1].set(&"1.0".try_into()?, vec![0].into())?;
        assert!(path.path().join("1").join("1.0").is_file());
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn configuration() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        let configuration = StoreTraits::create_configuration(&store).unwrap();
        assert_eq!(configuration.name, "filesystem");
        let store = crate::store::store_from_configuration(&configuration)?;
        store.set(&"a".try_into()?, vec![0].into())?;
        assert!(path.path().join("a").is_file());
        Ok(())
    }
}
