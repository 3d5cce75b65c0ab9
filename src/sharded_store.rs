//! A sharded store composing component stores into one hierarchical store.

mod array_shards;
mod config;
mod router;

use std::collections::BTreeSet;
use std::sync::Arc;

use itertools::Itertools;
use thiserror::Error;

use crate::{
    store::StoreConfiguration, Bytes, ListableStoreTraits, MaybeBytes, ReadableStoreTraits,
    StorageError, Store, StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix, StoreTraits,
    WritableStoreTraits,
};

use array_shards::ArrayShardAssignment;
use router::{GroupShardAssignment, ShardRouter};

pub use array_shards::Partition;
pub use config::{
    ArrayShardConfiguration, GroupShardConfiguration, ShardedStoreConfiguration,
    StoreConfigurationError,
};

/// A store composing a base store, group shards, and array shards into a single
/// hierarchical store.
///
/// Build one with a [`ShardedStoreBuilder`] or reconstruct one from a
/// [`ShardedStoreConfiguration`] with [`ShardedStore::from_configuration`]. The routing
/// table is immutable once built.
///
/// See the [crate root documentation](crate) for an example.
#[derive(Debug)]
pub struct ShardedStore {
    router: ShardRouter,
}

/// A sharded store creation error.
#[derive(Debug, Error)]
pub enum ShardedStoreCreateError {
    /// A group shard mount is nested within another group shard mount.
    #[error("group shard mount {0} is nested within {1}")]
    OverlappingGroupMounts(StorePrefix, StorePrefix),
    /// An array shard mount is nested within another array shard mount.
    #[error("array shard mount {0} is nested within {1}")]
    OverlappingArrayMounts(StorePrefix, StorePrefix),
    /// The sharded dimension is not a dimension of the array.
    #[error("sharded dimension {sharded_dimension} of the array mount at {mount} is not less than the dimensionality {dimensionality}")]
    InvalidShardedDimension {
        /// The array mount.
        mount: StorePrefix,
        /// The array dimensionality.
        dimensionality: usize,
        /// The requested sharded dimension.
        sharded_dimension: usize,
    },
    /// An array mount has no shard stores.
    #[error("the array mount at {0} has no shard stores")]
    EmptyShards(StorePrefix),
}

/// A [`ShardedStore`] builder.
pub struct ShardedStoreBuilder {
    base: Store,
    group_shards: Vec<(StorePrefix, Store)>,
    array_shards: Vec<(StorePrefix, usize, usize, Vec<Store>)>,
}

impl ShardedStoreBuilder {
    /// Create a new builder with `base` receiving every key no mount claims.
    #[must_use]
    pub fn new(base: Store) -> Self {
        Self {
            base,
            group_shards: vec![],
            array_shards: vec![],
        }
    }

    /// Mount `store` as a group shard owning every key under `mount`.
    pub fn mount_group(&mut self, mount: StorePrefix, store: Store) -> &mut Self {
        self.group_shards.push((mount, store));
        self
    }

    /// Mount `stores` as the array shards of the array at `mount`.
    ///
    /// The chunks of the array are partitioned over the stores along `sharded_dimension`
    /// with the [`Partition::Modulo`] scheme.
    pub fn mount_array_shards(
        &mut self,
        mount: StorePrefix,
        dimensionality: usize,
        sharded_dimension: usize,
        stores: Vec<Store>,
    ) -> &mut Self {
        self.array_shards
            .push((mount, dimensionality, sharded_dimension, stores));
        self
    }

    /// Build the [`ShardedStore`].
    ///
    /// # Errors
    /// Returns a [`ShardedStoreCreateError`] if mounts of the same kind are nested, an
    /// array mount has no shard stores, or a sharded dimension is out of range.
    pub fn build(&self) -> Result<ShardedStore, ShardedStoreCreateError> {
        let group_shards = self
            .group_shards
            .iter()
            .map(|(mount, store)| GroupShardAssignment {
                mount: mount.clone(),
                store: store.clone(),
            })
            .collect();
        let array_shards = self
            .array_shards
            .iter()
            .map(|(mount, dimensionality, sharded_dimension, stores)| {
                ArrayShardAssignment::new(
                    mount.clone(),
                    *dimensionality,
                    *sharded_dimension,
                    Partition::Modulo,
                    stores.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let router = ShardRouter::new(self.base.clone(), group_shards, array_shards)?;
        Ok(ShardedStore { router })
    }
}

impl ShardedStore {
    /// Resolve a global key to the component store holding it and the key local to that
    /// store.
    ///
    /// Resolution applies the array chunk rule first, then the longest matching group
    /// mount, and falls back to the base store with the key unchanged.
    ///
    /// # Errors
    /// Returns [`StorageError::Integrity`] if the key is a malformed chunk key of an array
    /// mount.
    pub fn resolve(&self, key: &StoreKey) -> Result<(&Store, StoreKey), StorageError> {
        self.router.resolve(key)
    }

    /// Apply `transform` to every component store, returning a sharded store with the same
    /// routing table over the transformed stores.
    ///
    /// Stores are visited in a deterministic order: the base store, then group shards in
    /// mount order, then array shards in mount order with each shard list in sequence. A
    /// store mounted more than once is transformed once and its result is reused, so
    /// sharing is preserved.
    ///
    /// # Errors
    /// Returns the first error of `transform`, aborting the traversal.
    pub fn map_shards<F>(&self, mut transform: F) -> Result<Self, StorageError>
    where
        F: FnMut(&Store) -> Result<Store, StorageError>,
    {
        fn transformed<F>(
            mapped: &mut Vec<(Store, Store)>,
            transform: &mut F,
            store: &Store,
        ) -> Result<Store, StorageError>
        where
            F: FnMut(&Store) -> Result<Store, StorageError>,
        {
            for (original, transformed) in mapped.iter() {
                if Arc::ptr_eq(original, store) {
                    return Ok(transformed.clone());
                }
            }
            let result = transform(store)?;
            mapped.push((store.clone(), result.clone()));
            Ok(result)
        }

        let mut mapped: Vec<(Store, Store)> = vec![];
        let base = transformed(&mut mapped, &mut transform, &self.router.base)?;
        let group_shards = self
            .router
            .group_shards
            .iter()
            .map(|assignment| {
                Ok(GroupShardAssignment {
                    mount: assignment.mount.clone(),
                    store: transformed(&mut mapped, &mut transform, &assignment.store)?,
                })
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        let array_shards = self
            .router
            .array_shards
            .iter()
            .map(|assignment| {
                let stores = assignment
                    .stores
                    .iter()
                    .map(|store| transformed(&mut mapped, &mut transform, store))
                    .collect::<Result<Vec<_>, StorageError>>()?;
                Ok(ArrayShardAssignment {
                    mount: assignment.mount.clone(),
                    dimensionality: assignment.dimensionality,
                    sharded_dimension: assignment.sharded_dimension,
                    partition: assignment.partition,
                    stores,
                })
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(Self {
            router: ShardRouter {
                base,
                group_shards,
                array_shards,
            },
        })
    }
}

impl ReadableStoreTraits for ShardedStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let (store, local) = self.resolve(key)?;
        store.get(&local)
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let (store, local) = self.resolve(key)?;
        store.size_key(&local)
    }

    fn contains(&self, key: &StoreKey) -> Result<bool, StorageError> {
        let (store, local) = self.resolve(key)?;
        store.contains(&local)
    }
}

impl WritableStoreTraits for ShardedStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        for assignment in &self.router.array_shards {
            if key.as_str() == format!("{}{}", assignment.mount, ".zarray") {
                assignment.validate_array_metadata(key, &value)?;
            }
        }
        let (store, local) = self.resolve(key)?;
        store.set(&local, value)
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let (store, local) = self.resolve(key)?;
        store.erase(&local)
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        self.router.base.erase_prefix(prefix)?;
        for assignment in &self.router.group_shards {
            if assignment.mount.as_str().starts_with(prefix.as_str()) {
                assignment.store.erase_prefix(&StorePrefix::root())?;
            } else if let Some(local) = prefix.as_str().strip_prefix(assignment.mount.as_str()) {
                assignment.store.erase_prefix(&StorePrefix::new(local)?)?;
            }
        }
        for assignment in &self.router.array_shards {
            if assignment.mount.as_str().starts_with(prefix.as_str()) {
                for store in &assignment.stores {
                    store.erase_prefix(&StorePrefix::root())?;
                }
            }
        }
        Ok(())
    }
}

impl ListableStoreTraits for ShardedStore {
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let mut keys = self.router.base.list_prefix(prefix)?;
        for assignment in &self.router.group_shards {
            keys.extend(assignment.global_keys(prefix)?);
        }
        for assignment in &self.router.array_shards {
            if assignment.mount.as_str().starts_with(prefix.as_str()) {
                keys.extend(assignment.global_chunk_keys()?);
            }
        }
        keys.sort();
        if let Some((key, _)) = keys.iter().tuple_windows().find(|(a, b)| a == b) {
            return Err(StorageError::Integrity(format!(
                "key {key} was found in multiple component stores"
            )));
        }
        Ok(keys)
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let mut keys = vec![];
        let mut prefixes = BTreeSet::new();
        for key in self.list_prefix(prefix)? {
            let remainder = key
                .as_str()
                .strip_prefix(prefix.as_str())
                .unwrap_or(key.as_str());
            match remainder.split_once('/') {
                Some((child, _)) => {
                    prefixes.insert(StorePrefix::new(
                        prefix.as_str().to_string() + child + "/",
                    )?);
                }
                None => keys.push(key),
            }
        }
        Ok(StoreKeysPrefixes::new(keys, prefixes.into_iter().collect()))
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

impl StoreTraits for ShardedStore {
    fn create_configuration(&self) -> Option<StoreConfiguration> {
        let configuration = self.to_configuration().ok()?;
        let serde_json::Value::Object(configuration) =
            serde_json::to_value(configuration).ok()?
        else {
            return None;
        };
        Some(StoreConfiguration {
            name: "sharded".to_string(),
            configuration,
        })
    }
}
