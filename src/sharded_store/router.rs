//! Key routing over the component stores of a sharded store.

use itertools::Itertools;

use crate::{ListableStoreTraits, StorageError, Store, StoreKey, StoreKeys, StorePrefix};

use super::{array_shards::ArrayShardAssignment, ShardedStoreCreateError};

/// A group shard: a store owning every key under a group mount prefix.
#[derive(Debug)]
pub(crate) struct GroupShardAssignment {
    pub(crate) mount: StorePrefix,
    pub(crate) store: Store,
}

impl GroupShardAssignment {
    /// Lists the keys of this shard under a global `prefix`, rewritten as global keys.
    pub(crate) fn global_keys(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let local_keys = if self.mount.as_str().starts_with(prefix.as_str()) {
            self.store.list()?
        } else if let Some(local) = prefix.as_str().strip_prefix(self.mount.as_str()) {
            self.store.list_prefix(&StorePrefix::new(local)?)?
        } else {
            return Ok(vec![]);
        };
        local_keys
            .into_iter()
            .map(|local| StoreKey::new(format!("{}{}", self.mount, local)).map_err(StorageError::from))
            .collect()
    }
}

/// The routing table of a sharded store.
///
/// Resolution applies the array chunk rule first, then the longest matching group mount,
/// and falls back to the base store with the key unchanged.
#[derive(Debug)]
pub(crate) struct ShardRouter {
    pub(crate) base: Store,
    pub(crate) group_shards: Vec<GroupShardAssignment>,
    pub(crate) array_shards: Vec<ArrayShardAssignment>,
}

impl ShardRouter {
    /// Create a new router, validating that no mount is nested within another.
    pub(crate) fn new(
        base: Store,
        mut group_shards: Vec<GroupShardAssignment>,
        mut array_shards: Vec<ArrayShardAssignment>,
    ) -> Result<Self, ShardedStoreCreateError> {
        group_shards.sort_by(|a, b| a.mount.cmp(&b.mount));
        array_shards.sort_by(|a, b| a.mount.cmp(&b.mount));
        for (a, b) in group_shards.iter().tuple_combinations() {
            if let Some((inner, outer)) = nested_mounts(&a.mount, &b.mount) {
                return Err(ShardedStoreCreateError::OverlappingGroupMounts(
                    inner.clone(),
                    outer.clone(),
                ));
            }
        }
        for (a, b) in array_shards.iter().tuple_combinations() {
            if let Some((inner, outer)) = nested_mounts(&a.mount, &b.mount) {
                return Err(ShardedStoreCreateError::OverlappingArrayMounts(
                    inner.clone(),
                    outer.clone(),
                ));
            }
        }
        Ok(Self {
            base,
            group_shards,
            array_shards,
        })
    }

    /// Resolve a global key to a component store and the key local to it.
    ///
    /// # Errors
    /// Returns [`StorageError::Integrity`] if the key is a malformed chunk key of an array
    /// mount.
    pub(crate) fn resolve(&self, key: &StoreKey) -> Result<(&Store, StoreKey), StorageError> {
        for assignment in &self.array_shards {
            if let Some(coords) = assignment.chunk_coords_for_key(key)? {
                let (shard_index, local) = assignment.resolve_chunk(&coords);
                let local_key =
                    StoreKey::new(super::array_shards::encode_chunk_coords(&local))?;
                return Ok((&assignment.stores[shard_index], local_key));
            }
        }

        let group = self
            .group_shards
            .iter()
            .filter(|assignment| key.has_prefix(&assignment.mount))
            .max_by_key(|assignment| assignment.mount.as_str().len());
        if let Some(assignment) = group {
            let local = key
                .as_str()
                .strip_prefix(assignment.mount.as_str())
                .unwrap_or(key.as_str());
            return Ok((&assignment.store, StoreKey::new(local)?));
        }

        Ok((&self.base, key.clone()))
    }
}

/// Returns the (inner, outer) pair if one mount is equal to or nested within the other.
fn nested_mounts<'a>(
    a: &'a StorePrefix,
    b: &'a StorePrefix,
) -> Option<(&'a StorePrefix, &'a StorePrefix)> {
    if a.as_str().starts_with(b.as_str()) {
        Some((a, b))
    } else if b.as_str().starts_with(a.as_str()) {
        Some((b, a))
    } else {
        None
    }
}
