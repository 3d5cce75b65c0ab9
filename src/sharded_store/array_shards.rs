//! Array chunk sharding.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{Bytes, ListableStoreTraits, StorageError, Store, StoreKey, StoreKeys, StorePrefix};

use super::ShardedStoreCreateError;

/// The scheme partitioning chunk indices along the sharded dimension over the shard stores.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Chunk index `i` routes to shard `i mod N` at local index `i div N`,
    /// where `N` is the number of shard stores.
    #[default]
    Modulo,
}

/// Chunk indices, one per array dimension.
pub(crate) type ChunkCoords = Vec<u64>;

/// The shard stores of one array mount and the routing of its chunk keys.
#[derive(Debug)]
pub(crate) struct ArrayShardAssignment {
    pub(crate) mount: StorePrefix,
    pub(crate) dimensionality: usize,
    pub(crate) sharded_dimension: usize,
    pub(crate) partition: Partition,
    pub(crate) stores: Vec<Store>,
}

/// Shape and chunk grid fields of array metadata stored at a `.zarray` key.
#[derive(Deserialize)]
struct ArrayMetadata {
    shape: Vec<u64>,
    chunks: Vec<u64>,
}

impl ArrayShardAssignment {
    pub(crate) fn new(
        mount: StorePrefix,
        dimensionality: usize,
        sharded_dimension: usize,
        partition: Partition,
        stores: Vec<Store>,
    ) -> Result<Self, ShardedStoreCreateError> {
        if stores.is_empty() {
            return Err(ShardedStoreCreateError::EmptyShards(mount));
        }
        if sharded_dimension >= dimensionality {
            return Err(ShardedStoreCreateError::InvalidShardedDimension {
                mount,
                dimensionality,
                sharded_dimension,
            });
        }
        Ok(Self {
            mount,
            dimensionality,
            sharded_dimension,
            partition,
            stores,
        })
    }

    /// Returns the chunk indices of `key` if it is a chunk key of this array mount.
    ///
    /// A chunk key is the mount prefix followed by a single path segment of `.` separated
    /// chunk indices.
    ///
    /// # Errors
    /// Returns [`StorageError::Integrity`] if the chunk indices do not match the array
    /// dimensionality.
    pub(crate) fn chunk_coords_for_key(
        &self,
        key: &StoreKey,
    ) -> Result<Option<ChunkCoords>, StorageError> {
        let Some(segment) = key.as_str().strip_prefix(self.mount.as_str()) else {
            return Ok(None);
        };
        if segment.contains('/') {
            return Ok(None);
        }
        let Some(coords) = parse_chunk_coords(segment) else {
            return Ok(None);
        };
        if coords.len() == self.dimensionality {
            Ok(Some(coords))
        } else {
            Err(StorageError::Integrity(format!(
                "chunk key {key} has {} indices, but the array at {} has dimensionality {}",
                coords.len(),
                self.mount,
                self.dimensionality
            )))
        }
    }

    /// Returns the shard store index and local chunk indices of a global chunk.
    pub(crate) fn resolve_chunk(&self, coords: &[u64]) -> (usize, ChunkCoords) {
        let count = self.stores.len() as u64;
        let index = coords[self.sharded_dimension];
        let mut local = coords.to_vec();
        match self.partition {
            Partition::Modulo => {
                local[self.sharded_dimension] = index / count;
                // index % count < count, which is a usize
                (usize::try_from(index % count).unwrap(), local)
            }
        }
    }

    /// Returns the global chunk indices of a local chunk in shard `shard_index`.
    pub(crate) fn global_chunk_coords(&self, shard_index: usize, local: &[u64]) -> ChunkCoords {
        let count = self.stores.len() as u64;
        let mut global = local.to_vec();
        match self.partition {
            Partition::Modulo => {
                global[self.sharded_dimension] =
                    local[self.sharded_dimension] * count + shard_index as u64;
            }
        }
        global
    }

    /// Lists every chunk key held by the shard stores, as global keys under the mount.
    ///
    /// # Errors
    /// Returns [`StorageError::Integrity`] if a shard store holds a key which is not a
    /// valid chunk key for this array.
    pub(crate) fn global_chunk_keys(&self) -> Result<StoreKeys, StorageError> {
        let mut keys = vec![];
        for (shard_index, store) in self.stores.iter().enumerate() {
            for local_key in store.list()? {
                let Some(local) = parse_chunk_coords(local_key.as_str())
                    .filter(|coords| coords.len() == self.dimensionality)
                else {
                    return Err(StorageError::Integrity(format!(
                        "array shard {shard_index} at {} holds key {local_key}, which is not a chunk key of a dimensionality {} array",
                        self.mount, self.dimensionality
                    )));
                };
                let global = self.global_chunk_coords(shard_index, &local);
                keys.push(StoreKey::new(format!(
                    "{}{}",
                    self.mount,
                    encode_chunk_coords(&global)
                ))?);
            }
        }
        Ok(keys)
    }

    /// Validates array metadata written to the `.zarray` key under the mount.
    ///
    /// The array shape must match the declared dimensionality, and the chunk shape along
    /// the sharded dimension must be 1 so that each chunk maps to exactly one shard.
    pub(crate) fn validate_array_metadata(
        &self,
        key: &StoreKey,
        value: &Bytes,
    ) -> Result<(), StorageError> {
        let metadata: ArrayMetadata = serde_json::from_slice(value)
            .map_err(|err| StorageError::InvalidMetadata(key.clone(), err.to_string()))?;
        if metadata.shape.len() != self.dimensionality {
            return Err(StorageError::Integrity(format!(
                "array metadata at {key} has shape of length {}, but the array mount at {} declares dimensionality {}",
                metadata.shape.len(),
                self.mount,
                self.dimensionality
            )));
        }
        if metadata.chunks.get(self.sharded_dimension) != Some(&1) {
            return Err(StorageError::Integrity(format!(
                "array metadata at {key} must have a chunk shape of 1 along sharded dimension {}",
                self.sharded_dimension
            )));
        }
        Ok(())
    }
}

/// Parses a `.` separated chunk index segment, e.g. `3.0` to `[3, 0]`.
///
/// Returns [`None`] if any part is empty or contains a non-digit character.
pub(crate) fn parse_chunk_coords(segment: &str) -> Option<ChunkCoords> {
    segment
        .split('.')
        .map(|part| {
            if !part.is_empty() && part.bytes().all(|c| c.is_ascii_digit()) {
                part.parse::<u64>().ok()
            } else {
                None
            }
        })
        .collect()
}

/// Encodes chunk indices as a `.` separated chunk key segment.
pub(crate) fn encode_chunk_coords(coords: &[u64]) -> String {
    coords.iter().join(".")
}
