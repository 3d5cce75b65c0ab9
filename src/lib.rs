//! A sharded store for Zarr-style hierarchies.
//!
//! A [`ShardedStore`] composes a base store and additional component stores into a single
//! logical hierarchical store. Component stores are "mounted" on the base store at key
//! prefixes:
//! - a *group shard* owns every key under a group path, and
//! - *array shards* split the chunks of a single array along one dimension over an ordered
//!   list of stores.
//!
//! Splitting a large array-oriented dataset over many component stores avoids materialising
//! a single store with an excessive object/file count. A [`ShardedStore`] implements the
//! same store traits as its components, so it can be used as a drop-in store by any
//! consumer of the [`StoreTraits`] API, including another [`ShardedStore`].
//!
//! The routing table of a [`ShardedStore`] is immutable once built. It can be exported to a
//! plain [`ShardedStoreConfiguration`], reconstructed through the store registry (see
//! [`store_from_configuration`]), and every component store can be rewrapped with
//! [`ShardedStore::map_shards`].
//!
//! ## Example
//! ```
//! # use std::sync::Arc;
//! use sharded_store::store::MemoryStore;
//! use sharded_store::{ReadableStoreTraits, ShardedStoreBuilder, Store, WritableStoreTraits};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // A base store, a group shard for "people", and 3 array shards for "data/temperature".
//! let mut builder = ShardedStoreBuilder::new(Arc::new(MemoryStore::new()));
//! builder.mount_group("people/".try_into()?, Arc::new(MemoryStore::new()));
//! builder.mount_array_shards(
//!     "data/temperature/".try_into()?,
//!     2, // dimensionality
//!     0, // sharded dimension
//!     (0..3).map(|_| Arc::new(MemoryStore::new()) as Store).collect(),
//! );
//! let store = builder.build()?;
//!
//! // Chunk 3 along dimension 0 routes to shard 0 (3 mod 3) as local chunk 1 (3 div 3).
//! store.set(&"data/temperature/3.0".try_into()?, vec![1, 2, 3, 4].into())?;
//! assert!(store.get(&"data/temperature/3.0".try_into()?)?.is_some());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod sharded_store;
pub mod storage_adapter;
mod storage_sync;
pub mod store;
mod store_key;
mod store_prefix;

#[cfg(any(test, feature = "tests"))]
/// Store test utilities (for external store development).
pub mod store_test;

use std::sync::Arc;

use thiserror::Error;

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

pub use self::storage_sync::{
    ListableStoreTraits, ReadableStoreTraits, StoreTraits, WritableStoreTraits,
};

pub use self::sharded_store::{
    ArrayShardConfiguration, GroupShardConfiguration, Partition, ShardedStore,
    ShardedStoreBuilder, ShardedStoreConfiguration, ShardedStoreCreateError,
    StoreConfigurationError,
};

pub use self::store::{store_from_configuration, StoreConfiguration, StorePlugin, StorePluginCreateError};

/// [`Arc`] wrapped readable store.
pub type ReadableStore = Arc<dyn ReadableStoreTraits>;

/// [`Arc`] wrapped writable store.
pub type WritableStore = Arc<dyn WritableStoreTraits>;

/// [`Arc`] wrapped listable store.
pub type ListableStore = Arc<dyn ListableStoreTraits>;

/// [`Arc`] wrapped store supporting every store operation.
///
/// This is the store handle composed by a [`ShardedStore`].
pub type Store = Arc<dyn StoreTraits>;

/// The type for bytes used in store set and get methods.
///
/// An alias for [`bytes::Bytes`].
pub type Bytes = bytes::Bytes;

/// An alias for bytes which may or may not be available.
///
/// When a value is read from a store, it returns `MaybeBytes` which is [`None`] if the key
/// is not available. A missing key is not an error.
pub type MaybeBytes = Option<Bytes>;

/// [`StoreKeys`] and [`StorePrefixes`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Create a new [`StoreKeysPrefixes`].
    #[must_use]
    pub fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// Returns the keys.
    #[must_use]
    pub const fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns the prefixes.
    #[must_use]
    pub const fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error parsing the metadata for a key.
    #[error("error parsing metadata for {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// An invalid store prefix.
    #[error("invalid store prefix {0}")]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// A violation of the sharded store routing invariants, such as a chunk key arity
    /// mismatch or a key found in multiple component stores.
    #[error("{0}")]
    Integrity(String),
    /// The requested method is not supported.
    #[error("{0}")]
    Unsupported(String),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
