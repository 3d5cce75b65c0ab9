//! Sharded store configuration (de)serialisation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    store::{store_from_configuration, StoreConfiguration, StorePlugin, StorePluginCreateError},
    Store, StorePrefix, StorePrefixError, StoreTraits,
};

use super::{Partition, ShardedStore, ShardedStoreBuilder, ShardedStoreCreateError};

/// The configuration of a [`ShardedStore`]: the base store and every mount, with each
/// component store described by its own [`StoreConfiguration`].
///
/// Mount paths are serialised without the trailing `/` separator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShardedStoreConfiguration {
    /// The base store.
    pub base: StoreConfiguration,
    /// The group shard mounts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_shards: Vec<GroupShardConfiguration>,
    /// The array shard mounts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array_shards: Vec<ArrayShardConfiguration>,
}

/// The configuration of one group shard mount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupShardConfiguration {
    /// The mount path, without a trailing `/`.
    pub path: String,
    /// The store owning the keys under the mount.
    pub store: StoreConfiguration,
}

/// The configuration of one array shard mount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayShardConfiguration {
    /// The mount path, without a trailing `/`.
    pub path: String,
    /// The array dimensionality.
    pub dimensionality: usize,
    /// The dimension along which chunks are partitioned over the shard stores.
    pub sharded_dimension: usize,
    /// The partition scheme.
    pub partition: Partition,
    /// The ordered shard stores.
    pub stores: Vec<StoreConfiguration>,
}

/// A sharded store configuration error.
#[derive(Debug, Error)]
pub enum StoreConfigurationError {
    /// A component store could not be created from its configuration.
    #[error(transparent)]
    StorePlugin(#[from] StorePluginCreateError),
    /// A mount path is not a valid store prefix.
    #[error(transparent)]
    InvalidMountPath(#[from] StorePrefixError),
    /// The routing table could not be constructed.
    #[error(transparent)]
    Create(#[from] ShardedStoreCreateError),
    /// A component store cannot describe itself as a configuration.
    #[error("the {0} cannot be serialised to a store configuration")]
    NotSerializable(String),
}

impl ShardedStore {
    /// Export the routing table as a [`ShardedStoreConfiguration`].
    ///
    /// # Errors
    /// Returns [`StoreConfigurationError::NotSerializable`] if any component store returns
    /// [`None`] from [`StoreTraits::create_configuration`], such as a storage adapter.
    pub fn to_configuration(&self) -> Result<ShardedStoreConfiguration, StoreConfigurationError> {
        let base = self
            .router
            .base
            .create_configuration()
            .ok_or_else(|| StoreConfigurationError::NotSerializable("base store".to_string()))?;
        let group_shards = self
            .router
            .group_shards
            .iter()
            .map(|assignment| {
                let store = assignment.store.create_configuration().ok_or_else(|| {
                    StoreConfigurationError::NotSerializable(format!(
                        "group shard store at {}",
                        assignment.mount
                    ))
                })?;
                Ok(GroupShardConfiguration {
                    path: mount_path(&assignment.mount),
                    store,
                })
            })
            .collect::<Result<Vec<_>, StoreConfigurationError>>()?;
        let array_shards = self
            .router
            .array_shards
            .iter()
            .map(|assignment| {
                let stores = assignment
                    .stores
                    .iter()
                    .enumerate()
                    .map(|(index, store)| {
                        store.create_configuration().ok_or_else(|| {
                            StoreConfigurationError::NotSerializable(format!(
                                "array shard store {index} at {}",
                                assignment.mount
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, StoreConfigurationError>>()?;
                Ok(ArrayShardConfiguration {
                    path: mount_path(&assignment.mount),
                    dimensionality: assignment.dimensionality,
                    sharded_dimension: assignment.sharded_dimension,
                    partition: assignment.partition,
                    stores,
                })
            })
            .collect::<Result<Vec<_>, StoreConfigurationError>>()?;
        Ok(ShardedStoreConfiguration {
            base,
            group_shards,
            array_shards,
        })
    }

    /// Create a [`ShardedStore`] from its configuration, reconstructing every component
    /// store through the store registry.
    ///
    /// # Errors
    /// Returns a [`StoreConfigurationError`] if a component store cannot be created or the
    /// routing table is invalid.
    pub fn from_configuration(
        configuration: &ShardedStoreConfiguration,
    ) -> Result<Self, StoreConfigurationError> {
        let mut builder = ShardedStoreBuilder::new(store_from_configuration(&configuration.base)?);
        for group_shard in &configuration.group_shards {
            builder.mount_group(
                StorePrefix::new(group_shard.path.clone() + "/")?,
                store_from_configuration(&group_shard.store)?,
            );
        }
        for array_shard in &configuration.array_shards {
            let stores = array_shard
                .stores
                .iter()
                .map(store_from_configuration)
                .collect::<Result<Vec<Store>, _>>()?;
            builder.mount_array_shards(
                StorePrefix::new(array_shard.path.clone() + "/")?,
                array_shard.dimensionality,
                array_shard.sharded_dimension,
                stores,
            );
        }
        Ok(builder.build()?)
    }
}

/// The serialised form of a mount prefix, without the trailing `/`.
fn mount_path(mount: &StorePrefix) -> String {
    mount
        .as_str()
        .strip_suffix('/')
        .unwrap_or(mount.as_str())
        .to_string()
}

fn is_name_sharded(name: &str) -> bool {
    name.eq("sharded")
}

fn create_store_sharded(
    configuration: &StoreConfiguration,
) -> Result<Store, StorePluginCreateError> {
    let configuration: ShardedStoreConfiguration = serde_json::from_value(
        serde_json::Value::Object(configuration.configuration.clone()),
    )
    .map_err(|err| StorePluginCreateError::InvalidConfiguration {
        name: "sharded".to_string(),
        error: err.to_string(),
    })?;
    let store = ShardedStore::from_configuration(&configuration)
        .map_err(|err| StorePluginCreateError::Other(err.to_string()))?;
    Ok(std::sync::Arc::new(store))
}

inventory::submit! {
    StorePlugin::new("sharded", is_name_sharded, create_store_sharded)
}
