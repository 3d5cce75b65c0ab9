//! The built-in stores and the store plugin registry.

mod filesystem_store;
mod memory_store;
mod store_plugin;

pub use filesystem_store::{
    array_shard_filesystem_stores, FilesystemStore, FilesystemStoreCreateError,
};
pub use memory_store::MemoryStore;
pub use store_plugin::{
    store_from_configuration, StoreConfiguration, StorePlugin, StorePluginCreateError,
};
