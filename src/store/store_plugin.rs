//! Store plugin support.
//!
//! Store types register a [`StorePlugin`] at compile time using the [inventory] crate.
//! At runtime, [`store_from_configuration`] applies a name matching function to identify
//! which registered plugin is associated with a [`StoreConfiguration`], and reconstructs
//! the store from its constructor parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Store;

/// A store descriptor: a store type name and its constructor parameters.
///
/// A configuration holds enough to reconstruct an equivalent store through
/// [`store_from_configuration`] without the original live handle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfiguration {
    /// The name of the store type.
    pub name: String,
    /// The constructor parameters of the store.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

impl StoreConfiguration {
    /// Create a new [`StoreConfiguration`] with no constructor parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configuration: serde_json::Map::default(),
        }
    }
}

/// A store plugin.
pub struct StorePlugin {
    /// The identifier of the store type.
    identifier: &'static str,
    /// Tests if the configuration name is a match for this plugin.
    match_name_fn: fn(name: &str) -> bool,
    /// Create the store from its configuration.
    create_fn: fn(configuration: &StoreConfiguration) -> Result<Store, StorePluginCreateError>,
}

inventory::collect!(StorePlugin);

/// A store plugin creation error.
#[derive(Debug, Error)]
pub enum StorePluginCreateError {
    /// The store type is not registered.
    #[error("store {0} is not supported")]
    Unsupported(String),
    /// The configuration is invalid for the store type.
    #[error("invalid configuration for store {name}: {error}")]
    InvalidConfiguration {
        /// The name of the store type.
        name: String,
        /// The underlying error.
        error: String,
    },
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorePluginCreateError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorePluginCreateError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

impl StorePlugin {
    /// Create a new store plugin for registration.
    pub const fn new(
        identifier: &'static str,
        match_name_fn: fn(name: &str) -> bool,
        create_fn: fn(configuration: &StoreConfiguration) -> Result<Store, StorePluginCreateError>,
    ) -> Self {
        Self {
            identifier,
            match_name_fn,
            create_fn,
        }
    }

    /// Create a store from `configuration`.
    ///
    /// # Errors
    /// Returns a [`StorePluginCreateError`] if the configuration is invalid.
    pub fn create(&self, configuration: &StoreConfiguration) -> Result<Store, StorePluginCreateError> {
        (self.create_fn)(configuration)
    }

    /// Returns true if this plugin is associated with `name`.
    #[must_use]
    pub fn match_name(&self, name: &str) -> bool {
        (self.match_name_fn)(name)
    }

    /// Returns the identifier of the plugin.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        self.identifier
    }
}

/// Create a store from its [`StoreConfiguration`] through the registered store plugins.
///
/// # Errors
/// Returns [`StorePluginCreateError::Unsupported`] if no plugin is registered for the
/// configuration name, or the plugin's error if store creation fails.
pub fn store_from_configuration(
    configuration: &StoreConfiguration,
) -> Result<Store, StorePluginCreateError> {
    for plugin in inventory::iter::<StorePlugin> {
        if plugin.match_name(&configuration.name) {
            return plugin.create(configuration);
        }
    }
    Err(StorePluginCreateError::Unsupported(
        configuration.name.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_stores() {
        assert!(store_from_configuration(&StoreConfiguration::new("memory")).is_ok());
        assert_eq!(
            store_from_configuration(&StoreConfiguration::new("unknown"))
                .unwrap_err()
                .to_string(),
            "store unknown is not supported"
        );
    }
}
