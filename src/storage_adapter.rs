//! Storage adapters wrapping a store with additional behaviour.
//!
//! An adapter implements the store traits over an inner store, so it can wrap any
//! component of a sharded store, or the sharded store itself. Adapters wrap live state
//! and cannot be described by a store configuration; exporting the configuration of a
//! sharded store with an adapted component fails.

pub mod performance_metrics;
pub mod usage_log;
