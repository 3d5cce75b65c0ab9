#![allow(missing_docs)]

use std::{error::Error, path::Path, sync::Arc};

use parking_lot::Mutex;

use sharded_store::{
    storage_adapter::{
        performance_metrics::PerformanceMetricsStorageAdapter, usage_log::UsageLogStorageAdapter,
    },
    store::{array_shard_filesystem_stores, FilesystemStore},
    ListableStoreTraits, ReadableStoreTraits, ShardedStore, ShardedStoreBuilder, Store,
    WritableStoreTraits,
};

fn filesystem_sharded_store(path: &Path) -> Result<ShardedStore, Box<dyn Error>> {
    let mut builder = ShardedStoreBuilder::new(Arc::new(FilesystemStore::new(path.join("base"))?));
    builder.mount_group(
        "people/".try_into()?,
        Arc::new(FilesystemStore::new(path.join("people"))?),
    );
    builder.mount_group(
        "simulation/fine/".try_into()?,
        Arc::new(FilesystemStore::new(path.join("fine"))?),
    );
    builder.mount_array_shards(
        "data/temperature/".try_into()?,
        2,
        0,
        array_shard_filesystem_stores(path.join("temperature"), 3)?,
    );
    Ok(builder.build()?)
}

#[test]
#[cfg_attr(miri, ignore)]
fn filesystem_end_to_end() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = filesystem_sharded_store(path.path())?;

    store.set(&"top".try_into()?, vec![0].into())?;
    store.set(&"people/bob".try_into()?, vec![1].into())?;
    store.set(&"simulation/fine".try_into()?, vec![2].into())?;
    store.set(&"data/temperature/3.0".try_into()?, vec![3, 4].into())?;
    store.set(&"data/temperature/4.0".try_into()?, vec![5].into())?;

    // Keys land in the component stores at their local paths.
    assert!(path.path().join("base/top").is_file());
    assert!(path.path().join("base/simulation/fine").is_file());
    assert!(path.path().join("people/bob").is_file());
    assert!(path.path().join("temperature/0/1.0").is_file());
    assert!(path.path().join("temperature/1/1.0").is_file());

    assert_eq!(store.get(&"people/bob".try_into()?)?, Some(vec![1].into()));
    assert_eq!(
        store.get(&"data/temperature/3.0".try_into()?)?,
        Some(vec![3, 4].into())
    );
    assert_eq!(
        store.list()?,
        &[
            "data/temperature/3.0".try_into()?,
            "data/temperature/4.0".try_into()?,
            "people/bob".try_into()?,
            "simulation/fine".try_into()?,
            "top".try_into()?,
        ]
    );

    store.erase_prefix(&"data/".try_into()?)?;
    assert!(store.get(&"data/temperature/4.0".try_into()?)?.is_none());
    assert_eq!(store.get(&"people/bob".try_into()?)?, Some(vec![1].into()));
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn configuration_round_trip() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = filesystem_sharded_store(path.path())?;
    store.set(&"people/bob".try_into()?, vec![1].into())?;
    store.set(&"data/temperature/5.1".try_into()?, vec![2].into())?;

    let configuration = store.to_configuration()?;
    let json = serde_json::to_string(&configuration)?;
    let reconstructed = ShardedStore::from_configuration(&serde_json::from_str(&json)?)?;

    // Filesystem stores are backed by the same directories, the data is visible.
    assert_eq!(reconstructed.list()?, store.list()?);
    assert_eq!(
        reconstructed.get(&"data/temperature/5.1".try_into()?)?,
        Some(vec![2].into())
    );
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn map_shards_wraps_every_component() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = filesystem_sharded_store(path.path())?;

    let mut adapters = vec![];
    let mapped = store.map_shards(|store| {
        let adapter = Arc::new(PerformanceMetricsStorageAdapter::new(store.clone()));
        adapters.push(adapter.clone());
        Ok(adapter as Store)
    })?;
    // Base, two group shards, and three array shards.
    assert_eq!(adapters.len(), 6);

    mapped.set(&"top".try_into()?, vec![0].into())?;
    mapped.set(&"people/bob".try_into()?, vec![1, 2].into())?;
    mapped.set(&"data/temperature/3.0".try_into()?, vec![3].into())?;
    mapped.get(&"people/bob".try_into()?)?;

    let writes: usize = adapters.iter().map(|adapter| adapter.writes()).sum();
    let bytes_written: usize = adapters.iter().map(|adapter| adapter.bytes_written()).sum();
    let reads: usize = adapters.iter().map(|adapter| adapter.reads()).sum();
    assert_eq!(writes, 3);
    assert_eq!(bytes_written, 4);
    assert_eq!(reads, 1);

    // Adapters cannot be serialised, so the mapped store has no configuration.
    assert!(mapped.to_configuration().is_err());
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn usage_log_over_sharded_store() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = Arc::new(filesystem_sharded_store(path.path())?);

    let log = Arc::new(Mutex::new(Vec::<u8>::new()));
    let store = UsageLogStorageAdapter::new(store, log.clone(), || {
        chrono::Utc::now().format("[%T%.3f] ").to_string()
    });

    store.set(&"data/temperature/3.0".try_into()?, vec![0, 1].into())?;
    store.get(&"data/temperature/3.0".try_into()?)?;
    store.list()?;

    let log = String::from_utf8(log.lock().clone())?;
    assert!(log.contains("set(data/temperature/3.0, len=2) -> Ok(())"));
    assert!(log.contains("get(data/temperature/3.0) -> len=Ok(2)"));
    assert!(log.contains("list() -> [data/temperature/3.0]"));
    Ok(())
}
