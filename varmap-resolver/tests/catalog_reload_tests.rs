//! Catalog file loading and snapshot hot-reload

mod helpers;

use helpers::{buffalo_catalog, dangling_catalog, temp_dir, write_catalog, BUFFALO};
use serial_test::serial;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use varmap_resolver::config::CATALOG_ENV_VAR;
use varmap_resolver::{
    load_catalog_file, read_catalog, EngineConfig, ReloadStatus, SnapshotWatcher, Variant,
    VariantId, VariantStore,
};

fn extended_catalog() -> Vec<Variant> {
    let mut records = buffalo_catalog();
    records.push(Variant::base("lc-1909-s-vdb", "lincoln_cent", 1909, "S").with_keywords(["vdb"]));
    records
}

#[tokio::test]
async fn test_read_catalog_file() {
    let dir = temp_dir();
    let path = write_catalog(dir.path(), "catalog.json", Some("fixture v1"), buffalo_catalog());

    let catalog = read_catalog(&path).await.unwrap();
    assert_eq!(catalog.label.as_deref(), Some("fixture v1"));
    assert_eq!(catalog.variants, buffalo_catalog());
}

#[tokio::test]
async fn test_load_catalog_label_falls_back_to_path() {
    let dir = temp_dir();
    let path = write_catalog(dir.path(), "unlabeled.json", None, buffalo_catalog());

    let store = VariantStore::new();
    let info = load_catalog_file(&store, &path).await.unwrap();
    assert_eq!(info.version, 1);
    assert!(info.label.unwrap().ends_with("unlabeled.json"));
}

#[tokio::test]
async fn test_invalid_json_is_catalog_error() {
    let dir = temp_dir();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ \"variants\": [ ").unwrap();

    let err = read_catalog(&path).await.unwrap_err();
    assert_eq!(err.code(), "CATALOG_ERROR");
    assert!(err.to_string().contains("broken.json"));
}

#[tokio::test]
async fn test_watcher_reload_cycle() {
    let dir = temp_dir();
    let path = write_catalog(dir.path(), "catalog.json", Some("v1"), buffalo_catalog());
    let store = Arc::new(VariantStore::new());
    let mut watcher = SnapshotWatcher::new(store.clone(), &path, Duration::from_millis(10));

    assert_eq!(watcher.load_now().await.unwrap().version, 1);
    assert_eq!(watcher.reload_if_changed().await, ReloadStatus::Unchanged);

    // Larger file: new stamp, valid catalog
    write_catalog(dir.path(), "catalog.json", Some("v2"), extended_catalog());
    match watcher.reload_if_changed().await {
        ReloadStatus::Reloaded(info) => {
            assert_eq!(info.version, 2);
            assert_eq!(info.label.as_deref(), Some("v2"));
        }
        other => panic!("unexpected status: {:?}", other),
    }
    assert!(store.get(&VariantId::new("lc-1909-s-vdb")).is_ok());

    // Dangling parent: rejected, version 2 stays active
    write_catalog(dir.path(), "catalog.json", Some("v3"), dangling_catalog());
    assert!(matches!(
        watcher.reload_if_changed().await,
        ReloadStatus::Rejected(_)
    ));
    assert_eq!(store.info().version, 2);
    assert_eq!(store.info().label.as_deref(), Some("v2"));

    // Same bad file again is not retried
    assert_eq!(watcher.reload_if_changed().await, ReloadStatus::Unchanged);

    // Garbage: rejected as well
    std::fs::write(&path, "not json at all").unwrap();
    assert!(matches!(
        watcher.reload_if_changed().await,
        ReloadStatus::Rejected(_)
    ));
    assert_eq!(store.info().version, 2);
}

#[tokio::test]
async fn test_watcher_task_picks_up_changes() {
    let dir = temp_dir();
    let path = write_catalog(dir.path(), "catalog.json", None, buffalo_catalog());
    let store = Arc::new(VariantStore::new());
    let mut watcher = SnapshotWatcher::new(store.clone(), &path, Duration::from_millis(10));
    watcher.load_now().await.unwrap();

    let cancel = CancellationToken::new();
    let handle = watcher.spawn(cancel.clone());

    write_catalog(dir.path(), "catalog.json", None, extended_catalog());

    let reloaded = tokio::time::timeout(Duration::from_secs(5), async {
        while store.info().version < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(reloaded.is_ok(), "watcher did not reload within 5s");
    assert_eq!(store.group("lincoln_cent", 1909, "S").len(), 1);
    assert_eq!(store.group(BUFFALO, 1918, "D").len(), 4);

    cancel.cancel();
    handle.await.unwrap();
}

#[test]
#[serial]
fn test_catalog_path_priority() {
    let config = EngineConfig {
        catalog_path: Some(PathBuf::from("from-toml.json")),
        ..EngineConfig::default()
    };

    std::env::remove_var(CATALOG_ENV_VAR);
    assert_eq!(config.catalog_path(None), Some(PathBuf::from("from-toml.json")));

    std::env::set_var(CATALOG_ENV_VAR, "from-env.json");
    assert_eq!(config.catalog_path(None), Some(PathBuf::from("from-env.json")));
    assert_eq!(
        config.catalog_path(Some(Path::new("from-cli.json"))),
        Some(PathBuf::from("from-cli.json"))
    );

    std::env::set_var(CATALOG_ENV_VAR, "   ");
    assert_eq!(config.catalog_path(None), Some(PathBuf::from("from-toml.json")));

    std::env::remove_var(CATALOG_ENV_VAR);
}

#[test]
#[serial]
fn test_engine_config_from_file() {
    let dir = temp_dir();
    let path = dir.path().join("varmap.toml");
    std::fs::write(
        &path,
        "catalog_path = \"/data/catalog.json\"\n[resolution]\nunknown_mint_policy = \"search_all_mints\"\n",
    )
    .unwrap();

    let (config, location) = EngineConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(location.unwrap().path, path);
    assert_eq!(
        config.resolution.unknown_mint_policy,
        varmap_resolver::UnknownMintPolicy::SearchAllMints
    );
    assert_eq!(config.catalog_path, Some(PathBuf::from("/data/catalog.json")));
}

#[test]
fn test_missing_cli_config_is_error() {
    let dir = temp_dir();
    let result = EngineConfig::load(Some(dir.path().join("nope.toml").as_path()));
    assert!(result.is_err());
}
