//! E2E Test: PWA Storage
//!
//! Cached buckets survive a host restart through a snapshot, and storage
//! limits fail the install cleanly.

use futures::executor::block_on;
use kpio_offline_runtime::service_worker::{
    CacheStorage, FetchEvent, MemoryCacheStorage, Request,
};
use kpio_offline_runtime::{AgentError, OfflineAgent, StorageError};

use crate::fixtures::AtlasFixtures;
use crate::harness::OfflineHarness;

#[test]
fn test_snapshot_restores_offline_app() {
    let harness = OfflineHarness::new();
    harness.install(1).unwrap();
    let snapshot = harness.caches.snapshot().unwrap();

    // New host process: restored storage, no network at all.
    let caches = MemoryCacheStorage::restore(&snapshot, harness.caches.quota()).unwrap();
    assert_eq!(caches.cache_names(), [AtlasFixtures::cache_name(1)]);
    assert_eq!(caches.usage(), harness.caches.usage());

    let agent = OfflineAgent::new(AtlasFixtures::config(1)).unwrap();
    let mut event = FetchEvent::new(Request::navigate(AtlasFixtures::url("/log.html")), None);
    agent.on_fetch(&mut event, &caches);
    let outcome = block_on(event.into_outcome());
    assert_eq!(
        OfflineHarness::text(&outcome),
        AtlasFixtures::body(AtlasFixtures::SHELL, "r1")
    );
}

#[test]
fn test_corrupt_snapshot_is_rejected() {
    let result = MemoryCacheStorage::restore(&[0xff, 0xff, 0xff], 1024);
    assert!(matches!(result, Err(StorageError::Corrupt(_))));
}

#[test]
fn test_quota_exceeded_fails_install() {
    let harness = OfflineHarness::with_storage(MemoryCacheStorage::with_quota(1024));
    let result = harness.install(1);
    assert!(matches!(
        result,
        Err(AgentError::Storage(StorageError::QuotaExceeded))
    ));
    assert!(harness.registration.active().is_none());
    assert_eq!(harness.caches.usage(), 0);
}

#[test]
fn test_restored_storage_upgrades_cleanly() {
    let harness = OfflineHarness::new();
    harness.install(1).unwrap();
    let snapshot = harness.caches.snapshot().unwrap();

    let restarted = OfflineHarness::with_storage(
        MemoryCacheStorage::restore(&snapshot, harness.caches.quota()).unwrap(),
    );
    AtlasFixtures::serve(&restarted.network, "r2");
    restarted.install(2).unwrap();

    assert!(!block_on(restarted.caches.has(&AtlasFixtures::cache_name(1))).unwrap());
    assert!(block_on(restarted.caches.has(&AtlasFixtures::cache_name(2))).unwrap());
}
