//! E2E Test: PWA Lifecycle
//!
//! Upgrades between Atlas releases: the new bucket replaces the old one,
//! a failed install changes nothing, and a patient release waits for the
//! last open page to close.

use futures::executor::block_on;
use kpio_offline_runtime::service_worker::{CacheStorage, LifecycleEvent, WorkerState};
use kpio_offline_runtime::{AgentError, OfflineAgent};

use crate::fixtures::AtlasFixtures;
use crate::harness::OfflineHarness;

#[test]
fn test_upgrade_serves_new_release_and_drops_old_bucket() {
    let harness = OfflineHarness::new();
    harness.install(1).unwrap();
    let client = harness.open_page();

    AtlasFixtures::serve(&harness.network, "r2");
    let v2 = harness.install(2).unwrap();

    assert_eq!(
        harness.caches.cache_names(),
        [AtlasFixtures::cache_name(2)]
    );
    assert_eq!(harness.registration.controller(client), Some(v2));

    harness.go_offline();
    let outcome = harness.navigate(client, "/");
    assert_eq!(
        OfflineHarness::text(&outcome),
        AtlasFixtures::body(AtlasFixtures::SHELL, "r2")
    );
    assert_eq!(harness.network.request_count(), 0);
}

#[test]
fn test_activation_removes_foreign_buckets() {
    let harness = OfflineHarness::new();
    block_on(harness.caches.open("legacy-app-cache")).unwrap();
    block_on(harness.caches.open("atlas-offline-v0")).unwrap();

    harness.install(1).unwrap();
    assert_eq!(
        block_on(harness.caches.keys()).unwrap(),
        [AtlasFixtures::cache_name(1)]
    );
}

#[test]
fn test_failed_upgrade_keeps_serving_previous_release() {
    let harness = OfflineHarness::new();
    let v1 = harness.install(1).unwrap();
    let client = harness.open_page();

    // The new release forgot to publish its stylesheet.
    AtlasFixtures::serve(&harness.network, "r2");
    harness
        .network
        .remove_route(&AtlasFixtures::url("./style.css"));
    let result = harness.install(2);
    assert!(matches!(
        result,
        Err(AgentError::AssetStatus { status: 404, .. })
    ));

    assert_eq!(harness.registration.active().unwrap().id(), v1);
    assert!(harness
        .caches
        .cache(&AtlasFixtures::cache_name(2))
        .unwrap()
        .is_empty());

    harness.go_offline();
    let outcome = harness.get(client, "./style.css");
    assert_eq!(
        OfflineHarness::text(&outcome),
        AtlasFixtures::body("./style.css", "r1")
    );
}

#[test]
fn test_retry_after_failed_install_succeeds() {
    let harness = OfflineHarness::new();
    harness.network.set_online(false);
    assert!(harness.install(1).is_err());
    assert!(harness.registration.active().is_none());

    harness.go_online();
    let id = harness.install(1).unwrap();
    assert_eq!(harness.registration.active().unwrap().id(), id);
    assert_eq!(
        harness
            .caches
            .cache(&AtlasFixtures::cache_name(1))
            .unwrap()
            .len(),
        12
    );
}

#[test]
fn test_patient_release_waits_for_pages_to_close() {
    let harness = OfflineHarness::new();
    let v1 = harness.install(1).unwrap();
    let first = harness.open_page();
    let second = harness.open_page();

    AtlasFixtures::serve(&harness.network, "r2");
    let agent = OfflineAgent::new(AtlasFixtures::config(2).with_skip_waiting(false)).unwrap();
    let v2 = harness.install_agent(agent).unwrap();

    let waiting = harness.registration.waiting().unwrap();
    assert_eq!(waiting.id(), v2);
    assert_eq!(waiting.state(), WorkerState::Installed);
    assert_eq!(harness.registration.controller(first), Some(v1));

    // Both buckets exist; the old release still answers.
    assert_eq!(harness.caches.cache_names().len(), 2);
    harness.go_offline();
    assert_eq!(
        OfflineHarness::text(&harness.navigate(first, "/")),
        AtlasFixtures::body(AtlasFixtures::SHELL, "r1")
    );

    harness.close_page(first).unwrap();
    assert!(harness.registration.waiting().is_some());

    harness.close_page(second).unwrap();
    assert_eq!(harness.registration.active().unwrap().id(), v2);
    assert_eq!(
        harness.caches.cache_names(),
        [AtlasFixtures::cache_name(2)]
    );

    let page = harness.open_page();
    assert_eq!(
        OfflineHarness::text(&harness.navigate(page, "/")),
        AtlasFixtures::body(AtlasFixtures::SHELL, "r2")
    );
}

#[test]
fn test_lifecycle_event_log() {
    let harness = OfflineHarness::new();
    let client = harness.open_page();
    let v1 = harness.install(1).unwrap();
    let v2 = harness.install(2).unwrap();

    let events = harness.registration.events();
    let controller_changes: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            LifecycleEvent::ControllerChange(id) => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(controller_changes, [v1, v2]);
    assert_eq!(harness.registration.controller(client), Some(v2));
}
