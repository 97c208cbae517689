//! Test harness
//!
//! One registration wired to an in-memory origin and cache storage, with
//! blocking helpers so scenarios read top to bottom.

use alloc::string::String;
use alloc::sync::Arc;

use futures::executor::block_on;
use kpio_offline_runtime::service_worker::{
    ClientId, FetchOutcome, MemoryCacheStorage, MemoryNetwork, Request, RequestMethod,
    ServiceWorkerId, ServiceWorkerRegistration,
};
use kpio_offline_runtime::{OfflineAgent, Result};

use crate::fixtures::AtlasFixtures;

pub struct OfflineHarness {
    pub caches: Arc<MemoryCacheStorage>,
    pub network: Arc<MemoryNetwork>,
    pub registration: ServiceWorkerRegistration,
}

impl OfflineHarness {
    /// Fresh storage and an origin serving release `r1`.
    pub fn new() -> Self {
        Self::with_storage(MemoryCacheStorage::new())
    }

    pub fn with_storage(caches: MemoryCacheStorage) -> Self {
        let caches = Arc::new(caches);
        let network = Arc::new(AtlasFixtures::network("r1"));
        let registration = ServiceWorkerRegistration::new(caches.clone(), network.clone());
        Self {
            caches,
            network,
            registration,
        }
    }

    /// Install Atlas release `version`.
    pub fn install(&self, version: u32) -> Result<ServiceWorkerId> {
        let agent = OfflineAgent::new(AtlasFixtures::config(version))?;
        log::info!("[E2E] installing {}", agent.cache_name());
        block_on(self.registration.update(agent))
    }

    pub fn install_agent(&self, agent: OfflineAgent) -> Result<ServiceWorkerId> {
        block_on(self.registration.update(agent))
    }

    pub fn open_page(&self) -> ClientId {
        self.registration.open_client()
    }

    pub fn close_page(&self, client: ClientId) -> Result<()> {
        block_on(self.registration.close_client(client))
    }

    /// Cut the network and forget traffic seen so far.
    pub fn go_offline(&self) {
        self.network.set_online(false);
        self.network.clear_log();
    }

    pub fn go_online(&self) {
        self.network.set_online(true);
    }

    /// Top-level navigation to `path`.
    pub fn navigate(&self, client: ClientId, path: &str) -> FetchOutcome {
        self.send(client, Request::navigate(AtlasFixtures::url(path)))
    }

    /// Subresource GET of `path`.
    pub fn get(&self, client: ClientId, path: &str) -> FetchOutcome {
        self.send(client, Request::new(AtlasFixtures::url(path)))
    }

    pub fn post(&self, client: ClientId, path: &str) -> FetchOutcome {
        self.send(
            client,
            Request::new(AtlasFixtures::url(path)).with_method(RequestMethod::Post),
        )
    }

    pub fn send(&self, client: ClientId, request: Request) -> FetchOutcome {
        block_on(self.registration.fetch(client, request))
    }

    /// Body of a responded outcome as text; empty for passthroughs.
    pub fn text(outcome: &FetchOutcome) -> String {
        outcome
            .response()
            .map(|response| response.text_body())
            .unwrap_or_default()
    }
}

impl Default for OfflineHarness {
    fn default() -> Self {
        Self::new()
    }
}
