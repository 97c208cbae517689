//! Service Worker Registration
//!
//! In-memory host for one scope. Runs new versions through install and
//! activate, tracks which clients are controlled, and routes their fetches
//! to the active worker.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::RwLock;

use super::{
    CacheStorage, ClientId, EventControl, ExtendableEvent, FetchEvent, FetchOutcome,
    LifecycleEvent, LifecycleManager, Network, Request, ServiceWorker, ServiceWorkerId,
    WorkerState,
};
use crate::agent::{OfflineAgent, Platform};
use crate::error::Result;

#[derive(Debug, Default)]
struct RegistrationState {
    installing: Option<ServiceWorker>,
    waiting: Option<ServiceWorker>,
    active: Option<ServiceWorker>,
    /// Open clients and whether the active worker controls them.
    clients: BTreeMap<ClientId, bool>,
    lifecycle: LifecycleManager,
}

impl RegistrationState {
    fn has_controlled_clients(&self) -> bool {
        self.clients.values().any(|controlled| *controlled)
    }
}

/// A service worker registration
///
/// The state lock is never held across an await, so fetches through the
/// active version keep working while a new version installs.
pub struct ServiceWorkerRegistration {
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<RegistrationState>,
}

impl ServiceWorkerRegistration {
    /// Create a new registration
    pub fn new(caches: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            caches,
            network,
            state: RwLock::new(RegistrationState::default()),
        }
    }

    pub fn caches(&self) -> &Arc<dyn CacheStorage> {
        &self.caches
    }

    fn platform<'a>(&'a self, control: &'a EventControl) -> Platform<'a> {
        Platform::new(self.caches.as_ref(), self.network.as_ref(), control)
    }

    /// Install a new version and activate it when allowed.
    ///
    /// A failed install leaves the current active worker in place and
    /// returns the install error.
    pub async fn update(&self, agent: OfflineAgent) -> Result<ServiceWorkerId> {
        let agent = Arc::new(agent);
        let mut worker = ServiceWorker::new(agent.clone());
        let id = worker.id();

        {
            let mut state = self.state.write();
            state.lifecycle.transition_state(&mut worker, WorkerState::Installing)?;
            state.installing = Some(worker.clone());
        }

        let control = EventControl::new();
        let installed = {
            let mut event = ExtendableEvent::install();
            agent.on_install(&mut event, self.platform(&control));
            event.settle().await
        };

        {
            let mut state = self.state.write();
            state.installing = None;

            if let Err(e) = installed {
                log::warn!("[SW Host] install of {} failed: {}", worker.cache_name(), e);
                state.lifecycle.transition_state(&mut worker, WorkerState::Redundant)?;
                return Err(e);
            }
            state.lifecycle.transition_state(&mut worker, WorkerState::Installed)?;

            let activate_now = control.skip_waiting_requested()
                || state.active.is_none()
                || !state.has_controlled_clients();
            if !activate_now {
                if let Some(mut previous) = state.waiting.take() {
                    state.lifecycle.transition_state(&mut previous, WorkerState::Redundant)?;
                }
                log::info!("[SW Host] worker {} waiting", id.raw());
                state.waiting = Some(worker);
                return Ok(id);
            }

            // A newer version supersedes whatever was waiting.
            if let Some(mut previous) = state.waiting.take() {
                state.lifecycle.transition_state(&mut previous, WorkerState::Redundant)?;
            }
        }

        self.activate(worker).await?;
        Ok(id)
    }

    async fn activate(&self, mut worker: ServiceWorker) -> Result<()> {
        {
            let mut state = self.state.write();
            if let Some(mut previous) = state.active.take() {
                state.lifecycle.transition_state(&mut previous, WorkerState::Redundant)?;
            }
            state.lifecycle.transition_state(&mut worker, WorkerState::Activating)?;
            state.active = Some(worker.clone());
        }

        let agent = worker.agent().clone();
        let control = EventControl::new();
        let activated = {
            let mut event = ExtendableEvent::activate();
            agent.on_activate(&mut event, self.platform(&control));
            event.settle().await
        };
        if let Err(e) = activated {
            log::warn!("[SW Host] activate of {} failed: {}", worker.cache_name(), e);
        }

        let mut state = self.state.write();
        state.lifecycle.transition_state(&mut worker, WorkerState::Activated)?;
        if control.claim_requested() {
            state.clients.values_mut().for_each(|controlled| *controlled = true);
            state.lifecycle.controller_change(&worker)?;
        }
        state.active = Some(worker);
        Ok(())
    }

    /// Make every open client controlled by the active worker.
    pub fn claim(&self) -> Result<()> {
        let mut state = self.state.write();
        let state = &mut *state;
        let Some(active) = state.active.as_ref() else {
            return Ok(());
        };
        state.clients.values_mut().for_each(|controlled| *controlled = true);
        state.lifecycle.controller_change(active)
    }

    /// Open a page. It is controlled if a worker is already active.
    pub fn open_client(&self) -> ClientId {
        let id = ClientId::new();
        let mut state = self.state.write();
        let controlled = state.active.is_some();
        state.clients.insert(id, controlled);
        id
    }

    /// Close a page. Closing the last controlled page promotes a waiting
    /// worker.
    pub async fn close_client(&self, id: ClientId) -> Result<()> {
        let promote = {
            let mut state = self.state.write();
            state.clients.remove(&id);
            if state.has_controlled_clients() {
                None
            } else {
                state.waiting.take()
            }
        };

        match promote {
            Some(worker) => self.activate(worker).await,
            None => Ok(()),
        }
    }

    /// Worker controlling `client`, if any.
    pub fn controller(&self, client: ClientId) -> Option<ServiceWorkerId> {
        let state = self.state.read();
        match state.clients.get(&client) {
            Some(true) => state.active.as_ref().map(ServiceWorker::id),
            _ => None,
        }
    }

    /// Route a request from `client` through its controller.
    pub async fn fetch(&self, client: ClientId, request: Request) -> FetchOutcome {
        let agent = {
            let state = self.state.read();
            match (state.clients.get(&client), state.active.as_ref()) {
                (Some(true), Some(active)) => Some(active.agent().clone()),
                _ => None,
            }
        };
        let Some(agent) = agent else {
            return FetchOutcome::Passthrough(request);
        };

        let mut event = FetchEvent::new(request, Some(client));
        agent.on_fetch(&mut event, self.caches.as_ref());
        event.into_outcome().await
    }

    pub fn installing(&self) -> Option<ServiceWorker> {
        self.state.read().installing.clone()
    }

    pub fn waiting(&self) -> Option<ServiceWorker> {
        self.state.read().waiting.clone()
    }

    pub fn active(&self) -> Option<ServiceWorker> {
        self.state.read().active.clone()
    }

    pub fn client_count(&self) -> usize {
        self.state.read().clients.len()
    }

    /// Lifecycle events recorded so far, oldest first.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.state.read().lifecycle.events().to_vec()
    }
}

impl core::fmt::Debug for ServiceWorkerRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceWorkerRegistration")
            .field("state", &*self.state.read())
            .finish()
    }
}
