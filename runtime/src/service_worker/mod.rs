//! Service Worker Module
//!
//! Worker records, capability traits and the in-memory host that drives an
//! [`OfflineAgent`] through install, activate and fetch.

mod cache;
mod events;
mod fetch;
mod lifecycle;
mod network;
mod registration;

pub use cache::*;
pub use events::*;
pub use fetch::*;
pub use lifecycle::*;
pub use network::*;
pub use registration::*;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::agent::OfflineAgent;

/// Service Worker global ID counter
static NEXT_SW_ID: AtomicU64 = AtomicU64::new(1);

/// Client global ID counter
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Service Worker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Initial state, script evaluated
    #[default]
    Parsed,
    /// Installing (install event fired)
    Installing,
    /// Installed, waiting to activate
    Installed,
    /// Activating (activate event fired)
    Activating,
    /// Active and controlling pages
    Activated,
    /// Failed to install or superseded
    Redundant,
}

/// Service Worker ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceWorkerId(u64);

impl ServiceWorkerId {
    /// Create a new unique ID
    pub fn new() -> Self {
        Self(NEXT_SW_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Get raw value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ServiceWorkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// An open page of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

/// A Service Worker instance: one version of the agent and its state.
#[derive(Debug, Clone)]
pub struct ServiceWorker {
    id: ServiceWorkerId,
    state: WorkerState,
    agent: Arc<OfflineAgent>,
}

impl ServiceWorker {
    /// Create a new service worker
    pub fn new(agent: Arc<OfflineAgent>) -> Self {
        Self {
            id: ServiceWorkerId::new(),
            state: WorkerState::Parsed,
            agent,
        }
    }

    /// Get the worker ID
    pub fn id(&self) -> ServiceWorkerId {
        self.id
    }

    /// Get current state
    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn agent(&self) -> &Arc<OfflineAgent> {
        &self.agent
    }

    /// Bucket this version owns
    pub fn cache_name(&self) -> &str {
        self.agent.cache_name()
    }

    /// Check if the worker is active
    pub fn is_active(&self) -> bool {
        self.state == WorkerState::Activated
    }

    /// Check if the worker is waiting
    pub fn is_waiting(&self) -> bool {
        self.state == WorkerState::Installed
    }
}
