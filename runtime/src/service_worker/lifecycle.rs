//! Service Worker Lifecycle Management
//!
//! Handles service worker state transitions and the lifecycle control
//! capability (`skipWaiting`, `clients.claim`) exposed to handlers.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{ServiceWorker, ServiceWorkerId, WorkerState};
use crate::error::{AgentError, Result};

/// Lifecycle event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// State change
    StateChange(StateChangeEvent),
    /// Open clients switched to a new controller
    ControllerChange(ServiceWorkerId),
}

/// State change event data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeEvent {
    /// Worker ID
    pub worker_id: ServiceWorkerId,
    /// Old state
    pub old_state: WorkerState,
    /// New state
    pub new_state: WorkerState,
}

/// Lifecycle manager
///
/// Validates transitions and keeps a log of everything that happened.
#[derive(Debug, Default)]
pub struct LifecycleManager {
    events: Vec<LifecycleEvent>,
}

impl LifecycleManager {
    /// Create new lifecycle manager
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Clear recorded events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Transition worker state
    pub fn transition_state(
        &mut self,
        worker: &mut ServiceWorker,
        new_state: WorkerState,
    ) -> Result<()> {
        let old_state = worker.state;

        if !is_valid_transition(old_state, new_state) {
            return Err(AgentError::InvalidStateTransition {
                from: old_state,
                to: new_state,
            });
        }

        worker.state = new_state;
        log::info!(
            "[SW Host] worker {} ({}) {:?} -> {:?}",
            worker.id().raw(),
            worker.cache_name(),
            old_state,
            new_state
        );

        self.events.push(LifecycleEvent::StateChange(StateChangeEvent {
            worker_id: worker.id(),
            old_state,
            new_state,
        }));

        Ok(())
    }

    /// Record that open clients are now controlled by `worker`.
    pub fn controller_change(&mut self, worker: &ServiceWorker) -> Result<()> {
        if worker.state != WorkerState::Activated {
            return Err(AgentError::InvalidStateTransition {
                from: worker.state,
                to: WorkerState::Activated,
            });
        }
        self.events.push(LifecycleEvent::ControllerChange(worker.id()));
        Ok(())
    }
}

/// Check if a state transition is valid
fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use WorkerState::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Installed)
            | (Installing, Redundant)   // install failed
            | (Installed, Activating)
            | (Installed, Redundant)    // replaced while waiting
            | (Activating, Activated)
            | (Activating, Redundant)
            | (Activated, Redundant) // superseded
    )
}

/// Requests a handler can make of its host.
#[async_trait]
pub trait LifecycleControl: Send + Sync {
    /// Activate as soon as install finishes instead of waiting for the
    /// previous version's clients to close.
    async fn skip_waiting(&self) -> Result<()>;

    /// Take control of already-open clients.
    async fn claim(&self) -> Result<()>;
}

/// [`LifecycleControl`] that records requests for the host to act on once
/// the event settles.
#[derive(Debug, Default)]
pub struct EventControl {
    skip_waiting: AtomicBool,
    claim: AtomicBool,
}

impl EventControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn claim_requested(&self) -> bool {
        self.claim.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LifecycleControl for EventControl {
    async fn skip_waiting(&self) -> Result<()> {
        self.skip_waiting.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn claim(&self) -> Result<()> {
        self.claim.store(true, Ordering::SeqCst);
        Ok(())
    }
}
