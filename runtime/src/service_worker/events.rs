//! Service Worker Events
//!
//! Lifecycle events whose completion the host must wait for.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::future::Future;

use futures_util::future::{join_all, BoxFuture, FutureExt};

use crate::error::Result;

/// Event type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Install event
    Install,
    /// Activate event
    Activate,
}

/// An install or activate event.
///
/// Handlers extend the event's lifetime with [`wait_until`](Self::wait_until).
/// The host calls [`settle`](Self::settle) and must not move the worker to
/// its next state before that future resolves.
pub struct ExtendableEvent<'a> {
    event_type: EventType,
    pending: Vec<BoxFuture<'a, Result<()>>>,
}

impl<'a> ExtendableEvent<'a> {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            pending: Vec::new(),
        }
    }

    pub fn install() -> Self {
        Self::new(EventType::Install)
    }

    pub fn activate() -> Self {
        Self::new(EventType::Activate)
    }

    /// Get event type
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Keep the event open until `work` resolves.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = Result<()>> + Send + 'a,
    {
        self.pending.push(work.boxed());
    }

    /// Check if wait_until was called
    pub fn has_wait_until(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Await every extension. All of them run to completion; the first
    /// failure in registration order is returned.
    pub async fn settle(self) -> Result<()> {
        let results = join_all(self.pending).await;
        results.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }
}

impl core::fmt::Debug for ExtendableEvent<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExtendableEvent")
            .field("event_type", &self.event_type)
            .field("pending", &self.pending.len())
            .finish()
    }
}
