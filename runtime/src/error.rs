//! Error types for the offline runtime.

use alloc::string::String;
use thiserror::Error;

use crate::service_worker::WorkerState;

/// Failures reported by a [`Network`](crate::service_worker::Network) capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// No route to the origin (offline, DNS failure, reset).
    #[error("network unreachable while fetching {0}")]
    Unreachable(String),
    /// The host refused to perform the request.
    #[error("request to {0} was refused")]
    Refused(String),
}

/// Failures reported by a [`CacheStorage`](crate::service_worker::CacheStorage) capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Named cache does not exist.
    #[error("cache not found: {0}")]
    NotFound(String),
    /// A batch named the same request more than once.
    #[error("duplicate request in batch: {0}")]
    DuplicateEntry(String),
    /// Storage quota exceeded.
    #[error("cache storage quota exceeded")]
    QuotaExceeded,
    /// Backend-specific failure.
    #[error("cache storage backend failure: {0}")]
    Backend(String),
    /// A persisted snapshot could not be decoded.
    #[error("corrupt cache snapshot: {0}")]
    Corrupt(String),
}

/// Errors surfaced by the agent and its host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A manifest asset could not be fetched during install.
    #[error("failed to fetch manifest asset {url}: {source}")]
    AssetFetch {
        url: String,
        #[source]
        source: NetworkError,
    },

    /// A manifest asset answered with a non-2xx status during install.
    #[error("manifest asset {url} answered with status {status}")]
    AssetStatus { url: String, status: u16 },

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Worker state machine refused a transition.
    #[error("invalid worker state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: WorkerState, to: WorkerState },
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, AgentError>;
