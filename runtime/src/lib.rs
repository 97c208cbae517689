//! KPIO Offline Runtime
//!
//! An offline-only service worker agent and the in-memory host that drives it.
//! At install the agent fetches a fixed manifest into a versioned cache bucket,
//! at activation it deletes every other bucket, and afterwards it answers
//! same-origin GET requests from the cache alone. Navigations get the app
//! shell; everything else gets its exact cache entry. Misses are answered with
//! synthesized 503/404 responses instead of a network fetch.
//!
//! # Architecture
//!
//! - `agent`: The offline agent (install / activate / fetch handlers)
//! - `config`: Agent configuration, JSON loading, asset manifest resolution
//! - `error`: Error types
//! - `url`: URL parsing, resolution, same-origin checks
//! - `service_worker`: Worker records, events, cache storage, network
//!   capability, lifecycle control and the registration host

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod agent;
pub mod config;
pub mod error;
pub mod service_worker;
pub mod url;

pub use agent::{ActivationReport, OfflineAgent, Platform, RequestKind};
pub use config::{AgentConfig, AssetManifest};
pub use error::{AgentError, NetworkError, Result, StorageError};
pub use url::Url;
