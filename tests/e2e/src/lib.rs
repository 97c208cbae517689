//! KPIO End-to-End Testing Framework
//!
//! Drives the offline runtime through whole-application scenarios: the Atlas
//! app is installed from an in-memory origin, the network is cut, and every
//! page and asset must still be served from the cache.

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod fixtures;
pub mod harness;

#[cfg(test)]
mod pwa {
    mod test_pwa_lifecycle;
    mod test_pwa_offline;
    mod test_pwa_storage;
}

pub use fixtures::AtlasFixtures;
pub use harness::OfflineHarness;
