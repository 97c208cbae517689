//! Test fixtures and data factories
//!
//! The Atlas application as served by its origin.

use alloc::format;
use alloc::string::String;

use kpio_offline_runtime::config::{bucket_name, AgentConfig, ATLAS_ASSETS, ATLAS_CACHE_PREFIX};
use kpio_offline_runtime::service_worker::MemoryNetwork;

/// Atlas application fixtures
pub struct AtlasFixtures;

impl AtlasFixtures {
    /// Origin the app is served from.
    pub const ORIGIN: &'static str = "https://atlas.example";

    /// Shell document served for navigations.
    pub const SHELL: &'static str = "./programs.html";

    /// Configuration for release `version` of the app.
    pub fn config(version: u32) -> AgentConfig {
        AgentConfig::atlas(Self::ORIGIN).with_cache_name(&Self::cache_name(version))
    }

    pub fn cache_name(version: u32) -> String {
        bucket_name(ATLAS_CACHE_PREFIX, version)
    }

    /// Absolute URL of an asset path such as `./style.css`.
    pub fn url(path: &str) -> String {
        format!(
            "{}/{}",
            Self::ORIGIN,
            path.trim_start_matches("./").trim_start_matches('/')
        )
    }

    /// Content type the origin sends for `path`.
    pub fn content_type(path: &str) -> &'static str {
        match path.rsplit('.').next() {
            Some("html") => "text/html;charset=UTF-8",
            Some("css") => "text/css",
            Some("js") => "text/javascript",
            Some("webmanifest") => "application/manifest+json",
            Some("png") => "image/png",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }

    /// Body the origin serves for `path` in `release`.
    pub fn body(path: &str, release: &str) -> String {
        match path.rsplit('.').next() {
            Some("html") => format!(
                "<!DOCTYPE html>\n<html>\n<head><title>Atlas</title></head>\n\
                 <body data-page=\"{}\" data-release=\"{}\"></body>\n</html>",
                path, release
            ),
            _ => format!("/* {} {} */", path, release),
        }
    }

    /// Origin serving every Atlas asset.
    pub fn network(release: &str) -> MemoryNetwork {
        let network = MemoryNetwork::new();
        Self::serve(&network, release);
        network
    }

    /// (Re)publish every Atlas asset for `release`.
    pub fn serve(network: &MemoryNetwork, release: &str) {
        for path in ATLAS_ASSETS {
            network.route_body(
                &Self::url(path),
                Self::content_type(path),
                Self::body(path, release).as_bytes(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_and_types() {
        assert_eq!(
            AtlasFixtures::url("./icons/icons.svg"),
            "https://atlas.example/icons/icons.svg"
        );
        assert_eq!(AtlasFixtures::content_type("./style.css"), "text/css");
        assert_eq!(AtlasFixtures::cache_name(2), "atlas-offline-v2");
        assert!(AtlasFixtures::body("./log.html", "r1").contains("data-release=\"r1\""));
    }
}
