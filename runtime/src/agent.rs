//! Offline-only cache agent.
//!
//! Install fills the current bucket with the manifest, activate deletes every
//! other bucket, and fetch answers same-origin GETs from the cache alone.
//! The fetch path is only ever handed a [`CacheStorage`], so it cannot reach
//! the network even on a miss.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use futures_util::future::join_all;

use crate::config::{AgentConfig, AssetManifest};
use crate::error::{AgentError, Result, StorageError};
use crate::service_worker::{
    CacheStorage, ExtendableEvent, FetchEvent, LifecycleControl, Network, Request,
    RequestMethod, RequestMode, Response,
};
use crate::url::Url;

/// Status of the response synthesized when the shell is not cached.
pub const OFFLINE_SHELL_STATUS: u16 = 503;
pub const OFFLINE_SHELL_STATUS_TEXT: &str = "Offline";
pub const OFFLINE_SHELL_BODY: &str = "Offline shell not found in cache.";

/// Status of the response synthesized for an uncached asset.
pub const NOT_CACHED_STATUS: u16 = 404;
pub const NOT_CACHED_STATUS_TEXT: &str = "Not cached";
pub const NOT_CACHED_BODY: &str = "Resource not available offline.";

/// Capabilities the host lends to lifecycle handlers.
#[derive(Clone, Copy)]
pub struct Platform<'a> {
    pub caches: &'a dyn CacheStorage,
    pub network: &'a dyn Network,
    pub control: &'a dyn LifecycleControl,
}

impl<'a> Platform<'a> {
    pub fn new(
        caches: &'a dyn CacheStorage,
        network: &'a dyn Network,
        control: &'a dyn LifecycleControl,
    ) -> Self {
        Self {
            caches,
            network,
            control,
        }
    }
}

/// How a handled request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Top-level navigation or HTML request: served the shell.
    Navigation,
    /// Everything else: served its exact cache entry.
    Asset,
}

/// What activation did to the namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// The current bucket.
    pub kept: String,
    /// Stale buckets removed.
    pub deleted: Vec<String>,
    /// Stale buckets whose deletion failed.
    pub failed: Vec<(String, StorageError)>,
}

/// The offline cache agent for one version of the application.
#[derive(Debug)]
pub struct OfflineAgent {
    config: AgentConfig,
    origin: Url,
    manifest: AssetManifest,
}

impl OfflineAgent {
    /// Validate `config` and resolve its manifest.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let manifest = config.manifest()?;
        let origin = Url::parse(&config.origin)?;
        Ok(Self {
            config,
            origin,
            manifest,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Name of the bucket this version owns.
    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    /// Install handler: keeps the event open until the bucket is populated.
    pub fn on_install<'a>(&'a self, event: &mut ExtendableEvent<'a>, platform: Platform<'a>) {
        event.wait_until(self.install(platform));
    }

    /// Fetch every manifest asset and store them in the current bucket.
    ///
    /// Population is all-or-nothing: a transport error or a non-2xx status
    /// for any asset fails the install before anything is written.
    pub async fn install(&self, platform: Platform<'_>) -> Result<()> {
        let name = self.cache_name();
        log::info!(
            "[OfflineSW] installing {} assets into {}",
            self.manifest.len(),
            name
        );

        platform.caches.open(name).await?;

        let requests: Vec<Request> = self
            .manifest
            .entries()
            .iter()
            .map(|url| Request::new(url.href()))
            .collect();
        let responses = join_all(requests.iter().map(|r| platform.network.fetch(r))).await;

        let mut entries = Vec::with_capacity(requests.len());
        for (request, response) in requests.into_iter().zip(responses) {
            let response = match response {
                Ok(response) => response,
                Err(source) => {
                    log::warn!("[OfflineSW] install of {} failed: {}", name, source);
                    return Err(AgentError::AssetFetch {
                        url: request.url,
                        source,
                    });
                }
            };
            if !response.ok() {
                log::warn!(
                    "[OfflineSW] install of {} failed: {} answered {}",
                    name,
                    request.url,
                    response.status
                );
                return Err(AgentError::AssetStatus {
                    url: request.url,
                    status: response.status,
                });
            }
            entries.push((request, response));
        }

        platform.caches.put_all(name, entries).await?;
        if self.config.skip_waiting {
            platform.control.skip_waiting().await?;
        }

        log::info!("[OfflineSW] installed {}", name);
        Ok(())
    }

    /// Activate handler: keeps the event open until stale buckets are gone.
    pub fn on_activate<'a>(&'a self, event: &mut ExtendableEvent<'a>, platform: Platform<'a>) {
        event.wait_until(async move { self.activate(platform).await.map(|_| ()) });
    }

    /// Delete every bucket except the current one, then claim open clients.
    ///
    /// Deletions run concurrently; a failed deletion is reported and does not
    /// stop the others or fail the activation.
    pub async fn activate(&self, platform: Platform<'_>) -> Result<ActivationReport> {
        let current = self.cache_name();
        let stale: Vec<String> = platform
            .caches
            .keys()
            .await?
            .into_iter()
            .filter(|name| name != current)
            .collect();

        let results = join_all(stale.iter().map(|name| platform.caches.delete(name))).await;

        let mut report = ActivationReport {
            kept: current.to_string(),
            ..ActivationReport::default()
        };
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(true) => report.deleted.push(name),
                Ok(false) => log::debug!("[OfflineSW] stale cache {} already gone", name),
                Err(e) => {
                    log::warn!("[OfflineSW] failed to delete stale cache {}: {}", name, e);
                    report.failed.push((name, e));
                }
            }
        }

        platform.control.claim().await?;

        log::info!(
            "[OfflineSW] activated {}: {} stale caches deleted, {} failed",
            current,
            report.deleted.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Decide whether a request is handled and how.
    ///
    /// Only same-origin GETs are handled; `None` leaves the request to the
    /// host's default network behavior.
    pub fn classify(&self, request: &Request) -> Option<RequestKind> {
        if request.method != RequestMethod::Get {
            return None;
        }
        let url = Url::parse(&request.url).ok()?;
        if !url.same_origin(&self.origin) {
            return None;
        }

        let accepts_html = request
            .header("accept")
            .map_or(false, |accept| accept.contains("text/html"));
        if request.mode == RequestMode::Navigate || accepts_html {
            Some(RequestKind::Navigation)
        } else {
            Some(RequestKind::Asset)
        }
    }

    /// Fetch handler. Leaves the event unanswered for requests it does not
    /// handle.
    pub fn on_fetch<'a>(&'a self, event: &mut FetchEvent<'a>, caches: &'a dyn CacheStorage) {
        let Some(kind) = self.classify(event.request()) else {
            log::debug!(
                "[OfflineSW] passthrough {} {}",
                event.request().method.as_str(),
                event.request().url
            );
            return;
        };
        let request = event.request().clone();
        event.respond_with(self.respond(kind, request, caches));
    }

    /// Answer a handled request from the cache. Always yields a response.
    pub async fn respond(
        &self,
        kind: RequestKind,
        request: Request,
        caches: &dyn CacheStorage,
    ) -> Response {
        match kind {
            RequestKind::Navigation => {
                let shell = Request::new(self.manifest.shell().href());
                if let Some(response) = self.lookup(caches, &shell).await {
                    return response;
                }
                if let Some(response) = self.lookup(caches, &request).await {
                    return response;
                }
                log::debug!("[OfflineSW] shell missing for {}", request.url);
                Response::text(
                    OFFLINE_SHELL_STATUS,
                    OFFLINE_SHELL_STATUS_TEXT,
                    OFFLINE_SHELL_BODY,
                )
            }
            RequestKind::Asset => match self.lookup(caches, &request).await {
                Some(response) => response,
                None => {
                    log::debug!("[OfflineSW] cache miss for {}", request.url);
                    Response::text(NOT_CACHED_STATUS, NOT_CACHED_STATUS_TEXT, NOT_CACHED_BODY)
                }
            },
        }
    }

    /// Lookup in this version's bucket only; a bucket left behind by a
    /// failed stale deletion never answers. Storage failures count as misses.
    async fn lookup(&self, caches: &dyn CacheStorage, request: &Request) -> Option<Response> {
        match caches.match_in(self.cache_name(), request).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("[OfflineSW] cache lookup for {} failed: {}", request.url, e);
                None
            }
        }
    }
}
