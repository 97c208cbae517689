//! Agent configuration.
//!
//! The bucket name and asset list are injected here rather than baked into
//! the agent, so several versions can live side by side (and in tests).

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::url::Url;

/// Pages, styles, scripts and icons of the Atlas application.
pub const ATLAS_ASSETS: &[&str] = &[
    "./programs.html",
    "./schedule.html",
    "./log.html",
    "./tracker.html",
    "./history.html",
    "./profile.html",
    "./settings.html",
    "./style.css",
    "./functions.js",
    "./manifest.webmanifest",
    "./icons/atlas-logo.png",
    "./icons/icons.svg",
];

/// Bucket prefix of the Atlas application.
pub const ATLAS_CACHE_PREFIX: &str = "atlas-offline";

/// Build a versioned bucket name: `{prefix}-v{version}`.
pub fn bucket_name(prefix: &str, version: u32) -> String {
    format!("{}-v{}", prefix, version)
}

/// Offline agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name of the current version's bucket. Bumping it is the only way to
    /// invalidate the cached set.
    pub cache_name: String,
    /// Origin the agent serves (`scheme://host[:port]`).
    pub origin: String,
    /// Path the relative asset paths are resolved against.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Document served for every navigation request.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Assets cached at install time, in order.
    pub assets: Vec<String>,
    /// Ask the host to activate as soon as install succeeds.
    #[serde(default = "default_skip_waiting")]
    pub skip_waiting: bool,
}

fn default_scope() -> String {
    String::from("/")
}

fn default_shell() -> String {
    String::from("./index.html")
}

fn default_skip_waiting() -> bool {
    true
}

impl AgentConfig {
    pub fn new<I, S>(cache_name: &str, origin: &str, shell: &str, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cache_name: cache_name.to_string(),
            origin: origin.to_string(),
            scope: default_scope(),
            shell: shell.to_string(),
            assets: assets.into_iter().map(Into::into).collect(),
            skip_waiting: default_skip_waiting(),
        }
    }

    /// Configuration of the Atlas application served from `origin`.
    pub fn atlas(origin: &str) -> Self {
        Self::new(
            &bucket_name(ATLAS_CACHE_PREFIX, 1),
            origin,
            "./programs.html",
            ATLAS_ASSETS.iter().copied(),
        )
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    pub fn with_cache_name(mut self, cache_name: &str) -> Self {
        self.cache_name = cache_name.to_string();
        self
    }

    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AgentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Absolute URL of the scope.
    pub fn scope_url(&self) -> Result<Url> {
        let origin = self.origin_url()?;
        let scope = if self.scope.ends_with('/') {
            self.scope.clone()
        } else {
            format!("{}/", self.scope)
        };
        let url = origin.resolve(&scope)?;
        if !url.same_origin(&origin) {
            return Err(AgentError::Config(format!(
                "scope {} is outside origin {}",
                self.scope, self.origin
            )));
        }
        Ok(url)
    }

    fn origin_url(&self) -> Result<Url> {
        let url = Url::parse(&self.origin)?;
        if !url.is_http() {
            return Err(AgentError::Config(format!(
                "origin must be http or https: {}",
                self.origin
            )));
        }
        if url.path != "/" || url.query.is_some() || url.fragment.is_some() {
            return Err(AgentError::Config(format!(
                "origin must not carry a path: {}",
                self.origin
            )));
        }
        Ok(url)
    }

    /// Resolve the asset list against the scope.
    pub fn manifest(&self) -> Result<AssetManifest> {
        if self.cache_name.trim().is_empty() {
            return Err(AgentError::Config(String::from("cache_name is empty")));
        }
        if self.assets.is_empty() {
            return Err(AgentError::Config(String::from("asset list is empty")));
        }

        let scope = self.scope_url()?;
        let mut entries: Vec<Url> = Vec::with_capacity(self.assets.len());
        for path in &self.assets {
            let url = scope.resolve(path)?;
            if !url.same_origin(&scope) {
                return Err(AgentError::Config(format!(
                    "asset {} is not on origin {}",
                    path, self.origin
                )));
            }
            if entries
                .iter()
                .any(|e| e.href_without_fragment() == url.href_without_fragment())
            {
                return Err(AgentError::Config(format!("duplicate asset: {}", path)));
            }
            entries.push(url);
        }

        let shell = scope.resolve(&self.shell)?;
        let shell = entries
            .iter()
            .position(|e| e.href_without_fragment() == shell.href_without_fragment())
            .ok_or_else(|| {
                AgentError::Config(format!("shell {} is not in the asset list", self.shell))
            })?;

        Ok(AssetManifest { entries, shell })
    }

    /// Validate without keeping the resolved manifest.
    pub fn validate(&self) -> Result<()> {
        self.manifest().map(|_| ())
    }
}

/// Asset list resolved to absolute URLs. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    entries: Vec<Url>,
    shell: usize,
}

impl AssetManifest {
    /// Resolved asset URLs in configuration order.
    pub fn entries(&self) -> &[Url] {
        &self.entries
    }

    /// URL of the shell document.
    pub fn shell(&self) -> &Url {
        &self.entries[self.shell]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.iter().any(|e| e.href_without_fragment() == url)
    }
}
