//! Network capability.
//!
//! Workers only reach the network through [`Network`]. The offline agent
//! uses it during install and nowhere else.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use spin::{Mutex, RwLock};

use super::fetch::{Request, Response, ResponseType};
use crate::error::NetworkError;
use crate::url::Url;

/// Outbound fetch performed on behalf of a worker.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// In-memory origin server.
///
/// Serves registered routes by exact URL, answers 404 for anything else,
/// refuses schemes other than http(s), and records every request it sees so
/// tests can assert that no traffic happened.
pub struct MemoryNetwork {
    routes: RwLock<BTreeMap<String, Response>>,
    online: AtomicBool,
    log: Mutex<Vec<String>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(BTreeMap::new()),
            online: AtomicBool::new(true),
            log: Mutex::new(Vec::new()),
        }
    }

    /// A network that is down. Every attempt is still recorded.
    pub fn offline() -> Self {
        let network = Self::new();
        network.set_online(false);
        network
    }

    /// Serve `response` for `url`.
    pub fn route(&self, url: &str, response: Response) {
        self.routes.write().insert(url.to_string(), response);
    }

    /// Serve a 200 with `body` for `url`.
    pub fn route_body(&self, url: &str, content_type: &str, body: &[u8]) {
        let response = Response::new(200)
            .with_header("content-type", content_type)
            .with_body(body.to_vec());
        self.route(url, response);
    }

    /// Stop serving `url`; later requests get a 404.
    pub fn remove_route(&self, url: &str) {
        self.routes.write().remove(url);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Number of fetch attempts, successful or not.
    pub fn request_count(&self) -> usize {
        self.log.lock().len()
    }

    /// URLs of every fetch attempt in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Network for MemoryNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.log.lock().push(request.url.clone());

        let fetchable = Url::parse(&request.url).map_or(false, |url| url.is_http());
        if !fetchable {
            return Err(NetworkError::Refused(request.url.clone()));
        }
        if !self.is_online() {
            return Err(NetworkError::Unreachable(request.url.clone()));
        }

        let mut response = self
            .routes
            .read()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::new(404));
        response.response_type = ResponseType::Basic;
        response.url = request.url.clone();
        Ok(response)
    }
}
