//! Fetch Event Handling
//!
//! Request/response value types and the fetch event handed to a worker.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::future::Future;
use core::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use super::ClientId;

/// Fetch event ID counter
static NEXT_FETCH_ID: AtomicU64 = AtomicU64::new(1);

/// Fetch event ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchEventId(u64);

impl FetchEventId {
    /// Create a new ID
    pub fn new() -> Self {
        Self(NEXT_FETCH_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for FetchEventId {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl RequestMethod {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

/// Request mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestMode {
    /// Same-origin only
    SameOrigin,
    /// No CORS
    NoCors,
    /// CORS
    #[default]
    Cors,
    /// Top-level navigation
    Navigate,
}

/// Request destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestDestination {
    #[default]
    Empty,
    Document,
    Font,
    Image,
    Manifest,
    Script,
    Style,
}

/// Fetch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Absolute request URL
    pub url: String,
    /// HTTP method
    pub method: RequestMethod,
    /// Headers, names lowercased
    pub headers: BTreeMap<String, String>,
    /// Request mode
    pub mode: RequestMode,
    /// Request destination
    pub destination: RequestDestination,
}

impl Request {
    /// Create a GET request in `cors` mode.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RequestMethod::Get,
            headers: BTreeMap::new(),
            mode: RequestMode::Cors,
            destination: RequestDestination::Empty,
        }
    }

    /// Create a top-level navigation request the way a browser issues one.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(url)
            .with_mode(RequestMode::Navigate)
            .with_destination(RequestDestination::Document)
            .with_header("Accept", "text/html,application/xhtml+xml,*/*;q=0.8")
    }

    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: RequestDestination) -> Self {
        self.destination = destination;
        self
    }

    /// Set a header; the name is stored lowercased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }
}

/// Response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseType {
    /// Same-origin network response
    Basic,
    /// Constructed by a worker
    #[default]
    Default,
}

/// Fetch response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Response type
    pub response_type: ResponseType,
    /// Final URL, empty for constructed responses
    pub url: String,
    /// Status code
    pub status: u16,
    /// Status text
    pub status_text: String,
    /// Headers, names lowercased
    pub headers: BTreeMap<String, String>,
    /// Body bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Create an empty response with the canonical status text.
    pub fn new(status: u16) -> Self {
        Self {
            response_type: ResponseType::Default,
            url: String::new(),
            status,
            status_text: status_text_for(status).to_string(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Plain-text response with an explicit status text, as built by
    /// `new Response(text, { status, statusText })`.
    pub fn text(status: u16, status_text: &str, body: &str) -> Self {
        let mut response = Self::new(status);
        response.status_text = status_text.to_string();
        response.headers.insert(
            String::from("content-type"),
            String::from("text/plain;charset=UTF-8"),
        );
        response.body = body.as_bytes().to_vec();
        response
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// Check if response is OK
    pub fn ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body as UTF-8 text, lossy.
    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Get status text for status code
fn status_text_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

/// What the host does with a request after dispatching its fetch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The worker did not answer; the host performs its default network fetch.
    Passthrough(Request),
    /// The worker answered.
    Responded(Response),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Responded(response) => Some(response),
            Self::Passthrough(_) => None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough(_))
    }
}

/// Fetch event
///
/// A worker answers by handing a future to [`respond_with`](Self::respond_with);
/// the host awaits it through [`into_outcome`](Self::into_outcome).
pub struct FetchEvent<'a> {
    id: FetchEventId,
    request: Request,
    client_id: Option<ClientId>,
    response: Option<BoxFuture<'a, Response>>,
}

impl<'a> FetchEvent<'a> {
    /// Create a new fetch event
    pub fn new(request: Request, client_id: Option<ClientId>) -> Self {
        Self {
            id: FetchEventId::new(),
            request,
            client_id,
            response: None,
        }
    }

    pub fn id(&self) -> FetchEventId {
        self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    /// Check if respondWith was called
    pub fn responded(&self) -> bool {
        self.response.is_some()
    }

    /// Answer the request. Only the first call takes effect.
    pub fn respond_with<F>(&mut self, response: F)
    where
        F: Future<Output = Response> + Send + 'a,
    {
        if self.response.is_none() {
            self.response = Some(response.boxed());
        }
    }

    /// Resolve the event into what the host should do with the request.
    pub async fn into_outcome(self) -> FetchOutcome {
        match self.response {
            Some(response) => FetchOutcome::Responded(response.await),
            None => FetchOutcome::Passthrough(self.request),
        }
    }
}

impl core::fmt::Debug for FetchEvent<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FetchEvent")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("client_id", &self.client_id)
            .field("responded", &self.responded())
            .finish()
    }
}
