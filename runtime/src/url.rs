//! URL handling.
//!
//! Just enough of the URL model for same-origin checks, manifest path
//! resolution and cache keys. Default ports are dropped on parse so that
//! `https://host:443` and `https://host` share an origin.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::error::AgentError;

/// Parsed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    /// URL scheme, lowercased (`http`, `https`, ...).
    pub scheme: String,
    /// Host, lowercased.
    pub host: String,
    /// Port, `None` when absent or the scheme default.
    pub port: Option<u16>,
    /// Path, always starting with `/`.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    /// Fragment without the leading `#`.
    pub fragment: Option<String>,
}

impl Url {
    /// Parse an absolute URL.
    pub fn parse(input: &str) -> Result<Self, AgentError> {
        let input = input.trim();
        let invalid = || AgentError::Config(format!("invalid URL: {}", input));

        let pos = input.find("://").ok_or_else(invalid)?;
        let scheme = input[..pos].to_ascii_lowercase();
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
            return Err(invalid());
        }
        let rest = &input[pos + 3..];

        let (rest, fragment) = match rest.find('#') {
            Some(pos) => (&rest[..pos], Some(rest[pos + 1..].to_string())),
            None => (rest, None),
        };
        let (rest, query) = match rest.find('?') {
            Some(pos) => (&rest[..pos], Some(rest[pos + 1..].to_string())),
            None => (rest, None),
        };
        let (host_port, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], normalize_path(&rest[pos..])),
            None => (rest, String::from("/")),
        };

        let (host, port) = match host_port.rfind(':') {
            Some(pos) => {
                let port: u16 = host_port[pos + 1..].parse().map_err(|_| invalid())?;
                (host_port[..pos].to_ascii_lowercase(), Some(port))
            }
            None => (host_port.to_ascii_lowercase(), None),
        };
        if host.is_empty() {
            return Err(invalid());
        }

        let port = port.filter(|p| Some(*p) != default_port(&scheme));

        Ok(Self {
            scheme,
            host,
            port,
            path,
            query,
            fragment,
        })
    }

    /// Check if this is an HTTP(S) URL.
    pub fn is_http(&self) -> bool {
        self.scheme == "http" || self.scheme == "https"
    }

    /// Serialized origin (`scheme://host[:port]`).
    pub fn origin(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }

    /// Whether both URLs share scheme, host and port.
    pub fn same_origin(&self, other: &Url) -> bool {
        self.scheme == other.scheme && self.host == other.host && self.port == other.port
    }

    /// Full URL string.
    pub fn href(&self) -> String {
        let mut url = self.href_without_fragment();
        if let Some(fragment) = &self.fragment {
            url.push('#');
            url.push_str(fragment);
        }
        url
    }

    /// URL string with the fragment removed; this is the cache key form.
    pub fn href_without_fragment(&self) -> String {
        let mut url = self.origin();
        url.push_str(&self.path);
        if let Some(query) = &self.query {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Resolve `relative` against this URL.
    pub fn resolve(&self, relative: &str) -> Result<Url, AgentError> {
        let relative = relative.trim();
        if relative.contains("://") {
            return Url::parse(relative);
        }
        if let Some(rest) = relative.strip_prefix("//") {
            return Url::parse(&format!("{}://{}", self.scheme, rest));
        }

        let mut url = self.clone();
        url.fragment = None;

        let (relative, fragment) = match relative.find('#') {
            Some(pos) => (&relative[..pos], Some(relative[pos + 1..].to_string())),
            None => (relative, None),
        };
        let (relative, query) = match relative.find('?') {
            Some(pos) => (&relative[..pos], Some(relative[pos + 1..].to_string())),
            None => (relative, None),
        };

        if relative.is_empty() {
            // Query or fragment only keeps the base path.
            if query.is_some() {
                url.query = query;
            }
        } else if relative.starts_with('/') {
            url.path = normalize_path(relative);
            url.query = query;
        } else {
            let base_dir = match self.path.rfind('/') {
                Some(pos) => &self.path[..=pos],
                None => "/",
            };
            url.path = normalize_path(&format!("{}{}", base_dir, relative));
            url.query = query;
        }
        url.fragment = fragment;

        Ok(url)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.href())
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        _ => None,
    }
}

/// Remove `.` and `..` segments from an absolute path.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let trailing_slash = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = String::from("/");
    out.push_str(&segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        out.push('/');
    }
    out
}
