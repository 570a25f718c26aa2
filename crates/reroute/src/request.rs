//! Request options and destination extraction

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use hyper::{Request, Uri};

/// Per-request timeouts, carried in the request extensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeout {
    pub connect: Option<Duration>,
    pub read: Option<Duration>,
}

impl Timeout {
    pub fn read(duration: Duration) -> Self {
        Self {
            connect: None,
            read: Some(duration),
        }
    }

    /// Timeouts attached to `request`, if any
    pub fn of<B>(request: &Request<B>) -> Timeout {
        request
            .extensions()
            .get::<Timeout>()
            .copied()
            .unwrap_or_default()
    }
}

/// Extension methods for attaching options to a request
pub trait RequestExt {
    fn with_timeout(self, timeout: Timeout) -> Self;

    fn with_read_timeout(self, duration: Duration) -> Self;
}

impl RequestExt for Request<Bytes> {
    fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.extensions_mut().insert(timeout);
        self
    }

    fn with_read_timeout(self, duration: Duration) -> Self {
        let timeout = Timeout {
            read: Some(duration),
            ..Timeout::of(&self)
        };
        self.with_timeout(timeout)
    }
}

/// Scheme, host and optional port of a destination.
///
/// Normalised so that equal destinations compare equal: scheme and host are
/// lowercased and a port equal to the scheme's default is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Authority {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Authority {
    pub fn new(scheme: &str, host: &str, port: Option<u16>) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        let port = port.filter(|p| Some(*p) != default_port(&scheme));
        Self {
            host: host.to_ascii_lowercase(),
            scheme,
            port,
        }
    }

    /// Authority of an absolute URI, `None` when it has no scheme or host
    pub fn of_uri(uri: &Uri) -> Option<Self> {
        let scheme = uri.scheme_str()?;
        let host = uri.host().filter(|h| !h.is_empty())?;
        Some(Self::new(scheme, host, uri.port_u16()))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host in the form a socket address lookup takes, without the brackets
    /// around an IPv6 literal
    pub fn socket_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
    }

    /// Explicit, non-default port
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Port to connect to, falling back to the scheme's default
    pub fn port_or_default(&self) -> u16 {
        self.port
            .or_else(|| default_port(&self.scheme))
            .unwrap_or(80)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        _ => None,
    }
}

/// Where a request is going: authority plus path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub authority: Authority,
    pub path: String,
}

impl Destination {
    /// Destination of `request`, `None` when its URI is not absolute
    pub fn of<B>(request: &Request<B>) -> Option<Self> {
        let uri = request.uri();
        let authority = Authority::of_uri(uri)?;
        Some(Self {
            authority,
            path: uri.path().to_string(),
        })
    }
}
