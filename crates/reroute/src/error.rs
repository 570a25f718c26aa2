use thiserror::Error;

use crate::hooks::HookHandle;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid overlay target or client configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Overlay needs a host or a URL to match")]
    MissingTarget,

    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Host {0:?} must not contain a scheme or path; use a URL target instead")]
    InvalidHost(String),

    #[error("URL {0:?} has no host")]
    MissingHost(String),

    #[error("Invalid path pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Invalid proxy address: {0}")]
    InvalidProxy(String),

    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors raised while dispatching a request or managing hooks
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Read timed out")]
    ReadTimeout,

    #[error("Connect timed out")]
    ConnectTimeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    #[error("Invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Request URI has no host: {0}")]
    MissingHost(String),

    #[error("Application error: {0}")]
    App(#[source] BoxError),

    #[error("Hook {0} is not installed")]
    HookMissing(HookHandle),
}

impl Error {
    /// True for both read and connect timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ReadTimeout | Error::ConnectTimeout)
    }
}
