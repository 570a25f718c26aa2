//! HTTP clients built on the transports

use bytes::Bytes;
use hyper::{Method, Request, Response};

use crate::config::{ClientConfig, Mode};
use crate::hooks::Dispatch;
use crate::request::Timeout;
use crate::transport::{ConnectionPool, HttpConnection, HttpProxy};
use crate::Error;

#[derive(Debug, Clone)]
enum Route {
    Connection(HttpConnection),
    Pool(ConnectionPool),
    Proxy(HttpProxy),
}

impl Route {
    fn new(config: &ClientConfig) -> Result<Self, Error> {
        if let Some(proxy) = &config.proxy {
            return Ok(Route::Proxy(HttpProxy::new(proxy)?));
        }
        Ok(match config.mode {
            Mode::Pooled => Route::Pool(ConnectionPool::new(config)),
            Mode::Direct => Route::Connection(HttpConnection::new()),
        })
    }

    fn original(&self) -> &dyn Dispatch {
        match self {
            Route::Connection(t) => t,
            Route::Pool(t) => t,
            Route::Proxy(t) => t,
        }
    }
}

/// Fills in the configured timeouts on requests that carry none
fn with_defaults(config: &ClientConfig, mut request: Request<Bytes>) -> Request<Bytes> {
    if request.extensions().get::<Timeout>().is_none() {
        request.extensions_mut().insert(config.default_timeout());
    }
    request
}

fn build(method: Method, url: &str, body: Bytes) -> Result<Request<Bytes>, Error> {
    Ok(Request::builder().method(method).uri(url).body(body)?)
}

/// Async HTTP client. Requests go through the interception hooks.
#[derive(Debug, Clone)]
pub struct AsyncClient {
    config: ClientConfig,
    route: Route,
}

impl AsyncClient {
    pub fn new() -> Result<Self, Error> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, Error> {
        let route = Route::new(&config)?;
        Ok(Self { config, route })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Error> {
        let request = with_defaults(&self.config, request);
        match &self.route {
            Route::Connection(t) => t.handle_async_request(request).await,
            Route::Pool(t) => t.handle_async_request(request).await,
            Route::Proxy(t) => t.handle_async_request(request).await,
        }
    }

    pub async fn get(&self, url: &str) -> Result<Response<Bytes>, Error> {
        self.send(build(Method::GET, url, Bytes::new())?).await
    }

    pub async fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<Response<Bytes>, Error> {
        self.send(build(Method::POST, url, body.into())?).await
    }
}

/// Blocking HTTP client. Requests always take the original transport and are
/// never intercepted.
///
/// Owns a single-threaded runtime, so it must not be used or dropped from
/// inside another async runtime.
pub struct BlockingClient {
    config: ClientConfig,
    route: Route,
    runtime: tokio::runtime::Runtime,
}

impl BlockingClient {
    pub fn new() -> Result<Self, Error> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let route = Route::new(&config)?;
        Ok(Self {
            config,
            route,
            runtime,
        })
    }

    pub fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Error> {
        let request = with_defaults(&self.config, request);
        self.runtime.block_on(self.route.original().dispatch(request))
    }

    pub fn get(&self, url: &str) -> Result<Response<Bytes>, Error> {
        self.send(build(Method::GET, url, Bytes::new())?)
    }

    pub fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<Response<Bytes>, Error> {
        self.send(build(Method::POST, url, body.into())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_proxy_config_selects_proxy_route() {
        let client =
            AsyncClient::with_config(ClientConfig::default().with_proxy("http://127.0.0.1:3128"))
                .unwrap();
        assert!(matches!(client.route, Route::Proxy(_)));
    }

    #[test]
    fn test_mode_selects_route() {
        let pooled = AsyncClient::new().unwrap();
        assert!(matches!(pooled.route, Route::Pool(_)));

        let direct =
            AsyncClient::with_config(ClientConfig::default().with_mode(Mode::Direct)).unwrap();
        assert!(matches!(direct.route, Route::Connection(_)));
    }

    #[test]
    fn test_invalid_proxy_is_a_config_error() {
        let err = AsyncClient::with_config(ClientConfig::default().with_proxy("nope")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_request_timeout_wins_over_default() {
        let config = ClientConfig::default().with_read_timeout(Duration::from_secs(5));
        let own = Timeout::read(Duration::from_millis(10));

        let mut request = build(Method::GET, "http://example.org", Bytes::new()).unwrap();
        request.extensions_mut().insert(own);
        assert_eq!(Timeout::of(&with_defaults(&config, request)), own);

        let request = build(Method::GET, "http://example.org", Bytes::new()).unwrap();
        assert_eq!(
            Timeout::of(&with_defaults(&config, request)).read,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_unsupported_scheme_is_reported() {
        let client = BlockingClient::new().unwrap();
        let err = client.get("ftp://example.org/file").unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme(s) if s == "ftp"));
    }
}
