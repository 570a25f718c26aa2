use async_trait::async_trait;
use bytes::Bytes;
use hyper::{Request, Response};

use super::{bounded, connect, http_authority, send_on, set_host};
use crate::hooks::{Dispatch, InterceptionPoint, Registry};
use crate::request::{Authority, Timeout};
use crate::{ConfigError, Error};

/// Forwards requests through an outbound HTTP proxy
#[derive(Debug, Clone)]
pub struct HttpProxy {
    proxy: Authority,
}

impl HttpProxy {
    /// `proxy` is the proxy's address, e.g. `http://127.0.0.1:3128`
    pub fn new(proxy: &str) -> Result<Self, ConfigError> {
        let uri: hyper::Uri = proxy
            .parse()
            .map_err(|_| ConfigError::InvalidProxy(proxy.to_string()))?;
        let proxy = http_authority(&uri).map_err(|_| ConfigError::InvalidProxy(proxy.to_string()))?;
        Ok(Self { proxy })
    }

    pub fn proxy(&self) -> &Authority {
        &self.proxy
    }

    /// Dispatch through the hooks at [`InterceptionPoint::HttpProxy`]
    pub async fn handle_async_request(
        &self,
        request: Request<Bytes>,
    ) -> Result<Response<Bytes>, Error> {
        Registry::global()
            .dispatch(InterceptionPoint::HttpProxy, self, request)
            .await
    }
}

#[async_trait]
impl Dispatch for HttpProxy {
    async fn dispatch(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>, Error> {
        http_authority(request.uri())?;
        let timeout = Timeout::of(&request);
        tracing::debug!(
            "Forwarding {} {} via proxy {}",
            request.method(),
            request.uri(),
            self.proxy
        );

        // The proxy gets the absolute-form URI untouched
        set_host(&mut request)?;
        let stream = connect(&self.proxy, timeout.connect).await?;
        bounded(timeout.read, send_on(stream, request)).await
    }
}
