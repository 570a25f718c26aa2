use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use super::{bounded, collect, http_authority};
use crate::hooks::{Dispatch, InterceptionPoint, Registry};
use crate::request::Timeout;
use crate::{ClientConfig, Error};

/// Dispatches over a pool of reusable connections
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl ConnectionPool {
    pub fn new(config: &ClientConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(config.connect_timeout());

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        builder.pool_idle_timeout(config.pool_idle_timeout());
        if let Some(max_idle) = config.pool_max_idle_per_host {
            builder.pool_max_idle_per_host(max_idle);
        }

        Self {
            client: builder.build(connector),
        }
    }

    /// Dispatch through the hooks at [`InterceptionPoint::ConnectionPool`]
    pub async fn handle_async_request(
        &self,
        request: Request<Bytes>,
    ) -> Result<Response<Bytes>, Error> {
        Registry::global()
            .dispatch(InterceptionPoint::ConnectionPool, self, request)
            .await
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

#[async_trait]
impl Dispatch for ConnectionPool {
    async fn dispatch(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Error> {
        http_authority(request.uri())?;
        let timeout = Timeout::of(&request);
        tracing::debug!("Sending {} {} via connection pool", request.method(), request.uri());

        bounded(timeout.read, async {
            let response = self.client.request(request.map(Full::new)).await?;
            collect(response).await
        })
        .await
    }
}
