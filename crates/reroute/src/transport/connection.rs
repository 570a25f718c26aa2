use async_trait::async_trait;
use bytes::Bytes;
use hyper::{Request, Response, Uri};

use super::{bounded, connect, http_authority, send_on, set_host};
use crate::hooks::{Dispatch, InterceptionPoint, Registry};
use crate::request::Timeout;
use crate::Error;

/// Opens a new connection for every request
#[derive(Debug, Clone, Default)]
pub struct HttpConnection;

impl HttpConnection {
    pub fn new() -> Self {
        Self
    }

    /// Dispatch through the hooks at [`InterceptionPoint::Connection`]
    pub async fn handle_async_request(
        &self,
        request: Request<Bytes>,
    ) -> Result<Response<Bytes>, Error> {
        Registry::global()
            .dispatch(InterceptionPoint::Connection, self, request)
            .await
    }
}

#[async_trait]
impl Dispatch for HttpConnection {
    async fn dispatch(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>, Error> {
        let authority = http_authority(request.uri())?;
        let timeout = Timeout::of(&request);
        tracing::debug!("Connecting to {} for {} {}", authority, request.method(), request.uri());

        // Origin-form request line on a direct connection
        set_host(&mut request)?;
        let origin: Uri = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .parse()
            .map_err(hyper::http::Error::from)?;
        *request.uri_mut() = origin;

        let stream = connect(&authority, timeout.connect).await?;
        bounded(timeout.read, send_on(stream, request)).await
    }
}
