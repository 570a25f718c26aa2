//! In-process applications that redirected requests are handed to

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::Service;
use hyper::{Request, Response};

use crate::error::BoxError;

/// An application invoked in memory instead of over a socket.
///
/// Implemented for every hyper [`Service`] that takes a buffered request and
/// returns a body of [`Bytes`], so a `service_fn` closure is an `App`.
pub trait App: Send + Sync + 'static {
    fn serve(&self, request: Request<Full<Bytes>>)
        -> BoxFuture<'static, Result<Response<Bytes>, BoxError>>;
}

impl<S, B> App for S
where
    S: Service<Request<Full<Bytes>>, Response = Response<B>> + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn serve(
        &self,
        request: Request<Full<Bytes>>,
    ) -> BoxFuture<'static, Result<Response<Bytes>, BoxError>> {
        let response = Service::call(self, request);
        Box::pin(async move {
            let (parts, body) = response.await.map_err(Into::into)?.into_parts();
            let body = body.collect().await.map_err(Into::into)?.to_bytes();
            Ok(Response::from_parts(parts, body))
        })
    }
}
