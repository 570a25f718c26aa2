//! Transports that physically dispatch requests
//!
//! Each transport corresponds to one [`InterceptionPoint`]. Its
//! `handle_async_request` routes through the hooks registered at that point
//! and its [`Dispatch`] impl is the original behaviour the hooks wrap.
//!
//! [`InterceptionPoint`]: crate::InterceptionPoint
//! [`Dispatch`]: crate::Dispatch

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, HOST};
use hyper::{Request, Response, Uri};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::request::Authority;
use crate::Error;

mod connection;
mod pool;
mod proxy;

pub use connection::HttpConnection;
pub use pool::ConnectionPool;
pub use proxy::HttpProxy;

/// Authority of an absolute `http` URI
fn http_authority(uri: &Uri) -> Result<Authority, Error> {
    let authority = Authority::of_uri(uri).ok_or_else(|| Error::MissingHost(uri.to_string()))?;
    match authority.scheme() {
        "http" => Ok(authority),
        other => Err(Error::UnsupportedScheme(other.to_string())),
    }
}

/// Run `fut`, failing with [`Error::ReadTimeout`] if it outlives `limit`
async fn bounded<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::ReadTimeout)?,
        None => fut.await,
    }
}

async fn connect(authority: &Authority, limit: Option<Duration>) -> Result<TcpStream, Error> {
    let addr = (authority.socket_host().to_string(), authority.port_or_default());
    let stream = match limit {
        Some(limit) => tokio::time::timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectTimeout)??,
        None => TcpStream::connect(addr).await?,
    };
    Ok(stream)
}

/// Set the `Host` header from the URI unless the caller already set one
fn set_host(request: &mut Request<Bytes>) -> Result<(), Error> {
    if request.headers().contains_key(HOST) {
        return Ok(());
    }
    if let Some(authority) = request.uri().authority() {
        let value = HeaderValue::from_str(authority.as_str()).map_err(hyper::http::Error::from)?;
        request.headers_mut().insert(HOST, value);
    }
    Ok(())
}

/// Send a single request over a fresh HTTP/1 connection
async fn send_on(stream: TcpStream, request: Request<Bytes>) -> Result<Response<Bytes>, Error> {
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("Connection closed with error: {}", e);
        }
    });

    let response = sender.send_request(request.map(Full::new)).await?;
    collect(response).await
}

async fn collect(response: Response<Incoming>) -> Result<Response<Bytes>, Error> {
    let (parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok(Response::from_parts(parts, body))
}
