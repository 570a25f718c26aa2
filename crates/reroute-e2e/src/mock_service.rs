//! Real HTTP service on a local port
//!
//! Plays the part of the network in tests: requests that an overlay passes
//! through end up here, are recorded, and get the configured reply.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use tokio::net::TcpListener;

/// A request received by the mock service
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    /// Request target as sent: a path, or an absolute URI when sent to a proxy
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    delay: Option<Duration>,
}

/// A mock HTTP service for testing
pub struct MockHttpService {
    addr: SocketAddr,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    reply: Arc<RwLock<Reply>>,
}

impl MockHttpService {
    /// Start a mock HTTP service on an ephemeral loopback port
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_on("127.0.0.1:0").await
    }

    /// Start a mock HTTP service listening on `addr`
    pub async fn start_on(addr: &str) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        let requests = Arc::new(RwLock::new(Vec::new()));
        let reply = Arc::new(RwLock::new(Reply {
            status: StatusCode::OK,
            headers: vec![],
            body: b"network".to_vec(),
            delay: None,
        }));

        let service_requests = requests.clone();
        let service_reply = reply.clone();
        tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                tracing::debug!("Mock service connection from {}", peer);

                let requests = service_requests.clone();
                let reply = service_reply.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let requests = requests.clone();
                        let reply = reply.clone();
                        async move { Self::respond(req, &requests, &reply).await }
                    });

                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        tracing::debug!("Mock service connection error: {}", e);
                    }
                });
            }
        });

        Ok(Self {
            addr,
            requests,
            reply,
        })
    }

    async fn respond(
        req: Request<Incoming>,
        requests: &RwLock<Vec<RecordedRequest>>,
        reply: &RwLock<Reply>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let method = req.method().to_string();
        let uri = req.uri().to_string();
        let headers = req
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = req
            .into_body()
            .collect()
            .await
            .map(|b| b.to_bytes().to_vec())
            .unwrap_or_default();

        requests.write().push(RecordedRequest {
            method,
            uri,
            headers,
            body,
        });

        let reply = reply.read().clone();
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }

        let mut response = Response::new(Full::new(Bytes::from(reply.body)));
        *response.status_mut() = reply.status;
        for (name, value) in reply.headers {
            if let (Ok(name), Ok(value)) = (
                hyper::header::HeaderName::try_from(name),
                hyper::header::HeaderValue::try_from(value),
            ) {
                response.headers_mut().append(name, value);
            }
        }
        Ok(response)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Host and port, e.g. "127.0.0.1:12345"
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Absolute URL for `path` on this service
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.read().last().cloned()
    }

    pub fn set_response_status(&self, status: StatusCode) {
        self.reply.write().status = status;
    }

    pub fn set_response_body(&self, body: impl Into<Vec<u8>>) {
        self.reply.write().body = body.into();
    }

    pub fn add_response_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.reply.write().headers.push((name.into(), value.into()));
    }

    /// Wait this long before answering each request
    pub fn set_response_delay(&self, delay: Duration) {
        self.reply.write().delay = Some(delay);
    }
}
