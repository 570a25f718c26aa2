//! Redirect outbound HTTP requests into in-process applications
//!
//! An [`Overlay`] is a redirection rule: requests whose destination matches
//! its host or URL pattern are answered by an in-process [`App`] instead of
//! going over the network. Overlays hook the transports of this crate's
//! clients ([`AsyncClient`], and the [`HttpConnection`], [`ConnectionPool`]
//! and [`HttpProxy`] transports under it), so call sites need no changes.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::convert::Infallible;
//!
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use hyper::service::service_fn;
//! use hyper::{Request, Response};
//! use reroute::{AsyncClient, Overlay};
//!
//! let app = service_fn(|_req: Request<Full<Bytes>>| async {
//!     Ok::<_, Infallible>(Response::new(Full::new(Bytes::from("bar"))))
//! });
//! let overlay = Overlay::for_host(app, "example.org")?;
//!
//! reroute_scope::scoped(&overlay, |_| async {
//!     let response = AsyncClient::new()?.get("http://example.org/foo").await?;
//!     assert_eq!(response.body(), "bar");
//!     Ok::<_, reroute::Error>(())
//! })
//! .await??;
//! # Ok(())
//! # }
//! ```

mod app;
mod client;
mod config;
mod error;
mod hooks;
mod matcher;
mod overlay;
mod request;
mod transport;

pub use app::App;
pub use client::{AsyncClient, BlockingClient};
pub use config::{ClientConfig, Mode};
pub use error::{BoxError, ConfigError, Error};
pub use hooks::{Dispatch, HookHandle, Intercept, InterceptionPoint, Next, Registry};
pub use matcher::{Matcher, Target};
pub use overlay::{Overlay, OverlayBuilder};
pub use request::{Authority, Destination, RequestExt, Timeout};
pub use transport::{ConnectionPool, HttpConnection, HttpProxy};
