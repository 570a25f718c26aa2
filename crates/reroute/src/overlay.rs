//! Interception overlays
//!
//! An [`Overlay`] redirects requests whose destination matches its
//! [`Target`] into an in-process [`App`]. While active it has one hook at
//! every [`InterceptionPoint`]; requests that do not match fall through to
//! whatever was installed before it.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response};
use parking_lot::Mutex;
use reroute_scope::{enter_blocking, AsyncScope, Entered};

use crate::app::App;
use crate::hooks::{HookHandle, Intercept, InterceptionPoint, Next, Registry};
use crate::matcher::{Matcher, Target};
use crate::request::{Destination, Timeout};
use crate::{ConfigError, Error};

/// Redirects matching requests into an in-process app.
///
/// Cloning gives another handle to the same overlay. When the last handle of
/// an active overlay is dropped, its hooks are removed.
#[derive(Clone)]
pub struct Overlay {
    inner: Arc<Inner>,
}

struct Inner {
    target: Target,
    redirect: Arc<Redirect>,
    hooks: Mutex<Vec<HookHandle>>,
}

/// Builder for [`Overlay`]
#[must_use]
pub struct OverlayBuilder {
    app: Arc<dyn App>,
    target: Target,
}

impl OverlayBuilder {
    /// Match this host on any path over plain HTTP
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.target.host = Some(host.into());
        self
    }

    /// Match this URL; the path is a glob. Wins over [`host`](Self::host).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.target.url = Some(url.into());
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn build(self) -> Result<Overlay, ConfigError> {
        let matcher = Matcher::new(&self.target)?;
        tracing::debug!(
            "Overlay for {}{}",
            matcher.authority(),
            matcher.path_pattern()
        );

        Ok(Overlay {
            inner: Arc::new(Inner {
                target: self.target,
                redirect: Arc::new(Redirect {
                    matcher,
                    app: self.app,
                }),
                hooks: Mutex::new(Vec::new()),
            }),
        })
    }
}

impl Overlay {
    pub fn builder(app: impl App) -> OverlayBuilder {
        OverlayBuilder {
            app: Arc::new(app),
            target: Target::default(),
        }
    }

    pub fn for_host(app: impl App, host: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder(app).host(host).build()
    }

    pub fn for_url(app: impl App, url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder(app).url(url).build()
    }

    pub fn from_target(app: impl App, target: Target) -> Result<Self, ConfigError> {
        Self::builder(app).target(target).build()
    }

    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    pub fn matcher(&self) -> &Matcher {
        &self.inner.redirect.matcher
    }

    pub fn is_active(&self) -> bool {
        !self.inner.hooks.lock().is_empty()
    }

    /// Number of hooks this overlay currently has installed
    pub fn hook_count(&self) -> usize {
        self.inner.hooks.lock().len()
    }

    /// Install a hook at every interception point. Does nothing if already active.
    pub fn activate(&self) {
        let mut hooks = self.inner.hooks.lock();
        if !hooks.is_empty() {
            return;
        }

        let registry = Registry::global();
        for point in InterceptionPoint::ALL {
            hooks.push(registry.install(point, self.inner.redirect.clone()));
        }
        tracing::debug!("Activated overlay for {}", self.matcher().authority());
    }

    /// Remove this overlay's hooks in reverse order. Does nothing if inactive.
    pub fn deactivate(&self) -> Result<(), Error> {
        self.inner.uninstall()
    }

    /// Activate until the returned guard is dropped.
    ///
    /// The synchronous counterpart of [`AsyncScope::enter`].
    pub fn enter_blocking(&self) -> Result<Entered<'_, Overlay>, Error> {
        enter_blocking(self)
    }
}

impl Inner {
    fn uninstall(&self) -> Result<(), Error> {
        let mut hooks = self.hooks.lock();
        if hooks.is_empty() {
            return Ok(());
        }

        let registry = Registry::global();
        let mut result = Ok(());
        while let Some(handle) = hooks.pop() {
            if let Err(e) = registry.uninstall(handle) {
                tracing::error!("Failed to remove overlay hook: {}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        tracing::debug!(
            "Deactivated overlay for {}",
            self.redirect.matcher.authority()
        );
        result
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !self.hooks.get_mut().is_empty() {
            tracing::debug!("Dropping an active overlay, removing its hooks");
            let _ = self.uninstall();
        }
    }
}

#[async_trait]
impl AsyncScope for Overlay {
    type Target = Overlay;
    type Error = Error;

    async fn enter(&self) -> Result<Overlay, Error> {
        self.activate();
        Ok(self.clone())
    }

    async fn exit(&self) -> Result<(), Error> {
        self.deactivate()
    }
}

/// The hook an overlay installs at each interception point
struct Redirect {
    matcher: Matcher,
    app: Arc<dyn App>,
}

#[async_trait]
impl Intercept for Redirect {
    async fn intercept(
        &self,
        request: Request<Bytes>,
        next: Next<'_>,
    ) -> Result<Response<Bytes>, Error> {
        let Some(destination) = Destination::of(&request) else {
            return next.run(request).await;
        };
        if !self.matcher.matches(&destination) {
            tracing::trace!(
                "{}{} does not match {}{}",
                destination.authority,
                destination.path,
                self.matcher.authority(),
                self.matcher.path_pattern()
            );
            return next.run(request).await;
        }

        tracing::debug!(
            "Redirecting {} {} to in-process app",
            request.method(),
            request.uri()
        );
        let limit = Timeout::of(&request).read;
        let response = self.app.serve(request.map(Full::new));
        let response = match limit {
            Some(limit) => tokio::time::timeout(limit, response)
                .await
                .map_err(|_| Error::ReadTimeout)?,
            None => response.await,
        };
        response.map_err(Error::App)
    }
}
