//! Process-wide registry of interception hooks
//!
//! Every transport dispatches through one of a fixed set of
//! [`InterceptionPoint`]s. Each point keeps a stack of hooks; a request
//! enters the most recently installed hook first, and each hook either
//! answers the request or hands it to the [`Next`] hook down the stack. The
//! bottom of the stack is the transport's original [`Dispatch`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use hyper::{Request, Response};
use parking_lot::{const_mutex, Mutex};

use crate::Error;

/// A place where outbound requests physically get dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptionPoint {
    /// A fresh connection per request
    Connection,
    /// Pooled, reused connections
    ConnectionPool,
    /// Requests forwarded through an outbound HTTP proxy
    HttpProxy,
}

impl InterceptionPoint {
    pub const ALL: [InterceptionPoint; 3] = [
        InterceptionPoint::Connection,
        InterceptionPoint::ConnectionPool,
        InterceptionPoint::HttpProxy,
    ];

    fn index(self) -> usize {
        match self {
            InterceptionPoint::Connection => 0,
            InterceptionPoint::ConnectionPool => 1,
            InterceptionPoint::HttpProxy => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InterceptionPoint::Connection => "connection",
            InterceptionPoint::ConnectionPool => "connection-pool",
            InterceptionPoint::HttpProxy => "http-proxy",
        }
    }
}

impl fmt::Display for InterceptionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The original, unhooked dispatch behaviour of a transport
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Error>;
}

/// A hook sitting in front of an interception point
#[async_trait]
pub trait Intercept: Send + Sync {
    /// Answer `request`, or pass it on untouched with `next.run(request)`
    async fn intercept(
        &self,
        request: Request<Bytes>,
        next: Next<'_>,
    ) -> Result<Response<Bytes>, Error>;
}

/// The rest of the chain below a hook
pub struct Next<'a> {
    hooks: &'a [Hook],
    original: &'a dyn Dispatch,
}

impl Next<'_> {
    pub async fn run(self, request: Request<Bytes>) -> Result<Response<Bytes>, Error> {
        match self.hooks.split_last() {
            Some((hook, rest)) => {
                let next = Next {
                    hooks: rest,
                    original: self.original,
                };
                hook.intercept.intercept(request, next).await
            }
            None => self.original.dispatch(request).await,
        }
    }
}

/// Identifies one installed hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle {
    point: InterceptionPoint,
    id: u64,
}

impl HookHandle {
    pub fn point(&self) -> InterceptionPoint {
        self.point
    }
}

impl fmt::Display for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} at {}", self.id, self.point)
    }
}

#[derive(Clone)]
struct Hook {
    id: u64,
    intercept: Arc<dyn Intercept>,
}

/// Hook stacks for every interception point
pub struct Registry {
    next_id: AtomicU64,
    points: [Mutex<Vec<Hook>>; 3],
}

static REGISTRY: Registry = Registry::new();

impl Registry {
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            points: [
                const_mutex(Vec::new()),
                const_mutex(Vec::new()),
                const_mutex(Vec::new()),
            ],
        }
    }

    /// The registry every transport dispatches through
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    /// Push `intercept` on top of the stack at `point`
    pub fn install(&self, point: InterceptionPoint, intercept: Arc<dyn Intercept>) -> HookHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut hooks = self.points[point.index()].lock();
        hooks.push(Hook { id, intercept });
        tracing::debug!("Installed hook #{} at {} (depth {})", id, point, hooks.len());
        HookHandle { point, id }
    }

    /// Remove exactly the hook identified by `handle`, leaving the others in place
    pub fn uninstall(&self, handle: HookHandle) -> Result<(), Error> {
        let mut hooks = self.points[handle.point.index()].lock();
        let position = hooks
            .iter()
            .position(|hook| hook.id == handle.id)
            .ok_or(Error::HookMissing(handle))?;
        hooks.remove(position);
        tracing::debug!(
            "Removed hook #{} at {} (depth {})",
            handle.id,
            handle.point,
            hooks.len()
        );
        Ok(())
    }

    pub fn is_installed(&self, handle: HookHandle) -> bool {
        self.points[handle.point.index()]
            .lock()
            .iter()
            .any(|hook| hook.id == handle.id)
    }

    /// Number of hooks stacked at `point`
    pub fn depth(&self, point: InterceptionPoint) -> usize {
        self.points[point.index()].lock().len()
    }

    /// Send `request` through the hooks at `point`, ending at `original`
    pub async fn dispatch(
        &self,
        point: InterceptionPoint,
        original: &dyn Dispatch,
        request: Request<Bytes>,
    ) -> Result<Response<Bytes>, Error> {
        // Snapshot so hooks can come and go while this request is in flight
        let hooks = self.points[point.index()].lock().clone();
        Next {
            hooks: &hooks,
            original,
        }
        .run(request)
        .await
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers with a fixed body
    struct Original;

    #[async_trait]
    impl Dispatch for Original {
        async fn dispatch(&self, _request: Request<Bytes>) -> Result<Response<Bytes>, Error> {
            Ok(Response::new(Bytes::from_static(b"original")))
        }
    }

    /// Answers requests whose path starts with `prefix`, passes the rest on
    struct Prefix {
        prefix: &'static str,
        body: &'static str,
    }

    #[async_trait]
    impl Intercept for Prefix {
        async fn intercept(
            &self,
            request: Request<Bytes>,
            next: Next<'_>,
        ) -> Result<Response<Bytes>, Error> {
            if request.uri().path().starts_with(self.prefix) {
                Ok(Response::new(Bytes::from_static(self.body.as_bytes())))
            } else {
                next.run(request).await
            }
        }
    }

    fn prefix(prefix: &'static str, body: &'static str) -> Arc<dyn Intercept> {
        Arc::new(Prefix { prefix, body })
    }

    async fn body_for(registry: &Registry, path: &str) -> Bytes {
        let request = Request::get(format!("http://example.org{}", path))
            .body(Bytes::new())
            .unwrap();
        registry
            .dispatch(InterceptionPoint::ConnectionPool, &Original, request)
            .await
            .unwrap()
            .into_body()
    }

    #[tokio::test]
    async fn test_empty_chain_uses_original() {
        let registry = Registry::new();
        assert_eq!(body_for(&registry, "/a").await, "original");
    }

    #[tokio::test]
    async fn test_latest_hook_wins() {
        let registry = Registry::new();
        registry.install(InterceptionPoint::ConnectionPool, prefix("/a", "first"));
        registry.install(InterceptionPoint::ConnectionPool, prefix("/a", "second"));

        assert_eq!(body_for(&registry, "/a").await, "second");
        assert_eq!(body_for(&registry, "/b").await, "original");
    }

    #[tokio::test]
    async fn test_chain_falls_through_to_earlier_hooks() {
        let registry = Registry::new();
        registry.install(InterceptionPoint::ConnectionPool, prefix("/a", "a"));
        registry.install(InterceptionPoint::ConnectionPool, prefix("/b", "b"));

        assert_eq!(body_for(&registry, "/a").await, "a");
        assert_eq!(body_for(&registry, "/b").await, "b");
        assert_eq!(body_for(&registry, "/c").await, "original");
    }

    #[tokio::test]
    async fn test_out_of_order_removal_keeps_other_hooks() {
        let registry = Registry::new();
        let a = registry.install(InterceptionPoint::ConnectionPool, prefix("/a", "a"));
        let b = registry.install(InterceptionPoint::ConnectionPool, prefix("/b", "b"));

        registry.uninstall(a).unwrap();

        assert!(!registry.is_installed(a));
        assert!(registry.is_installed(b));
        assert_eq!(body_for(&registry, "/a").await, "original");
        assert_eq!(body_for(&registry, "/b").await, "b");
    }

    #[test]
    fn test_points_are_independent() {
        let registry = Registry::new();
        registry.install(InterceptionPoint::HttpProxy, prefix("/", "proxy"));

        assert_eq!(registry.depth(InterceptionPoint::HttpProxy), 1);
        assert_eq!(registry.depth(InterceptionPoint::Connection), 0);
        assert_eq!(registry.depth(InterceptionPoint::ConnectionPool), 0);
    }

    #[test]
    fn test_uninstalling_twice_fails() {
        let registry = Registry::new();
        let handle = registry.install(InterceptionPoint::Connection, prefix("/", "x"));

        registry.uninstall(handle).unwrap();
        let err = registry.uninstall(handle).unwrap_err();
        assert!(matches!(err, Error::HookMissing(h) if h == handle));
    }

    #[test]
    fn test_every_point_is_listed_once() {
        let mut indices: Vec<_> = InterceptionPoint::ALL.iter().map(|p| p.index()).collect();
        indices.dedup();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
