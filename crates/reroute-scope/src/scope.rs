use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::executor::block_on;
use futures::future::BoxFuture;
use futures::FutureExt;

/// A resource with asynchronous entry and exit
#[async_trait]
pub trait AsyncScope: Send + Sync {
    /// Value handed to the body of the scope on entry
    type Target: Send;
    type Error: Send;

    async fn enter(&self) -> Result<Self::Target, Self::Error>;

    async fn exit(&self) -> Result<(), Self::Error>;
}

/// Exits the scope if dropped while still armed
struct ExitOnDrop<'a, S: AsyncScope + ?Sized> {
    scope: &'a S,
    armed: bool,
}

impl<S: AsyncScope + ?Sized> Drop for ExitOnDrop<'_, S> {
    fn drop(&mut self) {
        if self.armed && block_on(self.scope.exit()).is_err() {
            tracing::warn!("Scope exit failed after the scoped future was dropped");
        }
    }
}

/// Run `body` inside `scope`.
///
/// The scope is exited once the body completes, whatever its output, and
/// also when the body panics. In that case the panic is resumed after the
/// exit has run. An exit error replaces a successful body output.
///
/// If the returned future is dropped after entering, for example by a
/// timeout or `select!`, the exit is driven to completion on the dropping
/// thread.
pub async fn scoped<S, F, Fut>(scope: &S, body: F) -> Result<Fut::Output, S::Error>
where
    S: AsyncScope + ?Sized,
    F: FnOnce(S::Target) -> Fut,
    Fut: Future,
{
    let target = scope.enter().await?;
    let mut guard = ExitOnDrop { scope, armed: true };
    let outcome = AssertUnwindSafe(async move { body(target).await })
        .catch_unwind()
        .await;
    let exited = scope.exit().await;
    guard.armed = false;

    match outcome {
        Ok(output) => exited.map(|()| output),
        Err(panic) => {
            if exited.is_err() {
                tracing::warn!("Scope exit failed while unwinding a panicking body");
            }
            std::panic::resume_unwind(panic)
        }
    }
}

/// Wrap an async function so that every call runs inside `scope`.
pub fn decorate<S, A, F, Fut>(
    scope: S,
    f: F,
) -> impl Fn(A) -> BoxFuture<'static, Result<Fut::Output, S::Error>>
where
    S: AsyncScope + Clone + 'static,
    A: Send + 'static,
    F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: Send,
{
    move |args| {
        let scope = scope.clone();
        let f = f.clone();
        async move { scoped(&scope, move |_| f(args)).await }.boxed()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts entries and exits
    #[derive(Clone, Default)]
    pub(crate) struct Counter {
        pub entered: Arc<AtomicUsize>,
        pub exited: Arc<AtomicUsize>,
        pub fail_exit: bool,
    }

    #[async_trait]
    impl AsyncScope for Counter {
        type Target = usize;
        type Error = &'static str;

        async fn enter(&self) -> Result<usize, &'static str> {
            Ok(self.entered.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn exit(&self) -> Result<(), &'static str> {
            self.exited.fetch_add(1, Ordering::SeqCst);
            if self.fail_exit {
                Err("exit failed")
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_scoped_exits_after_body() {
        let counter = Counter::default();

        let output = scoped(&counter, |n| async move {
            assert_eq!(n, 1);
            "done"
        })
        .await;

        assert_eq!(output, Ok("done"));
        assert_eq!(counter.entered.load(Ordering::SeqCst), 1);
        assert_eq!(counter.exited.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scoped_exits_when_body_fails() {
        let counter = Counter::default();

        let output = scoped(&counter, |_| async { Err::<(), _>("body failed") }).await;

        assert_eq!(output, Ok(Err("body failed")));
        assert_eq!(counter.exited.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scoped_exits_when_body_panics() {
        let counter = Counter::default();

        let result = AssertUnwindSafe(scoped(&counter, |_| async {
            panic!("boom");
        }))
        .catch_unwind()
        .await;

        assert!(result.is_err());
        assert_eq!(counter.exited.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scoped_reports_exit_failure() {
        let counter = Counter {
            fail_exit: true,
            ..Counter::default()
        };

        let output = scoped(&counter, |_| async { 42 }).await;
        assert_eq!(output, Err("exit failed"));
    }

    #[tokio::test]
    async fn test_scoped_exits_when_cancelled() {
        let counter = Counter::default();

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            scoped(&counter, |_| futures::future::pending::<()>()),
        )
        .await;

        assert!(cancelled.is_err());
        assert_eq!(counter.entered.load(Ordering::SeqCst), 1);
        assert_eq!(counter.exited.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completed_scope_exits_once() {
        let counter = Counter::default();

        let future = scoped(&counter, |_| async { 1 });
        assert_eq!(future.await, Ok(1));

        assert_eq!(counter.exited.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decorate_wraps_every_call() {
        let counter = Counter::default();
        let seen = counter.entered.clone();

        let wrapped = decorate(counter.clone(), move |x: u32| {
            let seen = seen.clone();
            async move {
                // Inside the scope the entry has already happened
                assert!(seen.load(Ordering::SeqCst) > 0);
                x * 2
            }
        });

        assert_eq!(wrapped(2).await, Ok(4));
        assert_eq!(wrapped(5).await, Ok(10));
        assert_eq!(counter.entered.load(Ordering::SeqCst), 2);
        assert_eq!(counter.exited.load(Ordering::SeqCst), 2);
    }
}
