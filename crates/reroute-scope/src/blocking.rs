use std::ops::Deref;

use futures::executor::block_on;

use crate::AsyncScope;

/// Guard returned by [`enter_blocking`]. Exits the scope when dropped.
#[must_use = "the scope is exited as soon as the guard is dropped"]
pub struct Entered<'a, S: AsyncScope + ?Sized> {
    scope: &'a S,
    target: S::Target,
    active: bool,
}

/// Enter `scope` from synchronous code.
///
/// Drives the scope's async `enter` to completion on the calling thread.
/// The returned guard runs the async `exit` the same way when it is dropped,
/// or explicitly through [`Entered::exit`]. The scope's futures must not
/// depend on being polled by an async runtime.
pub fn enter_blocking<S: AsyncScope + ?Sized>(scope: &S) -> Result<Entered<'_, S>, S::Error> {
    let target = block_on(scope.enter())?;
    Ok(Entered {
        scope,
        target,
        active: true,
    })
}

impl<S: AsyncScope + ?Sized> Entered<'_, S> {
    /// Exit now, reporting the exit error instead of discarding it
    pub fn exit(mut self) -> Result<(), S::Error> {
        self.active = false;
        block_on(self.scope.exit())
    }
}

impl<S: AsyncScope + ?Sized> Deref for Entered<'_, S> {
    type Target = S::Target;

    fn deref(&self) -> &S::Target {
        &self.target
    }
}

impl<S: AsyncScope + ?Sized> Drop for Entered<'_, S> {
    fn drop(&mut self) {
        if self.active && block_on(self.scope.exit()).is_err() {
            tracing::warn!("Scope exit failed while dropping a blocking guard");
        }
    }
}
