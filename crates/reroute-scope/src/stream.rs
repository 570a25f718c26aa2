use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::Mutex;

use crate::{AsyncScope, ScopeError};

/// A scope backed by a stream that yields exactly one value.
///
/// Entering polls the stream for its value; whatever the stream does before
/// yielding is the setup. Exiting polls it again and expects it to end;
/// whatever it does before ending is the teardown.
pub struct StreamScope<St> {
    stream: Mutex<Pin<Box<St>>>,
}

impl<St: Stream> StreamScope<St> {
    pub fn new(stream: St) -> Self {
        Self {
            stream: Mutex::new(Box::pin(stream)),
        }
    }
}

#[async_trait]
impl<St> AsyncScope for StreamScope<St>
where
    St: Stream + Send + 'static,
    St::Item: Send,
{
    type Target = St::Item;
    type Error = ScopeError;

    async fn enter(&self) -> Result<St::Item, ScopeError> {
        let mut stream = self.stream.lock().await;
        stream.next().await.ok_or(ScopeError::NoValue)
    }

    async fn exit(&self) -> Result<(), ScopeError> {
        let mut stream = self.stream.lock().await;
        match stream.next().await {
            None => Ok(()),
            Some(_) => Err(ScopeError::DidNotStop),
        }
    }
}

/// Turn a stream-producing function into a factory of [`StreamScope`]s.
pub fn scope_fn<A, F, St>(f: F) -> impl Fn(A) -> StreamScope<St>
where
    F: Fn(A) -> St,
    St: Stream,
{
    move |args| StreamScope::new(f(args))
}
