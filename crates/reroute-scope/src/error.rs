use thiserror::Error;

/// Errors raised by [`StreamScope`](crate::StreamScope)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Stream ended before producing a value")]
    NoValue,

    #[error("Stream produced more than one value")]
    DidNotStop,
}
