//! Scoped async resources
//!
//! An [`AsyncScope`] is anything that can be entered and exited
//! asynchronously. This crate turns such a resource into a scoped block
//! ([`scoped`]), a function wrapper ([`decorate`]) or a blocking guard
//! ([`enter_blocking`]), and adapts single-value streams into scopes
//! ([`StreamScope`]).

mod blocking;
mod error;
mod scope;
mod stream;

pub use blocking::{enter_blocking, Entered};
pub use error::ScopeError;
pub use scope::{decorate, scoped, AsyncScope};
pub use stream::{scope_fn, StreamScope};
