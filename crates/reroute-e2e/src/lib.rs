//! End-to-end test utilities for reroute
//!
//! Provides a real local HTTP service standing in for "the network", a few
//! in-process apps to redirect into, and shared test setup.

pub mod apps;
pub mod harness;
pub mod mock_service;

pub use harness::{init_test, json_body, unique_host};
pub use mock_service::{MockHttpService, RecordedRequest};
