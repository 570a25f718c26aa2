//! Shared test setup

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter keeping hosts distinct across tests running in parallel
static HOST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize tracing for tests
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("reroute=debug,reroute_e2e=debug")
        .with_test_writer()
        .try_init();
}

/// A host name no other test uses.
///
/// Overlays are process-wide, and tests in one binary run concurrently, so
/// each test redirects its own hosts.
pub fn unique_host(prefix: &str) -> String {
    let n = HOST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}.reroute.test", prefix, n)
}

/// Parse a response body as JSON
pub fn json_body(response: &hyper::Response<bytes::Bytes>) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::from_slice(response.body())?)
}
