pub mod client;
pub mod tasks;

pub use client::ApiClient;
pub use tasks::BatchScheduler;

use serde_json::Value;
use std::future::Future;

/// Boundary for the upstream football API. Every call resolves to the parsed
/// `response` array, or an empty Vec on any connection-level or payload
/// failure. Failures here are soft: the cycle retries on its next run.
pub trait Fetch {
    fn fetch(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Vec<Value>> + Send;
}
