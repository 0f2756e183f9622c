//! REST API access for convention data.
//!
//! [`RemoteSource`] is the seam the cache synchronizes through; [`ApiClient`]
//! is the HTTP implementation. Each entity collection is one GET endpoint
//! returning a JSON array of records. Authenticated endpoints take a bearer
//! token supplied by the caller.

pub mod client;
pub mod error;

use async_trait::async_trait;
use serde_json::Value;

pub use client::ApiClient;
pub use error::ApiError;

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Whether requests to authenticated endpoints can be attempted
    fn is_authenticated(&self) -> bool;

    /// Fetch one collection as raw JSON records.
    async fn fetch_collection(&self, endpoint: &str, authenticated: bool) -> Result<Vec<Value>, ApiError>;
}
