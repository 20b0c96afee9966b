//! Transport seam

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::RefreshRequest;

/// Fetches the server's rendering for a refresh request.
///
/// Implementations own transport concerns (base URL, encoding, timeouts,
/// headers). The controller only sees the response body or a `FetchError`.
#[async_trait]
pub trait FragmentFetcher: Send + Sync {
    async fn fetch(&self, request: &RefreshRequest) -> Result<String, FetchError>;
}
