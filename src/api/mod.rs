//! Hosting API access
//!
//! This module contains everything that talks to the code-hosting platform:
//! - The `HostingApi` trait, one method per remote operation
//! - `GitHubClient`, the HTTP implementation of that trait
//! - `QuotaGate`, which meters the core and search rate-limit pools
//! - `ApiGateway`, which routes every call through the gate and retries once

mod client;
mod gateway;
mod quota;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::GitHubClient;
pub use gateway::ApiGateway;
pub use quota::QuotaGate;
pub use types::{
    ApiError, ApiFailure, PoolLimit, QuotaPool, RateLimits, RepositorySnapshot, SearchItem,
    SearchPage, SearchQuery,
};

/// Remote operations the crawler consumes
///
/// Each method performs exactly one request and reports a single failed attempt as
/// an `ApiFailure`; metering and retries are layered on top by `ApiGateway`.
#[allow(async_fn_in_trait)]
pub trait HostingApi {
    /// Fetches the authoritative state of both quota pools
    async fn rate_limits(&self) -> Result<RateLimits, ApiFailure>;

    /// Fetches repository metadata
    async fn repository(&self, repository_id: i64) -> Result<RepositorySnapshot, ApiFailure>;

    /// Fetches the raw README text, or `None` if the repository has no README
    async fn readme(&self, repository_id: i64) -> Result<Option<String>, ApiFailure>;

    /// Lists every file path in the tree of the default branch tip
    async fn tree_paths(&self, repository_id: i64) -> Result<Vec<String>, ApiFailure>;

    /// Runs one page of a code search
    async fn search_code(
        &self,
        query: &SearchQuery,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ApiFailure>;
}
