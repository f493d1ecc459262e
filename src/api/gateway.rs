//! Metered, retrying access to the hosting API
//!
//! Every operation acquires a `QuotaGate` permit, performs the call, and on
//! failure waits either the server-suggested delay or the configured cooldown
//! before a single retry. A second consecutive failure is fatal.

use crate::api::quota::QuotaGate;
use crate::api::types::{ApiError, ApiFailure, QuotaPool, RepositorySnapshot, SearchPage, SearchQuery};
use crate::api::HostingApi;
use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{trace, warn};

/// Attempts per operation: the first call plus one retry
const MAX_ATTEMPTS: u32 = 2;

/// Hosting API wrapper that meters and retries every call
pub struct ApiGateway<A: HostingApi> {
    api: A,
    quota: QuotaGate,
    cooldown: Duration,
}

impl<A: HostingApi> ApiGateway<A> {
    /// Creates a gateway
    ///
    /// # Arguments
    ///
    /// * `api` - The underlying API
    /// * `cooldown` - Wait before a retry when the failure suggests no delay
    pub fn new(api: A, cooldown: Duration) -> Self {
        Self {
            api,
            quota: QuotaGate::new(cooldown),
            cooldown,
        }
    }

    /// The underlying API
    pub fn api(&self) -> &A {
        &self.api
    }

    /// The quota gate all calls are metered through
    pub fn quota(&self) -> &QuotaGate {
        &self.quota
    }

    /// Fetches repository metadata
    pub async fn get_repository(&mut self, repository_id: i64) -> Result<RepositorySnapshot, ApiError> {
        let api = &self.api;
        with_retry(
            api,
            &mut self.quota,
            self.cooldown,
            QuotaPool::Core,
            "get_repository",
            || api.repository(repository_id),
        )
        .await
    }

    /// Fetches the README text; a repository without a README yields an empty string
    pub async fn get_readme(&mut self, repository_id: i64) -> Result<String, ApiError> {
        let api = &self.api;
        let readme = with_retry(
            api,
            &mut self.quota,
            self.cooldown,
            QuotaPool::Core,
            "get_readme",
            || api.readme(repository_id),
        )
        .await?;

        Ok(readme.unwrap_or_default())
    }

    /// Lists the distinct basenames of files with the given extension
    ///
    /// Basenames are lower-cased and trimmed; the tree is read recursively from
    /// the tip of the default branch.
    pub async fn get_file_basenames(
        &mut self,
        repository_id: i64,
        extension: &str,
    ) -> Result<BTreeSet<String>, ApiError> {
        let api = &self.api;
        let paths = with_retry(
            api,
            &mut self.quota,
            self.cooldown,
            QuotaPool::Core,
            "get_file_basenames",
            || api.tree_paths(repository_id),
        )
        .await?;

        Ok(basenames(&paths, extension))
    }

    /// Runs one page of a code search
    pub async fn search_code(
        &mut self,
        query: &SearchQuery,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ApiError> {
        let api = &self.api;
        with_retry(
            api,
            &mut self.quota,
            self.cooldown,
            QuotaPool::Search,
            "search_code",
            || api.search_code(query, page, per_page),
        )
        .await
    }
}

/// Runs `call` up to `MAX_ATTEMPTS` times, acquiring a permit before each attempt
async fn with_retry<A, T, F, Fut>(
    api: &A,
    quota: &mut QuotaGate,
    cooldown: Duration,
    pool: QuotaPool,
    operation: &'static str,
    mut call: F,
) -> Result<T, ApiError>
where
    A: HostingApi,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiFailure>>,
{
    let mut attempt = 1;
    loop {
        quota.acquire(api, pool).await?;
        trace!("{} attempt {}", operation, attempt);

        match call().await {
            Ok(value) => return Ok(value),
            Err(source) if attempt >= MAX_ATTEMPTS => {
                return Err(ApiError::RetriesExhausted { operation, source });
            }
            Err(failure) => {
                let wait = failure.retry_after().unwrap_or(cooldown);
                warn!(
                    "{} failed ({}), retrying in {}s",
                    operation,
                    failure,
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

/// Extracts lower-cased, trimmed, deduplicated file stems with the given extension
fn basenames(paths: &[String], extension: &str) -> BTreeSet<String> {
    paths
        .iter()
        .map(Path::new)
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(extension))
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()))
        .map(|stem| stem.trim().to_lowercase())
        .filter(|stem| !stem.is_empty())
        .collect()
}
