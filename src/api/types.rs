//! Types exchanged with the hosting API

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// An independently metered rate-limit bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotaPool {
    /// General REST calls (metadata, README, tree)
    Core,
    /// Search calls
    Search,
}

impl QuotaPool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Search => "search",
        }
    }
}

/// Authoritative state of one quota pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimit {
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// Authoritative state of both quota pools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub core: PoolLimit,
    pub search: PoolLimit,
}

impl RateLimits {
    /// Returns the limit of the given pool
    pub fn pool(&self, pool: QuotaPool) -> PoolLimit {
        match pool {
            QuotaPool::Core => self.core,
            QuotaPool::Search => self.search,
        }
    }
}

/// Crawlable attributes of one repository at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct RepositorySnapshot {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub license: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub stargazers_count: u32,
    pub watchers_count: u32,
    pub forks_count: u32,
    pub open_issues_count: u32,
    pub has_issues: bool,
    pub has_downloads: bool,
    pub has_wiki: bool,
    pub has_pages: bool,
}

impl RepositorySnapshot {
    /// Returns `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A code search query
///
/// Renders as `<signature> [<qualifier>] [size:<from>..<to>] filename:<filename> [repo:<full name>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub signature: String,
    pub qualifier: String,
    pub size: Option<(i64, i64)>,
    pub filename: String,
    pub repository: Option<String>,
}

impl SearchQuery {
    /// Creates a query for `signature` inside files named `filename`
    pub fn new(signature: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            qualifier: String::new(),
            size: None,
            filename: filename.into(),
            repository: None,
        }
    }

    /// Restricts the query to files whose size is in `from..=to`
    pub fn with_size(mut self, from: i64, to: i64) -> Self {
        self.size = Some((from, to));
        self
    }

    /// Adds an extra qualifier such as `path:packages`
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// Scopes the query to a single repository (`owner/name`)
    pub fn in_repository(mut self, full_name: impl Into<String>) -> Self {
        self.repository = Some(full_name.into());
        self
    }

    /// Renders the `q` parameter
    pub fn to_query_string(&self) -> String {
        let mut parts = vec![self.signature.clone()];
        if !self.qualifier.is_empty() {
            parts.push(self.qualifier.clone());
        }
        if let Some((from, to)) = self.size {
            parts.push(format!("size:{}..{}", from, to));
        }
        parts.push(format!("filename:{}", self.filename));
        if let Some(repository) = &self.repository {
            parts.push(format!("repo:{}", repository));
        }
        parts.join(" ")
    }
}

/// One matched file, identified by its repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub repository_id: i64,
    pub full_name: String,
}

/// One page of code search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub total_count: u64,
    pub items: Vec<SearchItem>,
    pub page: u32,
}

/// A single failed API attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiFailure {
    #[error("resource not found")]
    NotFound,

    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    Request(String),
}

impl ApiFailure {
    /// Server-suggested wait before retrying, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// A fatal API error that aborts the crawl
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{operation} failed after retry: {source}")]
    RetriesExhausted {
        operation: &'static str,
        #[source]
        source: ApiFailure,
    },
}

impl ApiError {
    /// Returns true if the server rejected the request as unprocessable (HTTP 422)
    ///
    /// A `repo:` scoped search answers 422 when the repository no longer exists.
    pub fn is_unprocessable(&self) -> bool {
        matches!(
            self,
            Self::RetriesExhausted {
                source: ApiFailure::Status { status: 422, .. },
                ..
            }
        )
    }
}
