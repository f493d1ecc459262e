//! GitHub REST client
//!
//! This module implements `HostingApi` over the GitHub REST v3 API:
//! - Building the HTTP client with user agent and authorization headers
//! - One request per operation, decoded into crate types
//! - Classifying failed responses into `ApiFailure`

use crate::api::types::{
    ApiFailure, PoolLimit, RateLimits, RepositorySnapshot, SearchItem, SearchPage, SearchQuery,
};
use crate::api::HostingApi;
use crate::config::ApiConfig;
use crate::{ConfigError, HarvestError};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

/// Longest error body kept in an `ApiFailure::Status`
const MAX_ERROR_MESSAGE: usize = 200;

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitPool,
    search: RateLimitPool,
}

#[derive(Debug, Deserialize)]
struct RateLimitPool {
    remaining: u64,
    reset: i64,
}

impl RateLimitPool {
    fn into_limit(self) -> Result<PoolLimit, ApiFailure> {
        let reset_at = DateTime::from_timestamp(self.reset, 0)
            .ok_or_else(|| ApiFailure::Decode(format!("invalid reset time {}", self.reset)))?;
        Ok(PoolLimit {
            remaining: self.remaining,
            reset_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    id: i64,
    name: String,
    owner: OwnerResponse,
    description: Option<String>,
    license: Option<LicenseResponse>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    stargazers_count: u32,
    #[serde(default)]
    watchers_count: u32,
    #[serde(default)]
    forks_count: u32,
    #[serde(default)]
    open_issues_count: u32,
    #[serde(default)]
    has_issues: bool,
    #[serde(default)]
    has_downloads: bool,
    #[serde(default)]
    has_wiki: bool,
    #[serde(default)]
    has_pages: bool,
}

#[derive(Debug, Deserialize)]
struct OwnerResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct LicenseResponse {
    name: String,
}

impl From<RepositoryResponse> for RepositorySnapshot {
    fn from(repo: RepositoryResponse) -> Self {
        Self {
            id: repo.id,
            owner: repo.owner.login,
            name: repo.name,
            description: repo.description,
            license: repo.license.map(|l| l.name),
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            pushed_at: repo.pushed_at,
            stargazers_count: repo.stargazers_count,
            watchers_count: repo.watchers_count,
            forks_count: repo.forks_count,
            open_issues_count: repo.open_issues_count,
            has_issues: repo.has_issues,
            has_downloads: repo.has_downloads,
            has_wiki: repo.has_wiki,
            has_pages: repo.has_pages,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    items: Vec<SearchItemResponse>,
}

#[derive(Debug, Deserialize)]
struct SearchItemResponse {
    repository: SearchRepository,
}

#[derive(Debug, Deserialize)]
struct SearchRepository {
    id: i64,
    full_name: String,
}

/// GitHub API client
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: Url,
}

impl GitHubClient {
    /// Creates a client for the configured base URL
    ///
    /// # Arguments
    ///
    /// * `config` - The remote API configuration
    /// * `token` - Access token; overrides the token in `config` when present
    ///
    /// # Returns
    ///
    /// * `Ok(GitHubClient)` - Successfully built client
    /// * `Err(HarvestError)` - Invalid base URL, token, or HTTP client setup
    pub fn new(config: &ApiConfig, token: Option<&str>) -> Result<Self, HarvestError> {
        let mut base_url = Url::parse(&config.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));

        if let Some(token) = token.or(config.token.as_deref()) {
            let mut auth_val = HeaderValue::from_str(&format!("token {}", token))
                .map_err(|e| ConfigError::Validation(format!("Invalid token: {}", e)))?;
            auth_val.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_val);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiFailure> {
        self.base_url
            .join(path)
            .map_err(|e| ApiFailure::Request(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiFailure> {
        let response = send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiFailure::Decode(e.to_string()))
    }
}

/// Sends a request and classifies any non-success response
async fn send(request: RequestBuilder) -> Result<Response, ApiFailure> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiFailure::Network(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(ApiFailure::NotFound),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Err(ApiFailure::RateLimited {
            retry_after: parse_retry_after(response.headers()),
        }),
        _ => {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_MESSAGE {
                let mut end = MAX_ERROR_MESSAGE;
                while !message.is_char_boundary(end) {
                    end -= 1;
                }
                message.truncate(end);
            }
            Err(ApiFailure::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Reads a `Retry-After` header given in seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())?
        .trim()
        .parse::<u64>()
        .ok()
}

impl HostingApi for GitHubClient {
    async fn rate_limits(&self) -> Result<RateLimits, ApiFailure> {
        let url = self.endpoint("rate_limit")?;
        let response: RateLimitResponse = self.get_json(self.client.get(url)).await?;

        Ok(RateLimits {
            core: response.resources.core.into_limit()?,
            search: response.resources.search.into_limit()?,
        })
    }

    async fn repository(&self, repository_id: i64) -> Result<RepositorySnapshot, ApiFailure> {
        let url = self.endpoint(&format!("repositories/{}", repository_id))?;
        let response: RepositoryResponse = self.get_json(self.client.get(url)).await?;
        Ok(response.into())
    }

    async fn readme(&self, repository_id: i64) -> Result<Option<String>, ApiFailure> {
        let url = self.endpoint(&format!("repositories/{}/readme", repository_id))?;
        let request = self.client.get(url).header(ACCEPT, RAW_MEDIA_TYPE);

        match send(request).await {
            Ok(response) => response
                .text()
                .await
                .map(Some)
                .map_err(|e| ApiFailure::Decode(e.to_string())),
            Err(ApiFailure::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn tree_paths(&self, repository_id: i64) -> Result<Vec<String>, ApiFailure> {
        let url = self.endpoint(&format!("repositories/{}/git/trees/HEAD", repository_id))?;
        let request = self.client.get(url).query(&[("recursive", "1")]);
        let response: TreeResponse = self.get_json(request).await?;

        Ok(response.tree.into_iter().map(|entry| entry.path).collect())
    }

    async fn search_code(
        &self,
        query: &SearchQuery,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ApiFailure> {
        let url = self.endpoint("search/code")?;
        let request = self.client.get(url).query(&[
            ("q", query.to_query_string()),
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
        ]);
        let response: SearchResponse = self.get_json(request).await?;

        Ok(SearchPage {
            total_count: response.total_count,
            items: response
                .items
                .into_iter()
                .map(|item| SearchItem {
                    repository_id: item.repository.id,
                    full_name: item.repository.full_name,
                })
                .collect(),
            page,
        })
    }
}
