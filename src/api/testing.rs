//! Scripted in-memory `HostingApi` for unit tests

use crate::api::types::{
    ApiFailure, PoolLimit, RateLimits, RepositorySnapshot, SearchItem, SearchPage, SearchQuery,
};
use crate::api::HostingApi;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    limits: (u64, u64),
    queued_limits: VecDeque<(u64, u64)>,
    rate_limit_failures: VecDeque<ApiFailure>,
    rate_limit_calls: usize,
    repositories: HashMap<i64, RepositorySnapshot>,
    readmes: HashMap<i64, String>,
    trees: HashMap<i64, Vec<String>>,
    searches: HashMap<String, (u64, Vec<SearchItem>)>,
    rejected_searches: HashMap<String, ApiFailure>,
    failures: HashMap<&'static str, VecDeque<ApiFailure>>,
    calls: Vec<String>,
}

/// Fake hosting API whose responses are scripted per test
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    /// Creates a fake with generous quota and no repositories
    pub fn new() -> Self {
        let state = FakeState {
            limits: (5000, 30),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Sets the quota reported once the queued responses are used up
    pub fn set_limits(&self, core: u64, search: u64) {
        self.state.lock().unwrap().limits = (core, search);
    }

    /// Queues one quota response ahead of the default
    pub fn queue_limits(&self, core: u64, search: u64) {
        self.state
            .lock()
            .unwrap()
            .queued_limits
            .push_back((core, search));
    }

    /// Makes the next quota checks fail, in order
    pub fn fail_rate_limits(&self, failures: Vec<ApiFailure>) {
        self.state
            .lock()
            .unwrap()
            .rate_limit_failures
            .extend(failures);
    }

    /// Makes the next calls of `operation` fail, in order
    ///
    /// `operation` is one of `repository`, `readme`, `tree` or `search`.
    pub fn fail_next(&self, operation: &'static str, failures: Vec<ApiFailure>) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .extend(failures);
    }

    pub fn add_repository(&self, snapshot: RepositorySnapshot) {
        self.state
            .lock()
            .unwrap()
            .repositories
            .insert(snapshot.id, snapshot);
    }

    pub fn set_readme(&self, repository_id: i64, text: &str) {
        self.state
            .lock()
            .unwrap()
            .readmes
            .insert(repository_id, text.to_string());
    }

    pub fn set_tree(&self, repository_id: i64, paths: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .trees
            .insert(repository_id, paths.iter().map(|p| p.to_string()).collect());
    }

    /// Scripts the results of a query; unscripted queries return nothing
    pub fn set_search(&self, query: &str, total_count: u64, repository_ids: &[i64]) {
        let items = repository_ids
            .iter()
            .map(|id| SearchItem {
                repository_id: *id,
                full_name: format!("octo/repo-{}", id),
            })
            .collect();
        self.state
            .lock()
            .unwrap()
            .searches
            .insert(query.to_string(), (total_count, items));
    }

    /// Makes every search for `query` fail with `failure`
    pub fn reject_search(&self, query: &str, failure: ApiFailure) {
        self.state
            .lock()
            .unwrap()
            .rejected_searches
            .insert(query.to_string(), failure);
    }

    pub fn rate_limit_calls(&self) -> usize {
        self.state.lock().unwrap().rate_limit_calls
    }

    /// Every call made so far, as `operation:argument`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls of one operation, as `operation:argument`
    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{}:", operation);
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&prefix))
            .collect()
    }

    fn record(&self, operation: &'static str, argument: String) -> Result<(), ApiFailure> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{}:{}", operation, argument));
        match state.failures.get_mut(operation).and_then(|f| f.pop_front()) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// Builds a snapshot named `octo/repo-<id>`
pub fn snapshot(id: i64, pushed_at: Option<DateTime<Utc>>) -> RepositorySnapshot {
    RepositorySnapshot {
        id,
        owner: "octo".to_string(),
        name: format!("repo-{}", id),
        description: Some("A mixed reality sample".to_string()),
        license: None,
        created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
        pushed_at,
        stargazers_count: 1,
        watchers_count: 1,
        forks_count: 0,
        open_issues_count: 0,
        has_issues: true,
        has_downloads: true,
        has_wiki: true,
        has_pages: false,
    }
}

impl HostingApi for FakeApi {
    async fn rate_limits(&self) -> Result<RateLimits, ApiFailure> {
        let mut state = self.state.lock().unwrap();
        state.rate_limit_calls += 1;
        if let Some(failure) = state.rate_limit_failures.pop_front() {
            return Err(failure);
        }

        let default_limits = state.limits;
        let (core, search) = state
            .queued_limits
            .pop_front()
            .unwrap_or(default_limits);
        let reset_at = Utc::now() + Duration::seconds(30);
        Ok(RateLimits {
            core: PoolLimit {
                remaining: core,
                reset_at,
            },
            search: PoolLimit {
                remaining: search,
                reset_at,
            },
        })
    }

    async fn repository(&self, repository_id: i64) -> Result<RepositorySnapshot, ApiFailure> {
        self.record("repository", repository_id.to_string())?;
        self.state
            .lock()
            .unwrap()
            .repositories
            .get(&repository_id)
            .cloned()
            .ok_or(ApiFailure::NotFound)
    }

    async fn readme(&self, repository_id: i64) -> Result<Option<String>, ApiFailure> {
        self.record("readme", repository_id.to_string())?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .readmes
            .get(&repository_id)
            .cloned())
    }

    async fn tree_paths(&self, repository_id: i64) -> Result<Vec<String>, ApiFailure> {
        self.record("tree", repository_id.to_string())?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .trees
            .get(&repository_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn search_code(
        &self,
        query: &SearchQuery,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ApiFailure> {
        let q = query.to_query_string();
        self.record("search", format!("{}#{}", q, page))?;

        let state = self.state.lock().unwrap();
        if let Some(failure) = state.rejected_searches.get(&q) {
            return Err(failure.clone());
        }
        let (total_count, items) = state.searches.get(&q).cloned().unwrap_or_default();
        let start = ((page.saturating_sub(1)) * per_page) as usize;
        let end = (start + per_page as usize).min(items.len());
        let items = if start < end {
            items[start..end].to_vec()
        } else {
            Vec::new()
        };

        Ok(SearchPage {
            total_count,
            items,
            page,
        })
    }
}
