//! Crawler module for discovering and indexing repositories
//!
//! This module contains the core crawling logic, including:
//! - Partitioning the code search space under the result cap
//! - Crawling each repository and rebuilding its keyword edges
//! - Reconciling stored repositories the search no longer reaches
//! - Overall crawl coordination

mod coordinator;
mod partition;
mod reconcile;
mod repository;

pub use coordinator::Coordinator;
pub use partition::{enumerable_results, page_limit, plan_window, SearchWindow, WindowPlan};
pub use reconcile::ReconcileReport;
pub use repository::{repository_record, ReadmeCleaner, RepositoryOutcome, MAX_DESCRIPTION_CHARS};

use crate::api::GitHubClient;
use crate::config::Config;
use crate::extract::{ExtractionPipeline, Stopwords};
use crate::storage::{open_storage, RunSummary};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;

/// Runs a complete crawl operation against GitHub
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the storage database
/// 2. Build the API client and the extraction pipeline
/// 3. Traverse the configured size domain and crawl every repository found
/// 4. Reconcile repositories that were not reached
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `token` - Access token; falls back to the one in the configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
/// * `domain` - Size range to crawl; defaults to the configured domain
///
/// # Returns
///
/// * `Ok(RunSummary)` - Crawl completed successfully
/// * `Err(HarvestError)` - Crawl failed
pub async fn run_crawl(
    config: &Config,
    token: Option<&str>,
    config_hash: &str,
    domain: Option<(i64, i64)>,
) -> Result<RunSummary, HarvestError> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let client = GitHubClient::new(&config.api, token)?;

    let stopwords = match &config.crawler.stopwords_path {
        Some(path) => Stopwords::load(Path::new(path))?,
        None => Stopwords::builtin(),
    };
    tracing::debug!("Loaded {} stop words", stopwords.len());
    let pipeline = ExtractionPipeline::with_defaults(Arc::new(stopwords));

    let (domain_from, domain_to) =
        domain.unwrap_or((config.search.domain_from, config.search.domain_to));

    let mut coordinator = Coordinator::new(client, storage, pipeline, config, config_hash)?;
    coordinator.crawl(domain_from, domain_to).await
}
