//! Crawler coordinator - main crawl orchestration logic
//!
//! A crawl is one sequential pass:
//! - Recording the run in storage
//! - Traversing the partitioned search space and crawling every repository found
//! - Reconciling stored repositories the traversal did not reach
//! - Marking the run completed, or failed if any step aborts

use crate::api::{ApiGateway, HostingApi};
use crate::config::{Config, SearchConfig};
use crate::crawler::partition::SearchWindow;
use crate::crawler::repository::ReadmeCleaner;
use crate::extract::ExtractionPipeline;
use crate::state::CrawlState;
use crate::storage::{RunSummary, Storage};
use crate::{ConfigError, HarvestError};
use std::time::{Duration, Instant};

/// Main crawler coordinator structure
pub struct Coordinator<A: HostingApi, S: Storage> {
    pub(super) gateway: ApiGateway<A>,
    pub(super) storage: S,
    pub(super) pipeline: ExtractionPipeline,
    pub(super) cleaner: ReadmeCleaner,
    pub(super) search: SearchConfig,
    pub(super) source_extension: String,
    config_hash: String,
}

impl<A: HostingApi, S: Storage> Coordinator<A, S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `api` - The hosting API to crawl
    /// * `storage` - Where the index is kept
    /// * `pipeline` - Extractors run over README text
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash recorded with every run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to initialize
    pub fn new(
        api: A,
        storage: S,
        pipeline: ExtractionPipeline,
        config: &Config,
        config_hash: impl Into<String>,
    ) -> Result<Self, HarvestError> {
        let cooldown = Duration::from_secs(config.api.cooldown_secs);

        Ok(Self {
            gateway: ApiGateway::new(api, cooldown),
            storage,
            pipeline,
            cleaner: ReadmeCleaner::new()?,
            search: config.search.clone(),
            source_extension: config.crawler.source_extension.clone(),
            config_hash: config_hash.into(),
        })
    }

    /// The storage the index is written to
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The metered API gateway
    pub fn gateway(&self) -> &ApiGateway<A> {
        &self.gateway
    }

    /// Crawls the size domain `[domain_from, domain_to]`
    ///
    /// The run is recorded in storage. A fatal error marks it failed before it
    /// is returned; nothing is resumed, the next crawl starts from scratch.
    pub async fn crawl(
        &mut self,
        domain_from: i64,
        domain_to: i64,
    ) -> Result<RunSummary, HarvestError> {
        if domain_from < 0 {
            return Err(ConfigError::Validation(format!(
                "domain-from must be >= 0, got {}",
                domain_from
            ))
            .into());
        }
        if domain_from > domain_to {
            return Err(ConfigError::Validation(format!(
                "domain-from ({}) must not exceed domain-to ({})",
                domain_from, domain_to
            ))
            .into());
        }

        let run_id = self.storage.create_run(&self.config_hash)?;
        tracing::info!(
            "Starting crawl run {} over sizes {}..{}",
            run_id,
            domain_from,
            domain_to
        );
        let start_time = Instant::now();

        match self.run(domain_from, domain_to).await {
            Ok(summary) => {
                self.storage.complete_run(run_id, &summary)?;
                tracing::info!(
                    "Crawl completed: {} repositories visited, {} removed, {} keywords removed in {:?}",
                    summary.repositories_visited,
                    summary.repositories_removed,
                    summary.keywords_removed,
                    start_time.elapsed()
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("Crawl run {} failed: {}", run_id, e);
                if let Err(mark) = self.storage.fail_run(run_id, &e.to_string()) {
                    tracing::error!("Failed to mark run {} as failed: {}", run_id, mark);
                }
                Err(e)
            }
        }
    }

    async fn run(&mut self, domain_from: i64, domain_to: i64) -> Result<RunSummary, HarvestError> {
        let mut state = CrawlState::new();

        self.traverse(SearchWindow::new(domain_from, domain_to), &mut state)
            .await?;
        tracing::info!(
            "Traversal done, {} repositories visited",
            state.visited_count()
        );

        let report = self.reconcile(&mut state).await?;

        Ok(RunSummary {
            repositories_visited: state.visited_count() as u64,
            repositories_removed: report.repositories_removed,
            keywords_removed: report.keywords_removed,
        })
    }
}
