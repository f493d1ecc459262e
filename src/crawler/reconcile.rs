//! Reconciliation of stored repositories the traversal did not reach

use crate::api::{HostingApi, SearchQuery};
use crate::crawler::Coordinator;
use crate::state::CrawlState;
use crate::storage::Storage;
use crate::HarvestError;
use tracing::{debug, info};

/// Counters produced by a reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Stored repositories the traversal did not visit
    pub stale: usize,
    /// Stale repositories that still match and were crawled directly
    pub recrawled: usize,
    pub repositories_removed: u64,
    pub keywords_removed: u64,
}

impl<A: HostingApi, S: Storage> Coordinator<A, S> {
    /// Re-verifies every stored repository not visited this run
    ///
    /// Each one is probed with a search scoped to that repository. Repositories
    /// with no match, or whose scoped search is rejected as unprocessable, are
    /// deleted along with their edges; the rest are crawled.
    /// Keywords left without edges are deleted last.
    pub(super) async fn reconcile(
        &mut self,
        state: &mut CrawlState,
    ) -> Result<ReconcileReport, HarvestError> {
        let stale = state.stale(self.storage.stored_repository_ids()?);
        let mut report = ReconcileReport {
            stale: stale.len(),
            ..Default::default()
        };
        info!("Reconciling {} repositories not seen this run", stale.len());

        let mut gone = Vec::new();
        for repository_id in stale {
            let full_name = match self.storage.get_repository(repository_id)? {
                Some(record) => record.full_name(),
                None => continue,
            };

            let query = SearchQuery::new(&self.search.signature, &self.search.filename)
                .in_repository(&full_name);
            let total_count = match self.gateway.search_code(&query, 1, 1).await {
                Ok(probe) => probe.total_count,
                Err(e) if e.is_unprocessable() => {
                    debug!("Scoped search for {} rejected: {}", full_name, e);
                    0
                }
                Err(e) => return Err(e.into()),
            };

            if total_count == 0 {
                debug!("{} no longer matches, marking for removal", full_name);
                gone.push(repository_id);
            } else {
                debug!("{} still matches, crawling directly", full_name);
                state.mark_visited(repository_id);
                self.crawl_repository(repository_id).await?;
                report.recrawled += 1;
            }
        }
        self.storage.save_changes()?;

        report.repositories_removed = self.storage.remove_repositories(&gone)?;
        report.keywords_removed = self.storage.remove_orphan_keywords()?;
        self.storage.save_changes()?;

        info!(
            "Reconciliation done: {} recrawled, {} repositories and {} keywords removed",
            report.recrawled, report.repositories_removed, report.keywords_removed
        );
        Ok(report)
    }
}
