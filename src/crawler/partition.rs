//! Search-space partitioning
//!
//! The code search serves at most `result-cap` results per query. The file-size
//! domain is bisected until every window's total fits under the cap; a window
//! that cannot be bisected any further is split once by a path qualifier.

use crate::api::{HostingApi, SearchPage, SearchQuery};
use crate::config::SearchConfig;
use crate::crawler::Coordinator;
use crate::state::CrawlState;
use crate::storage::Storage;
use crate::HarvestError;
use std::fmt;
use tracing::{debug, info, trace, warn};

/// One slice of the search domain: an inclusive size range plus an optional qualifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchWindow {
    pub from: i64,
    pub to: i64,
    pub qualifier: String,
}

impl SearchWindow {
    pub fn new(from: i64, to: i64) -> Self {
        Self {
            from,
            to,
            qualifier: String::new(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// Returns true if the size range holds a single value
    pub fn is_degenerate(&self) -> bool {
        self.from == self.to
    }

    /// Builds the code search query for this window
    pub fn query(&self, search: &SearchConfig) -> SearchQuery {
        SearchQuery::new(&search.signature, &search.filename)
            .with_qualifier(&self.qualifier)
            .with_size(self.from, self.to)
    }
}

impl fmt::Display for SearchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)?;
        if !self.qualifier.is_empty() {
            write!(f, " {}", self.qualifier)?;
        }
        Ok(())
    }
}

/// What to do with a probed window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowPlan {
    /// The total fits under the cap
    Enumerate,
    /// Split the size range at its midpoint
    Bisect(SearchWindow, SearchWindow),
    /// Single-size window: query with and without the fallback qualifier
    SplitQualifier(SearchWindow, SearchWindow),
    /// Single-size window that is already qualified: enumerate up to the cap
    EnumerateTruncated,
}

/// Decides how a window whose probe reported `total_count` results is handled
///
/// # Arguments
///
/// * `window` - The probed window
/// * `total_count` - Total results reported by the probe
/// * `cap` - Maximum number of results one query can enumerate
/// * `fallback_qualifier` - Qualifier used to split a single-size window
pub fn plan_window(
    window: &SearchWindow,
    total_count: u64,
    cap: u64,
    fallback_qualifier: &str,
) -> WindowPlan {
    if total_count <= cap {
        return WindowPlan::Enumerate;
    }

    if !window.is_degenerate() {
        let mid = window.from + (window.to - window.from) / 2;
        let left = SearchWindow {
            from: window.from,
            to: mid,
            qualifier: window.qualifier.clone(),
        };
        let right = SearchWindow {
            from: mid + 1,
            to: window.to,
            qualifier: window.qualifier.clone(),
        };
        return WindowPlan::Bisect(left, right);
    }

    if window.qualifier.is_empty() {
        let with = window.clone().with_qualifier(fallback_qualifier);
        let without = window
            .clone()
            .with_qualifier(format!("NOT {}", fallback_qualifier));
        return WindowPlan::SplitQualifier(with, without);
    }

    WindowPlan::EnumerateTruncated
}

/// Last page worth requesting for one query
pub fn page_limit(search: &SearchConfig) -> u32 {
    let per_page = u64::from(search.per_page.max(1));
    let pages_for_cap = search.result_cap.div_ceil(per_page);
    u32::try_from(pages_for_cap)
        .unwrap_or(u32::MAX)
        .min(search.max_pages)
}

/// Most results one query can actually enumerate: the result cap or what the
/// page limit reaches, whichever is smaller
pub fn enumerable_results(search: &SearchConfig) -> u64 {
    let reachable = u64::from(page_limit(search)) * u64::from(search.per_page.max(1));
    search.result_cap.min(reachable)
}

impl<A: HostingApi, S: Storage> Coordinator<A, S> {
    /// Walks the partition tree of `root` depth-first, left to right
    ///
    /// Every leaf window is enumerated and each repository not yet in `state`
    /// is crawled.
    pub(super) async fn traverse(
        &mut self,
        root: SearchWindow,
        state: &mut CrawlState,
    ) -> Result<(), HarvestError> {
        let cap = enumerable_results(&self.search);
        let mut stack = vec![root];

        while let Some(window) = stack.pop() {
            let query = window.query(&self.search);
            let probe = self
                .gateway
                .search_code(&query, 1, self.search.per_page)
                .await?;

            match plan_window(
                &window,
                probe.total_count,
                cap,
                &self.search.fallback_qualifier,
            ) {
                WindowPlan::Enumerate => {
                    info!("Window {}: {} results", window, probe.total_count);
                    self.enumerate(&query, probe, state).await?;
                }
                WindowPlan::EnumerateTruncated => {
                    warn!(
                        "Window {} still has {} results (cap {}); results past the cap are skipped",
                        window, probe.total_count, cap
                    );
                    self.enumerate(&query, probe, state).await?;
                }
                WindowPlan::Bisect(left, right) => {
                    debug!(
                        "Window {} has {} results, bisecting into {} and {}",
                        window, probe.total_count, left, right
                    );
                    stack.push(right);
                    stack.push(left);
                }
                WindowPlan::SplitQualifier(with, without) => {
                    debug!(
                        "Window {} has {} results, splitting by qualifier",
                        window, probe.total_count
                    );
                    stack.push(without);
                    stack.push(with);
                }
            }
        }

        Ok(())
    }

    /// Enumerates the pages of a query, starting from an already fetched first page
    ///
    /// Stops at the first empty page or at the page limit. Storage is committed
    /// after every page.
    async fn enumerate(
        &mut self,
        query: &SearchQuery,
        first: SearchPage,
        state: &mut CrawlState,
    ) -> Result<(), HarvestError> {
        let limit = page_limit(&self.search);
        let mut number = 1;
        let mut page = first;

        loop {
            if page.items.is_empty() {
                break;
            }

            for item in &page.items {
                if state.mark_visited(item.repository_id) {
                    self.crawl_repository(item.repository_id).await?;
                } else {
                    trace!("{} already visited this run", item.full_name);
                }
            }
            self.storage.save_changes()?;
            debug!(
                "Page {} done, {} repositories visited so far",
                number,
                state.visited_count()
            );

            if number >= limit {
                break;
            }
            number += 1;
            page = self
                .gateway
                .search_code(query, number, self.search.per_page)
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: u64 = 1000;

    fn plan(window: &SearchWindow, total: u64) -> WindowPlan {
        plan_window(window, total, CAP, "path:packages")
    }

    /// Splits `root` with a synthetic total and returns the leaf windows
    fn leaves(root: SearchWindow, total_for: impl Fn(&SearchWindow) -> u64) -> Vec<SearchWindow> {
        let mut stack = vec![root];
        let mut leaves = Vec::new();
        while let Some(window) = stack.pop() {
            match plan(&window, total_for(&window)) {
                WindowPlan::Enumerate | WindowPlan::EnumerateTruncated => leaves.push(window),
                WindowPlan::Bisect(left, right) | WindowPlan::SplitQualifier(left, right) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        leaves
    }

    #[test]
    fn test_within_cap_enumerates() {
        assert_eq!(plan(&SearchWindow::new(0, 1000), 1000), WindowPlan::Enumerate);
        assert_eq!(plan(&SearchWindow::new(0, 1000), 0), WindowPlan::Enumerate);
    }

    #[test]
    fn test_over_cap_bisects_at_midpoint() {
        assert_eq!(
            plan(&SearchWindow::new(0, 1000), 1500),
            WindowPlan::Bisect(SearchWindow::new(0, 500), SearchWindow::new(501, 1000))
        );
    }

    #[test]
    fn test_bisect_keeps_qualifier() {
        let window = SearchWindow::new(10, 13).with_qualifier("path:packages");
        match plan(&window, 5000) {
            WindowPlan::Bisect(left, right) => {
                assert_eq!((left.from, left.to), (10, 11));
                assert_eq!((right.from, right.to), (12, 13));
                assert_eq!(left.qualifier, "path:packages");
                assert_eq!(right.qualifier, "path:packages");
            }
            other => panic!("expected bisect, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_window_splits_by_qualifier() {
        assert_eq!(
            plan(&SearchWindow::new(750, 750), 1200),
            WindowPlan::SplitQualifier(
                SearchWindow::new(750, 750).with_qualifier("path:packages"),
                SearchWindow::new(750, 750).with_qualifier("NOT path:packages"),
            )
        );
    }

    #[test]
    fn test_qualified_degenerate_window_is_truncated() {
        let window = SearchWindow::new(750, 750).with_qualifier("NOT path:packages");
        assert_eq!(plan(&window, 1200), WindowPlan::EnumerateTruncated);
    }

    #[test]
    fn test_leaves_cover_range_without_gaps() {
        // A dense cluster around 300..=320 forces deep bisection
        let total_for = |w: &SearchWindow| -> u64 {
            let overlap = (w.to.min(320) - w.from.max(300) + 1).max(0) as u64;
            overlap * 1500 + (w.to - w.from + 1) as u64
        };
        let leaves = leaves(SearchWindow::new(0, 50_000), total_for);

        // The complement half of a qualifier split repeats its sibling's range
        let covering: Vec<&SearchWindow> = leaves
            .iter()
            .filter(|w| !w.qualifier.starts_with("NOT "))
            .collect();
        assert_eq!(covering.first().map(|w| w.from), Some(0));
        assert_eq!(covering.last().map(|w| w.to), Some(50_000));
        for pair in covering.windows(2) {
            assert_eq!(pair[0].to + 1, pair[1].from);
        }
        for window in &leaves {
            assert!(window.from <= window.to);
        }

        // Single sizes inside the cluster exceed the cap and are queried twice
        let qualified: Vec<&SearchWindow> = leaves
            .iter()
            .filter(|w| !w.qualifier.is_empty())
            .collect();
        assert_eq!(qualified.len(), 2 * 21);
        for pair in qualified.chunks(2) {
            assert_eq!(pair[0].from, pair[1].from);
            assert!(pair[0].is_degenerate());
            assert_eq!(pair[0].qualifier, "path:packages");
            assert_eq!(pair[1].qualifier, "NOT path:packages");
        }
    }

    #[test]
    fn test_query_string() {
        let search = SearchConfig::default();
        let window = SearchWindow::new(750, 750).with_qualifier("NOT path:packages");
        assert_eq!(
            window.query(&search).to_query_string(),
            "com.unity.xr NOT path:packages size:750..750 filename:manifest.json"
        );
        assert_eq!(
            SearchWindow::new(0, 10).query(&search).to_query_string(),
            "com.unity.xr size:0..10 filename:manifest.json"
        );
    }

    #[test]
    fn test_page_limit() {
        let mut search = SearchConfig::default();
        assert_eq!(page_limit(&search), 10);

        search.result_cap = 250;
        assert_eq!(page_limit(&search), 3);

        search.result_cap = 10_000;
        assert_eq!(page_limit(&search), 10);
    }

    #[test]
    fn test_enumerable_results_respects_page_limit() {
        let mut search = SearchConfig::default();
        search.result_cap = 1000;
        search.per_page = 100;
        search.max_pages = 10;
        assert_eq!(enumerable_results(&search), 1000);

        search.per_page = 50;
        assert_eq!(enumerable_results(&search), 500);

        search.result_cap = 120;
        assert_eq!(enumerable_results(&search), 120);
    }

    #[test]
    fn test_window_display() {
        assert_eq!(SearchWindow::new(1, 2).to_string(), "[1, 2]");
        assert_eq!(
            SearchWindow::new(3, 3).with_qualifier("path:packages").to_string(),
            "[3, 3] path:packages"
        );
    }
}
