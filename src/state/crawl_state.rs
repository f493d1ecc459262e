use std::collections::HashSet;

/// Repository ids visited during one crawl invocation
///
/// Created by the top-level crawl call and passed down by reference through the
/// partition traversal and the reconciliation pass. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    visited: HashSet<i64>,
}

impl CrawlState {
    /// Creates an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a visit; returns false if the repository was already visited this run
    pub fn mark_visited(&mut self, repository_id: i64) -> bool {
        self.visited.insert(repository_id)
    }

    /// Returns true if the repository was visited this run
    pub fn is_visited(&self, repository_id: i64) -> bool {
        self.visited.contains(&repository_id)
    }

    /// Number of repositories visited this run
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Returns the stored ids this run has not visited, preserving their order
    pub fn stale<I>(&self, stored: I) -> Vec<i64>
    where
        I: IntoIterator<Item = i64>,
    {
        stored
            .into_iter()
            .filter(|id| !self.visited.contains(id))
            .collect()
    }
}
