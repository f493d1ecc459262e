//! Statistics generation from the index database
//!
//! This module provides functionality for extracting and displaying
//! index statistics from the storage layer.

use crate::state::KeywordType;
use crate::storage::{RunRecord, RunSummary, Storage};
use crate::HarvestError;
use std::collections::HashMap;
use std::fmt;

/// Number of keywords listed by `--stats`
pub const TOP_KEYWORDS: usize = 20;

/// Index statistics summary
#[derive(Debug, Clone)]
pub struct IndexStatistics {
    /// Total number of stored repositories
    pub repositories: u64,

    /// Total number of stored keywords
    pub keywords: u64,

    /// Count of keyword edges by type
    pub edges_by_type: HashMap<KeywordType, u64>,

    /// Most recent crawl run, if any
    pub latest_run: Option<RunRecord>,

    /// Keywords attached to the most repositories
    pub top_keywords: Vec<(String, u64)>,
}

impl IndexStatistics {
    pub fn total_edges(&self) -> u64 {
        self.edges_by_type.values().sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `top` - How many of the most connected keywords to include
///
/// # Returns
///
/// * `Ok(IndexStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage, top: usize) -> Result<IndexStatistics, HarvestError> {
    Ok(IndexStatistics {
        repositories: storage.count_repositories()?,
        keywords: storage.count_keywords()?,
        edges_by_type: storage.count_edges_by_type()?,
        latest_run: storage.get_latest_run()?,
        top_keywords: storage.top_keywords(top)?,
    })
}

impl fmt::Display for IndexStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Index Statistics ===\n")?;

        let total = self.total_edges();
        writeln!(f, "Overview:")?;
        writeln!(f, "  Repositories: {}", self.repositories)?;
        writeln!(f, "  Keywords: {}", self.keywords)?;
        writeln!(f, "  Keyword edges: {}", total)?;
        writeln!(f)?;

        if total > 0 {
            writeln!(f, "Edges by Type:")?;
            for kind in KeywordType::all_types() {
                let count = self.edges_by_type.get(&kind).copied().unwrap_or(0);
                if count == 0 {
                    continue;
                }
                let percentage = (count as f64 / total as f64) * 100.0;
                writeln!(f, "  {}: {} ({:.1}%)", kind, count, percentage)?;
            }
            writeln!(f)?;
        }

        match &self.latest_run {
            Some(run) => {
                writeln!(f, "Latest Run:")?;
                writeln!(f, "  Id: {}", run.id)?;
                writeln!(f, "  Status: {}", run.status.to_db_string())?;
                writeln!(f, "  Started: {}", run.started_at)?;
                if let Some(finished) = &run.finished_at {
                    writeln!(f, "  Finished: {}", finished)?;
                }
                writeln!(f, "  Repositories visited: {}", run.repositories_visited)?;
                writeln!(f, "  Repositories removed: {}", run.repositories_removed)?;
                writeln!(f, "  Keywords removed: {}", run.keywords_removed)?;
                if let Some(error) = &run.error_message {
                    writeln!(f, "  Error: {}", error)?;
                }
            }
            None => writeln!(f, "No crawl runs recorded")?,
        }

        if !self.top_keywords.is_empty() {
            writeln!(f, "\nTop Keywords:")?;
            for (word, repositories) in &self.top_keywords {
                writeln!(f, "  {} ({} repositories)", word, repositories)?;
            }
        }

        Ok(())
    }
}

/// Formats statistics as a plain-text report
pub fn render_statistics(stats: &IndexStatistics) -> String {
    stats.to_string()
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &IndexStatistics) {
    print!("{}", stats);
}

/// Prints the counters of a finished crawl
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Crawl Summary ===\n");
    println!("  Repositories visited: {}", summary.repositories_visited);
    println!("  Repositories removed: {}", summary.repositories_removed);
    println!("  Keywords removed: {}", summary.keywords_removed);
}
