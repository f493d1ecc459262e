//! Output module for crawl summaries and index reports
//!
//! This module handles:
//! - Loading index statistics from storage
//! - Printing statistics and run summaries

pub mod stats;

pub use stats::{
    load_statistics, print_run_summary, print_statistics, render_statistics, IndexStatistics,
    TOP_KEYWORDS,
};
