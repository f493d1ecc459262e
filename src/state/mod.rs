//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: Repository ids visited during the current crawl invocation
//! - `KeywordType`: The tag that distinguishes keyword edges produced by different sources

mod crawl_state;
mod keyword_type;

// Re-export main types
pub use crawl_state::CrawlState;
pub use keyword_type::KeywordType;
