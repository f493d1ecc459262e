//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::KeywordType;
use crate::storage::{KeywordEdgeRecord, RepositoryRecord, RunRecord, RunSummary};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid stored value in {column}: {value}")]
    InvalidValue { column: &'static str, value: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler. Writes are
/// batched: they become durable only when `save_changes` is called.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run and commits it immediately
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed with its counters
    fn complete_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()>;

    /// Discards uncommitted writes and marks a run as failed
    fn fail_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Repository Management =====

    /// Inserts a repository or updates the stored row with the same id
    ///
    /// # Returns
    ///
    /// `true` if the repository is new or its `pushed_at` differs from the stored
    /// value, i.e. its keywords need to be extracted again
    fn insert_or_update_repository(&mut self, record: &RepositoryRecord) -> StorageResult<bool>;

    /// Gets a repository by id
    fn get_repository(&self, repository_id: i64) -> StorageResult<Option<RepositoryRecord>>;

    /// Gets the ids of every stored repository in ascending order
    fn stored_repository_ids(&self) -> StorageResult<Vec<i64>>;

    /// Deletes repositories together with all of their keyword edges
    ///
    /// # Returns
    ///
    /// The number of repositories deleted
    fn remove_repositories(&mut self, repository_ids: &[i64]) -> StorageResult<u64>;

    // ===== Keyword Management =====

    /// Attaches a keyword to a repository under the given type
    ///
    /// The keyword record is created on first use. An existing edge with the same
    /// `(repository, keyword, type)` key has its weight replaced.
    fn add_keyword_connection(
        &mut self,
        repository_id: i64,
        word: &str,
        kind: KeywordType,
        weight: f64,
    ) -> StorageResult<()>;

    /// Deletes the repository's edges whose type is in `kinds`
    ///
    /// # Returns
    ///
    /// The number of edges deleted
    fn remove_keyword_edges(
        &mut self,
        repository_id: i64,
        kinds: &[KeywordType],
    ) -> StorageResult<u64>;

    /// Deletes every keyword that no longer has an edge
    ///
    /// # Returns
    ///
    /// The number of keywords deleted
    fn remove_orphan_keywords(&mut self) -> StorageResult<u64>;

    /// Gets all edges of a repository, ordered by type then descending weight
    fn edges_for_repository(&self, repository_id: i64) -> StorageResult<Vec<KeywordEdgeRecord>>;

    // ===== Batching =====

    /// Commits pending writes; a no-op when nothing is pending
    fn save_changes(&mut self) -> StorageResult<()>;

    // ===== Statistics =====

    /// Gets total repository count
    fn count_repositories(&self) -> StorageResult<u64>;

    /// Gets total keyword count
    fn count_keywords(&self) -> StorageResult<u64>;

    /// Counts edges per type
    fn count_edges_by_type(&self) -> StorageResult<HashMap<KeywordType, u64>>;

    /// Gets the words attached to the most repositories, with their repository counts
    fn top_keywords(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;
}
