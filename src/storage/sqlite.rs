//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Writes open a transaction lazily and `save_changes` commits it, so a batch of
//! writes between two checkpoints lands atomically.

use crate::state::KeywordType;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{KeywordEdgeRecord, RepositoryRecord, RunRecord, RunStatus, RunSummary};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const REPOSITORY_COLUMNS: &str = "id, owner, name, description, license, created_at, updated_at,
     pushed_at, stargazers_count, watchers_count, forks_count, open_issues_count,
     has_issues, has_downloads, has_wiki, has_pages";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status,
     repositories_visited, repositories_removed, keywords_removed, error_message";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,

    /// word -> keyword id for every stored keyword
    keyword_ids: HashMap<String, i64>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        let mut storage = Self {
            conn,
            keyword_ids: HashMap::new(),
        };
        storage.reload_keyword_cache()?;
        Ok(storage)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            keyword_ids: HashMap::new(),
        })
    }

    /// Returns true if writes are waiting for `save_changes`
    pub fn has_pending_changes(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn begin_if_needed(&mut self) -> StorageResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn reload_keyword_cache(&mut self) -> StorageResult<()> {
        let mut stmt = self.conn.prepare("SELECT word, id FROM keywords")?;
        let keywords = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        drop(stmt);

        self.keyword_ids = keywords;
        Ok(())
    }

    fn keyword_id_for(&mut self, word: &str) -> StorageResult<i64> {
        if let Some(id) = self.keyword_ids.get(word) {
            return Ok(*id);
        }

        self.conn
            .execute("INSERT INTO keywords (word) VALUES (?1)", params![word])?;
        let id = self.conn.last_insert_rowid();
        self.keyword_ids.insert(word.to_string(), id);
        Ok(id)
    }
}

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<RepositoryRecord> {
    Ok(RepositoryRecord {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        license: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        pushed_at: row.get(7)?,
        stargazers_count: row.get(8)?,
        watchers_count: row.get(9)?,
        forks_count: row.get(10)?,
        open_issues_count: row.get(11)?,
        has_issues: row.get(12)?,
        has_downloads: row.get(13)?,
        has_wiki: row.get(14)?,
        has_pages: row.get(15)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        repositories_visited: row.get::<_, i64>(5)? as u64,
        repositories_removed: row.get::<_, i64>(6)? as u64,
        keywords_removed: row.get::<_, i64>(7)? as u64,
        error_message: row.get(8)?,
    })
}

fn parse_keyword_type(value: String) -> StorageResult<KeywordType> {
    KeywordType::from_db_string(&value).ok_or(StorageError::InvalidValue {
        column: "keyword_edges.type",
        value,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.save_changes()?;

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()> {
        self.save_changes()?;

        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, repositories_visited = ?3,
             repositories_removed = ?4, keywords_removed = ?5 WHERE id = ?6",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                summary.repositories_visited as i64,
                summary.repositories_removed as i64,
                summary.keywords_removed as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()> {
        if self.has_pending_changes() {
            self.conn.execute_batch("ROLLBACK")?;
            self.reload_keyword_cache()?;
        }

        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, error_message, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    // ===== Repository Management =====

    fn insert_or_update_repository(&mut self, record: &RepositoryRecord) -> StorageResult<bool> {
        self.begin_if_needed()?;

        let stored_pushed_at: Option<Option<DateTime<Utc>>> = self
            .conn
            .query_row(
                "SELECT pushed_at FROM repositories WHERE id = ?1",
                params![record.id],
                |row| row.get(0),
            )
            .optional()?;

        self.conn.execute(
            "INSERT INTO repositories (id, owner, name, description, license, created_at,
                 updated_at, pushed_at, stargazers_count, watchers_count, forks_count,
                 open_issues_count, has_issues, has_downloads, has_wiki, has_pages, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
             ON CONFLICT(id) DO UPDATE SET
                 owner = excluded.owner,
                 name = excluded.name,
                 description = excluded.description,
                 license = excluded.license,
                 created_at = excluded.created_at,
                 updated_at = excluded.updated_at,
                 pushed_at = excluded.pushed_at,
                 stargazers_count = excluded.stargazers_count,
                 watchers_count = excluded.watchers_count,
                 forks_count = excluded.forks_count,
                 open_issues_count = excluded.open_issues_count,
                 has_issues = excluded.has_issues,
                 has_downloads = excluded.has_downloads,
                 has_wiki = excluded.has_wiki,
                 has_pages = excluded.has_pages,
                 crawled_at = excluded.crawled_at",
            params![
                record.id,
                record.owner,
                record.name,
                record.description,
                record.license,
                record.created_at,
                record.updated_at,
                record.pushed_at,
                record.stargazers_count,
                record.watchers_count,
                record.forks_count,
                record.open_issues_count,
                record.has_issues,
                record.has_downloads,
                record.has_wiki,
                record.has_pages,
                Utc::now(),
            ],
        )?;

        Ok(match stored_pushed_at {
            None => true,
            Some(previous) => previous != record.pushed_at,
        })
    }

    fn get_repository(&self, repository_id: i64) -> StorageResult<Option<RepositoryRecord>> {
        let repository = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM repositories WHERE id = ?1",
                    REPOSITORY_COLUMNS
                ),
                params![repository_id],
                repository_from_row,
            )
            .optional()?;

        Ok(repository)
    }

    fn stored_repository_ids(&self) -> StorageResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM repositories ORDER BY id ASC")?;

        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    fn remove_repositories(&mut self, repository_ids: &[i64]) -> StorageResult<u64> {
        if repository_ids.is_empty() {
            return Ok(0);
        }
        self.begin_if_needed()?;

        let mut removed = 0;
        for id in repository_ids {
            self.conn.execute(
                "DELETE FROM keyword_edges WHERE repository_id = ?1",
                params![id],
            )?;
            removed += self
                .conn
                .execute("DELETE FROM repositories WHERE id = ?1", params![id])?
                as u64;
        }

        Ok(removed)
    }

    // ===== Keyword Management =====

    fn add_keyword_connection(
        &mut self,
        repository_id: i64,
        word: &str,
        kind: KeywordType,
        weight: f64,
    ) -> StorageResult<()> {
        self.begin_if_needed()?;

        let keyword_id = self.keyword_id_for(word)?;
        self.conn.execute(
            "INSERT INTO keyword_edges (repository_id, keyword_id, type, weight)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(repository_id, keyword_id, type) DO UPDATE SET weight = excluded.weight",
            params![repository_id, keyword_id, kind.to_db_string(), weight],
        )?;

        Ok(())
    }

    fn remove_keyword_edges(
        &mut self,
        repository_id: i64,
        kinds: &[KeywordType],
    ) -> StorageResult<u64> {
        if kinds.is_empty() {
            return Ok(0);
        }
        self.begin_if_needed()?;

        let placeholders = vec!["?"; kinds.len()].join(", ");
        let sql = format!(
            "DELETE FROM keyword_edges WHERE repository_id = ? AND type IN ({})",
            placeholders
        );

        let mut values: Vec<rusqlite::types::Value> = vec![repository_id.into()];
        values.extend(kinds.iter().map(|k| k.to_db_string().to_string().into()));

        let removed = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(removed as u64)
    }

    fn remove_orphan_keywords(&mut self) -> StorageResult<u64> {
        self.begin_if_needed()?;

        let orphans: Vec<String> = {
            let mut stmt = self.conn.prepare(
                "SELECT word FROM keywords
                 WHERE NOT EXISTS (SELECT 1 FROM keyword_edges e WHERE e.keyword_id = keywords.id)",
            )?;
            let words = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            words
        };

        if orphans.is_empty() {
            return Ok(0);
        }

        let removed = self.conn.execute(
            "DELETE FROM keywords
             WHERE NOT EXISTS (SELECT 1 FROM keyword_edges e WHERE e.keyword_id = keywords.id)",
            [],
        )?;

        for word in &orphans {
            self.keyword_ids.remove(word);
        }

        Ok(removed as u64)
    }

    fn edges_for_repository(&self, repository_id: i64) -> StorageResult<Vec<KeywordEdgeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.repository_id, e.keyword_id, k.word, e.type, e.weight
             FROM keyword_edges e JOIN keywords k ON k.id = e.keyword_id
             WHERE e.repository_id = ?1
             ORDER BY e.type ASC, e.weight DESC, k.word ASC",
        )?;

        let rows = stmt
            .query_map(params![repository_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(repository_id, keyword_id, word, kind, weight)| {
                Ok(KeywordEdgeRecord {
                    repository_id,
                    keyword_id,
                    word,
                    kind: parse_keyword_type(kind)?,
                    weight,
                })
            })
            .collect()
    }

    // ===== Batching =====

    fn save_changes(&mut self) -> StorageResult<()> {
        if self.has_pending_changes() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    // ===== Statistics =====

    fn count_repositories(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_keywords(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM keywords", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_edges_by_type(&self) -> StorageResult<HashMap<KeywordType, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT type, COUNT(*) FROM keyword_edges GROUP BY type")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = HashMap::new();
        for (kind, count) in rows {
            counts.insert(parse_keyword_type(kind)?, count as u64);
        }

        Ok(counts)
    }

    fn top_keywords(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT k.word, COUNT(DISTINCT e.repository_id) AS repos
             FROM keywords k JOIN keyword_edges e ON e.keyword_id = k.id
             GROUP BY k.id
             ORDER BY repos DESC, k.word ASC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
