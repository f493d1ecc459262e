//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Repo-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    repositories_visited INTEGER NOT NULL DEFAULT 0,
    repositories_removed INTEGER NOT NULL DEFAULT 0,
    keywords_removed INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

-- Repositories keyed by the platform's repository id
CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY,
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    license TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    pushed_at TEXT,
    stargazers_count INTEGER NOT NULL DEFAULT 0,
    watchers_count INTEGER NOT NULL DEFAULT 0,
    forks_count INTEGER NOT NULL DEFAULT 0,
    open_issues_count INTEGER NOT NULL DEFAULT 0,
    has_issues INTEGER NOT NULL DEFAULT 0,
    has_downloads INTEGER NOT NULL DEFAULT 0,
    has_wiki INTEGER NOT NULL DEFAULT 0,
    has_pages INTEGER NOT NULL DEFAULT 0,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_repositories_owner_name ON repositories(owner, name);

-- Canonical keywords; words compare case-sensitively
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE
);

-- Typed, weighted repository/keyword edges
CREATE TABLE IF NOT EXISTS keyword_edges (
    repository_id INTEGER NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    weight REAL NOT NULL,
    PRIMARY KEY (repository_id, keyword_id, type)
);

CREATE INDEX IF NOT EXISTS idx_keyword_edges_keyword ON keyword_edges(keyword_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
