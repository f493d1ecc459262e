//! Per-repository crawl: metadata, change detection, keywords, classnames

use crate::api::{HostingApi, RepositorySnapshot};
use crate::crawler::Coordinator;
use crate::extract::MAX_KEYWORD_CHARS;
use crate::state::KeywordType;
use crate::storage::{RepositoryRecord, Storage};
use crate::HarvestError;
use regex::Regex;
use tracing::{debug, info};

/// Longest description (in characters) that is persisted
pub const MAX_DESCRIPTION_CHARS: usize = 255;

/// Strips markup, links and symbols from README text before extraction
#[derive(Debug, Clone)]
pub struct ReadmeCleaner {
    tags: Regex,
    urls: Regex,
    symbols: Regex,
}

impl ReadmeCleaner {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            tags: Regex::new(r"</?[a-zA-Z]+[^>]*>")?,
            urls: Regex::new(r"https?://\S*")?,
            symbols: Regex::new(r"[^\s\w'-]")?,
        })
    }

    /// Removes HTML tags, then URLs, then every character that is not a word
    /// character, whitespace, apostrophe or hyphen
    pub fn clean(&self, text: &str) -> String {
        let text = self.tags.replace_all(text, "");
        let text = self.urls.replace_all(&text, "");
        self.symbols.replace_all(&text, "").into_owned()
    }
}

/// Builds the persisted record for a snapshot
pub fn repository_record(snapshot: &RepositorySnapshot) -> RepositoryRecord {
    RepositoryRecord {
        id: snapshot.id,
        owner: snapshot.owner.clone(),
        name: snapshot.name.clone(),
        description: snapshot
            .description
            .as_ref()
            .map(|d| d.chars().take(MAX_DESCRIPTION_CHARS).collect()),
        license: snapshot.license.clone(),
        created_at: snapshot.created_at,
        updated_at: snapshot.updated_at,
        pushed_at: snapshot.pushed_at,
        stargazers_count: snapshot.stargazers_count,
        watchers_count: snapshot.watchers_count,
        forks_count: snapshot.forks_count,
        open_issues_count: snapshot.open_issues_count,
        has_issues: snapshot.has_issues,
        has_downloads: snapshot.has_downloads,
        has_wiki: snapshot.has_wiki,
        has_pages: snapshot.has_pages,
    }
}

/// Result of crawling one repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryOutcome {
    /// Stored and unchanged since its last push; nothing was re-extracted
    Unchanged,
    /// New or pushed since the last crawl; keyword edges were rebuilt
    Updated { keywords: usize, classnames: usize },
}

impl<A: HostingApi, S: Storage> Coordinator<A, S> {
    /// Crawls one repository
    ///
    /// The repository row is always upserted. README keywords and classnames are
    /// rebuilt only when the repository is new or its last push time changed.
    pub(super) async fn crawl_repository(
        &mut self,
        repository_id: i64,
    ) -> Result<RepositoryOutcome, HarvestError> {
        let snapshot = self.gateway.get_repository(repository_id).await?;
        let full_name = snapshot.full_name();

        let changed = self
            .storage
            .insert_or_update_repository(&repository_record(&snapshot))?;
        if !changed {
            debug!("{} unchanged since last crawl", full_name);
            return Ok(RepositoryOutcome::Unchanged);
        }

        let removed = self
            .storage
            .remove_keyword_edges(repository_id, &KeywordType::crawler_owned())?;
        if removed > 0 {
            debug!("Removed {} stale keyword edges from {}", removed, full_name);
        }

        let readme = self.gateway.get_readme(repository_id).await?;
        let text = self.cleaner.clean(&readme);
        let mut keywords = 0;
        if !text.trim().is_empty() {
            for keyword in self.pipeline.run(&text) {
                self.storage.add_keyword_connection(
                    repository_id,
                    &keyword.word,
                    keyword.kind,
                    keyword.weight,
                )?;
                keywords += 1;
            }
        }

        let basenames = self
            .gateway
            .get_file_basenames(repository_id, &self.source_extension)
            .await?;
        let mut classnames = 0;
        for basename in basenames
            .iter()
            .filter(|b| b.chars().count() <= MAX_KEYWORD_CHARS)
        {
            self.storage
                .add_keyword_connection(repository_id, basename, KeywordType::Classname, 1.0)?;
            classnames += 1;
        }

        info!(
            "Indexed {}: {} readme keywords, {} classnames",
            full_name, keywords, classnames
        );
        Ok(RepositoryOutcome::Updated {
            keywords,
            classnames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::snapshot;

    #[test]
    fn test_clean_strips_tags_urls_and_symbols() {
        let cleaner = ReadmeCleaner::new().unwrap();
        let readme = "<p align=\"center\">XR Toolkit</p> Docs: https://example.com/docs?a=1 (v2.0) don't-panic!";
        assert_eq!(cleaner.clean(readme), "XR Toolkit Docs  v20 don't-panic");
    }

    #[test]
    fn test_clean_keeps_unicode_words() {
        let cleaner = ReadmeCleaner::new().unwrap();
        assert_eq!(cleaner.clean("Réalité mixte #1"), "Réalité mixte 1");
    }

    #[test]
    fn test_clean_markup_only_is_blank() {
        let cleaner = ReadmeCleaner::new().unwrap();
        assert!(cleaner.clean("<br/><hr> http://a.b *** !!").trim().is_empty());
    }

    #[test]
    fn test_record_truncates_description() {
        let mut snap = snapshot(7, None);
        snap.description = Some("é".repeat(300));
        let record = repository_record(&snap);
        assert_eq!(
            record.description.as_ref().map(|d| d.chars().count()),
            Some(MAX_DESCRIPTION_CHARS)
        );
        assert_eq!(record.full_name(), "octo/repo-7");
    }
}
