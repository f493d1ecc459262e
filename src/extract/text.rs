//! Shared text toolkit for the keyword extractors
//!
//! Tokenisation, phrase splitting, and the stop-word list.

use crate::HarvestError;
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_STOPLIST: &str = include_str!("stoplist.txt");

/// Shortest word a candidate keyword may contain
pub const MIN_WORD_CHARS: usize = 2;

/// A set of lower-case words ignored by every extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// The SMART stop-word list compiled into the binary
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_STOPLIST)
    }

    /// Parses a list with one word per line; lines starting with `#` are comments
    pub fn parse(content: &str) -> Self {
        let words = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_lowercase)
            .collect();
        Self { words }
    }

    /// Loads a replacement list from disk
    ///
    /// # Returns
    ///
    /// * `Ok(Stopwords)` - The parsed list
    /// * `Err(HarvestError)` - The file is unreadable or contains no words
    pub fn load(path: &Path) -> Result<Self, HarvestError> {
        let content = std::fs::read_to_string(path)?;
        let stopwords = Self::parse(&content);
        if stopwords.is_empty() {
            return Err(HarvestError::Stopwords(format!(
                "{} contains no words",
                path.display()
            )));
        }
        Ok(stopwords)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns true if `word` may be part of a keyword
    ///
    /// Candidates are not stop words, have at least `MIN_WORD_CHARS` characters
    /// and are not purely numeric.
    pub fn is_candidate(&self, word: &str) -> bool {
        word.chars().count() >= MIN_WORD_CHARS
            && !word.chars().all(|c| c.is_numeric() || c == '\'' || c == '-')
            && !self.contains(word)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\'' || c == '-'
}

/// Splits text into lower-case words
///
/// Apostrophes and hyphens are kept inside words but trimmed from their edges.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !is_word_char(c))
        .map(|token| token.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Splits text into fragments at sentence and phrase punctuation
pub fn fragments(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| {
        matches!(
            c,
            '.' | ',' | ';' | ':' | '!' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | '\n'
                | '\r' | '\t' | '|' | '/' | '\\' | '*' | '#' | '='
        )
    })
    .filter(|fragment| !fragment.trim().is_empty())
}
