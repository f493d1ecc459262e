//! Keyword extraction
//!
//! This module turns README text into weighted keywords:
//! - `KeywordExtractor`, the capability every algorithm implements
//! - `normalize`, the score projection applied to every extractor's output
//! - `ExtractionPipeline`, an ordered set of extractors, each tagged with its edge type

mod entropy;
mod rake;
mod text;
mod textrank;

pub use entropy::{positive_prefix, EntropyDifference, EntropyReference};
pub use rake::Rake;
pub use text::{tokenize, Stopwords};
pub use textrank::TextRank;

use crate::state::KeywordType;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Longest keyword (in characters) that is ever persisted
pub const MAX_KEYWORD_CHARS: usize = 120;

/// A keyword algorithm: text in, word to raw score out
///
/// Implementations hold no state between calls.
pub trait KeywordExtractor {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Scores the keywords of `text`; the map may be empty
    fn extract(&self, text: &str) -> HashMap<String, f64>;
}

/// Projects scores so the maximum is at most 1
///
/// If the largest score exceeds 1, every score is divided by it. Otherwise the
/// map is returned unchanged; scores are never scaled up.
pub fn normalize(keywords: HashMap<String, f64>) -> HashMap<String, f64> {
    let max = keywords.values().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > 1.0 {
        keywords
            .into_iter()
            .map(|(word, score)| (word, score / max))
            .collect()
    } else {
        keywords
    }
}

/// One keyword produced by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedKeyword {
    pub word: String,
    pub kind: KeywordType,
    pub weight: f64,
}

/// Ordered collection of extractors, one per edge type
pub struct ExtractionPipeline {
    extractors: Vec<(KeywordType, Box<dyn KeywordExtractor>)>,
}

impl ExtractionPipeline {
    /// Creates an empty pipeline
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Creates the pipeline used by the crawler: RAKE 1-4, TextRank, and both
    /// entropy-difference variants
    pub fn with_defaults(stopwords: Arc<Stopwords>) -> Self {
        let mut pipeline = Self::new();
        for (max_words, kind) in [
            (1, KeywordType::ReadmeRake1),
            (2, KeywordType::ReadmeRake2),
            (3, KeywordType::ReadmeRake3),
            (4, KeywordType::ReadmeRake4),
        ] {
            pipeline.register(kind, Rake::new(max_words, stopwords.clone()));
        }
        pipeline.register(KeywordType::ReadmeTextRank, TextRank::new(stopwords.clone()));
        pipeline.register(
            KeywordType::ReadmeEntropyNormal,
            EntropyDifference::new(EntropyReference::Normal, stopwords.clone()),
        );
        pipeline.register(
            KeywordType::ReadmeEntropyMax,
            EntropyDifference::new(EntropyReference::Max, stopwords),
        );
        pipeline
    }

    /// Adds an extractor under an edge type
    ///
    /// A type that is already registered is replaced, so every type yields at most
    /// one set of edges.
    pub fn register<E>(&mut self, kind: KeywordType, extractor: E)
    where
        E: KeywordExtractor + 'static,
    {
        self.extractors.retain(|(existing, _)| *existing != kind);
        self.extractors.push((kind, Box::new(extractor)));
    }

    /// Edge types in registration order
    pub fn kinds(&self) -> Vec<KeywordType> {
        self.extractors.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Runs every extractor over `text`
    ///
    /// Words are trimmed; empty words and words longer than `MAX_KEYWORD_CHARS`
    /// are dropped. Output is grouped by extractor in registration order, then
    /// sorted by descending weight.
    pub fn run(&self, text: &str) -> Vec<ExtractedKeyword> {
        let mut keywords = Vec::new();
        for (kind, extractor) in &self.extractors {
            let scores = normalize(extractor.extract(text));
            trace!("{} produced {} keywords", extractor.name(), scores.len());

            let mut batch: Vec<ExtractedKeyword> = scores
                .into_iter()
                .filter_map(|(word, weight)| {
                    let word = word.trim();
                    (!word.is_empty() && word.chars().count() <= MAX_KEYWORD_CHARS).then(|| {
                        ExtractedKeyword {
                            word: word.to_string(),
                            kind: *kind,
                            weight,
                        }
                    })
                })
                .collect();
            batch.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.word.cmp(&b.word)));
            keywords.extend(batch);
        }
        keywords
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new()
    }
}
