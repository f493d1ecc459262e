//! Entropy-difference keyword extraction
//!
//! Words that cluster in a few places of a document are more likely to be
//! keywords than words spread evenly through it. For every word occurring at
//! least twice, the Shannon entropy of the gaps between its occurrences is
//! compared against a reference entropy; the difference is the word's score.

use crate::extract::text::{tokenize, Stopwords};
use crate::extract::KeywordExtractor;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Reference entropy a word's gap entropy is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyReference {
    /// Expected entropy of randomly placed occurrences
    Normal,
    /// Entropy of evenly spaced occurrences
    Max,
}

impl EntropyReference {
    /// Reference entropy for a word occurring `n` times
    pub fn entropy(&self, n: usize) -> f64 {
        match self {
            Self::Normal => (2..=n).map(|k| 1.0 / k as f64).sum(),
            Self::Max => (n as f64).ln(),
        }
    }
}

/// Entropy-difference extractor
#[derive(Debug, Clone)]
pub struct EntropyDifference {
    reference: EntropyReference,
    stopwords: Arc<Stopwords>,
}

impl EntropyDifference {
    pub fn new(reference: EntropyReference, stopwords: Arc<Stopwords>) -> Self {
        Self {
            reference,
            stopwords,
        }
    }

    /// Scores every word occurring at least twice, in no particular order
    pub fn scores(&self, text: &str) -> Vec<(String, f64)> {
        let words: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|w| self.stopwords.is_candidate(w))
            .collect();
        let total = words.len();

        let mut positions: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, word) in words.iter().enumerate() {
            positions.entry(word.as_str()).or_default().push(index);
        }

        positions
            .into_iter()
            .filter(|(_, occurrences)| occurrences.len() >= 2)
            .map(|(word, occurrences)| {
                let h = gap_entropy(&occurrences, total);
                let score = self.reference.entropy(occurrences.len()) - h;
                (word.to_string(), score)
            })
            .collect()
    }
}

/// Shannon entropy of the cyclic gaps between sorted positions in a sequence of `total` tokens
fn gap_entropy(positions: &[usize], total: usize) -> f64 {
    let (first, last) = match (positions.first(), positions.last()) {
        (Some(first), Some(last)) if total > 0 => (*first, *last),
        _ => return 0.0,
    };

    let wrap = total - last + first;
    positions
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .chain(std::iter::once(wrap))
        .filter(|gap| *gap > 0)
        .map(|gap| {
            let p = gap as f64 / total as f64;
            -p * p.ln()
        })
        .sum()
}

/// Sorts scores descending and keeps the prefix of strictly positive scores
///
/// Truncation happens after sorting: the first non-positive score in sorted order
/// ends the kept prefix.
pub fn positive_prefix(mut scores: Vec<(String, f64)>) -> Vec<(String, f64)> {
    scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let kept = scores.iter().take_while(|(_, score)| *score > 0.0).count();
    scores.truncate(kept);
    scores
}

impl KeywordExtractor for EntropyDifference {
    fn name(&self) -> &'static str {
        match self.reference {
            EntropyReference::Normal => "entropy-normal",
            EntropyReference::Max => "entropy-max",
        }
    }

    fn extract(&self, text: &str) -> HashMap<String, f64> {
        positive_prefix(self.scores(text)).into_iter().collect()
    }
}
