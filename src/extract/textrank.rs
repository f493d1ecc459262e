//! TextRank keyword extraction
//!
//! Builds an undirected co-occurrence graph over candidate words and ranks the
//! nodes with weighted PageRank. The top third of the ranking is kept, weighted
//! by rank position.

use crate::extract::text::{tokenize, Stopwords};
use crate::extract::KeywordExtractor;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const WINDOW: usize = 2;
const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 30;
const TOLERANCE: f64 = 1e-4;

/// TextRank extractor
#[derive(Debug, Clone)]
pub struct TextRank {
    stopwords: Arc<Stopwords>,
}

impl TextRank {
    pub fn new(stopwords: Arc<Stopwords>) -> Self {
        Self { stopwords }
    }

    /// Ranks candidate words by centrality, best first
    fn rank(&self, text: &str) -> Vec<String> {
        let words: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|w| self.stopwords.is_candidate(w))
            .collect();
        if words.is_empty() {
            return Vec::new();
        }

        // BTreeMap keeps iteration order stable across runs
        let mut graph: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
        for (i, word) in words.iter().enumerate() {
            graph.entry(word.as_str()).or_default();
            for other in words.iter().skip(i + 1).take(WINDOW - 1) {
                if other == word {
                    continue;
                }
                *graph
                    .entry(word.as_str())
                    .or_default()
                    .entry(other.as_str())
                    .or_default() += 1.0;
                *graph
                    .entry(other.as_str())
                    .or_default()
                    .entry(word.as_str())
                    .or_default() += 1.0;
            }
        }

        let out_weight: HashMap<&str, f64> = graph
            .iter()
            .map(|(node, edges)| (*node, edges.values().sum()))
            .collect();

        let mut scores: HashMap<&str, f64> = graph.keys().map(|node| (*node, 1.0)).collect();
        for _ in 0..MAX_ITERATIONS {
            let mut delta: f64 = 0.0;
            let mut next = HashMap::with_capacity(scores.len());
            for (node, edges) in &graph {
                let incoming: f64 = edges
                    .iter()
                    .map(|(neighbor, weight)| weight / out_weight[neighbor] * scores[neighbor])
                    .sum();
                let score = (1.0 - DAMPING) + DAMPING * incoming;
                delta = delta.max((score - scores[node]).abs());
                next.insert(*node, score);
            }
            scores = next;
            if delta < TOLERANCE {
                break;
            }
        }

        let mut ranked: Vec<(&str, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().map(|(word, _)| word.to_string()).collect()
    }
}

impl KeywordExtractor for TextRank {
    fn name(&self) -> &'static str {
        "textrank"
    }

    fn extract(&self, text: &str) -> HashMap<String, f64> {
        let ranked = self.rank(text);
        let keep = (ranked.len() / 3).max(1).min(ranked.len());
        let kept = &ranked[..keep];

        let count = kept.len() as f64;
        kept.iter()
            .enumerate()
            .map(|(index, word)| (word.clone(), (count - index as f64) / count))
            .collect()
    }
}
