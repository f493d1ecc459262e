//! RAKE (Rapid Automatic Keyword Extraction)
//!
//! Candidate phrases are maximal runs of non-stop-words inside a text fragment.
//! Each word is scored by degree over frequency, and a phrase scores the sum of
//! its word scores.

use crate::extract::text::{fragments, tokenize, Stopwords};
use crate::extract::KeywordExtractor;
use std::collections::HashMap;
use std::sync::Arc;

/// RAKE extractor bounded to phrases of at most `max_words` words
#[derive(Debug, Clone)]
pub struct Rake {
    max_words: usize,
    stopwords: Arc<Stopwords>,
}

impl Rake {
    pub fn new(max_words: usize, stopwords: Arc<Stopwords>) -> Self {
        Self {
            max_words: max_words.max(1),
            stopwords,
        }
    }

    fn candidate_phrases(&self, text: &str) -> Vec<Vec<String>> {
        let mut phrases = Vec::new();
        for fragment in fragments(text) {
            let mut current: Vec<String> = Vec::new();
            for word in tokenize(fragment) {
                if self.stopwords.contains(&word) {
                    if !current.is_empty() {
                        phrases.push(std::mem::take(&mut current));
                    }
                } else {
                    current.push(word);
                }
            }
            if !current.is_empty() {
                phrases.push(current);
            }
        }

        phrases
            .into_iter()
            .filter(|phrase| phrase.len() <= self.max_words)
            .filter(|phrase| phrase.iter().all(|w| self.stopwords.is_candidate(w)))
            .collect()
    }
}

impl KeywordExtractor for Rake {
    fn name(&self) -> &'static str {
        "rake"
    }

    fn extract(&self, text: &str) -> HashMap<String, f64> {
        let phrases = self.candidate_phrases(text);

        let mut frequency: HashMap<&str, f64> = HashMap::new();
        let mut degree: HashMap<&str, f64> = HashMap::new();
        for phrase in &phrases {
            for word in phrase {
                *frequency.entry(word).or_default() += 1.0;
                *degree.entry(word).or_default() += phrase.len() as f64;
            }
        }

        phrases
            .iter()
            .map(|phrase| {
                let score = phrase
                    .iter()
                    .map(|w| degree[w.as_str()] / frequency[w.as_str()])
                    .sum();
                (phrase.join(" "), score)
            })
            .collect()
    }
}
