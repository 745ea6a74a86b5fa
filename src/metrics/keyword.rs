//! Keyword extraction over subject + body, plus subject-length stats.

use std::collections::HashMap;

use crate::model::message::NormalizedMessage;
use crate::model::report::{KeywordCount, KeywordReport, SubjectStats};

use super::{rank_top, Accumulator};

/// Function words excluded from the keyword counts.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "been", "have", "has", "had", "does", "did",
    "will", "would", "could", "should", "may", "might", "can", "this", "that", "these",
    "those", "you", "your", "yours", "her", "hers", "him", "his", "its", "our", "ours",
    "their", "theirs", "them", "they", "she", "but", "not", "with", "from", "into", "out",
    "about", "all", "any", "more", "most", "some", "such", "than", "too", "very", "just",
    "also", "here", "there", "when", "where", "which", "who", "whom", "why", "how", "what",
];

/// Lower-cased word tokens of at least three alphabetic characters,
/// stopwords removed. Vocabulary is capped: when the map grows past
/// `max_vocabulary`, singleton tokens are pruned.
#[derive(Debug)]
pub struct KeywordAccumulator {
    words: HashMap<String, (u64, u64)>, // count, first_seen
    next_seen: u64,
    max_vocabulary: usize,
    subject_length_sum: u64,
    subject_length_max: u64,
    subject_length_min: u64,
    subjects_seen: u64,
}

impl KeywordAccumulator {
    pub fn new(max_vocabulary: usize) -> Self {
        Self {
            words: HashMap::new(),
            next_seen: 0,
            max_vocabulary: max_vocabulary.max(1),
            subject_length_sum: 0,
            subject_length_max: 0,
            subject_length_min: u64::MAX,
            subjects_seen: 0,
        }
    }

    fn prune(&mut self) {
        if self.words.len() <= self.max_vocabulary {
            return;
        }
        self.words.retain(|_, (count, _)| *count > 1);
    }

    pub fn finish(self, top_n: usize) -> KeywordReport {
        let distinct = self.words.len() as u64;
        let mut entries: Vec<(String, (u64, u64))> = self.words.into_iter().collect();
        rank_top(&mut entries, |e| e.1 .0, |e| e.1 .1);
        entries.truncate(top_n);

        KeywordReport {
            top_keywords: entries
                .into_iter()
                .map(|(word, (count, _))| KeywordCount { word, count })
                .collect(),
            distinct_words: distinct,
            subjects: SubjectStats {
                average_length: if self.subjects_seen == 0 {
                    0.0
                } else {
                    self.subject_length_sum as f64 / self.subjects_seen as f64
                },
                max_length: self.subject_length_max,
                min_length: if self.subjects_seen == 0 {
                    0
                } else {
                    self.subject_length_min
                },
            },
        }
    }
}

impl Accumulator for KeywordAccumulator {
    fn fold(&mut self, msg: &NormalizedMessage) {
        if !msg.subject.is_empty() {
            let len = msg.subject.chars().count() as u64;
            self.subject_length_sum += len;
            self.subject_length_max = self.subject_length_max.max(len);
            self.subject_length_min = self.subject_length_min.min(len);
            self.subjects_seen += 1;
        }

        for token in tokenize(&msg.searchable_text()) {
            let order = self.next_seen;
            self.next_seen += 1;
            let entry = self.words.entry(token).or_insert((0, order));
            entry.0 += 1;
        }
        self.prune();
    }
}

/// Split text into lower-cased alphabetic tokens of length >= 3.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}
