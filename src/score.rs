//! Pluggable sentiment and language scoring.
//!
//! The pipeline performs no scoring of its own — it invokes injected
//! strategies per message and folds the results. A scorer failure on one
//! message degrades that message to neutral/unknown; jobs never fail
//! because a model hiccuped.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::metrics::time::{period_of_day, PERIOD_LABELS};
use crate::model::message::NormalizedMessage;
use crate::model::report::{
    BucketCount, LanguageReport, PeriodScore, SenderScore, SentimentReport,
};

/// Language code used when detection fails or is disabled.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Scorer errors are opaque to the pipeline; they only get logged.
pub type ScoreResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Sentiment category, ordered most negative to most positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl Sentiment {
    /// Numeric score: -2 (very negative) to 2 (very positive).
    pub fn score(self) -> f64 {
        match self {
            Self::VeryNegative => -2.0,
            Self::Negative => -1.0,
            Self::Neutral => 0.0,
            Self::Positive => 1.0,
            Self::VeryPositive => 2.0,
        }
    }
}

/// Strategy producing a sentiment category for one message text.
pub trait SentimentScorer: Send + Sync {
    fn score_sentiment(&self, text: &str) -> ScoreResult<Sentiment>;
}

/// Strategy producing an ISO-639-1 language code for one message text.
pub trait LanguageDetector: Send + Sync {
    fn detect_language(&self, text: &str) -> ScoreResult<String>;
}

// ── Built-in strategies ─────────────────────────────────────────

/// Default no-op strategy: everything is neutral and unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralScorer;

impl SentimentScorer for NeutralScorer {
    fn score_sentiment(&self, _text: &str) -> ScoreResult<Sentiment> {
        Ok(Sentiment::Neutral)
    }
}

impl LanguageDetector for NeutralScorer {
    fn detect_language(&self, _text: &str) -> ScoreResult<String> {
        Ok(UNKNOWN_LANGUAGE.to_string())
    }
}

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "fantastic", "awesome", "perfect",
    "love", "like", "happy", "pleased", "satisfied", "thank", "thanks", "appreciate",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "disappointed", "angry", "frustrated", "hate",
    "dislike", "upset", "sad", "sorry", "apologize", "problem", "issue", "error",
];

/// Word-list scorer: counts distinct positive/negative matches and maps
/// the difference onto the five categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl SentimentScorer for LexiconScorer {
    fn score_sentiment(&self, text: &str) -> ScoreResult<Sentiment> {
        let mut positive = 0i64;
        let mut negative = 0i64;
        let mut seen: Vec<&str> = Vec::new();

        for word in text
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
        {
            let lower = word.to_lowercase();
            if let Some(&hit) = POSITIVE_WORDS.iter().find(|&&w| w == lower) {
                if !seen.contains(&hit) {
                    seen.push(hit);
                    positive += 1;
                }
            } else if let Some(&hit) = NEGATIVE_WORDS.iter().find(|&&w| w == lower) {
                if !seen.contains(&hit) {
                    seen.push(hit);
                    negative += 1;
                }
            }
        }

        Ok(match positive - negative {
            d if d >= 3 => Sentiment::VeryPositive,
            d if d >= 1 => Sentiment::Positive,
            d if d <= -3 => Sentiment::VeryNegative,
            d if d <= -1 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        })
    }
}

/// Function words per language, enough to separate short mail bodies.
const LANGUAGE_MARKERS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "you", "for", "with", "this", "that", "have", "are"]),
    ("es", &["que", "los", "las", "una", "por", "para", "con", "este", "esta"]),
    ("de", &["und", "der", "die", "das", "nicht", "mit", "ist", "ein", "eine"]),
    ("fr", &["les", "des", "une", "est", "pour", "dans", "vous", "avec", "pas"]),
];

/// Stopword-frequency language detector. At least two marker hits are
/// required before it commits to a language.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerLanguageDetector;

impl LanguageDetector for MarkerLanguageDetector {
    fn detect_language(&self, text: &str) -> ScoreResult<String> {
        let mut best: Option<(&str, usize)> = None;
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();

        for (code, markers) in LANGUAGE_MARKERS {
            let hits = words.iter().filter(|w| markers.contains(&w.as_str())).count();
            if hits >= 2 && best.is_none_or(|(_, b)| hits > b) {
                best = Some((code, hits));
            }
        }

        Ok(best
            .map(|(code, _)| code.to_string())
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()))
    }
}

// ── Fold adapter ────────────────────────────────────────────────

/// Folds scorer outputs into sentiment and language distributions.
#[derive(Debug, Default)]
pub struct ScoreAccumulator {
    counts: [u64; 5], // indexed by category, most negative first
    score_sum: f64,
    scored: u64,
    by_sender: HashMap<String, (f64, u64, u64)>, // sum, samples, first_seen
    by_period: [(f64, u64); 4],
    languages: HashMap<String, (u64, u64)>, // count, first_seen
    next_seen: u64,
}

impl ScoreAccumulator {
    /// Score one message with the injected strategies and fold the result.
    pub fn fold(
        &mut self,
        msg: &NormalizedMessage,
        scorer: &dyn SentimentScorer,
        detector: &dyn LanguageDetector,
    ) {
        let text = msg.searchable_text();

        let sentiment = match scorer.score_sentiment(&text) {
            Ok(s) => s,
            Err(e) => {
                debug!(uid = %msg.uid, error = %e, "Sentiment scorer failed, using neutral");
                Sentiment::Neutral
            }
        };
        let language = match detector.detect_language(&text) {
            Ok(code) if !code.is_empty() => code,
            Ok(_) => UNKNOWN_LANGUAGE.to_string(),
            Err(e) => {
                debug!(uid = %msg.uid, error = %e, "Language detector failed, using unknown");
                UNKNOWN_LANGUAGE.to_string()
            }
        };

        let idx = match sentiment {
            Sentiment::VeryNegative => 0,
            Sentiment::Negative => 1,
            Sentiment::Neutral => 2,
            Sentiment::Positive => 3,
            Sentiment::VeryPositive => 4,
        };
        self.counts[idx] += 1;
        self.score_sum += sentiment.score();
        self.scored += 1;

        let order = self.next_seen;
        self.next_seen += 1;

        let sender = self
            .by_sender
            .entry(msg.from.normalized())
            .or_insert((0.0, 0, order));
        sender.0 += sentiment.score();
        sender.1 += 1;

        if let Some(date) = msg.date {
            use chrono::Timelike;
            let p = period_of_day(date.hour());
            self.by_period[p].0 += sentiment.score();
            self.by_period[p].1 += 1;
        }

        let lang = self.languages.entry(language).or_insert((0, order));
        lang.0 += 1;
    }

    pub fn finish(self) -> (SentimentReport, LanguageReport) {
        let mut senders: Vec<(String, (f64, u64, u64))> = self.by_sender.into_iter().collect();
        senders.sort_by(|a, b| b.1 .1.cmp(&a.1 .1).then(a.1 .2.cmp(&b.1 .2)));

        let sentiment = SentimentReport {
            very_negative: self.counts[0],
            negative: self.counts[1],
            neutral: self.counts[2],
            positive: self.counts[3],
            very_positive: self.counts[4],
            average_score: if self.scored == 0 {
                0.0
            } else {
                self.score_sum / self.scored as f64
            },
            by_sender: senders
                .into_iter()
                .map(|(address, (sum, n, _))| SenderScore {
                    address,
                    mean_score: sum / n as f64,
                    samples: n,
                })
                .collect(),
            by_period: PERIOD_LABELS
                .iter()
                .zip(self.by_period)
                .map(|(label, (sum, n))| PeriodScore {
                    label: (*label).to_string(),
                    mean_score: if n == 0 { 0.0 } else { sum / n as f64 },
                    samples: n,
                })
                .collect(),
        };

        let mut langs: Vec<(String, (u64, u64))> = self.languages.into_iter().collect();
        langs.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        let primary = langs
            .first()
            .map(|(code, _)| code.clone())
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());
        let confidence = match (langs.first(), self.scored) {
            (Some((_, (count, _))), total) if total > 0 => *count as f64 / total as f64,
            _ => 0.0,
        };

        let language = LanguageReport {
            languages: langs
                .into_iter()
                .map(|(code, (count, _))| BucketCount::new(code, count))
                .collect(),
            primary_language: primary,
            confidence,
        };

        (sentiment, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;
    use chrono::{TimeZone, Utc};

    struct FailingScorer;

    impl SentimentScorer for FailingScorer {
        fn score_sentiment(&self, _text: &str) -> ScoreResult<Sentiment> {
            Err("model unavailable".into())
        }
    }

    impl LanguageDetector for FailingScorer {
        fn detect_language(&self, _text: &str) -> ScoreResult<String> {
            Err("model unavailable".into())
        }
    }

    fn msg(from: &str, body: &str, hour: u32) -> NormalizedMessage {
        NormalizedMessage {
            uid: "u".into(),
            from: EmailAddress::parse(from),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            date: Some(Utc.with_ymd_and_hms(2024, 1, 4, hour, 0, 0).unwrap()),
            subject: String::new(),
            body: body.into(),
            size: 0,
            attachments: Vec::new(),
            message_id: String::new(),
            in_reply_to: None,
            references: Vec::new(),
            is_read: false,
        }
    }

    #[test]
    fn test_lexicon_scorer_categories() {
        let scorer = LexiconScorer;
        assert_eq!(
            scorer.score_sentiment("thanks, great work, love it").unwrap(),
            Sentiment::VeryPositive
        );
        assert_eq!(
            scorer.score_sentiment("this is a problem").unwrap(),
            Sentiment::Negative
        );
        assert_eq!(
            scorer.score_sentiment("the meeting is at noon").unwrap(),
            Sentiment::Neutral
        );
        assert_eq!(
            scorer
                .score_sentiment("terrible awful error, so sorry")
                .unwrap(),
            Sentiment::VeryNegative
        );
    }

    #[test]
    fn test_marker_language_detector() {
        let det = MarkerLanguageDetector;
        assert_eq!(
            det.detect_language("the report and the numbers for you").unwrap(),
            "en"
        );
        assert_eq!(
            det.detect_language("las cifras que pediste para el informe").unwrap(),
            "es"
        );
        assert_eq!(det.detect_language("ok").unwrap(), UNKNOWN_LANGUAGE);
    }

    #[test]
    fn test_failing_scorer_degrades_to_neutral_unknown() {
        let mut acc = ScoreAccumulator::default();
        acc.fold(&msg("a@x.com", "great stuff", 10), &FailingScorer, &FailingScorer);
        let (sentiment, language) = acc.finish();
        assert_eq!(sentiment.neutral, 1);
        assert_eq!(sentiment.very_positive, 0);
        assert_eq!(language.primary_language, UNKNOWN_LANGUAGE);
    }

    #[test]
    fn test_distribution_counts_conserve_total() {
        let mut acc = ScoreAccumulator::default();
        acc.fold(&msg("a@x.com", "thanks, great", 10), &LexiconScorer, &NeutralScorer);
        acc.fold(&msg("b@y.com", "big problem here", 13), &LexiconScorer, &NeutralScorer);
        acc.fold(&msg("a@x.com", "see you at noon", 18), &LexiconScorer, &NeutralScorer);
        let (sentiment, language) = acc.finish();
        let total = sentiment.very_negative
            + sentiment.negative
            + sentiment.neutral
            + sentiment.positive
            + sentiment.very_positive;
        assert_eq!(total, 3);
        assert_eq!(sentiment.by_sender[0].address, "a@x.com");
        assert_eq!(sentiment.by_sender[0].samples, 2);
        assert_eq!(language.languages[0].count, 3);
    }

    #[test]
    fn test_primary_language_is_mode() {
        let mut acc = ScoreAccumulator::default();
        acc.fold(
            &msg("a@x.com", "the report and the numbers for you", 10),
            &NeutralScorer,
            &MarkerLanguageDetector,
        );
        acc.fold(
            &msg("b@y.com", "que pediste para los informes", 11),
            &NeutralScorer,
            &MarkerLanguageDetector,
        );
        acc.fold(
            &msg("a@x.com", "the agenda and the minutes for this call", 12),
            &NeutralScorer,
            &MarkerLanguageDetector,
        );
        let (_, language) = acc.finish();
        assert_eq!(language.primary_language, "en");
        assert!((language.confidence - 2.0 / 3.0).abs() < 1e-9);
    }
}
