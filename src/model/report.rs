//! The final, immutable analysis report.
//!
//! Every field is produced exactly once by the report assembler after the
//! message stream is exhausted. All types serialize to JSON with stable
//! key and element ordering so identical inputs yield identical output.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Terminal aggregate of one completed analysis job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Total messages folded into the report.
    pub total_messages: u64,
    /// Oldest/newest message dates; `None` when no message had a
    /// parseable date.
    pub date_range: Option<DateRange>,
    /// Sum of all message sizes in bytes.
    pub total_size_bytes: u64,
    /// Senders by descending count, earliest-seen wins ties.
    pub top_senders: Vec<SenderStats>,
    pub activity: TimeActivity,
    pub attachments: AttachmentReport,
    pub sentiment: SentimentReport,
    pub threads: ThreadReport,
    pub domains: DomainReport,
    pub keywords: KeywordReport,
    pub response_times: ResponseTimeReport,
    pub sizes: SizeDistribution,
    pub languages: LanguageReport,
    /// When the job producing this report was created.
    pub created_at: DateTime<Utc>,
    /// Wall-clock duration of the pipeline run.
    pub processing_seconds: f64,
}

/// Oldest and newest parseable message dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// A labelled counter, used for weekday/month/period/histogram buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub label: String,
    pub count: u64,
}

impl BucketCount {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Per-sender aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenderStats {
    /// Lower-cased address.
    pub address: String,
    /// Display name as first seen in the stream.
    pub display_name: String,
    pub count: u64,
    /// Share of the total message count, 0–100.
    pub percentage: f64,
    pub total_size_bytes: u64,
    pub average_size_bytes: f64,
}

/// Temporal activity breakdowns, all derived from UTC timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeActivity {
    /// Message count per hour of day; index 0 = 00:00–00:59 UTC.
    pub hourly: Vec<u64>,
    /// Messages whose date could not be parsed. These are deliberately
    /// kept out of `hourly` so they do not masquerade as midnight mail.
    pub unknown_dates: u64,
    /// Monday through Sunday, in calendar order.
    pub weekdays: Vec<BucketCount>,
    /// Calendar months (`"2024-03"`), ascending.
    pub months: Vec<BucketCount>,
    /// Coarse periods of day: Morning (6–12), Afternoon (12–17),
    /// Evening (17–22), Night (22–6).
    pub periods: Vec<BucketCount>,
}

/// Attachment aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentReport {
    pub total_attachments: u64,
    pub total_size_bytes: u64,
    pub messages_with_attachments: u64,
    /// Share of messages carrying at least one attachment, 0–100.
    pub attachment_rate: f64,
    /// Content types by descending count.
    pub by_type: Vec<AttachmentTypeStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentTypeStats {
    pub content_type: String,
    pub count: u64,
    pub total_size_bytes: u64,
}

/// Sentiment distribution over the five categories plus breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentReport {
    pub very_positive: u64,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
    pub very_negative: u64,
    /// Mean numeric score over all messages (-2 .. 2).
    pub average_score: f64,
    /// Mean score per sender address, descending sample count.
    pub by_sender: Vec<SenderScore>,
    /// Mean score per period of day, fixed order.
    pub by_period: Vec<PeriodScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenderScore {
    pub address: String,
    pub mean_score: f64,
    pub samples: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodScore {
    pub label: String,
    pub mean_score: f64,
    pub samples: u64,
}

/// Conversation-thread aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadReport {
    /// Every thread, including single-message ones.
    pub total_threads: u64,
    /// Threads with more than one message.
    pub multi_message_threads: u64,
    pub average_thread_length: f64,
    pub longest_thread: u64,
    /// Largest conversations by message count.
    pub top_topics: Vec<ThreadTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadTopic {
    /// Normalized subject of the conversation.
    pub subject: String,
    pub length: u64,
    pub first_date: Option<DateTime<Utc>>,
    pub last_date: Option<DateTime<Utc>>,
}

/// Sender-domain aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainReport {
    pub top_domains: Vec<DomainStats>,
    pub distinct_domains: u64,
    /// Distinct domains divided by total messages.
    pub diversity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStats {
    pub domain: String,
    pub count: u64,
    pub percentage: f64,
}

/// Keyword aggregate over subject + body tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordReport {
    pub top_keywords: Vec<KeywordCount>,
    pub distinct_words: u64,
    pub subjects: SubjectStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: u64,
}

/// Subject-line length statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStats {
    pub average_length: f64,
    pub max_length: u64,
    pub min_length: u64,
}

/// Response latency between sender changes inside threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseTimeReport {
    pub samples: u64,
    pub mean_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
    /// Coarse latency histogram: `<1h`, `1-4h`, `4-24h`, `1-7d`, `>7d`.
    pub histogram: Vec<BucketCount>,
}

/// Message size distribution over fixed thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeDistribution {
    /// < 1 KB
    pub small: u64,
    /// 1 KB – 100 KB
    pub medium: u64,
    /// 100 KB – 1 MB
    pub large: u64,
    /// > 1 MB
    pub very_large: u64,
    pub average_bytes: f64,
    pub median_bytes: f64,
}

/// Language mix of the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageReport {
    /// ISO-639-1 code (or `"unknown"`) to message count, descending.
    pub languages: Vec<BucketCount>,
    /// The mode of the distribution; `"unknown"` for an empty corpus.
    pub primary_language: String,
    /// Share of messages in the primary language, 0–1.
    pub confidence: f64,
}
