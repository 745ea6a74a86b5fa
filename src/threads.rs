//! Conversation-thread reconstruction and response-time statistics.
//!
//! Messages are grouped by `Message-ID` / `In-Reply-To` / `References`
//! linkage, with a normalized-subject fallback for mail that carries no
//! linkage headers. Unlike the commutative metric accumulators, folding
//! here is order-dependent: the builder must observe messages in delivery
//! order and finalizes only once the stream ends.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::message::NormalizedMessage;
use crate::model::report::{
    BucketCount, ResponseTimeReport, ThreadReport, ThreadTopic,
};

/// Latency histogram bucket labels, in order.
const LATENCY_LABELS: [&str; 5] = ["<1h", "1-4h", "4-24h", "1-7d", ">7d"];

#[derive(Debug, Clone)]
struct ThreadMember {
    uid: String,
    sender: String,
    date: Option<DateTime<Utc>>,
    arrival: u64,
}

#[derive(Debug, Default)]
struct ThreadSlot {
    members: Vec<ThreadMember>,
    subject: String,
    /// Set when this slot was merged into another; follow to resolve.
    merged_into: Option<usize>,
}

/// Incremental thread builder.
#[derive(Debug, Default)]
pub struct ThreadBuilder {
    slots: Vec<ThreadSlot>,
    /// Message-ID (normalized) → slot index.
    by_id: HashMap<String, usize>,
    /// Normalized subject → slot index, for linkage-free mail.
    by_subject: HashMap<String, usize>,
    arrivals: u64,
}

impl ThreadBuilder {
    /// Fold one message, in delivery order.
    pub fn fold(&mut self, msg: &NormalizedMessage) {
        let arrival = self.arrivals;
        self.arrivals += 1;

        let mut linkage: Vec<&str> = msg
            .references
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(reply_to) = msg.in_reply_to.as_deref() {
            if !reply_to.is_empty() && !linkage.contains(&reply_to) {
                linkage.push(reply_to);
            }
        }

        // Every known id among the linkage set votes for a slot; distinct
        // slots get unioned, which handles reference chains split across
        // earlier messages.
        let mut hits: Vec<usize> = linkage
            .iter()
            .filter_map(|id| self.by_id.get(*id).copied())
            .map(|s| self.resolve(s))
            .collect();
        hits.sort_unstable();
        hits.dedup();

        let subject_key = normalize_subject(&msg.subject);

        let slot = match hits.split_first() {
            Some((&first, rest)) => {
                let mut target = first;
                for &other in rest {
                    target = self.merge(target, other);
                }
                target
            }
            None if linkage.is_empty() && !subject_key.is_empty() => {
                match self.by_subject.get(&subject_key).copied() {
                    Some(s) => self.resolve(s),
                    None => self.new_slot(&subject_key),
                }
            }
            None => self.new_slot(&subject_key),
        };

        if !msg.message_id.is_empty() {
            self.by_id.insert(msg.message_id.clone(), slot);
        }
        for id in linkage {
            self.by_id.entry(id.to_string()).or_insert(slot);
        }

        let s = &mut self.slots[slot];
        if s.subject.is_empty() {
            s.subject = subject_key;
        }
        s.members.push(ThreadMember {
            uid: msg.uid.clone(),
            sender: msg.from.normalized(),
            date: msg.date,
            arrival,
        });
    }

    fn new_slot(&mut self, subject_key: &str) -> usize {
        let idx = self.slots.len();
        self.slots.push(ThreadSlot {
            subject: subject_key.to_string(),
            ..ThreadSlot::default()
        });
        if !subject_key.is_empty() {
            self.by_subject.entry(subject_key.to_string()).or_insert(idx);
        }
        idx
    }

    /// Follow `merged_into` links to the live slot.
    fn resolve(&self, mut idx: usize) -> usize {
        while let Some(next) = self.slots[idx].merged_into {
            idx = next;
        }
        idx
    }

    /// Union two live slots; the older (lower index) one survives.
    fn merge(&mut self, a: usize, b: usize) -> usize {
        if a == b {
            return a;
        }
        let (keep, drop) = if a < b { (a, b) } else { (b, a) };
        let mut moved = std::mem::take(&mut self.slots[drop].members);
        self.slots[keep].members.append(&mut moved);
        if self.slots[keep].subject.is_empty() {
            self.slots[keep].subject = std::mem::take(&mut self.slots[drop].subject);
        }
        self.slots[drop].merged_into = Some(keep);
        keep
    }

    /// Message uids per thread, for partition checks.
    pub fn partitions(&self) -> Vec<Vec<String>> {
        self.slots
            .iter()
            .filter(|s| s.merged_into.is_none() && !s.members.is_empty())
            .map(|s| s.members.iter().map(|m| m.uid.clone()).collect())
            .collect()
    }

    /// Finalize: sort each thread chronologically, compute lengths and
    /// inter-message gaps. Response time is measured only between adjacent
    /// messages from *different* senders; same-sender follow-ups are not
    /// responses.
    pub fn finish(mut self, top_n: usize) -> (ThreadReport, ResponseTimeReport) {
        let mut lengths: Vec<u64> = Vec::new();
        let mut topics: Vec<(ThreadTopic, usize)> = Vec::new();
        let mut gaps_hours: Vec<f64> = Vec::new();

        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.merged_into.is_some() || slot.members.is_empty() {
                continue;
            }

            // Undated messages keep their arrival position at the front of
            // the timeline; gaps are only taken where both ends are dated.
            slot.members
                .sort_by_key(|m| (m.date.unwrap_or(DateTime::<Utc>::MIN_UTC), m.arrival));

            let len = slot.members.len() as u64;
            lengths.push(len);

            for pair in slot.members.windows(2) {
                if pair[0].sender == pair[1].sender {
                    continue;
                }
                if let (Some(a), Some(b)) = (pair[0].date, pair[1].date) {
                    gaps_hours.push((b - a).num_seconds().max(0) as f64 / 3600.0);
                }
            }

            if len > 1 {
                let dated: Vec<DateTime<Utc>> =
                    slot.members.iter().filter_map(|m| m.date).collect();
                topics.push((
                    ThreadTopic {
                        subject: slot.subject.clone(),
                        length: len,
                        first_date: dated.first().copied(),
                        last_date: dated.last().copied(),
                    },
                    idx,
                ));
            }
        }

        let total_threads = lengths.len() as u64;
        let multi = topics.len() as u64;
        let longest = lengths.iter().copied().max().unwrap_or(0);
        let average = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<u64>() as f64 / lengths.len() as f64
        };

        topics.sort_by(|a, b| b.0.length.cmp(&a.0.length).then(a.1.cmp(&b.1)));
        topics.truncate(top_n);

        let thread_report = ThreadReport {
            total_threads,
            multi_message_threads: multi,
            average_thread_length: average,
            longest_thread: longest,
            top_topics: topics.into_iter().map(|(t, _)| t).collect(),
        };

        (thread_report, response_report(&gaps_hours))
    }
}

fn response_report(gaps_hours: &[f64]) -> ResponseTimeReport {
    let mut histogram = [0u64; 5];
    for &h in gaps_hours {
        let bucket = if h < 1.0 {
            0
        } else if h < 4.0 {
            1
        } else if h < 24.0 {
            2
        } else if h < 24.0 * 7.0 {
            3
        } else {
            4
        };
        histogram[bucket] += 1;
    }

    let samples = gaps_hours.len() as u64;
    ResponseTimeReport {
        samples,
        mean_hours: if samples == 0 {
            0.0
        } else {
            gaps_hours.iter().sum::<f64>() / samples as f64
        },
        min_hours: if samples == 0 {
            0.0
        } else {
            gaps_hours.iter().copied().fold(f64::INFINITY, f64::min)
        },
        max_hours: gaps_hours.iter().copied().fold(0.0, f64::max),
        histogram: LATENCY_LABELS
            .iter()
            .zip(histogram)
            .map(|(label, count)| BucketCount::new(*label, count))
            .collect(),
    }
}

/// Normalize a subject for grouping: repeatedly strip `Re:`/`Fwd:`/`Fw:`
/// prefixes, trim, case-fold. Localized prefixes are deliberately not
/// handled; the fixtures pin this behavior.
pub fn normalize_subject(subject: &str) -> String {
    let mut s = subject.trim();
    loop {
        let lower = s.to_lowercase();
        let stripped = if lower.starts_with("re:") {
            &s[3..]
        } else if lower.starts_with("fwd:") {
            &s[4..]
        } else if lower.starts_with("fw:") {
            &s[3..]
        } else {
            break;
        };
        s = stripped.trim_start();
    }
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;
    use chrono::TimeZone;

    fn msg(
        uid: &str,
        from: &str,
        subject: &str,
        message_id: &str,
        in_reply_to: Option<&str>,
        references: Vec<&str>,
        hour: u32,
    ) -> NormalizedMessage {
        NormalizedMessage {
            uid: uid.into(),
            from: EmailAddress::parse(from),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            date: Some(Utc.with_ymd_and_hms(2024, 1, 4, hour, 0, 0).unwrap()),
            subject: subject.into(),
            body: String::new(),
            size: 100,
            attachments: Vec::new(),
            message_id: message_id.into(),
            in_reply_to: in_reply_to.map(String::from),
            references: references.into_iter().map(String::from).collect(),
            is_read: false,
        }
    }

    #[test]
    fn test_normalize_subject() {
        assert_eq!(normalize_subject("Hello"), "hello");
        assert_eq!(normalize_subject("Re: Hello"), "hello");
        assert_eq!(normalize_subject("RE: re: Hello"), "hello");
        assert_eq!(normalize_subject("Fwd: FW: Hello"), "hello");
        assert_eq!(normalize_subject("  Re:   spaced  "), "spaced");
        // Localized prefixes are not stripped.
        assert_eq!(normalize_subject("AW: Hello"), "aw: hello");
    }

    #[test]
    fn test_linkage_chain_builds_one_thread() {
        let mut builder = ThreadBuilder::default();
        builder.fold(&msg("1", "a@x.com", "Topic", "m1", None, vec![], 10));
        builder.fold(&msg("2", "b@y.com", "Re: Topic", "m2", Some("m1"), vec!["m1"], 11));
        builder.fold(&msg("3", "c@z.com", "Re: Topic", "m3", Some("m2"), vec!["m1", "m2"], 12));
        let (threads, _) = builder.finish(10);
        assert_eq!(threads.total_threads, 1);
        assert_eq!(threads.longest_thread, 3);
    }

    #[test]
    fn test_reference_hit_merges_threads() {
        let mut builder = ThreadBuilder::default();
        // Two replies arrive before we learn they share a root.
        builder.fold(&msg("1", "a@x.com", "Re: T", "m2", Some("m1"), vec!["m1"], 10));
        builder.fold(&msg("2", "b@y.com", "Other", "m9", Some("m8"), vec!["m8"], 11));
        builder.fold(&msg("3", "c@z.com", "Re: T", "m3", None, vec!["m1", "m8"], 12));
        let (threads, _) = builder.finish(10);
        assert_eq!(threads.total_threads, 1);
        assert_eq!(threads.longest_thread, 3);
    }

    #[test]
    fn test_subject_fallback_groups_linkage_free_mail() {
        let mut builder = ThreadBuilder::default();
        builder.fold(&msg("1", "a@x.com", "Meeting", "", None, vec![], 10));
        builder.fold(&msg("2", "b@y.com", "Re: Meeting", "", None, vec![], 11));
        builder.fold(&msg("3", "c@z.com", "Unrelated", "", None, vec![], 12));
        let (threads, _) = builder.finish(10);
        assert_eq!(threads.total_threads, 2);
        assert_eq!(threads.longest_thread, 2);
        assert_eq!(threads.top_topics[0].subject, "meeting");
    }

    #[test]
    fn test_partition_covers_every_message_once() {
        let mut builder = ThreadBuilder::default();
        builder.fold(&msg("1", "a@x.com", "A", "m1", None, vec![], 10));
        builder.fold(&msg("2", "b@y.com", "Re: A", "m2", Some("m1"), vec!["m1"], 11));
        builder.fold(&msg("3", "c@z.com", "B", "m3", None, vec![], 12));
        let partitions = builder.partitions();
        let mut all: Vec<String> = partitions.into_iter().flatten().collect();
        all.sort();
        assert_eq!(all, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_response_time_only_across_sender_changes() {
        let mut builder = ThreadBuilder::default();
        builder.fold(&msg("1", "a@x.com", "T", "m1", None, vec![], 10));
        builder.fold(&msg("2", "a@x.com", "Re: T", "m2", Some("m1"), vec!["m1"], 11));
        builder.fold(&msg("3", "a@x.com", "Re: T", "m3", Some("m2"), vec!["m2"], 12));
        let (_, responses) = builder.finish(10);
        // All one sender: no response samples at all.
        assert_eq!(responses.samples, 0);
        assert_eq!(responses.mean_hours, 0.0);
    }

    #[test]
    fn test_response_time_gaps() {
        let mut builder = ThreadBuilder::default();
        builder.fold(&msg("1", "a@x.com", "T", "m1", None, vec![], 10));
        builder.fold(&msg("2", "b@y.com", "Re: T", "m2", Some("m1"), vec!["m1"], 12));
        let (_, responses) = builder.finish(10);
        assert_eq!(responses.samples, 1);
        assert!((responses.mean_hours - 2.0).abs() < 1e-9);
        assert_eq!(responses.histogram[1].label, "1-4h");
        assert_eq!(responses.histogram[1].count, 1);
    }

    #[test]
    fn test_histogram_counts_conserve_samples() {
        let report = response_report(&[0.5, 2.0, 10.0, 48.0, 400.0]);
        assert_eq!(report.samples, 5);
        assert_eq!(
            report.histogram.iter().map(|b| b.count).sum::<u64>(),
            5
        );
        assert!((report.min_hours - 0.5).abs() < 1e-9);
        assert!((report.max_hours - 400.0).abs() < 1e-9);
    }
}
