//! Per-sender counts and sizes.

use std::collections::HashMap;

use crate::model::message::NormalizedMessage;
use crate::model::report::SenderStats;

use super::{percentage, rank_top, Accumulator};

#[derive(Debug, Clone, Default)]
struct SenderEntry {
    display_name: String,
    count: u64,
    total_size: u64,
    first_seen: u64,
}

/// Keyed by lower-cased sender address. The display name is whatever the
/// first message from that address carried.
#[derive(Debug, Default)]
pub struct SenderAccumulator {
    senders: HashMap<String, SenderEntry>,
    folded: u64,
}

impl Accumulator for SenderAccumulator {
    fn fold(&mut self, msg: &NormalizedMessage) {
        let key = msg.from.normalized();
        let order = self.folded;
        self.folded += 1;

        let entry = self.senders.entry(key).or_insert_with(|| SenderEntry {
            display_name: msg.from.display_name.clone(),
            first_seen: order,
            ..SenderEntry::default()
        });
        entry.count += 1;
        entry.total_size += msg.size;
    }
}

impl SenderAccumulator {
    /// Total messages folded; equals the sum of all per-sender counts.
    pub fn total(&self) -> u64 {
        self.folded
    }

    /// Resolve the top-N sender list. Percentages are computed here, from
    /// the final total, never during folding.
    pub fn finish(self, top_n: usize) -> Vec<SenderStats> {
        let total = self.folded;
        let mut entries: Vec<(String, SenderEntry)> = self.senders.into_iter().collect();
        rank_top(&mut entries, |e| e.1.count, |e| e.1.first_seen);
        entries.truncate(top_n);

        entries
            .into_iter()
            .map(|(address, e)| SenderStats {
                address,
                display_name: e.display_name,
                percentage: percentage(e.count, total),
                average_size_bytes: e.total_size as f64 / e.count as f64,
                count: e.count,
                total_size_bytes: e.total_size,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;

    fn msg(from: &str, name: &str, size: u64) -> NormalizedMessage {
        NormalizedMessage {
            uid: "u".into(),
            from: EmailAddress {
                display_name: name.into(),
                address: from.into(),
            },
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            date: None,
            subject: String::new(),
            body: String::new(),
            size,
            attachments: Vec::new(),
            message_id: String::new(),
            in_reply_to: None,
            references: Vec::new(),
            is_read: false,
        }
    }

    #[test]
    fn test_case_insensitive_keying_and_first_seen_name() {
        let mut acc = SenderAccumulator::default();
        acc.fold(&msg("Alice@X.com", "Alice A", 100));
        acc.fold(&msg("alice@x.com", "Someone Else", 300));
        let stats = acc.finish(10);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].address, "alice@x.com");
        assert_eq!(stats[0].display_name, "Alice A");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].total_size_bytes, 400);
        assert!((stats[0].average_size_bytes - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tie_broken_by_first_seen() {
        let mut acc = SenderAccumulator::default();
        acc.fold(&msg("b@y.com", "", 1));
        acc.fold(&msg("a@x.com", "", 1));
        let stats = acc.finish(10);
        assert_eq!(stats[0].address, "b@y.com");
        assert_eq!(stats[1].address, "a@x.com");
    }

    #[test]
    fn test_counts_sum_to_total() {
        let mut acc = SenderAccumulator::default();
        for i in 0..17 {
            acc.fold(&msg(&format!("s{}@x.com", i % 5), "", 10));
        }
        assert_eq!(acc.total(), 17);
        let stats = acc.finish(100);
        assert_eq!(stats.iter().map(|s| s.count).sum::<u64>(), 17);
    }
}
