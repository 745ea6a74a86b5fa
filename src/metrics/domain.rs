//! Sender-domain distribution.

use std::collections::HashMap;

use crate::model::message::NormalizedMessage;
use crate::model::report::{DomainReport, DomainStats};

use super::{percentage, rank_top, Accumulator};

/// Key used for empty or malformed sender domains.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Keyed by the lower-cased substring after `@` in the sender address.
#[derive(Debug, Default)]
pub struct DomainAccumulator {
    domains: HashMap<String, (u64, u64)>, // count, first_seen
    folded: u64,
}

impl Accumulator for DomainAccumulator {
    fn fold(&mut self, msg: &NormalizedMessage) {
        let key = msg
            .from
            .domain()
            .unwrap_or_else(|| UNKNOWN_DOMAIN.to_string());
        let order = self.folded;
        self.folded += 1;
        let entry = self.domains.entry(key).or_insert((0, order));
        entry.0 += 1;
    }
}

impl DomainAccumulator {
    pub fn finish(self, top_n: usize) -> DomainReport {
        let total = self.folded;
        // The sentinel bucket still appears in the top list, but does not
        // count as a distinct real domain.
        let distinct = self
            .domains
            .keys()
            .filter(|k| k.as_str() != UNKNOWN_DOMAIN)
            .count() as u64;

        let mut entries: Vec<(String, (u64, u64))> = self.domains.into_iter().collect();
        rank_top(&mut entries, |e| e.1 .0, |e| e.1 .1);
        entries.truncate(top_n);

        DomainReport {
            top_domains: entries
                .into_iter()
                .map(|(domain, (count, _))| DomainStats {
                    percentage: percentage(count, total),
                    domain,
                    count,
                })
                .collect(),
            distinct_domains: distinct,
            diversity: if total == 0 {
                0.0
            } else {
                distinct as f64 / total as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;

    fn msg(from: &str) -> NormalizedMessage {
        NormalizedMessage {
            uid: "u".into(),
            from: EmailAddress::parse(from),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            date: None,
            subject: String::new(),
            body: String::new(),
            size: 0,
            attachments: Vec::new(),
            message_id: String::new(),
            in_reply_to: None,
            references: Vec::new(),
            is_read: false,
        }
    }

    #[test]
    fn test_domain_counting_case_folded() {
        let mut acc = DomainAccumulator::default();
        acc.fold(&msg("a@X.com"));
        acc.fold(&msg("b@x.COM"));
        acc.fold(&msg("c@y.org"));
        let report = acc.finish(10);
        assert_eq!(report.top_domains[0].domain, "x.com");
        assert_eq!(report.top_domains[0].count, 2);
        assert_eq!(report.distinct_domains, 2);
        assert!((report.diversity - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_sender_buckets_to_unknown() {
        let mut acc = DomainAccumulator::default();
        acc.fold(&msg("not-an-address"));
        acc.fold(&msg("a@x.com"));
        let report = acc.finish(10);
        let unknown = report
            .top_domains
            .iter()
            .find(|d| d.domain == UNKNOWN_DOMAIN)
            .unwrap();
        assert_eq!(unknown.count, 1);
        assert_eq!(report.distinct_domains, 1);
    }

    #[test]
    fn test_counts_sum_to_total() {
        let mut acc = DomainAccumulator::default();
        for i in 0..9 {
            acc.fold(&msg(&format!("u@d{}.com", i % 3)));
        }
        let report = acc.finish(10);
        assert_eq!(report.top_domains.iter().map(|d| d.count).sum::<u64>(), 9);
    }
}
