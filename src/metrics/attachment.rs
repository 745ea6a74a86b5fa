//! Attachment counts and sizes per content type.

use std::collections::HashMap;

use crate::model::message::NormalizedMessage;
use crate::model::report::{AttachmentReport, AttachmentTypeStats};

use super::{percentage, rank_top, Accumulator};

#[derive(Debug, Default)]
pub struct AttachmentAccumulator {
    by_type: HashMap<String, (u64, u64, u64)>, // count, total_size, first_seen
    total_attachments: u64,
    total_size: u64,
    messages_with_attachments: u64,
    next_seen: u64,
}

impl Accumulator for AttachmentAccumulator {
    fn fold(&mut self, msg: &NormalizedMessage) {
        if msg.attachments.is_empty() {
            return;
        }
        self.messages_with_attachments += 1;
        for att in &msg.attachments {
            self.total_attachments += 1;
            self.total_size += att.size;
            let order = self.next_seen;
            self.next_seen += 1;
            let entry = self
                .by_type
                .entry(att.content_type.clone())
                .or_insert((0, 0, order));
            entry.0 += 1;
            entry.1 += att.size;
        }
    }
}

impl AttachmentAccumulator {
    /// `total_messages` is the job's processed count, needed for the rate.
    pub fn finish(self, total_messages: u64, top_n: usize) -> AttachmentReport {
        let mut entries: Vec<(String, (u64, u64, u64))> = self.by_type.into_iter().collect();
        rank_top(&mut entries, |e| e.1 .0, |e| e.1 .2);
        entries.truncate(top_n);

        AttachmentReport {
            total_attachments: self.total_attachments,
            total_size_bytes: self.total_size,
            messages_with_attachments: self.messages_with_attachments,
            attachment_rate: percentage(self.messages_with_attachments, total_messages),
            by_type: entries
                .into_iter()
                .map(|(content_type, (count, total_size_bytes, _))| AttachmentTypeStats {
                    content_type,
                    count,
                    total_size_bytes,
                })
                .collect(),
        }
    }
}
