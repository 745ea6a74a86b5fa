//! The mailbox collaborator interface.
//!
//! Connection, authentication, and pagination live outside this crate; a
//! [`MessageSource`] is what the orchestrator sees: a lazy, finite,
//! single-pass stream of raw messages for one folder. Two implementations
//! ship here: [`MemorySource`] for tests and benches, and [`MboxSource`]
//! so the CLI can analyze a local mbox file without a live mailbox.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{AnalyzerError, Result};
use crate::model::message::RawMessage;

/// A lazy stream of raw messages. Mid-stream items may be errors, which
/// the orchestrator treats as fatal to the job.
pub type MessageStream = Box<dyn Iterator<Item = Result<RawMessage>> + Send>;

/// An already-authenticated mailbox able to hand over message streams.
pub trait MessageSource: Send {
    /// Open `folder` and return at most `limit` messages.
    ///
    /// Failure to open (unknown folder, dropped connection) is fatal to
    /// the job that requested the stream.
    fn open(&self, folder: &str, limit: usize) -> Result<MessageStream>;
}

// ── In-memory source ────────────────────────────────────────────

/// Source backed by a pre-built message list.
///
/// `fail_after` injects a mid-stream read error after N successful
/// messages, for exercising the orchestrator's fatal-error path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    messages: Vec<RawMessage>,
    fail_open: bool,
    fail_after: Option<usize>,
}

impl MemorySource {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            messages,
            fail_open: false,
            fail_after: None,
        }
    }

    /// Make `open` fail as if the folder did not exist.
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Inject a stream error after `n` delivered messages.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

impl MessageSource for MemorySource {
    fn open(&self, folder: &str, limit: usize) -> Result<MessageStream> {
        if self.fail_open {
            return Err(AnalyzerError::SourceOpen {
                folder: folder.to_string(),
                reason: "folder does not exist".to_string(),
            });
        }

        let fail_after = self.fail_after;
        let iter = self
            .messages
            .iter()
            .take(limit)
            .cloned()
            .enumerate()
            .map(move |(i, msg)| match fail_after {
                Some(n) if i >= n => Err(AnalyzerError::SourceRead {
                    processed: n as u64,
                    reason: "connection dropped".to_string(),
                }),
                _ => Ok(msg),
            });
        // Collect up front: the backing Vec is already in memory and this
        // keeps the iterator 'static without borrowing self.
        let items: Vec<_> = iter.collect();
        Ok(Box::new(items.into_iter()))
    }
}

// ── MBOX file source ────────────────────────────────────────────

/// Source that splits a local mbox file into raw messages.
///
/// The folder argument is ignored; an mbox file is a single folder. Good
/// enough for the CLI and fixtures — streaming multi-gigabyte archives is
/// not a goal here.
#[derive(Debug, Clone)]
pub struct MboxSource {
    path: PathBuf,
}

impl MboxSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MessageSource for MboxSource {
    fn open(&self, _folder: &str, limit: usize) -> Result<MessageStream> {
        let data = std::fs::read(&self.path).map_err(|e| AnalyzerError::io(&self.path, e))?;
        let messages = split_mbox(&data, limit);
        debug!(path = %self.path.display(), count = messages.len(), "Opened mbox source");
        if messages.is_empty() {
            return Err(AnalyzerError::SourceOpen {
                folder: self.path.display().to_string(),
                reason: "no messages found (not an mbox file?)".to_string(),
            });
        }
        Ok(Box::new(messages.into_iter().map(Ok)))
    }
}

/// Split mbox bytes on `From ` separator lines into raw messages.
///
/// The separator line itself is not part of the message; `mail-parser`
/// would otherwise treat it as a malformed header.
fn split_mbox(data: &[u8], limit: usize) -> Vec<RawMessage> {
    let mut messages = Vec::new();
    let mut start: Option<usize> = None;
    let mut pos = 0;

    while pos < data.len() {
        let line_end = data[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i + 1)
            .unwrap_or(data.len());

        if data[pos..].starts_with(b"From ") {
            if let Some(s) = start {
                push_message(&mut messages, &data[s..pos]);
                if messages.len() >= limit {
                    return messages;
                }
            }
            start = Some(line_end);
        } else if start.is_none() && pos == 0 {
            // No leading separator: treat the whole file as one message
            // region starting at 0 (some exports omit the first line).
            start = Some(0);
        }

        pos = line_end;
    }

    if let Some(s) = start {
        if messages.len() < limit {
            push_message(&mut messages, &data[s..]);
        }
    }

    messages
}

fn push_message(messages: &mut Vec<RawMessage>, raw: &[u8]) {
    let trimmed: &[u8] = {
        let mut end = raw.len();
        while end > 0 && (raw[end - 1] == b'\n' || raw[end - 1] == b'\r') {
            end -= 1;
        }
        &raw[..end]
    };
    if trimmed.is_empty() {
        return;
    }
    messages.push(RawMessage {
        uid: format!("{}", messages.len() + 1),
        raw: trimmed.to_vec(),
        flags: Vec::new(),
        declared_size: Some(trimmed.len() as u64),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"From alice@example.com Thu Jan  4 10:00:00 2024\n\
From: Alice <alice@example.com>\n\
Subject: Hello\n\
\n\
Body one.\n\
From bob@example.com Thu Jan  4 11:00:00 2024\n\
From: Bob <bob@example.com>\n\
Subject: Re: Hello\n\
\n\
Body two.\n";

    #[test]
    fn test_split_mbox_two_messages() {
        let msgs = split_mbox(SAMPLE, 100);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].raw.starts_with(b"From: Alice"));
        assert!(msgs[1].raw.starts_with(b"From: Bob"));
        assert_eq!(msgs[0].uid, "1");
        assert_eq!(msgs[1].uid, "2");
    }

    #[test]
    fn test_split_mbox_respects_limit() {
        let msgs = split_mbox(SAMPLE, 1);
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn test_split_mbox_without_leading_separator() {
        let msgs = split_mbox(b"From: x@y.com\nSubject: S\n\nhi\n", 10);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].raw.starts_with(b"From: x@y.com"));
    }

    #[test]
    fn test_memory_source_failing_open() {
        let src = MemorySource::failing_open();
        assert!(src.open("INBOX", 10).is_err());
    }

    #[test]
    fn test_memory_source_fail_after() {
        let raw = RawMessage {
            uid: "1".into(),
            raw: b"Subject: x\n\nbody".to_vec(),
            flags: Vec::new(),
            declared_size: None,
        };
        let src = MemorySource::new(vec![raw.clone(), raw.clone(), raw]).fail_after(2);
        let items: Vec<_> = src.open("INBOX", 10).unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert!(items[2].is_err());
    }
}
