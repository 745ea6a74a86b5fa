//! Raw and normalized message records.

use chrono::{DateTime, Utc};

use super::address::EmailAddress;

/// A message as handed over by the mailbox collaborator, before parsing.
///
/// The source is expected to deliver the full RFC 822 message bytes; the
/// normalizer does the rest. `declared_size` is the size reported by the
/// provider (IMAP `RFC822.SIZE`), used when it differs from `raw.len()`.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Provider-assigned identifier, unique within one fetch.
    pub uid: String,
    /// Full raw message bytes (headers + body).
    pub raw: Vec<u8>,
    /// Provider flags (`\Seen`, `\Flagged`, ...).
    pub flags: Vec<String>,
    /// Size as declared by the provider, if any.
    pub declared_size: Option<u64>,
}

/// Canonical in-memory record for one message.
///
/// Immutable once built; owned by the pipeline run that produced it and
/// dropped as soon as its aggregates are folded. The report never retains
/// per-message data.
#[derive(Debug, Clone)]
pub struct NormalizedMessage {
    /// Identifier unique within the job (carried over from the raw uid).
    pub uid: String,
    /// Sender; `EmailAddress::unknown()` when the From header is absent
    /// or unparseable.
    pub from: EmailAddress,
    /// Primary recipients.
    pub to: Vec<EmailAddress>,
    /// Carbon-copy recipients.
    pub cc: Vec<EmailAddress>,
    /// Blind-carbon-copy recipients (rarely present in fetched mail).
    pub bcc: Vec<EmailAddress>,
    /// UTC timestamp. `None` when the Date header is missing or
    /// unparseable; such messages bucket to "unknown" and are excluded
    /// from date-range computation.
    pub date: Option<DateTime<Utc>>,
    /// Decoded subject line.
    pub subject: String,
    /// Plain-text body (possibly stripped from HTML).
    pub body: String,
    /// Message size in bytes.
    pub size: u64,
    /// Attachment descriptors; empty when attachment parsing is disabled.
    pub attachments: Vec<AttachmentDescriptor>,
    /// The `Message-ID` header value, normalized (no angle brackets).
    pub message_id: String,
    /// The `In-Reply-To` header value, normalized.
    pub in_reply_to: Option<String>,
    /// Message-IDs from the `References` header, normalized, oldest first.
    pub references: Vec<String>,
    /// Whether the provider marked the message as read.
    pub is_read: bool,
}

impl NormalizedMessage {
    /// Subject and body joined, the input for keyword and sentiment scoring.
    pub fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(self.subject.len() + self.body.len() + 1);
        text.push_str(&self.subject);
        text.push(' ');
        text.push_str(&self.body);
        text
    }
}

/// Metadata about one attachment. Content is never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    /// Filename; synthesized (`attachment_N`) when the part has none.
    pub filename: String,
    /// MIME content type (e.g. `"application/pdf"`).
    pub content_type: String,
    /// Decoded size in bytes.
    pub size: u64,
}
