//! Message normalization: raw fetched bytes → [`NormalizedMessage`].
//!
//! A pure transform. Malformed sender, date, or linkage headers degrade to
//! sentinel values ("unknown" sender, no date) — one bad message must
//! never fail a whole job.

use chrono::{DateTime, Utc};
use mail_parser::{HeaderValue, MessageParser, MimeHeaders};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::model::address::EmailAddress;
use crate::model::message::{AttachmentDescriptor, NormalizedMessage, RawMessage};

/// Normalize one raw message according to the job's parsing options.
pub fn normalize(raw: &RawMessage, options: &AnalysisConfig) -> NormalizedMessage {
    let size = raw.declared_size.unwrap_or(raw.raw.len() as u64);
    let is_read = raw
        .flags
        .iter()
        .any(|f| f.trim_start_matches('\\').eq_ignore_ascii_case("seen"));

    let parser = MessageParser::default();
    let Some(msg) = parser.parse(&raw.raw) else {
        debug!(uid = %raw.uid, "Unparseable message, using sentinel record");
        return NormalizedMessage {
            uid: raw.uid.clone(),
            from: EmailAddress::unknown(),
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
            is_read,
        };
    };

    let body = msg
        .body_text(0)
        .map(|s| s.into_owned())
        .or_else(|| {
            if options.parse_html_body {
                msg.body_html(0).map(|html| strip_html(&html))
            } else {
                None
            }
        })
        .unwrap_or_default();

    let attachments = if options.include_attachments {
        collect_attachments(&msg)
    } else {
        Vec::new()
    };

    NormalizedMessage {
        uid: raw.uid.clone(),
        from: address_of(msg.from()).unwrap_or_else(EmailAddress::unknown),
        to: address_list(msg.to()),
        cc: address_list(msg.cc()),
        bcc: address_list(msg.bcc()),
        date: convert_date(msg.date()),
        subject: msg.subject().unwrap_or_default().to_string(),
        body,
        size,
        attachments,
        message_id: msg.message_id().map(normalize_msg_id).unwrap_or_default(),
        in_reply_to: header_ids(msg.in_reply_to()).into_iter().next(),
        references: header_ids(msg.references()),
        is_read,
    }
}

/// Strip angle brackets and whitespace from a Message-ID.
pub fn normalize_msg_id(id: &str) -> String {
    id.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_string()
}

fn address_of(addr: Option<&mail_parser::Address<'_>>) -> Option<EmailAddress> {
    let first = addr.and_then(|a| a.first())?;
    let address = first.address().unwrap_or_default().to_string();
    if address.is_empty() {
        return None;
    }
    Some(EmailAddress {
        display_name: first.name().unwrap_or_default().to_string(),
        address,
    })
}

fn address_list(addr: Option<&mail_parser::Address<'_>>) -> Vec<EmailAddress> {
    let Some(addr) = addr else {
        return Vec::new();
    };
    addr.iter()
        .filter_map(|a| {
            let address = a.address()?.to_string();
            Some(EmailAddress {
                display_name: a.name().unwrap_or_default().to_string(),
                address,
            })
        })
        .collect()
}

/// Convert a `mail_parser` date to chrono UTC; `None` on absent or
/// unrepresentable dates.
fn convert_date(date: Option<&mail_parser::DateTime>) -> Option<DateTime<Utc>> {
    let date = date?;
    DateTime::parse_from_rfc3339(&date.to_rfc3339())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Extract normalized Message-IDs from an In-Reply-To / References header.
fn header_ids(value: &HeaderValue) -> Vec<String> {
    match value {
        HeaderValue::Text(t) => t
            .split_whitespace()
            .map(normalize_msg_id)
            .filter(|s| !s.is_empty())
            .collect(),
        HeaderValue::TextList(list) => list
            .iter()
            .map(|t| normalize_msg_id(t))
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn collect_attachments(msg: &mail_parser::Message<'_>) -> Vec<AttachmentDescriptor> {
    msg.attachments()
        .enumerate()
        .map(|(idx, part)| {
            let filename = part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| format!("attachment_{idx}"));

            let content_type = part
                .content_type()
                .map(|ct| {
                    let main = ct.ctype();
                    match ct.subtype() {
                        Some(sub) => format!("{main}/{sub}").to_lowercase(),
                        None => main.to_lowercase(),
                    }
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());

            AttachmentDescriptor {
                filename,
                content_type,
                size: part.contents().len() as u64,
            }
        })
        .collect()
}

/// Crude HTML-to-text: drop tags, decode the handful of entities that
/// matter for keyword and sentiment scoring.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                if in_tag {
                    in_tag = false;
                    out.push(' ');
                } else {
                    out.push(ch);
                }
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(bytes: &[u8]) -> RawMessage {
        RawMessage {
            uid: "u1".to_string(),
            raw: bytes.to_vec(),
            flags: vec!["\\Seen".to_string()],
            declared_size: None,
        }
    }

    const SIMPLE: &[u8] = b"From: Alice Example <Alice@Example.com>\r\n\
To: Bob <bob@other.org>, carol@other.org\r\n\
Date: Thu, 04 Jan 2024 10:30:00 +0000\r\n\
Subject: Quarterly report\r\n\
Message-ID: <m1@example.com>\r\n\
In-Reply-To: <m0@example.com>\r\n\
References: <root@example.com> <m0@example.com>\r\n\
\r\n\
Please find the report attached. Thanks!\r\n";

    #[test]
    fn test_normalize_simple_message() {
        let msg = normalize(&raw(SIMPLE), &AnalysisConfig::default());
        assert_eq!(msg.from.address, "Alice@Example.com");
        assert_eq!(msg.from.display_name, "Alice Example");
        assert_eq!(msg.to.len(), 2);
        assert_eq!(msg.subject, "Quarterly report");
        assert_eq!(msg.message_id, "m1@example.com");
        assert_eq!(msg.in_reply_to.as_deref(), Some("m0@example.com"));
        assert_eq!(msg.references, vec!["root@example.com", "m0@example.com"]);
        assert!(msg.body.contains("report attached"));
        assert!(msg.is_read);

        let date = msg.date.expect("date should parse");
        assert_eq!(date.to_rfc3339(), "2024-01-04T10:30:00+00:00");
    }

    #[test]
    fn test_normalize_missing_sender_and_date() {
        let msg = normalize(
            &raw(b"Subject: orphan\r\n\r\nno headers to speak of\r\n"),
            &AnalysisConfig::default(),
        );
        assert_eq!(msg.from, EmailAddress::unknown());
        assert!(msg.date.is_none());
        assert_eq!(msg.subject, "orphan");
    }

    #[test]
    fn test_normalize_garbage_bytes_never_panics() {
        let msg = normalize(&raw(&[0xff, 0xfe, 0x00, 0x01]), &AnalysisConfig::default());
        assert_eq!(msg.uid, "u1");
        assert_eq!(msg.from, EmailAddress::unknown());
        assert!(msg.date.is_none());
    }

    #[test]
    fn test_unparseable_date_is_none() {
        let msg = normalize(
            &raw(b"From: a@x.com\r\nDate: not a date at all\r\nSubject: s\r\n\r\nbody\r\n"),
            &AnalysisConfig::default(),
        );
        assert!(msg.date.is_none());
    }

    #[test]
    fn test_strip_html() {
        let text = strip_html("<p>Hello <b>world</b> &amp; friends</p>");
        assert_eq!(text, "Hello world & friends");
    }

    #[test]
    fn test_attachments_skipped_when_disabled() {
        let cfg = AnalysisConfig {
            include_attachments: false,
            ..AnalysisConfig::default()
        };
        let msg = normalize(&raw(SIMPLE), &cfg);
        assert!(msg.attachments.is_empty());
    }
}
