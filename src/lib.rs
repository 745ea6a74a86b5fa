//! `mailscope` — turn a mailbox into a statistical report.
//!
//! The core of this crate is a single-pass analysis pipeline: a stream of
//! raw messages from an already-authenticated mailbox is normalized and
//! folded into per-metric accumulators (senders, time activity, domains,
//! sizes, keywords, attachments), a conversation-thread reconstructor,
//! and pluggable sentiment/language scorers. The pipeline runs as a
//! background job with pollable status, cooperative cancellation, and a
//! wall-clock timeout; a finished job yields an immutable
//! [`model::report::AnalysisReport`].

pub mod config;
pub mod error;
pub mod job;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod score;
pub mod source;
pub mod threads;
