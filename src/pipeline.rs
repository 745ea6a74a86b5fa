//! The analysis pipeline: one pass over the message stream.
//!
//! Each message is normalized, then folded into every metric accumulator,
//! the thread builder, and the scorer adapter. Progress is reported at a
//! bounded cadence; cancellation and the job deadline are checked between
//! messages, never mid-message. On stream exhaustion the assembler
//! combines all accumulator states into the final report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AnalyzerError, Result};
use crate::metrics::attachment::AttachmentAccumulator;
use crate::metrics::domain::DomainAccumulator;
use crate::metrics::keyword::KeywordAccumulator;
use crate::metrics::sender::SenderAccumulator;
use crate::metrics::size::SizeAccumulator;
use crate::metrics::time::TimeActivityAccumulator;
use crate::metrics::Accumulator;
use crate::model::report::AnalysisReport;
use crate::normalize::normalize;
use crate::score::{LanguageDetector, ScoreAccumulator, SentimentScorer};
use crate::source::MessageSource;
use crate::threads::ThreadBuilder;

/// Cooperative controls threaded through one pipeline run.
pub struct RunControl<'a> {
    /// Checked between messages; stops fetching when set.
    pub cancel: &'a AtomicBool,
    /// Absolute wall-clock deadline; expiry fails the run.
    pub deadline: Option<Instant>,
    /// Timeout used for the error message when the deadline expires.
    pub timeout_secs: u64,
    /// Progress sink: percent (0–99 until completion) and step label.
    pub progress: Option<&'a (dyn Fn(u8, &str) + Send + Sync)>,
}

impl<'a> RunControl<'a> {
    /// A control with no deadline and no progress sink.
    pub fn unbounded(cancel: &'a AtomicBool) -> Self {
        Self {
            cancel,
            deadline: None,
            timeout_secs: 0,
            progress: None,
        }
    }

    fn report(&self, percent: u8, step: &str) {
        if let Some(progress) = self.progress {
            progress(percent.min(99), step);
        }
    }

    fn check(&self, processed: u64) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            debug!(processed, "Cancellation observed, stopping fetch");
            return Err(AnalyzerError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(AnalyzerError::Timeout(self.timeout_secs));
            }
        }
        Ok(())
    }
}

/// Run the full pipeline over one folder and assemble the report.
///
/// `created_at` is the job creation time, stamped into the report so a
/// re-run over identical input yields identical output.
pub fn run_analysis(
    source: &dyn MessageSource,
    config: &Config,
    scorer: &dyn SentimentScorer,
    detector: &dyn LanguageDetector,
    created_at: DateTime<Utc>,
    ctl: &RunControl<'_>,
) -> Result<AnalysisReport> {
    let started = Instant::now();
    let analysis = &config.analysis;

    ctl.report(0, "Fetching messages");
    ctl.check(0)?;
    let stream = source.open(&analysis.folder, analysis.limit)?;

    let mut senders = SenderAccumulator::default();
    let mut activity = TimeActivityAccumulator::default();
    let mut domains = DomainAccumulator::default();
    let mut sizes = SizeAccumulator::default();
    let mut keywords = KeywordAccumulator::new(config.report.max_vocabulary);
    let mut attachments = AttachmentAccumulator::default();
    let mut threads = ThreadBuilder::default();
    let mut scores = ScoreAccumulator::default();

    let expected = analysis.limit.max(1) as u64;
    let cadence = config.job.progress_every.max(1);
    let mut processed: u64 = 0;

    for item in stream {
        ctl.check(processed)?;

        let raw = item.map_err(|e| match e {
            e @ AnalyzerError::SourceRead { .. } => e,
            other => AnalyzerError::SourceRead {
                processed,
                reason: other.to_string(),
            },
        })?;

        let msg = normalize(&raw, analysis);

        senders.fold(&msg);
        activity.fold(&msg);
        domains.fold(&msg);
        sizes.fold(&msg);
        keywords.fold(&msg);
        attachments.fold(&msg);
        threads.fold(&msg);
        if analysis.include_sentiment {
            scores.fold(&msg, scorer, detector);
        }

        processed += 1;
        if processed % cadence == 0 {
            let percent = (processed * 100 / expected).min(99) as u8;
            ctl.report(percent, "Analyzing messages");
        }
    }

    ctl.check(processed)?;
    ctl.report(99, "Assembling report");

    let total = senders.total();
    let total_size = sizes.total_bytes();
    let date_range = activity.date_range();
    let (thread_report, response_report) = threads.finish(config.report.top_threads);
    let (sentiment, languages) = scores.finish();

    let report = AnalysisReport {
        total_messages: total,
        date_range,
        total_size_bytes: total_size,
        top_senders: senders.finish(config.report.top_senders),
        activity: activity.finish(),
        attachments: attachments.finish(total, config.report.top_attachment_types),
        sentiment,
        threads: thread_report,
        domains: domains.finish(config.report.top_domains),
        keywords: keywords.finish(config.report.top_keywords),
        response_times: response_report,
        sizes: sizes.finish(),
        languages,
        created_at,
        processing_seconds: started.elapsed().as_secs_f64(),
    };

    info!(
        total = report.total_messages,
        threads = report.threads.total_threads,
        seconds = report.processing_seconds,
        "Analysis complete"
    );

    Ok(report)
}
