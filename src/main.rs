//! CLI entry point for `mailscope`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use mailscope::config::{self, Config};
use mailscope::job::{JobRegistry, JobState};
use mailscope::model::report::AnalysisReport;
use mailscope::score::{LexiconScorer, MarkerLanguageDetector};
use mailscope::source::MboxSource;

#[derive(Parser)]
#[command(name = "mailscope", version, about = "Mailbox statistics and analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an mbox file and print the report
    Analyze {
        /// MBOX file to analyze
        path: PathBuf,

        /// Maximum number of messages to process
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Skip attachment parsing
        #[arg(long)]
        no_attachments: bool,

        /// Skip sentiment and language scoring
        #[arg(long)]
        no_sentiment: bool,

        /// Overall job timeout in seconds (0 = no timeout)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Print the active configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config();
    let _log_guard = init_logging(&cfg, cli.verbose);

    match cli.command {
        Commands::Analyze {
            path,
            limit,
            json,
            no_attachments,
            no_sentiment,
            timeout,
        } => {
            let mut cfg = cfg;
            if let Some(limit) = limit {
                cfg.analysis.limit = limit;
            }
            if no_attachments {
                cfg.analysis.include_attachments = false;
            }
            if no_sentiment {
                cfg.analysis.include_sentiment = false;
            }
            if let Some(timeout) = timeout {
                cfg.job.timeout_secs = timeout;
            }
            analyze(&path, cfg, json)
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&cfg)?);
            Ok(())
        }
    }
}

fn analyze(path: &std::path::Path, cfg: Config, json: bool) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let registry = JobRegistry::new();
    let id = registry.next_id();
    registry.start(
        id.clone(),
        cfg,
        Box::new(MboxSource::new(path)),
        Arc::new(LexiconScorer),
        Arc::new(MarkerLanguageDetector),
    )?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {percent}% {msg}")
            .expect("valid template")
            .progress_chars("=> "),
    );

    let status = loop {
        let status = registry.status(&id)?;
        bar.set_position(u64::from(status.progress));
        bar.set_message(status.current_step.clone());
        if status.state.is_terminal() {
            break status;
        }
        std::thread::sleep(Duration::from_millis(100));
    };
    bar.finish_and_clear();

    match status.state {
        JobState::Completed => {
            let report = registry.report(&id)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(report.as_ref())
                        .context("serializing report")?
                );
            } else {
                print_report(&report);
            }
            Ok(())
        }
        state => {
            let detail = status.error.unwrap_or_else(|| status.current_step.clone());
            anyhow::bail!("Analysis {state}: {detail}")
        }
    }
}

fn print_report(report: &AnalysisReport) {
    println!("Messages analyzed: {}", report.total_messages);
    if let Some(range) = &report.date_range {
        println!(
            "Date range:        {} to {}",
            range.first.format("%Y-%m-%d"),
            range.last.format("%Y-%m-%d")
        );
    }
    println!(
        "Total size:        {}",
        format_size(report.total_size_bytes, DECIMAL)
    );

    println!("\nTop senders:");
    for s in report.top_senders.iter().take(10) {
        println!(
            "  {:<40} {:>6}  ({:.1}%)",
            if s.display_name.is_empty() {
                s.address.clone()
            } else {
                format!("{} <{}>", s.display_name, s.address)
            },
            s.count,
            s.percentage
        );
    }

    println!("\nTop domains:");
    for d in report.domains.top_domains.iter().take(10) {
        println!("  {:<30} {:>6}  ({:.1}%)", d.domain, d.count, d.percentage);
    }

    println!(
        "\nThreads:           {} ({} conversations), longest {} messages, avg {:.1}",
        report.threads.total_threads,
        report.threads.multi_message_threads,
        report.threads.longest_thread,
        report.threads.average_thread_length
    );
    if report.response_times.samples > 0 {
        println!(
            "Response time:     avg {:.1}h over {} samples (min {:.1}h, max {:.1}h)",
            report.response_times.mean_hours,
            report.response_times.samples,
            report.response_times.min_hours,
            report.response_times.max_hours
        );
    }

    println!(
        "\nAttachments:       {} in {} messages ({:.1}% of mail), {}",
        report.attachments.total_attachments,
        report.attachments.messages_with_attachments,
        report.attachments.attachment_rate,
        format_size(report.attachments.total_size_bytes, DECIMAL)
    );

    let s = &report.sentiment;
    println!(
        "Sentiment:         ++{} +{} ={} -{} --{} (avg {:+.2})",
        s.very_positive, s.positive, s.neutral, s.negative, s.very_negative, s.average_score
    );
    println!(
        "Primary language:  {} ({:.0}% of messages)",
        report.languages.primary_language,
        report.languages.confidence * 100.0
    );

    println!(
        "\nSizes:             median {}, average {}",
        format_size(report.sizes.median_bytes as u64, DECIMAL),
        format_size(report.sizes.average_bytes as u64, DECIMAL)
    );

    println!("\nTop keywords:");
    for k in report.keywords.top_keywords.iter().take(15) {
        println!("  {:<20} {:>6}", k.word, k.count);
    }
}

/// Initialize tracing; returns the file-writer guard when file logging
/// is enabled (must stay alive for the duration of the process).
fn init_logging(cfg: &Config, verbosity: u8) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let level = match verbosity {
        0 => cfg.logging.level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if cfg.logging.log_to_file {
        let dir = config::cache_dir(cfg);
        let _ = std::fs::create_dir_all(&dir);
        let appender = tracing_appender::rolling::never(dir, "mailscope.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}
