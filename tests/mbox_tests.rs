//! End-to-end analysis of an mbox file on disk.

use std::io::Write;
use std::sync::atomic::AtomicBool;

use chrono::{TimeZone, Utc};

use mailscope::config::Config;
use mailscope::pipeline::{run_analysis, RunControl};
use mailscope::score::{LexiconScorer, MarkerLanguageDetector};
use mailscope::source::MboxSource;

const MBOX: &str = "\
From a@x.com Thu Jan  4 10:00:00 2024
From: Alice <a@x.com>
To: b@y.com
Date: Thu, 04 Jan 2024 10:00:00 +0000
Subject: Budget review
Message-ID: <m1@x.com>

Thanks for the great numbers, the budget looks good.

From b@y.com Thu Jan  4 12:00:00 2024
From: Bob <b@y.com>
To: a@x.com
Date: Thu, 04 Jan 2024 12:00:00 +0000
Subject: Re: Budget review
Message-ID: <m2@y.com>
In-Reply-To: <m1@x.com>
References: <m1@x.com>

There is a problem with the budget totals, see the error on page two.
";

#[test]
fn test_analyze_mbox_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MBOX.as_bytes()).unwrap();

    let source = MboxSource::new(file.path());
    let cancel = AtomicBool::new(false);
    let ctl = RunControl::unbounded(&cancel);
    let report = run_analysis(
        &source,
        &Config::default(),
        &LexiconScorer,
        &MarkerLanguageDetector,
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        &ctl,
    )
    .unwrap();

    assert_eq!(report.total_messages, 2);
    assert_eq!(report.threads.total_threads, 1);
    assert_eq!(report.threads.longest_thread, 2);
    assert_eq!(report.response_times.samples, 1);
    assert!((report.response_times.mean_hours - 2.0).abs() < 1e-9);

    // One positive, one negative body.
    assert_eq!(report.sentiment.neutral, 0);
    assert!(report.sentiment.positive + report.sentiment.very_positive >= 1);
    assert!(report.sentiment.negative + report.sentiment.very_negative >= 1);

    assert_eq!(report.languages.primary_language, "en");
    assert!(report
        .keywords
        .top_keywords
        .iter()
        .any(|k| k.word == "budget"));
    assert_eq!(report.domains.distinct_domains, 2);
}
