//! Job lifecycle: state machine, registry, and background execution.
//!
//! A job runs the pipeline on its own thread, fire-and-forget; callers
//! poll [`JobRegistry::status`] and fetch the report once the job reaches
//! `completed`. The registry is lifecycle-scoped: slots are created on
//! start and torn down by [`JobRegistry::remove`] once terminal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AnalyzerError, Result};
use crate::model::report::AnalysisReport;
use crate::pipeline::{run_analysis, RunControl};
use crate::score::{LanguageDetector, SentimentScorer};
use crate::source::MessageSource;

/// Lifecycle states. `completed`, `failed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Pollable status record, one per job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: String,
    pub state: JobState,
    /// 0–100; non-decreasing while running, exactly 100 once completed,
    /// frozen at the last value on failure or cancellation.
    pub progress: u8,
    pub current_step: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct JobSlot {
    status: Mutex<JobStatus>,
    cancel: AtomicBool,
    report: Mutex<Option<Arc<AnalysisReport>>>,
}

impl JobSlot {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            status: Mutex::new(JobStatus {
                id,
                state: JobState::Pending,
                progress: 0,
                current_step: "Initializing analysis".to_string(),
                error: None,
                created_at: now,
                updated_at: now,
            }),
            cancel: AtomicBool::new(false),
            report: Mutex::new(None),
        }
    }

    /// Update state/step, keeping progress monotone while non-terminal.
    fn update(&self, state: JobState, progress: Option<u8>, step: &str) {
        let mut status = self.status.lock().expect("status lock poisoned");
        status.state = state;
        if let Some(p) = progress {
            if p > status.progress || state == JobState::Completed {
                status.progress = p;
            }
        }
        status.current_step = step.to_string();
        status.updated_at = Utc::now();
    }
}

/// Process-wide registry mapping job id → slot.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, Arc<JobSlot>>>,
    seq: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh job identifier.
    pub fn next_id(&self) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("job-{}-{n}", Utc::now().timestamp_millis())
    }

    /// Create the job in `pending` and spawn its pipeline thread.
    ///
    /// Starting an id that is already `pending` or `running` is rejected
    /// with a conflict error and leaves the existing job untouched. A
    /// terminal job under the same id is replaced.
    pub fn start(
        &self,
        id: impl Into<String>,
        config: Config,
        source: Box<dyn MessageSource>,
        scorer: Arc<dyn SentimentScorer>,
        detector: Arc<dyn LanguageDetector>,
    ) -> Result<String> {
        let id = id.into();

        let slot = {
            let mut jobs = self.jobs.lock().expect("registry lock poisoned");
            if let Some(existing) = jobs.get(&id) {
                let state = existing.status.lock().expect("status lock poisoned").state;
                if !state.is_terminal() {
                    return Err(AnalyzerError::JobAlreadyRunning(id));
                }
            }
            let slot = Arc::new(JobSlot::new(id.clone()));
            jobs.insert(id.clone(), Arc::clone(&slot));
            slot
        };

        info!(job = %id, folder = %config.analysis.folder, "Starting analysis job");

        let thread_id = id.clone();
        let thread_slot = Arc::clone(&slot);
        std::thread::Builder::new()
            .name(format!("mailscope-{id}"))
            .spawn(move || {
                run_job(&thread_id, &thread_slot, config, source, scorer, detector);
            })
            .map_err(|e| AnalyzerError::SourceOpen {
                folder: id.clone(),
                reason: format!("could not spawn job thread: {e}"),
            })?;

        Ok(id)
    }

    fn slot(&self, id: &str) -> Result<Arc<JobSlot>> {
        self.jobs
            .lock()
            .expect("registry lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| AnalyzerError::JobNotFound(id.to_string()))
    }

    /// Latest known status for a job.
    pub fn status(&self, id: &str) -> Result<JobStatus> {
        let slot = self.slot(id)?;
        let status = slot.status.lock().expect("status lock poisoned");
        Ok(status.clone())
    }

    /// The finished report; an error until the job reaches `completed`.
    pub fn report(&self, id: &str) -> Result<Arc<AnalysisReport>> {
        let slot = self.slot(id)?;
        let report = slot.report.lock().expect("report lock poisoned");
        match report.as_ref() {
            Some(r) => Ok(Arc::clone(r)),
            None => {
                let state = slot.status.lock().expect("status lock poisoned").state;
                Err(AnalyzerError::ReportNotReady {
                    id: id.to_string(),
                    state: state.to_string(),
                })
            }
        }
    }

    /// Request cooperative cancellation. Returns `true` if the job was
    /// still cancellable, `false` if it had already reached a terminal
    /// state.
    pub fn cancel(&self, id: &str) -> Result<bool> {
        let slot = self.slot(id)?;
        let state = slot.status.lock().expect("status lock poisoned").state;
        if state.is_terminal() {
            return Ok(false);
        }
        slot.cancel.store(true, Ordering::Relaxed);
        info!(job = %id, "Cancellation requested");
        Ok(true)
    }

    /// Tear down a terminal job. Removing a live job is rejected.
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().expect("registry lock poisoned");
        let slot = jobs
            .get(id)
            .ok_or_else(|| AnalyzerError::JobNotFound(id.to_string()))?;
        let state = slot.status.lock().expect("status lock poisoned").state;
        if !state.is_terminal() {
            return Err(AnalyzerError::JobAlreadyRunning(id.to_string()));
        }
        jobs.remove(id);
        Ok(())
    }

    /// Snapshot of every known job, newest first.
    pub fn list(&self) -> Vec<JobStatus> {
        let jobs = self.jobs.lock().expect("registry lock poisoned");
        let mut statuses: Vec<JobStatus> = jobs
            .values()
            .map(|slot| slot.status.lock().expect("status lock poisoned").clone())
            .collect();
        statuses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        statuses
    }

    /// Poll until the job reaches a terminal state or `timeout` elapses;
    /// returns the last observed status either way.
    pub fn wait(&self, id: &str, timeout: Duration) -> Result<JobStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status(id)?;
            if status.state.is_terminal() || Instant::now() >= deadline {
                return Ok(status);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

/// Body of the per-job thread: run the pipeline, then settle the slot
/// into its terminal state.
fn run_job(
    id: &str,
    slot: &Arc<JobSlot>,
    config: Config,
    source: Box<dyn MessageSource>,
    scorer: Arc<dyn SentimentScorer>,
    detector: Arc<dyn LanguageDetector>,
) {
    let created_at = slot
        .status
        .lock()
        .expect("status lock poisoned")
        .created_at;

    slot.update(JobState::Running, Some(0), "Fetching messages");

    let progress_slot = Arc::clone(slot);
    let progress = move |percent: u8, step: &str| {
        progress_slot.update(JobState::Running, Some(percent), step);
    };

    let deadline = (config.job.timeout_secs > 0)
        .then(|| Instant::now() + Duration::from_secs(config.job.timeout_secs));
    let ctl = RunControl {
        cancel: &slot.cancel,
        deadline,
        timeout_secs: config.job.timeout_secs,
        progress: Some(&progress),
    };

    match run_analysis(
        source.as_ref(),
        &config,
        scorer.as_ref(),
        detector.as_ref(),
        created_at,
        &ctl,
    ) {
        Ok(report) => {
            *slot.report.lock().expect("report lock poisoned") = Some(Arc::new(report));
            slot.update(JobState::Completed, Some(100), "Analysis completed");
            info!(job = %id, "Job completed");
        }
        Err(AnalyzerError::Cancelled) => {
            // Partial state is discarded with the pipeline; progress stays
            // frozen at its last value.
            slot.update(JobState::Cancelled, None, "Analysis cancelled");
            info!(job = %id, "Job cancelled");
        }
        Err(e) => {
            {
                let mut status = slot.status.lock().expect("status lock poisoned");
                status.error = Some(e.to_string());
            }
            slot.update(JobState::Failed, None, "Analysis failed");
            warn!(job = %id, error = %e, "Job failed");
        }
    }
}
