use crate::aggregate::{Aggregator, SeverityPolicy};
use crate::classifier::ClassifierModel;
use crate::config::RuleConfig;
use crate::errors::{CheckFailure, ConfigError, EngineError, ParseError};
use crate::segments::{Language, Segment, SegmentModel};
use crate::types::{CheckId, Finding, RawFinding, SkipMarker, SkipReason};
use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of one document analysis. Owned by the caller; nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// SHA-256 of the rule configuration used
    pub config_fingerprint: String,
    /// Version of the classifier artifact, when one was loaded
    pub model_version: Option<String>,
    pub segment_count: usize,
    pub page_count: u32,
    /// Enabled (check, language) pairs that were expected to run
    pub checks_attempted: usize,
    pub checks_completed: usize,
    pub findings: Vec<Finding>,
    pub skipped: Vec<SkipMarker>,
}

impl AnalysisRun {
    pub fn summary(&self) -> String {
        format!(
            "{} of {} checks completed, {} finding(s), {} skipped",
            self.checks_completed,
            self.checks_attempted,
            self.findings.len(),
            self.skipped.len()
        )
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

enum ModelSource {
    Absent,
    Ready(Arc<ClassifierModel>),
    /// Loaded on first use and shared by every later run of this engine
    Lazy {
        path: PathBuf,
        cell: OnceLock<Result<Arc<ClassifierModel>, String>>,
    },
}

type Task = Box<dyn FnOnce() -> Result<Option<Vec<RawFinding>>, CheckFailure> + Send>;

/// One unit of work: a check over one language's segments.
pub(crate) struct Job {
    check_id: CheckId,
    language: Language,
    task: Task,
}

enum JobOutcome {
    Completed(Vec<RawFinding>),
    /// The check declined to run (e.g. remote check without credentials)
    Inactive,
    Failed(CheckFailure),
    Panicked(String),
}

pub struct RuleEngine {
    config: Arc<RuleConfig>,
    model: ModelSource,
    run_timeout: Option<Duration>,
}

impl RuleEngine {
    /// Validates the configuration up front; a bad config never reaches a check.
    pub fn new(config: RuleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let run_timeout = config.engine.run_timeout_ms.map(Duration::from_millis);
        Ok(Self {
            config: Arc::new(config),
            model: ModelSource::Absent,
            run_timeout,
        })
    }

    pub fn with_model(mut self, model: Arc<ClassifierModel>) -> Self {
        self.model = ModelSource::Ready(model);
        self
    }

    /// Load the classifier artifact lazily. A load failure disables the
    /// subjectivity check for every run of this engine; it is never fatal.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model = ModelSource::Lazy {
            path: path.into(),
            cell: OnceLock::new(),
        };
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    fn resolve_model(&self) -> Result<Arc<ClassifierModel>, String> {
        match &self.model {
            ModelSource::Absent => Err("no classifier model configured".to_string()),
            ModelSource::Ready(model) => Ok(Arc::clone(model)),
            ModelSource::Lazy { path, cell } => cell
                .get_or_init(|| {
                    info!("📁 Loading classifier model from: {}", path.display());
                    ClassifierModel::load(path)
                        .map(Arc::new)
                        .map_err(|e| e.to_string())
                })
                .clone(),
        }
    }

    fn worker_count(&self, jobs: usize) -> usize {
        let configured = match self.config.engine.max_workers {
            0 => thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            n => n,
        };
        configured.min(jobs).max(1)
    }

    /// Run every enabled check over `document`.
    ///
    /// Only a malformed document is fatal. Check failures, panics, a missing model
    /// and the run timeout all degrade to skip markers on the returned run.
    pub fn analyze(&self, document: &SegmentModel) -> Result<AnalysisRun, EngineError> {
        if document.iter().all(|s| s.text.trim().is_empty()) {
            return Err(EngineError::Parse(ParseError::Empty));
        }

        let partitions = document.partition_by_language();
        info!(
            "🔍 Analyzing {} segment(s) on {} page(s), languages: {:?}",
            document.len(),
            document.page_count(),
            document.languages()
        );

        let needs_model = partitions.iter().any(|(language, _)| {
            self.config
                .rules_for(*language)
                .is_some_and(|r| r.is_enabled(CheckId::Subjectivity))
        });
        let (model, skipped) = if needs_model {
            match self.resolve_model() {
                Ok(model) => (Some(model), Vec::new()),
                Err(reason) => {
                    warn!("⚠️  Subjectivity check disabled: {reason}");
                    (None, self.model_skips(&partitions, &reason))
                }
            }
        } else {
            (None, Vec::new())
        };

        let jobs = self.plan_jobs(&partitions, model.as_ref());
        let model_version = model.as_ref().map(|m| m.version().to_string());
        Ok(self.run_jobs(document, jobs, skipped, model_version))
    }

    /// One marker per language that enables subjectivity when the model could
    /// not be obtained.
    fn model_skips(&self, partitions: &[(Language, Arc<[Segment]>)], reason: &str) -> Vec<SkipMarker> {
        partitions
            .iter()
            .filter(|(language, _)| {
                self.config
                    .rules_for(*language)
                    .is_some_and(|r| r.is_enabled(CheckId::Subjectivity))
            })
            .map(|(language, _)| {
                SkipMarker::new(CheckId::Subjectivity, *language, SkipReason::ModelUnavailable, reason)
            })
            .collect()
    }

    fn plan_jobs(
        &self,
        partitions: &[(Language, Arc<[Segment]>)],
        model: Option<&Arc<ClassifierModel>>,
    ) -> Vec<Job> {
        let structured = self.section_languages(partitions);
        let mut jobs = Vec::new();
        for (language, segments) in partitions {
            let language = *language;
            let Some(rules) = self.config.rules_for(language) else {
                debug!("no rule set for language {language}; skipping {} segment(s)", segments.len());
                continue;
            };
            let enabled = rules.enabled_checks();
            debug!("enabled checks [{language}]: {enabled:?}");

            for check_id in enabled {
                if check_id == CheckId::Subjectivity && model.is_none() {
                    // already recorded as ModelUnavailable
                    continue;
                }
                if check_id == CheckId::RequiredSection && !structured.contains(&language) {
                    debug!(
                        "{check_id} [{language}] not run: {} of {} segment(s) is below the section language share",
                        segments.len(),
                        total_segments(partitions)
                    );
                    continue;
                }
                let config = Arc::clone(&self.config);
                let segments = Arc::clone(segments);
                let model = model.cloned();
                jobs.push(Job {
                    check_id,
                    language,
                    task: Box::new(move || {
                        let rules = config.rules_for(language).ok_or_else(|| {
                            CheckFailure::new(check_id.as_str(), format!("no rules for {language}"))
                        })?;
                        match check_id.instantiate(rules, model)? {
                            Some(check) => check.run(&segments).map(Some),
                            None => Ok(None),
                        }
                    }),
                });
            }
        }
        jobs
    }

    /// Languages whose required sections are checked: the most common language
    /// (first seen wins a tie) plus any holding at least the configured share.
    fn section_languages(&self, partitions: &[(Language, Arc<[Segment]>)]) -> Vec<Language> {
        let total = total_segments(partitions);
        let mut dominant: Option<(Language, usize)> = None;
        for (language, segments) in partitions {
            if dominant.map_or(true, |(_, count)| segments.len() > count) {
                dominant = Some((*language, segments.len()));
            }
        }

        let min_share = self.config.engine.section_language_share;
        partitions
            .iter()
            .filter(|(language, segments)| {
                dominant.is_some_and(|(d, _)| d == *language)
                    || (total > 0 && segments.len() as f64 / total as f64 >= min_share)
            })
            .map(|(language, _)| *language)
            .collect()
    }

    /// Execute jobs on the worker pool and aggregate whatever finished in time.
    pub(crate) fn run_jobs(
        &self,
        document: &SegmentModel,
        jobs: Vec<Job>,
        mut skipped: Vec<SkipMarker>,
        model_version: Option<String>,
    ) -> AnalysisRun {
        let started_at = Utc::now();
        let started = Instant::now();

        let meta: Vec<(CheckId, Language)> = jobs.iter().map(|j| (j.check_id, j.language)).collect();
        let outcomes = self.execute(jobs);

        let mut raw = Vec::new();
        let mut attempted = skipped.len();
        let mut completed = 0;

        for ((check_id, language), outcome) in meta.into_iter().zip(outcomes) {
            let Some((outcome, elapsed)) = outcome else {
                warn!("⏱️  {check_id} [{language}] did not finish before the run timeout");
                attempted += 1;
                skipped.push(SkipMarker::new(
                    check_id,
                    language,
                    SkipReason::Timeout,
                    "run timeout expired before the check finished",
                ));
                continue;
            };

            match outcome {
                JobOutcome::Inactive => {
                    debug!("{check_id} [{language}] not active");
                }
                JobOutcome::Completed(findings) => {
                    attempted += 1;
                    if let Some(stray) = findings.iter().find(|f| !document.contains_location(&f.location)) {
                        warn!("❌ {check_id} [{language}] reported a location outside the document: {}", stray.location);
                        skipped.push(SkipMarker::new(
                            check_id,
                            language,
                            SkipReason::Failed,
                            format!("finding at {} is outside the document", stray.location),
                        ));
                        continue;
                    }
                    info!("   ✅ {check_id} [{language}]: {} finding(s) in {elapsed:?}", findings.len());
                    completed += 1;
                    raw.extend(findings);
                }
                JobOutcome::Failed(failure) => {
                    attempted += 1;
                    warn!("❌ {check_id} [{language}] failed: {}", failure.reason);
                    skipped.push(SkipMarker::new(check_id, language, SkipReason::Failed, failure.reason));
                }
                JobOutcome::Panicked(message) => {
                    attempted += 1;
                    warn!("💥 {check_id} [{language}] panicked: {message}");
                    skipped.push(SkipMarker::new(
                        check_id,
                        language,
                        SkipReason::Panicked,
                        format!("unexpected fault: {message}"),
                    ));
                }
            }
        }

        let aggregator = Aggregator::new(SeverityPolicy {
            high_confidence_cutoff: self.config.engine.high_confidence_cutoff,
        });
        let set = aggregator.aggregate(raw, skipped);

        let run = AnalysisRun {
            started_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
            config_fingerprint: self.config.fingerprint(),
            model_version,
            segment_count: document.len(),
            page_count: document.page_count(),
            checks_attempted: attempted,
            checks_completed: completed,
            findings: set.findings,
            skipped: set.skipped,
        };
        info!("📊 {}", run.summary());
        run
    }

    /// Run jobs on a bounded pool of detached workers. Slot `i` holds job `i`'s
    /// outcome, or `None` when the run timeout expired first.
    ///
    /// Remote checks get a worker of their own so that local checks never queue
    /// behind a slow service, whatever the pool size.
    fn execute(&self, jobs: Vec<Job>) -> Vec<Option<(JobOutcome, Duration)>> {
        let total = jobs.len();
        let mut outcomes: Vec<Option<(JobOutcome, Duration)>> = (0..total).map(|_| None).collect();
        if total == 0 {
            return outcomes;
        }

        let remote_total = jobs.iter().filter(|j| j.check_id.is_remote()).count();
        let local_total = total - remote_total;

        let (local_tx, local_rx) = crossbeam_channel::unbounded::<(usize, Task)>();
        let (remote_tx, remote_rx) = crossbeam_channel::unbounded::<(usize, Task)>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, JobOutcome, Duration)>();
        let cancelled = Arc::new(AtomicBool::new(false));

        let local_workers = if local_total > 0 {
            spawn_workers("check", self.worker_count(local_total), &local_rx, &result_tx, &cancelled)
        } else {
            0
        };
        let remote_workers = if remote_total > 0 {
            spawn_workers("remote", 1, &remote_rx, &result_tx, &cancelled)
        } else {
            0
        };
        drop(result_tx);
        // only workers hold receivers from here on, so a failed send means they all exited
        drop(local_rx);
        drop(remote_rx);

        if local_workers + remote_workers == 0 {
            // no threads available: run inline, still isolated
            for (index, job) in jobs.into_iter().enumerate() {
                let started = Instant::now();
                outcomes[index] = Some((run_isolated(job.task), started.elapsed()));
            }
            return outcomes;
        }

        debug!(
            "running {total} job(s) on {local_workers} check worker(s) and {remote_workers} remote worker(s)"
        );
        let mut queued = 0;
        for (index, job) in jobs.into_iter().enumerate() {
            // a pool that failed to start hands its jobs to the other one
            let to_remote = if job.check_id.is_remote() {
                remote_workers > 0
            } else {
                local_workers == 0
            };
            if queue_job(if to_remote { &remote_tx } else { &local_tx }, index, job) {
                queued += 1;
            }
        }
        drop(local_tx);
        drop(remote_tx);

        let deadline = self.run_timeout.map(|t| Instant::now() + t);
        let mut remaining = queued;
        while remaining > 0 {
            let received = match deadline {
                Some(deadline) => result_rx.recv_deadline(deadline),
                None => result_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((index, outcome, elapsed)) => {
                    outcomes[index] = Some((outcome, elapsed));
                    remaining -= 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    cancelled.store(true, Ordering::Relaxed);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("check workers exited with {remaining} job(s) outstanding");
                    break;
                }
            }
        }
        outcomes
    }
}

/// Start up to `count` detached workers draining `jobs`; returns how many started.
fn spawn_workers(
    pool: &str,
    count: usize,
    jobs: &Receiver<(usize, Task)>,
    results: &Sender<(usize, JobOutcome, Duration)>,
    cancelled: &Arc<AtomicBool>,
) -> usize {
    let mut spawned = 0;
    for worker in 0..count {
        let job_rx = jobs.clone();
        let result_tx = results.clone();
        let cancelled = Arc::clone(cancelled);
        let spawn = thread::Builder::new()
            .name(format!("reportqa-{pool}-{worker}"))
            .spawn(move || {
                for (index, task) in job_rx.iter() {
                    if cancelled.load(Ordering::Relaxed) {
                        break;
                    }
                    let started = Instant::now();
                    let outcome = run_isolated(task);
                    if result_tx.send((index, outcome, started.elapsed())).is_err() {
                        break;
                    }
                }
            });
        match spawn {
            Ok(_) => spawned += 1,
            Err(e) => warn!("failed to spawn {pool} worker: {e}"),
        }
    }
    spawned
}

/// Hand one job to a pool. Returns false, with a warning, when no worker of that
/// pool is left to receive it; its slot then stays empty.
fn queue_job(queue: &Sender<(usize, Task)>, index: usize, job: Job) -> bool {
    match queue.send((index, job.task)) {
        Ok(()) => true,
        Err(e) => {
            warn!("failed to queue {} [{}]: {e}", job.check_id, job.language);
            false
        }
    }
}

fn total_segments(partitions: &[(Language, Arc<[Segment]>)]) -> usize {
    partitions.iter().map(|(_, segments)| segments.len()).sum()
}

fn run_isolated(task: Task) -> JobOutcome {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(Some(findings))) => JobOutcome::Completed(findings),
        Ok(Ok(None)) => JobOutcome::Inactive,
        Ok(Err(failure)) => JobOutcome::Failed(failure),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            JobOutcome::Panicked(message)
        }
    }
}
