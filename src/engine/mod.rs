// src/engine/mod.rs
//! Fans job units out over a fixed-size worker pool and gathers the results.
mod worker;

use crate::catalog::{Dso, JobUnit, SourceCatalog};
use crate::error::JobError;
use crate::process::{JobOutput, PipelineConfig, Table, TableSource};
use crate::profile::{ProfileRecord, ProfileSummary};
use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::{debug, info, instrument, warn};
use worker::{run_isolated, WorkerEvent};

/// How often the coordinator wakes up to check for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on workers; `None` uses the number of logical CPUs.
    pub workers: Option<usize>,
    /// Per-job wall-clock limit, measured from the moment a worker picks it up.
    /// Also bounds the whole batch, see [`EngineConfig::batch_deadline`].
    pub timeout: Option<Duration>,
    /// Collect per-job profile records.
    pub profiling: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: None,
            timeout: None,
            profiling: true,
        }
    }
}

impl EngineConfig {
    /// `min(jobs, parallelism)`, never zero.
    pub fn worker_count(&self, jobs: usize) -> usize {
        let parallelism = self.workers.unwrap_or_else(num_cpus::get).max(1);
        jobs.min(parallelism).max(1)
    }

    /// Latest moment a batch may still be collecting results: one timeout per
    /// round of `workers` jobs, plus one round of slack. A worker stuck in a
    /// timed-out job never frees its thread, so jobs still queued behind it at
    /// this point are reported as cancelled.
    pub fn batch_deadline(&self, start: Instant, jobs: usize, workers: usize) -> Option<Instant> {
        let rounds = jobs.div_ceil(workers.max(1)) + 1;
        let rounds = u32::try_from(rounds).unwrap_or(u32::MAX);
        self.timeout
            .and_then(|limit| limit.checked_mul(rounds))
            .map(|budget| start + budget)
    }
}

/// Shared flag that stops outstanding jobs from starting.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct JobFailure {
    pub source: Dso,
    pub year: i32,
    pub error: JobError,
}

/// Results of a batch, keyed by `(source, year)`.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub totals: BTreeMap<Dso, BTreeMap<i32, i64>>,
    /// Shaped tables per source, ascending by year.
    pub datasets: BTreeMap<Dso, Vec<(i32, Table)>>,
    pub profiles: Vec<ProfileRecord>,
    /// Sorted by source, then year.
    pub failures: Vec<JobFailure>,
}

impl BatchOutcome {
    fn seeded<I: IntoIterator<Item = Dso>>(sources: I) -> Self {
        let mut outcome = BatchOutcome::default();
        for source in sources {
            outcome.totals.entry(source).or_default();
            outcome.datasets.entry(source).or_default();
        }
        outcome
    }

    fn absorb(&mut self, output: JobOutput, profiling: bool) {
        self.totals
            .entry(output.source)
            .or_default()
            .insert(output.year, output.total);
        self.datasets
            .entry(output.source)
            .or_default()
            .push((output.year, output.table));
        if profiling {
            self.profiles.push(output.profile);
        }
    }

    fn finish(&mut self) {
        for tables in self.datasets.values_mut() {
            tables.sort_by_key(|(year, _)| *year);
        }
        self.failures.sort_by_key(|f| (f.source, f.year));
    }

    pub fn profile_summary(&self) -> ProfileSummary {
        ProfileSummary::from_records(&self.profiles)
    }

    /// `{"liander": {"2009": 123, ...}, ...}`
    pub fn totals_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.totals)
    }
}

enum Slot {
    Queued,
    Running(Instant),
    Done,
}

pub struct Engine {
    source: Arc<dyn TableSource>,
    pipeline: Arc<PipelineConfig>,
    config: EngineConfig,
    cancel: CancelToken,
}

impl Engine {
    pub fn new(source: Arc<dyn TableSource>, pipeline: PipelineConfig, config: EngineConfig) -> Self {
        Self {
            source,
            pipeline: Arc::new(pipeline),
            config,
            cancel: CancelToken::default(),
        }
    }

    /// Token that cancels this engine's outstanding jobs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run every job in the catalog. All catalog sources appear in the
    /// totals, even when none of their jobs succeeded.
    pub fn run_catalog(&self, catalog: &SourceCatalog) -> Result<BatchOutcome> {
        let mut outcome = self.run(catalog.jobs())?;
        for source in catalog.sources() {
            outcome.totals.entry(source).or_default();
            outcome.datasets.entry(source).or_default();
        }
        Ok(outcome)
    }

    #[instrument(level = "info", skip_all, fields(jobs = jobs.len()))]
    pub fn run(&self, jobs: Vec<JobUnit>) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::seeded(jobs.iter().map(|j| j.source));
        if jobs.is_empty() {
            return Ok(outcome);
        }

        let workers = self.config.worker_count(jobs.len());
        info!(workers, jobs = jobs.len(), "starting worker pool");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("dso-worker-{}", i))
            .build()
            .context("building worker pool")?;

        // Set once the coordinator stops listening, so queued jobs are skipped.
        let abandoned = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<WorkerEvent>();

        for (idx, job) in jobs.iter().cloned().enumerate() {
            let tx = tx.clone();
            let source = Arc::clone(&self.source);
            let pipeline = Arc::clone(&self.pipeline);
            let cancel = self.cancel.clone();
            let abandoned = Arc::clone(&abandoned);
            pool.spawn(move || {
                if cancel.is_cancelled() || abandoned.load(Ordering::SeqCst) {
                    let _ = tx.send(WorkerEvent::Skipped(idx));
                    return;
                }
                let _ = tx.send(WorkerEvent::Started(idx, Instant::now()));
                let result = run_isolated(&job, source.as_ref(), &pipeline);
                let _ = tx.send(WorkerEvent::Finished(idx, Box::new(result)));
            });
        }
        drop(tx);

        let mut slots: Vec<Slot> = jobs.iter().map(|_| Slot::Queued).collect();
        let mut remaining = jobs.len();
        let deadline = self
            .config
            .batch_deadline(Instant::now(), jobs.len(), workers);

        while remaining > 0 {
            if self.cancel.is_cancelled() {
                warn!(remaining, "cancelled; abandoning outstanding jobs");
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(remaining, "batch deadline reached; abandoning outstanding jobs");
                break;
            }

            let wait = self.next_wait(&slots, deadline);
            match rx.recv_timeout(wait) {
                Ok(WorkerEvent::Started(idx, at)) => {
                    if let Slot::Queued = slots[idx] {
                        slots[idx] = Slot::Running(at);
                    }
                }
                Ok(WorkerEvent::Finished(idx, result)) => {
                    if !matches!(slots[idx], Slot::Done) {
                        slots[idx] = Slot::Done;
                        remaining -= 1;
                        match *result {
                            Ok(output) => outcome.absorb(output, self.config.profiling),
                            Err(error) => outcome.failures.push(JobFailure {
                                source: jobs[idx].source,
                                year: jobs[idx].year,
                                error,
                            }),
                        }
                    } else {
                        debug!(idx, "discarding result of a job already resolved");
                    }
                }
                Ok(WorkerEvent::Skipped(idx)) => {
                    if !matches!(slots[idx], Slot::Done) {
                        slots[idx] = Slot::Done;
                        remaining -= 1;
                        outcome.failures.push(cancelled(&jobs[idx]));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if let Some(limit) = self.config.timeout {
                let now = Instant::now();
                for (idx, slot) in slots.iter_mut().enumerate() {
                    if let Slot::Running(at) = *slot {
                        if now.duration_since(at) >= limit {
                            let job = &jobs[idx];
                            warn!(source = %job.source, year = job.year, ?limit, "job timed out");
                            *slot = Slot::Done;
                            remaining -= 1;
                            outcome.failures.push(JobFailure {
                                source: job.source,
                                year: job.year,
                                error: JobError::JobTimeout {
                                    dso: job.source,
                                    year: job.year,
                                    after: limit,
                                },
                            });
                        }
                    }
                }
            }
        }

        abandoned.store(true, Ordering::SeqCst);
        for (idx, slot) in slots.iter().enumerate() {
            if !matches!(slot, Slot::Done) {
                outcome.failures.push(cancelled(&jobs[idx]));
            }
        }

        outcome.finish();
        info!(
            succeeded = outcome.totals.values().map(BTreeMap::len).sum::<usize>(),
            failed = outcome.failures.len(),
            "worker pool finished"
        );
        Ok(outcome)
    }

    /// Time until the earliest running job hits its limit or the batch hits
    /// its deadline, capped by the poll interval.
    fn next_wait(&self, slots: &[Slot], deadline: Option<Instant>) -> Duration {
        let Some(limit) = self.config.timeout else {
            return POLL_INTERVAL;
        };
        let now = Instant::now();
        slots
            .iter()
            .filter_map(|s| match s {
                Slot::Running(at) => Some(*at + limit),
                _ => None,
            })
            .chain(deadline)
            .map(|at| at.saturating_duration_since(now))
            .min()
            .map_or(POLL_INTERVAL, |d| d.min(POLL_INTERVAL))
    }
}

fn cancelled(job: &JobUnit) -> JobFailure {
    JobFailure {
        source: job.source,
        year: job.year,
        error: JobError::Cancelled {
            dso: job.source,
            year: job.year,
        },
    }
}
