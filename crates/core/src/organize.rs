use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::{classify, validate_mode};
use crate::error::OrganizeError;
use crate::filesystem::{FileSystem, LocalFileSystem};
use crate::model::{
    FailureKind, FileEntry, Job, JobFailure, MoveRecord, MoveStatus, ReorganizationRequest,
    ReorganizationResult, RunEvent, RunOutcome, RunPhase,
};
use crate::pool::{WorkerPool, DEFAULT_WORKERS};
use crate::priority::order_by_priority;

#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    pub workers: usize,
    pub dry_run: bool,
    pub excludes: Vec<String>,
    pub overwrite_existing: bool,
    pub run_id: Option<String>,
    pub emit_events: bool,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            dry_run: false,
            excludes: Vec::new(),
            overwrite_existing: false,
            run_id: None,
            emit_events: true,
        }
    }
}

#[derive(Debug, Clone)]
struct JobOutcome {
    job: Job,
    error: Option<String>,
}

#[derive(Default)]
struct OutcomeSink {
    outcomes: Mutex<Vec<JobOutcome>>,
}

impl OutcomeSink {
    fn record(&self, outcome: JobOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome);
    }

    fn len(&self) -> usize {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn take(&self) -> Vec<JobOutcome> {
        std::mem::take(&mut *self.outcomes.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

struct Candidate {
    entry: FileEntry,
    folder: String,
}

struct EventEmitter<'a, F> {
    run_id: &'a str,
    enabled: bool,
    seq: u64,
    on_event: F,
}

impl<F> EventEmitter<'_, F>
where
    F: FnMut(RunEvent),
{
    fn emit(
        &mut self,
        phase: RunPhase,
        current_path: Option<&Path>,
        files_scanned: u64,
        jobs_submitted: u64,
        jobs_completed: u64,
    ) {
        debug!("run {} entering {:?}", self.run_id, phase);
        if !self.enabled {
            return;
        }
        self.seq += 1;
        (self.on_event)(RunEvent {
            seq: self.seq,
            run_id: self.run_id.to_string(),
            phase,
            current_path: current_path.map(|path| path.to_string_lossy().to_string()),
            files_scanned,
            jobs_submitted,
            jobs_completed,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
    }
}

pub fn run_reorganization(
    request: &ReorganizationRequest,
    options: &OrganizeOptions,
) -> Result<ReorganizationResult, OrganizeError> {
    run_reorganization_with_callback(request, options, |_| {})
}

pub fn run_reorganization_with_callback<F>(
    request: &ReorganizationRequest,
    options: &OrganizeOptions,
    on_event: F,
) -> Result<ReorganizationResult, OrganizeError>
where
    F: FnMut(RunEvent),
{
    run_reorganization_on(Arc::new(LocalFileSystem), request, options, on_event)
}

// Err only for run-level failures detected before dispatch.
pub fn run_reorganization_on<F>(
    fs: Arc<dyn FileSystem>,
    request: &ReorganizationRequest,
    options: &OrganizeOptions,
    on_event: F,
) -> Result<ReorganizationResult, OrganizeError>
where
    F: FnMut(RunEvent),
{
    let run_id = options
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut emitter = EventEmitter {
        run_id: &run_id,
        enabled: options.emit_events,
        seq: 0,
        on_event,
    };

    match execute_run(fs, request, options, &run_id, &mut emitter) {
        Ok(result) => {
            emitter.emit(
                RunPhase::Completed,
                Some(request.source_dir.as_path()),
                result.files_scanned,
                result.jobs_submitted,
                result.jobs_succeeded + result.jobs_failed,
            );
            Ok(result)
        }
        Err(err) => {
            warn!("run {run_id} failed: {err}");
            emitter.emit(RunPhase::Failed, Some(request.source_dir.as_path()), 0, 0, 0);
            Err(err)
        }
    }
}

fn execute_run<F>(
    fs: Arc<dyn FileSystem>,
    request: &ReorganizationRequest,
    options: &OrganizeOptions,
    run_id: &str,
    emitter: &mut EventEmitter<'_, F>,
) -> Result<ReorganizationResult, OrganizeError>
where
    F: FnMut(RunEvent),
{
    validate_options(options)?;
    validate_mode(&request.mode)?;
    let source = request.source_dir.as_path();
    if source.as_os_str().is_empty() || !fs.exists(source) || !fs.is_dir(source) {
        return Err(OrganizeError::InvalidDirectory {
            path: source.to_path_buf(),
        });
    }

    let started = Instant::now();
    let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    info!(
        "run {run_id}: organizing {} ({} mode, {} worker(s){})",
        source.display(),
        request.mode.label(),
        options.workers,
        if options.dry_run { ", dry run" } else { "" }
    );

    let mut result = ReorganizationResult {
        run_id: run_id.to_string(),
        source_dir: source.to_path_buf(),
        mode: request.mode.clone(),
        outcome: RunOutcome::Completed,
        dry_run: options.dry_run,
        started_at,
        finished_at: String::new(),
        elapsed_ms: 0,
        files_scanned: 0,
        files_unmatched: 0,
        jobs_submitted: 0,
        jobs_succeeded: 0,
        jobs_failed: 0,
        jobs_skipped: 0,
        destinations_created: Vec::new(),
        moves: Vec::new(),
        failures: Vec::new(),
        warnings: Vec::new(),
    };

    emitter.emit(RunPhase::Scanning, Some(source), 0, 0, 0);
    let excludes = ExcludeMatcher::new(&options.excludes, &mut result.warnings);
    let entries = fs
        .list_regular_files(source)
        .map_err(|source_err| OrganizeError::Scan {
            path: source.to_path_buf(),
            source: source_err,
        })?
        .into_iter()
        .filter(|entry| !excludes.is_excluded(&entry.file_name))
        .collect::<Vec<_>>();
    result.files_scanned = entries.len() as u64;

    if entries.is_empty() {
        info!("run {run_id}: no files found in {}", source.display());
        result.outcome = RunOutcome::NoFiles;
        return Ok(finish(result, started));
    }

    emitter.emit(RunPhase::Classifying, None, result.files_scanned, 0, 0);
    let mut candidates = Vec::with_capacity(entries.len());
    for entry in entries {
        match classify(&entry, &request.mode, fs.as_ref()) {
            Some(folder) => candidates.push(Candidate { entry, folder }),
            None => result.files_unmatched += 1,
        }
    }
    order_by_priority(&mut candidates, |candidate| &candidate.entry);
    debug!(
        "run {run_id}: {} candidate(s), {} unmatched",
        candidates.len(),
        result.files_unmatched
    );

    emitter.emit(
        RunPhase::PreparingDestinations,
        None,
        result.files_scanned,
        0,
        0,
    );
    let failed_destinations =
        prepare_destinations(fs.as_ref(), source, &candidates, options, &mut result);

    emitter.emit(RunPhase::Dispatching, None, result.files_scanned, 0, 0);
    let mut jobs = Vec::with_capacity(candidates.len());
    for Candidate { entry, folder } in candidates {
        let destination = source.join(&folder).join(&entry.file_name);
        if let Some(cause) = failed_destinations.get(&folder) {
            result.jobs_skipped += 1;
            result.failures.push(JobFailure {
                kind: FailureKind::Destination,
                source: entry.path.clone(),
                destination: destination.clone(),
                message: format!(
                    "{}: destination folder '{}' unavailable: {}",
                    entry.path.display(),
                    folder,
                    cause
                ),
            });
            result.moves.push(MoveRecord {
                source: entry.path,
                destination,
                folder,
                status: MoveStatus::Skipped,
            });
            continue;
        }
        jobs.push(Job {
            source: entry.path,
            destination,
            folder,
        });
    }

    if options.dry_run {
        result.moves.extend(jobs.into_iter().map(|job| MoveRecord {
            source: job.source,
            destination: job.destination,
            folder: job.folder,
            status: MoveStatus::Planned,
        }));
        return Ok(finish(result, started));
    }

    let sink = Arc::new(OutcomeSink::default());
    let pool = start_pool(fs, options, Arc::clone(&sink))?;
    for job in jobs {
        pool.submit(job)?;
        result.jobs_submitted += 1;
    }

    emitter.emit(
        RunPhase::Draining,
        None,
        result.files_scanned,
        result.jobs_submitted,
        sink.len() as u64,
    );
    let stats = pool.shutdown()?;
    debug!(
        "run {run_id}: pool finished: executed={} panicked={}",
        stats.executed, stats.panicked
    );
    aggregate_outcomes(sink.take(), &mut result);

    Ok(finish(result, started))
}

fn validate_options(options: &OrganizeOptions) -> Result<(), OrganizeError> {
    if options.workers == 0 {
        return Err(OrganizeError::InvalidOptions(
            "workers must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn prepare_destinations(
    fs: &dyn FileSystem,
    source: &Path,
    candidates: &[Candidate],
    options: &OrganizeOptions,
    result: &mut ReorganizationResult,
) -> HashMap<String, String> {
    let mut seen = HashSet::new();
    let mut failed = HashMap::new();
    for candidate in candidates {
        if !seen.insert(candidate.folder.as_str()) {
            continue;
        }
        let folder_path = source.join(&candidate.folder);
        if options.dry_run {
            if !fs.is_dir(&folder_path) {
                result.destinations_created.push(candidate.folder.clone());
            }
            continue;
        }

        let existed = fs.is_dir(&folder_path);
        match fs.create_dir_if_absent(&folder_path) {
            Ok(()) => {
                if !existed {
                    result.destinations_created.push(candidate.folder.clone());
                }
            }
            Err(err) => {
                warn!(
                    "cannot create destination {}: {}",
                    folder_path.display(),
                    err
                );
                failed.insert(candidate.folder.clone(), err.to_string());
            }
        }
    }
    failed
}

fn start_pool(
    fs: Arc<dyn FileSystem>,
    options: &OrganizeOptions,
    sink: Arc<OutcomeSink>,
) -> Result<WorkerPool<Job>, OrganizeError> {
    let overwrite_existing = options.overwrite_existing;
    let pool = WorkerPool::new(options.workers, move |job: Job| {
        let moved = panic::catch_unwind(AssertUnwindSafe(|| {
            execute_move(fs.as_ref(), &job, overwrite_existing)
        }));
        let error = match moved {
            Ok(outcome) => outcome.err(),
            Err(_) => Some(format!(
                "{}: move to {} aborted unexpectedly",
                job.source.display(),
                job.destination.display()
            )),
        };
        if let Some(message) = &error {
            warn!("{message}");
        }
        sink.record(JobOutcome { job, error });
    })?;
    Ok(pool)
}

fn execute_move(fs: &dyn FileSystem, job: &Job, overwrite_existing: bool) -> Result<(), String> {
    if !overwrite_existing && fs.exists(&job.destination) {
        return Err(format!(
            "{}: destination already exists: {}",
            job.source.display(),
            job.destination.display()
        ));
    }
    fs.atomic_move(&job.source, &job.destination).map_err(|err| {
        format!(
            "{}: failed to move to {}: {}",
            job.source.display(),
            job.destination.display(),
            err
        )
    })
}

fn aggregate_outcomes(outcomes: Vec<JobOutcome>, result: &mut ReorganizationResult) {
    for JobOutcome { job, error } in outcomes {
        let status = match error {
            None => {
                result.jobs_succeeded += 1;
                MoveStatus::Moved
            }
            Some(message) => {
                result.jobs_failed += 1;
                result.failures.push(JobFailure {
                    kind: FailureKind::Move,
                    source: job.source.clone(),
                    destination: job.destination.clone(),
                    message,
                });
                MoveStatus::Failed
            }
        };
        result.moves.push(MoveRecord {
            source: job.source,
            destination: job.destination,
            folder: job.folder,
            status,
        });
    }
}

fn finish(mut result: ReorganizationResult, started: Instant) -> ReorganizationResult {
    result.moves.sort_by(|a, b| a.source.cmp(&b.source));
    result.failures.sort_by(|a, b| a.source.cmp(&b.source));
    result.finished_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    result.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        "run {}: scanned={} submitted={} succeeded={} failed={} skipped={}",
        result.run_id,
        result.files_scanned,
        result.jobs_submitted,
        result.jobs_succeeded,
        result.jobs_failed,
        result.jobs_skipped
    );
    result
}

struct ExcludeMatcher {
    globset: Option<GlobSet>,
    substrings: Vec<String>,
}

impl ExcludeMatcher {
    fn new(patterns: &[String], warnings: &mut Vec<String>) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut substrings = Vec::new();
        let mut globs = 0_usize;
        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            if is_plain_substring_pattern(pattern) {
                substrings.push(pattern.to_string());
                continue;
            }
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                    globs += 1;
                }
                Err(err) => {
                    warnings.push(format!(
                        "invalid exclude glob '{pattern}': {err}; using substring fallback."
                    ));
                    substrings.push(pattern.to_string());
                }
            }
        }

        let globset = if globs == 0 {
            None
        } else {
            match builder.build() {
                Ok(set) => Some(set),
                Err(err) => {
                    warnings.push(format!(
                        "failed to compile exclude glob set: {err}; glob excludes disabled."
                    ));
                    None
                }
            }
        };

        Self {
            globset,
            substrings,
        }
    }

    fn is_excluded(&self, file_name: &str) -> bool {
        if self
            .globset
            .as_ref()
            .is_some_and(|globset| globset.is_match(file_name))
        {
            return true;
        }
        self.substrings
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
    }
}

fn is_plain_substring_pattern(pattern: &str) -> bool {
    !pattern
        .chars()
        .any(|ch| matches!(ch, '*' | '?' | '[' | ']' | '{' | '}'))
}

#[cfg(test)]
mod tests {
    use super::{validate_options, ExcludeMatcher, OrganizeOptions};

    #[test]
    fn exclude_matcher_matches_glob_and_substring() {
        let mut warnings = Vec::new();
        let matcher = ExcludeMatcher::new(
            &[
                "*.tmp".to_string(),
                "[".to_string(),
                "draft".to_string(),
            ],
            &mut warnings,
        );

        assert!(matcher.is_excluded("cache.tmp"));
        assert!(matcher.is_excluded("draft-notes.txt"));
        assert!(!matcher.is_excluded("notes.txt"));
        assert!(!warnings.is_empty());
    }

    #[test]
    fn rejects_zero_workers() {
        let options = OrganizeOptions {
            workers: 0,
            ..OrganizeOptions::default()
        };
        assert!(validate_options(&options).is_err());
    }
}
