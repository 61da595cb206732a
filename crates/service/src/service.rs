use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;

use anyhow::{anyhow, Context, Result};
use file_organizer_core::{
    render_status_message, run_reorganization_with_callback, write_result_json, OrganizeMode,
    OrganizeOptions, ReorganizationRequest, ReorganizationResult, RunEvent, DEFAULT_WORKERS,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorganizeRequest {
    #[serde(default)]
    pub run_id: Option<String>,
    pub source_dir: PathBuf,
    pub mode: OrganizeMode,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub overwrite_existing: bool,
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_emit_events() -> bool {
    true
}

impl ReorganizeRequest {
    pub fn new(source_dir: impl Into<PathBuf>, mode: OrganizeMode) -> Self {
        Self {
            run_id: None,
            source_dir: source_dir.into(),
            mode,
            workers: default_workers(),
            dry_run: false,
            excludes: Vec::new(),
            overwrite_existing: false,
            emit_events: default_emit_events(),
            output: None,
        }
    }

    fn options(&self, run_id: &str) -> OrganizeOptions {
        OrganizeOptions {
            workers: self.workers,
            dry_run: self.dry_run,
            excludes: self.excludes.clone(),
            overwrite_existing: self.overwrite_existing,
            run_id: Some(run_id.to_string()),
            emit_events: self.emit_events,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunSessionStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSessionSnapshot {
    pub run_id: String,
    pub status: RunSessionStatus,
    pub status_message: Option<String>,
    pub result: Option<ReorganizationResult>,
    pub error: Option<String>,
    pub total_events: u64,
}

#[derive(Debug, Clone)]
struct RunSession {
    status: RunSessionStatus,
    result: Option<ReorganizationResult>,
    error: Option<String>,
    events: Vec<RunEvent>,
}

static SESSIONS: Lazy<Mutex<HashMap<String, RunSession>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub fn start_reorganization(request: ReorganizeRequest) -> Result<String> {
    let run_id = request
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    register_session(&run_id)?;

    let thread_run_id = run_id.clone();
    let spawned = thread::Builder::new()
        .name(format!("organize-run-{run_id}"))
        .spawn(move || {
            let outcome = execute_request(&request, &thread_run_id, |event| {
                if let Ok(mut sessions) = lock_sessions() {
                    if let Some(session) = sessions.get_mut(&thread_run_id) {
                        session.events.push(event);
                    }
                }
            });
            record_outcome(&thread_run_id, outcome);
        });

    if let Err(err) = spawned {
        let message = format!("failed to spawn reorganization thread: {err}");
        record_outcome(&run_id, Err(anyhow!(message.clone())));
        return Err(anyhow!(message));
    }
    Ok(run_id)
}

fn register_session(run_id: &str) -> Result<()> {
    let mut sessions = lock_sessions()?;
    if sessions
        .get(run_id)
        .is_some_and(|session| session.status == RunSessionStatus::Running)
    {
        return Err(anyhow!("run already in progress: {run_id}"));
    }
    sessions.insert(
        run_id.to_string(),
        RunSession {
            status: RunSessionStatus::Running,
            result: None,
            error: None,
            events: Vec::new(),
        },
    );
    Ok(())
}

fn record_outcome(run_id: &str, outcome: Result<ReorganizationResult>) {
    let Ok(mut sessions) = lock_sessions() else {
        return;
    };
    let Some(session) = sessions.get_mut(run_id) else {
        return;
    };
    match outcome {
        Ok(result) => {
            session.status = RunSessionStatus::Completed;
            session.result = Some(result);
            session.error = None;
        }
        Err(err) => {
            session.status = RunSessionStatus::Failed;
            session.error = Some(format!("{err:#}"));
        }
    }
}

pub fn run_reorganization_blocking(request: &ReorganizeRequest) -> Result<ReorganizationResult> {
    let run_id = request
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    execute_request(request, &run_id, |_| {})
}

fn execute_request<F>(
    request: &ReorganizeRequest,
    run_id: &str,
    on_event: F,
) -> Result<ReorganizationResult>
where
    F: FnMut(RunEvent),
{
    let core_request = ReorganizationRequest::new(request.source_dir.clone(), request.mode.clone());
    let mut result =
        run_reorganization_with_callback(&core_request, &request.options(run_id), on_event)?;
    // Moves have already happened; a failed write becomes a warning.
    if let Some(path) = &request.output {
        if let Err(err) = write_result_json(&result, path) {
            result.warnings.push(format!("{err:#}"));
        }
    }
    Ok(result)
}

pub fn poll_run_events(run_id: &str, from_seq: u64) -> Result<Vec<RunEvent>> {
    let sessions = lock_sessions()?;
    let session = sessions
        .get(run_id)
        .ok_or_else(|| anyhow!("run session not found: {run_id}"))?;

    Ok(session
        .events
        .iter()
        .filter(|event| event.seq > from_seq)
        .cloned()
        .collect())
}

pub fn get_run_session(run_id: &str) -> Result<RunSessionSnapshot> {
    let sessions = lock_sessions()?;
    let session = sessions
        .get(run_id)
        .ok_or_else(|| anyhow!("run session not found: {run_id}"))?;

    Ok(RunSessionSnapshot {
        run_id: run_id.to_string(),
        status: session.status.clone(),
        status_message: match session.status {
            RunSessionStatus::Running => None,
            RunSessionStatus::Completed => session.result.as_ref().map(render_status_message),
            RunSessionStatus::Failed => session.error.clone(),
        },
        result: session.result.clone(),
        error: session.error.clone(),
        total_events: session.events.len() as u64,
    })
}

pub fn forget_run_session(run_id: &str) -> Result<bool> {
    let mut sessions = lock_sessions()?;
    match sessions.get(run_id) {
        Some(session) if session.status != RunSessionStatus::Running => {
            sessions.remove(run_id);
            Ok(true)
        }
        _ => Ok(false),
    }
}

pub fn load_result(path: impl AsRef<Path>) -> Result<ReorganizationResult> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read result {}", path.display()))?;
    let result: ReorganizationResult = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(result)
}

fn lock_sessions() -> Result<std::sync::MutexGuard<'static, HashMap<String, RunSession>>> {
    SESSIONS
        .lock()
        .map_err(|_| anyhow!("run session registry lock poisoned"))
}
