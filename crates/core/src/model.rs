use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub extension: Option<String>,
}

impl FileEntry {
    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());
        Self {
            path,
            file_name,
            size_bytes,
            extension,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrganizeMode {
    Alphabetical,
    Keyword { keyword: String },
    Content { keywords: Vec<String> },
}

impl OrganizeMode {
    pub fn label(&self) -> &'static str {
        match self {
            OrganizeMode::Alphabetical => "alphabetical",
            OrganizeMode::Keyword { .. } => "keyword",
            OrganizeMode::Content { .. } => "content",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReorganizationRequest {
    pub source_dir: PathBuf,
    pub mode: OrganizeMode,
}

impl ReorganizationRequest {
    pub fn new(source_dir: impl Into<PathBuf>, mode: OrganizeMode) -> Self {
        Self {
            source_dir: source_dir.into(),
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub folder: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    #[default]
    Completed,
    NoFiles,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveStatus {
    Moved,
    Failed,
    Skipped,
    Planned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub folder: String,
    pub status: MoveStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    // Folder could not be created; the job was never submitted.
    Destination,
    Move,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReorganizationResult {
    pub run_id: String,
    pub source_dir: PathBuf,
    pub mode: OrganizeMode,
    pub outcome: RunOutcome,
    #[serde(default)]
    pub dry_run: bool,
    pub started_at: String,
    pub finished_at: String,
    #[serde(default)]
    pub elapsed_ms: u64,
    pub files_scanned: u64,
    pub files_unmatched: u64,
    pub jobs_submitted: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    #[serde(default)]
    pub jobs_skipped: u64,
    #[serde(default)]
    pub destinations_created: Vec<String>,
    #[serde(default)]
    pub moves: Vec<MoveRecord>,
    pub failures: Vec<JobFailure>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ReorganizationResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Scanning,
    Classifying,
    PreparingDestinations,
    Dispatching,
    Draining,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunEvent {
    pub seq: u64,
    pub run_id: String,
    pub phase: RunPhase,
    pub current_path: Option<String>,
    pub files_scanned: u64,
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub timestamp: String,
}
