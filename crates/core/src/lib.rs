pub mod classify;
pub mod error;
pub mod filesystem;
pub mod model;
pub mod organize;
pub mod pool;
pub mod priority;
pub mod summary;

pub use classify::{classify, content_bucket, keyword_bucket, letter_bucket, validate_mode};
pub use error::OrganizeError;
pub use filesystem::{FileSystem, LocalFileSystem};
pub use model::{
    FailureKind, FileEntry, Job, JobFailure, MoveRecord, MoveStatus, OrganizeMode,
    ReorganizationRequest, ReorganizationResult, RunEvent, RunOutcome, RunPhase,
};
pub use organize::{
    run_reorganization, run_reorganization_on, run_reorganization_with_callback,
    OrganizeOptions,
};
pub use pool::{PoolError, PoolStats, WorkerPool, DEFAULT_WORKERS};
pub use priority::{priority_score, CHEAP_EXTENSIONS, CHEAP_EXTENSION_BONUS};
pub use summary::{render_markdown_summary, render_status_message, write_result_json};
