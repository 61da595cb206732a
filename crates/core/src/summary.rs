use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{MoveStatus, OrganizeMode, ReorganizationResult, RunOutcome};

pub const STATUS_FAILURE_PREVIEW: usize = 5;

pub fn render_status_message(result: &ReorganizationResult) -> String {
    if result.outcome == RunOutcome::NoFiles {
        return "No files found.".to_string();
    }

    let mut out = String::new();
    if result.dry_run {
        out.push_str("Dry run: ");
    }
    out.push_str(&headline(&result.mode));
    if result.dry_run {
        let planned = result
            .moves
            .iter()
            .filter(|record| record.status == MoveStatus::Planned)
            .count();
        out.push_str(&format!(
            " {} scanned, {} planned, {} unmatched.",
            result.files_scanned, planned, result.files_unmatched
        ));
    } else {
        out.push_str(&format!(
            " {} scanned, {} moved, {} failed, {} unmatched.",
            result.files_scanned,
            result.jobs_succeeded,
            result.jobs_failed + result.jobs_skipped,
            result.files_unmatched
        ));
    }

    if !result.failures.is_empty() {
        out.push_str(&format!("\n{} failure(s):", result.failures.len()));
        for failure in result.failures.iter().take(STATUS_FAILURE_PREVIEW) {
            out.push_str("\n- ");
            out.push_str(&failure.message);
        }
        let hidden = result.failures.len().saturating_sub(STATUS_FAILURE_PREVIEW);
        if hidden > 0 {
            out.push_str(&format!("\n... and {hidden} more."));
        }
    }
    out
}

fn headline(mode: &OrganizeMode) -> String {
    match mode {
        OrganizeMode::Alphabetical => "Files organized alphabetically!".to_string(),
        OrganizeMode::Keyword { keyword } => {
            format!("Files with keyword '{keyword}' moved successfully!")
        }
        OrganizeMode::Content { .. } => "Files organized by content!".to_string(),
    }
}

pub fn render_markdown_summary(result: &ReorganizationResult) -> String {
    let mut out = String::new();
    out.push_str("# File Organizer Summary\n\n");
    out.push_str(&format!(
        "- Run: `{}`\n- Source: `{}`\n- Mode: `{}`\n- Started: `{}`\n- Finished: `{}`\n- Elapsed: `{} ms`\n- Dry run: `{}`\n\n",
        result.run_id,
        result.source_dir.display(),
        result.mode.label(),
        result.started_at,
        result.finished_at,
        result.elapsed_ms,
        result.dry_run
    ));

    out.push_str("## Counts\n\n");
    out.push_str(&format!(
        "- Scanned: {}\n- Unmatched: {}\n- Submitted: {}\n- Succeeded: {}\n- Failed: {}\n- Skipped (destination unavailable): {}\n\n",
        result.files_scanned,
        result.files_unmatched,
        result.jobs_submitted,
        result.jobs_succeeded,
        result.jobs_failed,
        result.jobs_skipped
    ));

    if !result.destinations_created.is_empty() {
        out.push_str("## Folders Created\n\n");
        for folder in &result.destinations_created {
            out.push_str(&format!("- `{folder}`\n"));
        }
        out.push('\n');
    }

    out.push_str("## Moves\n\n");
    if result.moves.is_empty() {
        out.push_str("No files were routed to a folder.\n\n");
    } else {
        for record in &result.moves {
            out.push_str(&format!(
                "- `{}` -> `{}` ({:?})\n",
                record.source.display(),
                record.folder,
                record.status
            ));
        }
        out.push('\n');
    }

    if !result.failures.is_empty() {
        out.push_str("## Failures\n\n");
        for failure in &result.failures {
            out.push_str(&format!("- [{:?}] {}\n", failure.kind, failure.message));
        }
        out.push('\n');
    }

    if !result.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for warning in &result.warnings {
            out.push_str(&format!("- {warning}\n"));
        }
    }

    out
}

pub fn write_result_json(result: &ReorganizationResult, output_path: impl AsRef<Path>) -> Result<()> {
    let path = output_path.as_ref();
    let payload =
        serde_json::to_string_pretty(result).context("failed to serialize reorganization result")?;
    fs::write(path, payload)
        .with_context(|| format!("failed to write result to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{render_markdown_summary, render_status_message};
    use crate::model::{
        FailureKind, JobFailure, MoveRecord, MoveStatus, OrganizeMode, ReorganizationResult,
        RunOutcome,
    };

    fn result(mode: OrganizeMode) -> ReorganizationResult {
        ReorganizationResult {
            run_id: "run-1".to_string(),
            source_dir: PathBuf::from("/data"),
            mode,
            outcome: RunOutcome::Completed,
            dry_run: false,
            started_at: "2024-01-01T00:00:00Z".to_string(),
            finished_at: "2024-01-01T00:00:01Z".to_string(),
            elapsed_ms: 1000,
            files_scanned: 3,
            files_unmatched: 1,
            jobs_submitted: 2,
            jobs_succeeded: 2,
            jobs_failed: 0,
            jobs_skipped: 0,
            destinations_created: vec!["A".to_string()],
            moves: vec![MoveRecord {
                source: PathBuf::from("/data/apple.doc"),
                destination: PathBuf::from("/data/A/apple.doc"),
                folder: "A".to_string(),
                status: MoveStatus::Moved,
            }],
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn failure(index: usize) -> JobFailure {
        JobFailure {
            kind: FailureKind::Move,
            source: PathBuf::from(format!("/data/f{index}")),
            destination: PathBuf::from(format!("/data/F/f{index}")),
            message: format!("/data/f{index}: permission denied"),
        }
    }

    #[test]
    fn no_files_message() {
        let mut empty = result(OrganizeMode::Alphabetical);
        empty.outcome = RunOutcome::NoFiles;
        assert_eq!(render_status_message(&empty), "No files found.");
    }

    #[test]
    fn success_message_names_mode_and_counts() {
        let message = render_status_message(&result(OrganizeMode::Keyword {
            keyword: "invoice".to_string(),
        }));
        assert_eq!(
            message,
            "Files with keyword 'invoice' moved successfully! 3 scanned, 2 moved, 0 failed, 1 unmatched."
        );
    }

    #[test]
    fn failure_message_previews_first_failures() {
        let mut failed = result(OrganizeMode::Alphabetical);
        failed.jobs_failed = 7;
        failed.failures = (0..7).map(failure).collect();

        let message = render_status_message(&failed);
        assert!(message.contains("7 failure(s):"));
        assert!(message.contains("/data/f0: permission denied"));
        assert!(message.contains("/data/f4: permission denied"));
        assert!(!message.contains("/data/f5: permission denied"));
        assert!(message.ends_with("... and 2 more."));
    }

    #[test]
    fn markdown_lists_moves_and_folders() {
        let markdown = render_markdown_summary(&result(OrganizeMode::Alphabetical));
        assert!(markdown.starts_with("# File Organizer Summary"));
        assert!(markdown.contains("- `A`"));
        assert!(markdown.contains("`/data/apple.doc` -> `A` (Moved)"));
    }
}
