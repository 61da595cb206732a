use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgAction;
use clap::{Args, Parser, Subcommand};
use file_organizer_core::{
    render_markdown_summary, render_status_message, run_reorganization, write_result_json,
    OrganizeMode, OrganizeOptions, ReorganizationRequest, ReorganizationResult, DEFAULT_WORKERS,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "file-organizer",
    version,
    about = "Move files into folders by first letter, name keyword, or content keyword."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Move each file into a folder named after its first letter (A-Z).
    Alphabetical(CommonArgs),
    /// Move files whose name contains a keyword into a folder named after it.
    Keyword(KeywordArgs),
    /// Move files into the folder of the first keyword found in their content.
    Content(ContentArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Directory whose top-level files are organized.
    #[arg(long, value_name = "DIR")]
    dir: PathBuf,

    /// Number of concurrent move workers.
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Plan the moves without creating folders or moving files.
    #[arg(long)]
    dry_run: bool,

    /// Skip files whose name matches a glob or contains a substring (repeatable).
    #[arg(long = "exclude", value_name = "GLOB", num_args = 1.., action = ArgAction::Append)]
    exclude: Vec<String>,

    /// Replace files that already exist at the destination.
    #[arg(long)]
    overwrite: bool,

    /// Optional JSON result output file.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Optional markdown summary output file.
    #[arg(long, value_name = "FILE")]
    md: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct KeywordArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Case-sensitive substring to look for in file names.
    #[arg(long)]
    keyword: String,
}

#[derive(Debug, Args)]
struct ContentArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Keywords searched in file content, in priority order (repeatable).
    #[arg(long = "keyword", value_name = "KEYWORD", required = true, action = ArgAction::Append)]
    keywords: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Alphabetical(args) => run_command(args, OrganizeMode::Alphabetical),
        Commands::Keyword(args) => run_command(
            args.common,
            OrganizeMode::Keyword {
                keyword: args.keyword,
            },
        ),
        Commands::Content(args) => run_command(
            args.common,
            OrganizeMode::Content {
                keywords: args.keywords,
            },
        ),
    }
}

fn run_command(args: CommonArgs, mode: OrganizeMode) -> Result<()> {
    let CommonArgs {
        dir,
        workers,
        dry_run,
        exclude,
        overwrite,
        output,
        md,
    } = args;

    let options = OrganizeOptions {
        workers,
        dry_run,
        excludes: exclude,
        overwrite_existing: overwrite,
        ..OrganizeOptions::default()
    };
    let request = ReorganizationRequest::new(dir, mode);
    let result = run_reorganization(&request, &options)
        .with_context(|| format!("cannot organize {}", request.source_dir.display()))?;

    println!("{}", render_status_message(&result));
    print_moves(&result);

    if let Some(output) = output {
        write_result_json(&result, &output)?;
        println!("Result JSON written to {}", output.display());
    }

    if let Some(md_path) = md {
        fs::write(&md_path, render_markdown_summary(&result)).with_context(|| {
            format!("failed to write markdown summary to {}", md_path.display())
        })?;
        println!("Markdown summary written to {}", md_path.display());
    }

    if !result.is_success() {
        anyhow::bail!("{} file(s) could not be moved", result.failures.len());
    }
    Ok(())
}

fn print_moves(result: &ReorganizationResult) {
    if !result.dry_run {
        return;
    }
    for record in &result.moves {
        println!(
            "- {} -> {}",
            record.source.display(),
            record.destination.display()
        );
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
