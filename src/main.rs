mod analysis;
mod config;
mod git;
mod issue;
mod model;
mod pipeline;
mod report;
mod retry;
#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pipeline::{AnalyzeOptions, PipelineError};
use report::ReportError;

/// diff-triage: classifies the latest commit diff with an LLM and files
/// the resulting report as a labelled GitHub issue.
#[derive(Parser, Debug)]
#[command(name = "diff-triage", version, about)]
struct Cli {
    /// Path to the optional TOML settings file
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze HEAD~1..HEAD, write the report, then file it as an issue
    Analyze {
        /// Repository to diff
        #[arg(long, default_value = ".")]
        repo_dir: PathBuf,

        /// Report path (overrides report.path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only write the report; do not file an issue
        #[arg(long)]
        skip_issue: bool,
    },

    /// File a previously written report as an issue
    FileIssue {
        /// Report path (overrides report.path)
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Print the issue instead of creating it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log_failure(&e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), PipelineError> {
    info!(path = %cli.config.display(), "loading configuration");
    let config = config::Config::load(&cli.config)?;

    match cli.command {
        Command::Analyze {
            repo_dir,
            output,
            skip_issue,
        } => {
            let report_path = output.unwrap_or_else(|| config.report.path.clone());
            pipeline::run_analyze(
                &config,
                AnalyzeOptions {
                    repo_dir: &repo_dir,
                    report_path: &report_path,
                    file_issue: !skip_issue,
                },
            )
            .await
        }
        Command::FileIssue { report, dry_run } => {
            let report_path = report.unwrap_or_else(|| config.report.path.clone());
            pipeline::run_file_issue(&config, &report_path, dry_run).await
        }
    }?;

    info!("done");
    Ok(())
}

fn log_failure(e: &PipelineError) {
    match e {
        PipelineError::Config(err) => error!(error = %err, "configuration error; nothing was sent"),
        PipelineError::Report(ReportError::Missing(path)) => error!(
            path = %path.display(),
            "precondition failed: report file is missing; no issue was filed"
        ),
        PipelineError::Report(ReportError::Empty(path)) => error!(
            path = %path.display(),
            "precondition failed: report file is empty; no issue was filed"
        ),
        PipelineError::Report(err) => error!(error = %err, "report I/O failed"),
        PipelineError::HttpClient(err) => error!(error = %err, "could not build HTTP client"),
        PipelineError::Filing(err) => error!(error = %err, "issue creation failed; giving up"),
    }
}
