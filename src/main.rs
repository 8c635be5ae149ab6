//! CLI entry point for the imgharvest tool.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use imgharvest_core::{
    ConfigError, OutcomeRecord, OutcomeStatus, RunSummary, RunVerdict, start_harvest,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

/// Process exit outcome mapped onto the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    Partial,
    Failure,
}

impl From<RunVerdict> for ProcessExit {
    fn from(verdict: RunVerdict) -> Self {
        match verdict {
            RunVerdict::Success => Self::Success,
            RunVerdict::Partial => Self::Partial,
            RunVerdict::Failure => Self::Failure,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Partial => ExitCode::from(1u8),
            ProcessExit::Failure => ExitCode::from(2u8),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(&args).await {
        Ok(exit) => exit.into(),
        Err(error) => {
            error!("{error:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: &Args) -> Result<ProcessExit> {
    let config = args.to_config();
    if let Err(ConfigError::EmptyQuery) = config.validate() {
        error!("--query must not be empty");
        return Ok(ProcessExit::Failure);
    }

    info!(
        query = %config.query,
        output_dir = %config.output_dir.display(),
        max_routines = config.max_routines,
        "imgharvest starting"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let mut handle = start_harvest(&config, cancel).await?;

    let mut summary = RunSummary::new();
    while let Some(record) = handle.outcomes().next().await {
        log_outcome(&record);
        summary.record(&record);
    }
    handle.finish().await;

    info!(
        fetched = summary.fetched(),
        failed = summary.fetch_failed(),
        verdict = ?summary.verdict(),
        "harvest complete"
    );

    Ok(summary.verdict().into())
}

fn log_outcome(record: &OutcomeRecord) {
    let subject = record.subject.as_deref().unwrap_or("");
    match (record.status, &record.detail) {
        (OutcomeStatus::Success, _) => {
            info!(subject, "{}: Succeeded.", record.component);
        }
        (OutcomeStatus::Failure, Some(detail)) if detail.is_cancelled() => {
            warn!(subject, "{}: {detail}", record.component);
        }
        (OutcomeStatus::Failure, Some(detail)) => {
            error!(subject, "{}: {detail}", record.component);
        }
        (OutcomeStatus::Failure, None) => {
            error!(subject, "{}: Failed.", record.component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_verdict() {
        assert_eq!(ProcessExit::from(RunVerdict::Success), ProcessExit::Success);
        assert_eq!(ProcessExit::from(RunVerdict::Partial), ProcessExit::Partial);
        assert_eq!(ProcessExit::from(RunVerdict::Failure), ProcessExit::Failure);
        assert_eq!(ExitCode::from(ProcessExit::Success), ExitCode::SUCCESS);
        assert_eq!(ExitCode::from(ProcessExit::Partial), ExitCode::from(1u8));
        assert_eq!(ExitCode::from(ProcessExit::Failure), ExitCode::from(2u8));
    }
}
