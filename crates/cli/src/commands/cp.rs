//! cp command - Copy one object or file
//!
//! Either side may be a Cloud Storage object, a local file, or `-` for the
//! process's standard streams. A destination of `.` names a local file after
//! the source's basename.

use clap::Args;
use gscp_core::{Config, Copier, Location, TransferSummary, human_size};
use gscp_gcs::GcsClient;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Copy a single object or file
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source: gs://bucket/key, a local path, or - for standard input
    pub source: String,

    /// Destination: gs://bucket/key, a local path, - for standard output,
    /// or . for a local file named after the source
    pub target: String,
}

#[derive(Debug, Serialize)]
struct CpOutput {
    status: &'static str,
    source: String,
    target: String,
    size_bytes: u64,
    size_human: String,
}

impl From<TransferSummary> for CpOutput {
    fn from(summary: TransferSummary) -> Self {
        Self {
            status: "success",
            size_human: human_size(summary.bytes),
            size_bytes: summary.bytes,
            source: summary.source,
            target: summary.destination,
        }
    }
}

/// Execute the cp command
pub async fn execute(args: CpArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config.clone());

    let source = match Location::parse(&args.source) {
        Ok(l) => l,
        Err(e) => {
            formatter.error(&format!("Invalid source path: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let target = match Location::resolve_destination(&args.source, &args.target) {
        Ok(l) => l,
        Err(e) => {
            formatter.error(&format!("Invalid target path: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    // Only remote transfers need credentials and a network client
    let client = if source.is_remote() || target.is_remote() {
        match GcsClient::new(&config.storage).await {
            Ok(c) => Some(c),
            Err(e) => {
                formatter.error(&format!("Failed to create storage client: {e}"));
                return ExitCode::from_error(&e);
            }
        }
    } else {
        None
    };

    let progress = ProgressBar::for_transfer(
        &output_config,
        config.defaults.progress && !target.is_stdio(),
    );

    let mut copier = Copier::new(config.defaults.transfer_options())
        .with_observer(&progress)
        .interrupt_on(ctrl_c());
    if let Some(client) = &client {
        copier = copier.with_store(client);
    }

    let result = copier.copy(&source, &target).await;
    progress.finish_and_clear();

    match result {
        Ok(summary) => {
            report(&formatter, &target, summary);
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to copy {source} to {target}: {e}"));
            ExitCode::from_error(&e)
        }
    }
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

fn report(formatter: &Formatter, target: &Location, summary: TransferSummary) {
    // Standard output carries the object itself
    if target.is_stdio() {
        return;
    }

    let output = CpOutput::from(summary);
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        formatter.println(&format!(
            "{} -> {} ({})",
            output.source, output.target, output.size_human
        ));
    }
}
