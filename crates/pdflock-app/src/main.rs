// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdflock — batch password protection for PDF and Office documents.
//
// Entry point. Initialises logging, parses the command line and maps the
// outcome to an exit code: 0 all done, 1 some files failed, 2 refused.

mod cli;
mod config_dir;
mod report;

use std::process::ExitCode;

use clap::Parser;
use pdflock_core::error::LockerError;
use pdflock_core::human_errors::humanize_error;

use cli::Cli;

/// Exit code when the request was refused before any file was touched.
const EXIT_REFUSED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("pdflock starting");

    let cli = Cli::parse();
    match cli::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("{}\n{}\n({err})", human.message, human.suggestion);
            if err.is_validation() || matches!(err, LockerError::Config(_)) {
                ExitCode::from(EXIT_REFUSED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
