// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use pdflock_batch::{BatchOrchestrator, OutputPolicy, OutputTarget};
use pdflock_core::config::LockerConfig;
use pdflock_core::error::{LockerError, Result};
use pdflock_core::human_errors::{humanize_failure, summarize_batch};
use pdflock_core::types::{BatchOutcome, InputDocument};
use pdflock_document::{PdfReader, is_protected};
use pdflock_security::{
    PasswordPattern, PasswordSpec, derive_password, extract_identifier, fingerprint,
    validate_date,
};
use tracing::{info, warn};

use crate::config_dir::{default_config_path, load_config};
use crate::report::BatchReport;

/// Password-protect PDF and Office documents with AES-256.
#[derive(Debug, Parser)]
#[command(name = "pdflock", version, about)]
pub struct Cli {
    /// Config file (default: the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Protect files with one password
    Lock(LockArgs),
    /// Show the password a derivation pattern gives for a file name
    Derive {
        /// File name containing a 7-10 digit identifier
        filename: String,
        /// Derivation pattern
        #[arg(long)]
        pattern: PasswordPattern,
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        day: Option<String>,
    },
    /// Show page count, metadata and protection state of a PDF
    Inspect {
        file: PathBuf,
        /// Password of a protected PDF, to show its pages and metadata
        #[arg(long)]
        password: Option<String>,
    },
    /// Show the active configuration
    Config {
        /// Write the defaults to the config file if it does not exist
        #[arg(long)]
        init: bool,
    },
}

#[derive(Debug, Args)]
pub struct LockArgs {
    /// PDF, .docx, .xlsx or .pptx files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Password to apply
    #[arg(long, conflicts_with = "derive")]
    pub password: Option<String>,

    /// Derive the password from the identifier in the first file name
    #[arg(long, value_name = "PATTERN")]
    pub derive: Option<PasswordPattern>,

    /// Identifier to derive from instead of the file name
    #[arg(long, requires = "derive")]
    pub id: Option<String>,

    /// Date for date-based patterns, as YYYYMMDD
    #[arg(long, requires = "derive")]
    pub date: Option<String>,

    /// Write outputs to this folder instead of next to the originals
    #[arg(long, conflicts_with = "fixed_dir")]
    pub out_dir: Option<PathBuf>,

    /// Write outputs to the configured fixed folder
    #[arg(long)]
    pub fixed_dir: bool,

    /// Output file name prefix (default from config)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Print a JSON report instead of text
    #[arg(long)]
    pub json: bool,
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Lock(args) => lock(args, config).await,
        Commands::Derive {
            filename,
            pattern,
            year,
            month,
            day,
        } => derive(&filename, pattern, year, month, day),
        Commands::Inspect { file, password } => inspect(&file, password.as_deref()),
        Commands::Config { init } => show_config(cli.config.as_deref(), &config, init),
    }
}

async fn lock(args: LockArgs, mut config: LockerConfig) -> Result<ExitCode> {
    if let Some(prefix) = &args.prefix {
        config.output_prefix = prefix.clone();
    }
    let password = password_spec(&args)?;
    let policy = match &args.out_dir {
        Some(dir) => OutputPolicy::new(
            OutputTarget::ChosenDirectory(dir.clone()),
            config.output_prefix.clone(),
        ),
        None if args.fixed_dir => OutputPolicy::fixed_directory(&config),
        None => OutputPolicy::same_directory(&config),
    };
    let prefix = config.output_prefix.clone();
    let inputs: Vec<InputDocument> = args.files.iter().map(InputDocument::from_path).collect();

    let orchestrator = Arc::new(BatchOrchestrator::from_config(config));
    let mut handle = orchestrator.spawn(inputs, password, policy);

    while let Some(progress) = handle.progress.recv().await {
        if !args.json {
            let mark = if progress.succeeded { "ok" } else { "failed" };
            println!(
                "[{}/{}] {mark:<6} {}",
                progress.index + 1,
                progress.total,
                progress.filename
            );
        }
    }

    let batch = handle
        .result
        .await
        .map_err(|err| LockerError::Unexpected(format!("batch task failed: {err}")))??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&BatchReport::from(&batch))?);
    } else {
        let summary = summarize_batch(&batch, &prefix);
        println!("\n{}\n{}", summary.title, summary.body);
        for result in &batch.results {
            if let Some(failure) = &result.failure {
                let human = humanize_failure(failure);
                println!("\n{}: {}\n  {}", result.original_filename, human.message, human.suggestion);
            }
        }
    }

    Ok(match batch.outcome() {
        BatchOutcome::Empty | BatchOutcome::AllSucceeded => ExitCode::SUCCESS,
        BatchOutcome::PartiallyFailed | BatchOutcome::AllFailed => ExitCode::from(1),
    })
}

fn password_spec(args: &LockArgs) -> Result<PasswordSpec> {
    let Some(pattern) = args.derive else {
        return match &args.password {
            Some(password) => Ok(PasswordSpec::Literal(password.clone())),
            None => Err(LockerError::PasswordEmpty),
        };
    };

    let identifier = match &args.id {
        Some(id) => id.clone(),
        None => args
            .files
            .iter()
            .filter_map(|path| path.file_name())
            .find_map(|name| extract_identifier(&name.to_string_lossy()))
            .ok_or_else(|| {
                warn!("no 7-10 digit identifier in the file names");
                LockerError::PasswordEmpty
            })?,
    };
    let date = args.date.as_deref().map(parse_compact_date).transpose()?;

    Ok(PasswordSpec::Derived {
        identifier,
        pattern,
        date,
    })
}

/// `YYYYMMDD` → validated `YYYYMMDD`.
fn parse_compact_date(raw: &str) -> Result<String> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LockerError::InvalidDate(
            "the date must be written as YYYYMMDD".into(),
        ));
    }
    validate_date(&raw[..4], &raw[4..6], &raw[6..])
}

fn derive(
    filename: &str,
    pattern: PasswordPattern,
    year: Option<String>,
    month: Option<String>,
    day: Option<String>,
) -> Result<ExitCode> {
    let Some(identifier) = extract_identifier(filename) else {
        eprintln!("No 7-10 digit identifier found in \"{filename}\".");
        return Ok(ExitCode::from(1));
    };

    let date = if pattern.uses_date() {
        match (year, month, day) {
            (Some(year), Some(month), Some(day)) => Some(validate_date(&year, &month, &day)?),
            _ => {
                return Err(LockerError::InvalidDate(format!(
                    "the {pattern} pattern needs --year, --month and --day"
                )));
            }
        }
    } else {
        None
    };

    let password = derive_password(&identifier, pattern, date.as_deref());
    if password.is_empty() {
        return Err(LockerError::PasswordEmpty);
    }

    println!("identifier: {identifier}");
    println!("password:   {password}");
    Ok(ExitCode::SUCCESS)
}

fn inspect(file: &Path, password: Option<&str>) -> Result<ExitCode> {
    let data = std::fs::read(file).map_err(|source| LockerError::SourceUnreadable {
        path: file.to_path_buf(),
        source,
    })?;
    let protected = is_protected(&data);
    info!(file = %file.display(), protected, "inspecting");

    println!("file:        {}", file.display());
    println!("protected:   {}", if protected { "yes" } else { "no" });
    println!("sha256:      {}", fingerprint(&data));

    let reader = match (protected, password) {
        (false, _) => PdfReader::from_bytes(&data)?,
        (true, Some(password)) => PdfReader::unlock(&data, password)?,
        (true, None) => {
            warn!("protected PDF; pass --password to read its pages");
            return Ok(ExitCode::SUCCESS);
        }
    };

    println!("pages:       {}", reader.page_count());
    let metadata = reader.metadata();
    let fields = [
        ("title", metadata.title),
        ("author", metadata.author),
        ("subject", metadata.subject),
        ("keywords", metadata.keywords),
        ("creator", metadata.creator),
        ("producer", metadata.producer),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{:<12} {value}", format!("{label}:"));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn show_config(explicit: Option<&Path>, config: &LockerConfig, init: bool) -> Result<ExitCode> {
    let path = explicit.map_or_else(default_config_path, Path::to_path_buf);
    if init && !path.exists() {
        config.save(&path)?;
        println!("wrote {}", path.display());
    }
    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn password_and_derive_conflict() {
        let parsed = Cli::try_parse_from([
            "pdflock", "lock", "a.pdf", "--password", "abcd", "--derive", "id_only",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn derived_spec_uses_first_identifier() {
        let cli = Cli::try_parse_from([
            "pdflock",
            "lock",
            "notes.pdf",
            "CT_12345678_20260110.pdf",
            "--derive",
            "id_yyyymmdd",
            "--date",
            "19800101",
        ])
        .expect("parse");
        let Commands::Lock(args) = cli.command else {
            panic!("expected lock");
        };
        let spec = password_spec(&args).expect("spec");
        assert_eq!(spec.resolve(4).expect("resolve"), "12345678-19800101");
    }

    #[test]
    fn compact_dates() {
        assert_eq!(parse_compact_date("19800101").expect("valid"), "19800101");
        assert!(matches!(parse_compact_date("1980-1-1"), Err(LockerError::InvalidDate(_))));
        assert!(matches!(parse_compact_date("19801301"), Err(LockerError::InvalidDate(_))));
    }

    #[test]
    fn missing_password_is_refused() {
        let cli = Cli::try_parse_from(["pdflock", "lock", "a.pdf"]).expect("parse");
        let Commands::Lock(args) = cli.command else {
            panic!("expected lock");
        };
        assert!(matches!(password_spec(&args), Err(LockerError::PasswordEmpty)));
    }
}
