// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages and batch summaries.
//
// Every failure is mapped to plain English with a clear suggestion. Front ends
// display these verbatim; the severity drives icon/colour choice.

use crate::error::{FailureKind, LockerError};
use crate::types::{BatchOutcome, BatchResult, ItemFailure};

/// Severity of a failure from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing is broken; the file just did not need (or could not take) this step.
    Informational,
    /// User must do something (pick another file, install software, free the file).
    ActionRequired,
    /// Cannot be fixed by the user for this file.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `LockerError` into a `HumanError`.
pub fn humanize_error(err: &LockerError) -> HumanError {
    let mut human = humanize_kind(err.kind());
    match err {
        // The renderer already phrased the host-missing case for people.
        LockerError::ConversionFailed { .. } => {
            human.suggestion = format!("{} ({err})", human.suggestion);
        }
        LockerError::PasswordTooShort { min } => {
            human.suggestion = format!("Use at least {min} characters.");
        }
        _ => {}
    }
    human
}

/// Convert a stored per-item failure into a `HumanError`.
pub fn humanize_failure(failure: &ItemFailure) -> HumanError {
    let mut human = humanize_kind(failure.kind);
    if matches!(
        failure.kind,
        FailureKind::ConversionFailed | FailureKind::Unexpected | FailureKind::CapabilityUnavailable
    ) {
        human.suggestion = format!("{} ({})", human.suggestion, failure.message);
    }
    human
}

fn humanize_kind(kind: FailureKind) -> HumanError {
    let (message, suggestion, severity) = match kind {
        FailureKind::UnsupportedFormat => (
            "This type of file isn't supported.",
            "Only PDF, Word (.docx), Excel (.xlsx) and PowerPoint (.pptx) files can be protected.",
            Severity::Permanent,
        ),
        FailureKind::SourceUnreadable => (
            "The file couldn't be opened.",
            "It may be open in another program, moved, or deleted. Close it and try again.",
            Severity::ActionRequired,
        ),
        FailureKind::CapabilityUnavailable => (
            "The converter for this file type isn't installed.",
            "Install the missing program, or save the file as PDF yourself and try again.",
            Severity::ActionRequired,
        ),
        FailureKind::PlatformUnsupported => (
            "This file type can't be converted on this computer.",
            "Excel and PowerPoint files can only be converted on Windows with Microsoft Office. Save the file as PDF first.",
            Severity::Permanent,
        ),
        FailureKind::ConversionFailed => (
            "The file couldn't be converted to PDF.",
            "Open the file once to check it isn't damaged, then try again.",
            Severity::ActionRequired,
        ),
        FailureKind::AlreadyEncrypted => (
            "This PDF already has a password.",
            "It was left unchanged. Remove the existing password first if you want to set a new one.",
            Severity::Informational,
        ),
        FailureKind::CorruptDocument => (
            "This PDF may be damaged.",
            "Try opening it in a PDF viewer, or save a fresh copy and try again.",
            Severity::Permanent,
        ),
        FailureKind::EncryptionFailed => (
            "The password couldn't be applied.",
            "Try again. If it keeps happening, re-save the PDF from its original program.",
            Severity::Permanent,
        ),
        FailureKind::PasswordEmpty => (
            "Please enter a password.",
            "Every protected file needs a password.",
            Severity::ActionRequired,
        ),
        FailureKind::PasswordTooShort => (
            "The password is too short.",
            "Choose a longer password.",
            Severity::ActionRequired,
        ),
        FailureKind::InvalidDate => (
            "The date doesn't look right.",
            "Enter the year as 4 digits, the month as 1-12 and the day as 1-31.",
            Severity::ActionRequired,
        ),
        FailureKind::PersistError => (
            "The protected file couldn't be saved.",
            "Check that the folder exists, that you may write to it, and that the file isn't open elsewhere.",
            Severity::ActionRequired,
        ),
        FailureKind::WorkspaceError => (
            "A temporary folder couldn't be created.",
            "Your disk may be full. Free some space and try again.",
            Severity::ActionRequired,
        ),
        FailureKind::Unexpected => (
            "Something unexpected went wrong.",
            "Try again. If this keeps happening, please report it.",
            Severity::Permanent,
        ),
    };

    HumanError {
        message: message.into(),
        suggestion: suggestion.into(),
        severity,
    }
}

/// Final message for a finished batch.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub title: String,
    pub body: String,
    pub outcome: BatchOutcome,
}

/// Phrase a batch result, distinguishing full success, partial failure and
/// total failure. `prefix` is mentioned so users know how to find outputs.
pub fn summarize_batch(batch: &BatchResult, prefix: &str) -> BatchSummary {
    let succeeded = batch.success_count();
    let failure_lines: Vec<String> = batch
        .failures()
        .iter()
        .map(|item| format!("- {}: {}", item.filename, item.failure.message))
        .collect();
    let outcome = batch.outcome();

    let (title, body) = match outcome {
        BatchOutcome::Empty => ("Nothing to do".to_string(), "No files were selected.".to_string()),
        BatchOutcome::AllSucceeded => {
            let naming = if prefix.is_empty() {
                String::new()
            } else {
                format!("\nSaved with \"{prefix}\" at the start of each file name.")
            };
            (
                "Done".to_string(),
                format!("Protected {succeeded} file(s) with a password.{naming}"),
            )
        }
        BatchOutcome::PartiallyFailed => (
            "Partly done".to_string(),
            format!(
                "Protected {succeeded} file(s).\n\nThese files had problems:\n{}",
                failure_lines.join("\n")
            ),
        ),
        BatchOutcome::AllFailed => (
            "Nothing was protected".to_string(),
            format!("Every file had a problem:\n{}", failure_lines.join("\n")),
        ),
    };

    BatchSummary {
        title,
        body,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionFailure;
    use crate::types::{BatchId, OfficeKind, OutputLocation, ProcessResult};
    use chrono::Utc;

    fn batch(results: Vec<ProcessResult>) -> BatchResult {
        BatchResult {
            id: BatchId::new(),
            results,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    fn ok(name: &str) -> ProcessResult {
        ProcessResult::succeeded(name, OutputLocation::Bytes(vec![]), String::new())
    }

    #[test]
    fn already_encrypted_is_informational() {
        let human = humanize_error(&LockerError::AlreadyEncrypted);
        assert_eq!(human.severity, Severity::Informational);
    }

    #[test]
    fn short_password_hint_uses_configured_minimum() {
        let human = humanize_error(&LockerError::PasswordTooShort { min: 12 });
        assert_eq!(human.suggestion, "Use at least 12 characters.");
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn host_missing_hint_reaches_user() {
        let err = LockerError::ConversionFailed {
            kind: OfficeKind::Presentation,
            failure: ConversionFailure::HostApplicationMissing {
                application: "Microsoft PowerPoint".into(),
            },
        };
        let human = humanize_failure(&ItemFailure::from(&err));
        assert!(human.suggestion.contains("check that it is installed"));
    }

    #[test]
    fn summary_distinguishes_outcomes() {
        let all_ok = summarize_batch(&batch(vec![ok("a.pdf")]), "locked_");
        assert_eq!(all_ok.outcome, BatchOutcome::AllSucceeded);
        assert!(all_ok.body.contains("locked_"));

        let bad = ProcessResult::failed("b.txt", &LockerError::UnsupportedFormat {
            extension: "txt".into(),
        });
        let partial = summarize_batch(&batch(vec![ok("a.pdf"), bad.clone()]), "locked_");
        assert_eq!(partial.outcome, BatchOutcome::PartiallyFailed);
        assert!(partial.body.contains("b.txt"));

        let failed = summarize_batch(&batch(vec![bad]), "locked_");
        assert_eq!(failed.outcome, BatchOutcome::AllFailed);
        assert_eq!(failed.title, "Nothing was protected");
    }
}
