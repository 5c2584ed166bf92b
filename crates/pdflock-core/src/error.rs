// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for pdflock.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::OfficeKind;

/// Top-level error type for all pdflock operations.
#[derive(Debug, Error)]
pub enum LockerError {
    // -- Input errors --
    #[error("unsupported file type: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("cannot read {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -- Conversion errors --
    #[error("{capability} is not available")]
    CapabilityUnavailable { capability: String },

    #[error("{kind} conversion requires {required} (this machine runs {current})")]
    PlatformUnsupported {
        kind: OfficeKind,
        required: String,
        current: String,
    },

    #[error("{kind} conversion failed: {failure}")]
    ConversionFailed {
        kind: OfficeKind,
        failure: ConversionFailure,
    },

    // -- PDF errors --
    #[error("the PDF is already password protected")]
    AlreadyEncrypted,

    #[error("the PDF could not be read: {0}")]
    CorruptDocument(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    // -- Validation errors (refuse the whole batch) --
    #[error("no password given")]
    PasswordEmpty,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    // -- Output / workspace --
    #[error("cannot write {}: {source}", path.display())]
    PersistError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("temporary workspace unavailable: {0}")]
    WorkspaceError(#[source] std::io::Error),

    #[error("unexpected failure: {0}")]
    Unexpected(String),

    // -- Ambient --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why an external converter did not produce a PDF.
///
/// Produced by the renderer itself so that callers never need to inspect
/// free-form error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionFailure {
    /// The host office application (Excel, PowerPoint, LibreOffice) could not
    /// be started.
    HostApplicationMissing { application: String },
    /// The converter did not finish within the configured timeout.
    TimedOut { after: Duration },
    /// The converter ran and reported an error.
    Failed(String),
}

impl std::fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HostApplicationMissing { application } => write!(
                f,
                "{application} could not be started; check that it is installed"
            ),
            Self::TimedOut { after } => write!(f, "timed out after {}s", after.as_secs()),
            Self::Failed(message) => f.write_str(message),
        }
    }
}

/// Copyable tag for each error variant, stored in per-item results and
/// emitted in machine-readable reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    SourceUnreadable,
    CapabilityUnavailable,
    PlatformUnsupported,
    ConversionFailed,
    AlreadyEncrypted,
    CorruptDocument,
    EncryptionFailed,
    PasswordEmpty,
    PasswordTooShort,
    InvalidDate,
    PersistError,
    WorkspaceError,
    Unexpected,
}

impl LockerError {
    /// The tag for this error. Ambient errors (config, raw I/O, JSON) are
    /// reported as `Unexpected` when they surface at an item boundary.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            Self::SourceUnreadable { .. } => FailureKind::SourceUnreadable,
            Self::CapabilityUnavailable { .. } => FailureKind::CapabilityUnavailable,
            Self::PlatformUnsupported { .. } => FailureKind::PlatformUnsupported,
            Self::ConversionFailed { .. } => FailureKind::ConversionFailed,
            Self::AlreadyEncrypted => FailureKind::AlreadyEncrypted,
            Self::CorruptDocument(_) => FailureKind::CorruptDocument,
            Self::EncryptionFailed(_) => FailureKind::EncryptionFailed,
            Self::PasswordEmpty => FailureKind::PasswordEmpty,
            Self::PasswordTooShort { .. } => FailureKind::PasswordTooShort,
            Self::InvalidDate(_) => FailureKind::InvalidDate,
            Self::PersistError { .. } => FailureKind::PersistError,
            Self::WorkspaceError(_) => FailureKind::WorkspaceError,
            Self::Unexpected(_) | Self::Config(_) | Self::Io(_) | Self::Serialization(_) => {
                FailureKind::Unexpected
            }
        }
    }

    /// Validation errors apply to the password shared by every item, so they
    /// refuse the batch instead of failing a single item.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::PasswordEmpty | Self::PasswordTooShort { .. } | Self::InvalidDate(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LockerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_flagged() {
        assert!(LockerError::PasswordEmpty.is_validation());
        assert!(LockerError::PasswordTooShort { min: 4 }.is_validation());
        assert!(LockerError::InvalidDate("month 13".into()).is_validation());
        assert!(!LockerError::AlreadyEncrypted.is_validation());
    }

    #[test]
    fn ambient_errors_map_to_unexpected() {
        let err = LockerError::Config("bad".into());
        assert_eq!(err.kind(), FailureKind::Unexpected);
    }

    #[test]
    fn conversion_failure_display() {
        let failure = ConversionFailure::TimedOut {
            after: Duration::from_secs(30),
        };
        assert_eq!(failure.to_string(), "timed out after 30s");

        let err = LockerError::ConversionFailed {
            kind: OfficeKind::Spreadsheet,
            failure: ConversionFailure::Failed("boom".into()),
        };
        assert_eq!(err.to_string(), "Excel workbook conversion failed: boom");
    }
}
