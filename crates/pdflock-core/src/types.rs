// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the pdflock protection pipeline.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FailureKind, LockerError};

/// Unique identifier for one batch invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Office document families that need a PDF rendering step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfficeKind {
    /// `.docx`
    WordProcessor,
    /// `.xlsx`
    Spreadsheet,
    /// `.pptx`
    Presentation,
}

impl std::fmt::Display for OfficeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::WordProcessor => "Word document",
            Self::Spreadsheet => "Excel workbook",
            Self::Presentation => "PowerPoint presentation",
        })
    }
}

/// Detected format of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Office(OfficeKind),
    Unsupported,
}

impl DocumentFormat {
    /// Classify a file name by its extension, ignoring case.
    ///
    /// Unsupported extensions are a normal outcome, not an error.
    pub fn classify(name: impl AsRef<Path>) -> Self {
        let ext = name
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Office(OfficeKind::WordProcessor),
            Some("xlsx") => Self::Office(OfficeKind::Spreadsheet),
            Some("pptx") => Self::Office(OfficeKind::Presentation),
            _ => Self::Unsupported,
        }
    }

    /// Short label for list views.
    pub fn display_category(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Office(OfficeKind::WordProcessor) => "Word document",
            Self::Office(OfficeKind::Spreadsheet) => "Excel workbook",
            Self::Office(OfficeKind::Presentation) => "PowerPoint presentation",
            Self::Unsupported => "Unsupported file",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Where an input document's content lives.
#[derive(Debug, Clone)]
pub enum InputSource {
    /// A file on local disk.
    Path(PathBuf),
    /// Uploaded content that never touched local disk.
    Bytes(Vec<u8>),
}

/// One document selected or uploaded by the user.
#[derive(Debug, Clone)]
pub struct InputDocument {
    source: InputSource,
    filename: String,
    format: DocumentFormat,
}

impl InputDocument {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let format = DocumentFormat::classify(&filename);
        Self {
            source: InputSource::Path(path),
            filename,
            format,
        }
    }

    pub fn from_bytes(data: Vec<u8>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let format = DocumentFormat::classify(&filename);
        Self {
            source: InputSource::Bytes(data),
            filename,
            format,
        }
    }

    pub fn source(&self) -> &InputSource {
        &self.source
    }

    /// Original file name including its extension.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.filename)
    }

    /// Lower-cased extension, or an empty string.
    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}

/// Where a protected PDF ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLocation {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Failure recorded against a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&LockerError> for ItemFailure {
    fn from(err: &LockerError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of processing one input document.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub original_filename: String,
    pub output: Option<OutputLocation>,
    pub failure: Option<ItemFailure>,
    /// SHA-256 of the protected output, hex encoded.
    pub fingerprint: Option<String>,
}

impl ProcessResult {
    pub fn succeeded(
        original_filename: impl Into<String>,
        output: OutputLocation,
        fingerprint: String,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            output: Some(output),
            failure: None,
            fingerprint: Some(fingerprint),
        }
    }

    pub fn failed(original_filename: impl Into<String>, err: &LockerError) -> Self {
        Self {
            original_filename: original_filename.into(),
            output: None,
            failure: Some(ItemFailure::from(err)),
            fingerprint: None,
        }
    }

    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// Human message for the failure, empty on success.
    pub fn error_message(&self) -> &str {
        self.failure.as_ref().map_or("", |f| f.message.as_str())
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.output {
            Some(OutputLocation::Path(path)) => Some(path),
            _ => None,
        }
    }
}

/// A failed item, as listed in batch summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub filename: String,
    pub failure: ItemFailure,
}

/// How a batch ended, used to phrase the final message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    Empty,
    AllSucceeded,
    PartiallyFailed,
    AllFailed,
}

/// Aggregate over every item of one batch, in input order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub id: BatchId,
    pub results: Vec<ProcessResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    pub fn failures(&self) -> Vec<FailedItem> {
        self.results
            .iter()
            .filter_map(|r| {
                r.failure.as_ref().map(|failure| FailedItem {
                    filename: r.original_filename.clone(),
                    failure: failure.clone(),
                })
            })
            .collect()
    }

    pub fn outcome(&self) -> BatchOutcome {
        let succeeded = self.success_count();
        if self.results.is_empty() {
            BatchOutcome::Empty
        } else if succeeded == self.results.len() {
            BatchOutcome::AllSucceeded
        } else if succeeded == 0 {
            BatchOutcome::AllFailed
        } else {
            BatchOutcome::PartiallyFailed
        }
    }
}

/// Published after each item completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemProgress {
    /// Zero-based position in the batch.
    pub index: usize,
    pub total: usize,
    pub filename: String,
    pub succeeded: bool,
}

impl ItemProgress {
    /// Completion as a percentage of the batch.
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        (self.index + 1) as f32 / self.total as f32 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(DocumentFormat::classify("Report.PDF"), DocumentFormat::Pdf);
        assert_eq!(
            DocumentFormat::classify("notes.DocX"),
            DocumentFormat::Office(OfficeKind::WordProcessor)
        );
        assert_eq!(
            DocumentFormat::classify("budget.xlsx"),
            DocumentFormat::Office(OfficeKind::Spreadsheet)
        );
        assert_eq!(
            DocumentFormat::classify("deck.pptx"),
            DocumentFormat::Office(OfficeKind::Presentation)
        );
    }

    #[test]
    fn unknown_extensions_are_unsupported() {
        assert_eq!(DocumentFormat::classify("readme.txt"), DocumentFormat::Unsupported);
        assert_eq!(DocumentFormat::classify("legacy.doc"), DocumentFormat::Unsupported);
        assert_eq!(DocumentFormat::classify("Makefile"), DocumentFormat::Unsupported);
        assert!(!DocumentFormat::Unsupported.is_supported());
    }

    #[test]
    fn input_document_names() {
        let doc = InputDocument::from_path("/tmp/in/CT_12345678.Pdf");
        assert_eq!(doc.filename(), "CT_12345678.Pdf");
        assert_eq!(doc.stem(), "CT_12345678");
        assert_eq!(doc.extension(), "pdf");
        assert_eq!(doc.format(), DocumentFormat::Pdf);

        let upload = InputDocument::from_bytes(vec![1, 2, 3], "slides.pptx");
        assert_eq!(
            upload.format(),
            DocumentFormat::Office(OfficeKind::Presentation)
        );
    }

    #[test]
    fn batch_counts_and_outcome() {
        let ok = ProcessResult::succeeded(
            "a.pdf",
            OutputLocation::Path("/out/locked_a.pdf".into()),
            "00".into(),
        );
        let bad = ProcessResult::failed(
            "b.txt",
            &LockerError::UnsupportedFormat {
                extension: "txt".into(),
            },
        );
        let batch = BatchResult {
            id: BatchId::new(),
            results: vec![ok.clone(), bad, ok],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        assert_eq!(batch.success_count(), 2);
        let failures = batch.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].filename, "b.txt");
        assert_eq!(failures[0].failure.kind, FailureKind::UnsupportedFormat);
        assert_eq!(batch.success_count() + failures.len(), batch.total());
        assert_eq!(batch.outcome(), BatchOutcome::PartiallyFailed);
    }

    #[test]
    fn progress_percent() {
        let progress = ItemProgress {
            index: 1,
            total: 4,
            filename: "x.pdf".into(),
            succeeded: true,
        };
        assert_eq!(progress.percent(), 50.0);
    }
}
