// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output naming and placement for protected PDFs.

use std::io::Write;
use std::path::{Path, PathBuf};

use pdflock_core::config::LockerConfig;
use pdflock_core::error::{LockerError, Result};
use pdflock_core::types::{InputDocument, InputSource, OutputLocation};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Where protected PDFs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Next to each original file.
    SameDirectory,
    /// A folder the user picked for this batch.
    ChosenDirectory(PathBuf),
    /// A standing folder, created when missing.
    FixedDirectory(PathBuf),
    /// Returned as bytes; nothing is written.
    InMemory,
}

/// Naming and placement for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPolicy {
    pub target: OutputTarget,
    pub prefix: String,
}

impl OutputPolicy {
    pub fn new(target: OutputTarget, prefix: impl Into<String>) -> Self {
        Self {
            target,
            prefix: prefix.into(),
        }
    }

    /// Outputs next to their originals, prefixed per `config`.
    pub fn same_directory(config: &LockerConfig) -> Self {
        Self::new(OutputTarget::SameDirectory, config.output_prefix.clone())
    }

    /// Protected PDFs returned as bytes, for uploads.
    pub fn in_memory(config: &LockerConfig) -> Self {
        Self::new(OutputTarget::InMemory, config.output_prefix.clone())
    }

    /// Outputs in the configured fixed folder.
    pub fn fixed_directory(config: &LockerConfig) -> Self {
        Self::new(
            OutputTarget::FixedDirectory(config.resolved_fixed_output_dir()),
            config.output_prefix.clone(),
        )
    }

    /// `<prefix><stem>.pdf` for any input, e.g. `locked_report.pdf` for
    /// `report.docx`.
    pub fn output_name(&self, input: &InputDocument) -> String {
        format!("{}{}.pdf", self.prefix, input.stem())
    }

    /// Destination path for `input`, or `None` for in-memory output.
    pub fn output_path(&self, input: &InputDocument) -> Result<Option<PathBuf>> {
        let name = self.output_name(input);
        let dir = match &self.target {
            OutputTarget::InMemory => return Ok(None),
            OutputTarget::ChosenDirectory(dir) | OutputTarget::FixedDirectory(dir) => dir.clone(),
            OutputTarget::SameDirectory => match input.source() {
                InputSource::Path(path) => path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
                InputSource::Bytes(_) => {
                    return Err(LockerError::PersistError {
                        path: PathBuf::from(&name),
                        source: std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            "uploaded files have no original folder; choose an output folder",
                        ),
                    });
                }
            },
        };
        let path = dir.join(name);
        if let InputSource::Path(original) = input.source() {
            if same_location(&path, original) {
                return Err(LockerError::PersistError {
                    path,
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "the output would replace the original; use a prefix or another folder",
                    ),
                });
            }
        }
        Ok(Some(path))
    }

    /// Write `pdf` for `input` according to the policy.
    ///
    /// Files appear atomically: the bytes go to a temporary file in the
    /// destination folder which is then renamed over any existing output.
    #[instrument(skip_all, fields(input = input.filename()))]
    pub fn persist(&self, input: &InputDocument, pdf: Vec<u8>) -> Result<OutputLocation> {
        let Some(path) = self.output_path(input)? else {
            return Ok(OutputLocation::Bytes(pdf));
        };

        if let OutputTarget::FixedDirectory(dir) = &self.target {
            std::fs::create_dir_all(dir).map_err(|source| LockerError::PersistError {
                path: dir.clone(),
                source,
            })?;
        }

        write_atomically(&path, &pdf)?;
        debug!(path = %path.display(), bytes = pdf.len(), "output written");
        Ok(OutputLocation::Path(path))
    }
}

/// Whether `a` and `b` name the same file, comparing canonical parents.
fn same_location(a: &Path, b: &Path) -> bool {
    fn locate(path: &Path) -> Option<PathBuf> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        Some(dir.canonicalize().ok()?.join(path.file_name()?))
    }

    match (locate(a), locate(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let persist_error = |source: std::io::Error| LockerError::PersistError {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(persist_error)?;
    file.write_all(data).map_err(persist_error)?;
    file.as_file().sync_all().map_err(persist_error)?;
    file.persist(path)
        .map_err(|err| persist_error(err.error))?;
    Ok(())
}
