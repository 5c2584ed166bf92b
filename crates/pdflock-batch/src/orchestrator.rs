// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator.
//
// For each input, in order:
//   classify → (convert Office → PDF) → encrypt → fingerprint → persist
//
// The password is resolved before anything is touched; a refusal aborts the
// whole batch. After that, a failing item never stops the items after it.
// Intermediates live in one temporary workspace, created on first need and
// removed when the batch ends, whatever happened to the items.

use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use pdflock_core::config::LockerConfig;
use pdflock_core::error::{ConversionFailure, LockerError, Result};
use pdflock_core::types::{
    BatchId, BatchResult, DocumentFormat, InputDocument, InputSource, ItemProgress, OfficeKind,
    ProcessResult,
};
use pdflock_document::{ConversionCapabilities, DocumentConverter, PdfEncryptor};
use pdflock_security::{PasswordSpec, fingerprint, short_fingerprint};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::output::OutputPolicy;
use crate::workspace::TempWorkspace;

/// A batch running on the blocking thread pool.
pub struct BatchHandle {
    /// One message per finished item, in input order.
    pub progress: mpsc::UnboundedReceiver<ItemProgress>,
    /// The aggregate, or the validation error that refused the batch.
    pub result: JoinHandle<Result<BatchResult>>,
}

/// Runs batches of documents through conversion and protection.
pub struct BatchOrchestrator {
    converter: DocumentConverter,
    encryptor: PdfEncryptor,
    config: LockerConfig,
}

impl BatchOrchestrator {
    pub fn new(converter: DocumentConverter, config: LockerConfig) -> Self {
        Self {
            converter,
            encryptor: PdfEncryptor::new(),
            config,
        }
    }

    /// Orchestrator using whatever converters this host provides.
    pub fn from_config(config: LockerConfig) -> Self {
        let converter = DocumentConverter::new(ConversionCapabilities::detect(&config));
        Self::new(converter, config)
    }

    pub fn config(&self) -> &LockerConfig {
        &self.config
    }

    pub fn converter(&self) -> &DocumentConverter {
        &self.converter
    }

    /// Process `inputs` in order and return one result per input.
    ///
    /// `on_progress` is called after every item. Only password validation
    /// fails the call itself; every other problem is recorded on its item.
    #[instrument(skip_all, fields(items = inputs.len()))]
    pub fn process(
        &self,
        inputs: &[InputDocument],
        password: &PasswordSpec,
        policy: &OutputPolicy,
        mut on_progress: impl FnMut(&ItemProgress),
    ) -> Result<BatchResult> {
        let password = password.resolve(self.config.min_password_length)?;

        let id = BatchId::new();
        let started_at = Utc::now();
        info!(batch = %id, "batch started");

        let mut workspace = LazyWorkspace::new(self.config.workspace_root.clone());
        let total = inputs.len();
        let mut results = Vec::with_capacity(total);

        for (index, input) in inputs.iter().enumerate() {
            let result = self.process_item(index, input, &password, policy, &mut workspace);
            on_progress(&ItemProgress {
                index,
                total,
                filename: input.filename().to_string(),
                succeeded: result.success(),
            });
            results.push(result);
        }

        workspace.release();

        let batch = BatchResult {
            id,
            results,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            batch = %batch.id,
            succeeded = batch.success_count(),
            failed = batch.total() - batch.success_count(),
            outcome = ?batch.outcome(),
            "batch finished"
        );
        Ok(batch)
    }

    /// Run [`BatchOrchestrator::process`] on tokio's blocking pool, streaming
    /// progress over a channel.
    pub fn spawn(
        self: Arc<Self>,
        inputs: Vec<InputDocument>,
        password: PasswordSpec,
        policy: OutputPolicy,
    ) -> BatchHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let result = tokio::task::spawn_blocking(move || {
            self.process(&inputs, &password, &policy, |progress| {
                // The receiver may have been dropped; the batch still finishes.
                let _ = tx.send(progress.clone());
            })
        });
        BatchHandle {
            progress: rx,
            result,
        }
    }

    /// Protect a single uploaded document and return the protected PDF.
    ///
    /// Unlike a batch, the item's own error is returned.
    #[instrument(skip_all, fields(file = filename))]
    pub fn protect_bytes(
        &self,
        data: Vec<u8>,
        filename: &str,
        password: &PasswordSpec,
    ) -> Result<Vec<u8>> {
        let password = password.resolve(self.config.min_password_length)?;
        let input = InputDocument::from_bytes(data, filename);

        let mut workspace = LazyWorkspace::new(self.config.workspace_root.clone());
        let protected = guarded(|| self.protect(0, &input, &password, &mut workspace));
        workspace.release();
        protected
    }

    fn process_item(
        &self,
        index: usize,
        input: &InputDocument,
        password: &str,
        policy: &OutputPolicy,
        workspace: &mut LazyWorkspace,
    ) -> ProcessResult {
        let filename = input.filename();
        let outcome = guarded(|| {
            let protected = self.protect(index, input, password, workspace)?;
            let digest = fingerprint(&protected);
            let location = policy.persist(input, protected)?;
            Ok((location, digest))
        });

        match outcome {
            Ok((location, digest)) => {
                info!(
                    file = filename,
                    fingerprint = short_fingerprint(&digest),
                    "item protected"
                );
                ProcessResult::succeeded(filename, location, digest)
            }
            Err(err) => {
                warn!(file = filename, kind = ?err.kind(), %err, "item failed");
                ProcessResult::failed(filename, &err)
            }
        }
    }

    /// Classify, convert when needed, and encrypt one input.
    fn protect(
        &self,
        index: usize,
        input: &InputDocument,
        password: &str,
        workspace: &mut LazyWorkspace,
    ) -> Result<Vec<u8>> {
        let pdf = match input.format() {
            DocumentFormat::Pdf => read_source(input)?,
            DocumentFormat::Office(kind) => Cow::Owned(self.convert(index, kind, input, workspace)?),
            DocumentFormat::Unsupported => {
                return Err(LockerError::UnsupportedFormat {
                    extension: input.extension(),
                });
            }
        };
        self.encryptor.encrypt(&pdf, password)
    }

    fn convert(
        &self,
        index: usize,
        kind: OfficeKind,
        input: &InputDocument,
        workspace: &mut LazyWorkspace,
    ) -> Result<Vec<u8>> {
        let workspace = workspace.get()?;

        let source = match input.source() {
            InputSource::Path(path) => {
                std::fs::File::open(path).map_err(|source| LockerError::SourceUnreadable {
                    path: path.clone(),
                    source,
                })?;
                path.clone()
            }
            InputSource::Bytes(data) => {
                let staged = workspace.scratch_path(index, &format!("input.{}", input.extension()));
                std::fs::write(&staged, data).map_err(LockerError::WorkspaceError)?;
                staged
            }
        };

        let converted = workspace.scratch_path(index, "converted.pdf");
        self.converter.convert_to_pdf(kind, &source, &converted)?;

        std::fs::read(&converted).map_err(|err| LockerError::ConversionFailed {
            kind,
            failure: ConversionFailure::Failed(format!("cannot read converted PDF: {err}")),
        })
    }
}

/// PDF bytes of a PDF input, borrowed when already in memory.
fn read_source(input: &InputDocument) -> Result<Cow<'_, [u8]>> {
    match input.source() {
        InputSource::Bytes(data) => Ok(Cow::Borrowed(data.as_slice())),
        InputSource::Path(path) => std::fs::read(path)
            .map(Cow::Owned)
            .map_err(|source| LockerError::SourceUnreadable {
                path: path.clone(),
                source,
            }),
    }
}

/// Run `f`, turning a panic into `LockerError::Unexpected`.
fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(%message, "item panicked");
        Err(LockerError::Unexpected(message))
    })
}

/// The batch workspace, created on first use.
///
/// A creation failure is remembered: every later item that needs the
/// workspace fails the same way without another attempt.
struct LazyWorkspace {
    root: Option<PathBuf>,
    state: Option<std::io::Result<TempWorkspace>>,
}

impl LazyWorkspace {
    fn new(root: Option<PathBuf>) -> Self {
        Self { root, state: None }
    }

    fn get(&mut self) -> Result<&TempWorkspace> {
        let root = self.root.as_deref();
        let state = self.state.get_or_insert_with(|| {
            let created = TempWorkspace::create(root);
            if let Err(err) = &created {
                error!(%err, "cannot create workspace");
            }
            created
        });
        match state {
            Ok(workspace) => Ok(workspace),
            Err(err) => Err(LockerError::WorkspaceError(std::io::Error::new(
                err.kind(),
                err.to_string(),
            ))),
        }
    }

    fn release(self) {
        if let Some(Ok(workspace)) = self.state {
            workspace.release();
        }
    }
}
