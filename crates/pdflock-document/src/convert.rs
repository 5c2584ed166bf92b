// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office → PDF conversion.
//
// Routing by document kind:
//   Word        → the word-processor renderer (LibreOffice, or Word automation)
//   Excel/PPT   → Office automation, which only exists on Windows
//
// Which renderers exist is described by `ConversionCapabilities`, probed once
// when the converter is built. Callers never inspect the host themselves.

use std::path::Path;
use std::sync::Arc;

use pdflock_core::config::LockerConfig;
use pdflock_core::error::{ConversionFailure, LockerError, Result};
use pdflock_core::types::OfficeKind;
use tracing::{debug, info, instrument, warn};

use crate::render::{OfficeAutomationRenderer, SofficeRenderer};

/// Operating system on which Office automation is available.
pub const AUTOMATION_OS: &str = "windows";

/// An external program that turns an Office document into a PDF.
pub trait PdfRenderer: Send + Sync {
    /// Human-readable program name (e.g. "LibreOffice").
    fn name(&self) -> &str;

    /// Whether the program can be started on this host.
    fn is_available(&self) -> bool;

    /// Render `input` to a PDF at `output`.
    ///
    /// On error the renderer may leave a partial file behind; the converter
    /// removes it.
    fn render(
        &self,
        kind: OfficeKind,
        input: &Path,
        output: &Path,
    ) -> std::result::Result<(), ConversionFailure>;
}

/// The conversion back ends present on this host.
#[derive(Clone)]
pub struct ConversionCapabilities {
    /// Converts Word documents.
    pub word_processor: Option<Arc<dyn PdfRenderer>>,
    /// Converts Excel workbooks and PowerPoint presentations.
    pub office_automation: Option<Arc<dyn PdfRenderer>>,
    /// `std::env::consts::OS` of the host; overridable for tests.
    pub host_os: String,
}

impl ConversionCapabilities {
    /// No renderers at all. Only PDFs can be protected.
    pub fn none() -> Self {
        Self {
            word_processor: None,
            office_automation: None,
            host_os: std::env::consts::OS.to_string(),
        }
    }

    /// Probe the host for the renderers described by `config`.
    ///
    /// LibreOffice handles Word documents when installed; on Windows, Word
    /// automation takes over when it is not.
    pub fn detect(config: &LockerConfig) -> Self {
        let timeout = config.conversion_timeout();
        let soffice: Arc<dyn PdfRenderer> =
            Arc::new(SofficeRenderer::new(&config.soffice_program, timeout));
        let automation: Option<Arc<dyn PdfRenderer>> = if cfg!(windows) {
            Some(Arc::new(OfficeAutomationRenderer::new(timeout)))
        } else {
            None
        };

        let word_processor = if soffice.is_available() {
            Some(soffice)
        } else {
            automation.clone().or(Some(soffice))
        };

        Self {
            word_processor,
            office_automation: automation,
            host_os: std::env::consts::OS.to_string(),
        }
    }

    pub fn with_word_processor(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.word_processor = Some(renderer);
        self
    }

    pub fn with_office_automation(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.office_automation = Some(renderer);
        self
    }

    pub fn with_host_os(mut self, os: impl Into<String>) -> Self {
        self.host_os = os.into();
        self
    }
}

impl std::fmt::Debug for ConversionCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionCapabilities")
            .field("word_processor", &self.word_processor.as_ref().map(|r| r.name()))
            .field(
                "office_automation",
                &self.office_automation.as_ref().map(|r| r.name()),
            )
            .field("host_os", &self.host_os)
            .finish()
    }
}

/// Converts Office documents to PDF through the available renderers.
pub struct DocumentConverter {
    capabilities: ConversionCapabilities,
    word_available: bool,
    automation_available: bool,
}

impl DocumentConverter {
    pub fn new(capabilities: ConversionCapabilities) -> Self {
        let word_available = capabilities
            .word_processor
            .as_ref()
            .is_some_and(|r| r.is_available());
        let automation_available = capabilities
            .office_automation
            .as_ref()
            .is_some_and(|r| r.is_available());

        debug!(?capabilities, word_available, automation_available, "converter ready");

        Self {
            capabilities,
            word_available,
            automation_available,
        }
    }

    pub fn capabilities(&self) -> &ConversionCapabilities {
        &self.capabilities
    }

    /// Whether a document of `kind` can be converted on this host.
    pub fn supports(&self, kind: OfficeKind) -> bool {
        match kind {
            OfficeKind::WordProcessor => self.word_available,
            OfficeKind::Spreadsheet | OfficeKind::Presentation => {
                self.capabilities.host_os == AUTOMATION_OS && self.automation_available
            }
        }
    }

    /// Convert the Office document at `input` to a PDF at `output`.
    ///
    /// On any error `output` does not exist afterwards.
    #[instrument(skip_all, fields(kind = %kind, input = %input.display()))]
    pub fn convert_to_pdf(&self, kind: OfficeKind, input: &Path, output: &Path) -> Result<()> {
        let renderer = self.renderer_for(kind)?;
        info!(renderer = renderer.name(), "converting to PDF");

        let rendered = renderer
            .render(kind, input, output)
            .and_then(|()| {
                if output.is_file() {
                    Ok(())
                } else {
                    Err(ConversionFailure::Failed(format!(
                        "{} reported success but wrote no PDF",
                        renderer.name()
                    )))
                }
            });

        if let Err(failure) = rendered {
            discard_partial(output);
            warn!(%failure, "conversion failed");
            return Err(LockerError::ConversionFailed { kind, failure });
        }

        debug!(output = %output.display(), "conversion finished");
        Ok(())
    }

    fn renderer_for(&self, kind: OfficeKind) -> Result<&Arc<dyn PdfRenderer>> {
        match kind {
            OfficeKind::WordProcessor => match &self.capabilities.word_processor {
                Some(renderer) if self.word_available => Ok(renderer),
                Some(renderer) => Err(LockerError::CapabilityUnavailable {
                    capability: format!("{} (Word to PDF)", renderer.name()),
                }),
                None => Err(LockerError::CapabilityUnavailable {
                    capability: "a Word to PDF converter".into(),
                }),
            },
            OfficeKind::Spreadsheet | OfficeKind::Presentation => {
                if self.capabilities.host_os != AUTOMATION_OS {
                    return Err(LockerError::PlatformUnsupported {
                        kind,
                        required: "Windows with Microsoft Office".into(),
                        current: self.capabilities.host_os.clone(),
                    });
                }
                match &self.capabilities.office_automation {
                    Some(renderer) if self.automation_available => Ok(renderer),
                    _ => Err(LockerError::CapabilityUnavailable {
                        capability: "Microsoft Office automation".into(),
                    }),
                }
            }
        }
    }
}

fn discard_partial(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => debug!(path = %output.display(), "removed partial output"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %output.display(), %err, "cannot remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Renderer double with a scripted result.
    struct FakeRenderer {
        available: bool,
        write_partial: bool,
        outcome: std::result::Result<(), ConversionFailure>,
    }

    impl FakeRenderer {
        fn succeeding() -> Arc<dyn PdfRenderer> {
            Arc::new(Self {
                available: true,
                write_partial: true,
                outcome: Ok(()),
            })
        }

        fn failing(failure: ConversionFailure) -> Arc<dyn PdfRenderer> {
            Arc::new(Self {
                available: true,
                write_partial: true,
                outcome: Err(failure),
            })
        }

        fn missing() -> Arc<dyn PdfRenderer> {
            Arc::new(Self {
                available: false,
                write_partial: false,
                outcome: Ok(()),
            })
        }
    }

    impl PdfRenderer for FakeRenderer {
        fn name(&self) -> &str {
            "Fake"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn render(
            &self,
            _kind: OfficeKind,
            _input: &Path,
            output: &Path,
        ) -> std::result::Result<(), ConversionFailure> {
            if self.write_partial {
                std::fs::write(output, b"%PDF-1.7 partial").expect("write output");
            }
            self.outcome.clone()
        }
    }

    fn paths() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("report.docx");
        std::fs::write(&input, b"PK fake docx").expect("write input");
        let output = dir.path().join("report.pdf");
        (dir, input, output)
    }

    #[test]
    fn word_uses_word_processor() {
        let (_dir, input, output) = paths();
        let converter = DocumentConverter::new(
            ConversionCapabilities::none().with_word_processor(FakeRenderer::succeeding()),
        );
        converter
            .convert_to_pdf(OfficeKind::WordProcessor, &input, &output)
            .expect("convert");
        assert!(output.is_file());
    }

    #[test]
    fn spreadsheet_off_windows_is_platform_unsupported() {
        let (_dir, input, output) = paths();
        let converter = DocumentConverter::new(
            ConversionCapabilities::none()
                .with_office_automation(FakeRenderer::succeeding())
                .with_host_os("linux"),
        );
        let err = converter
            .convert_to_pdf(OfficeKind::Spreadsheet, &input, &output)
            .unwrap_err();
        assert!(matches!(err, LockerError::PlatformUnsupported { .. }));
        assert!(!converter.supports(OfficeKind::Spreadsheet));
    }

    #[test]
    fn missing_renderers_are_capability_unavailable() {
        let (_dir, input, output) = paths();
        let converter = DocumentConverter::new(
            ConversionCapabilities::none()
                .with_word_processor(FakeRenderer::missing())
                .with_host_os(AUTOMATION_OS),
        );
        let word = converter
            .convert_to_pdf(OfficeKind::WordProcessor, &input, &output)
            .unwrap_err();
        assert!(matches!(word, LockerError::CapabilityUnavailable { .. }));

        let slides = converter
            .convert_to_pdf(OfficeKind::Presentation, &input, &output)
            .unwrap_err();
        assert!(matches!(slides, LockerError::CapabilityUnavailable { .. }));
    }

    #[test]
    fn failure_keeps_tag_and_removes_partial_output() {
        let (_dir, input, output) = paths();
        let converter = DocumentConverter::new(
            ConversionCapabilities::none()
                .with_office_automation(FakeRenderer::failing(
                    ConversionFailure::HostApplicationMissing {
                        application: "Microsoft PowerPoint".into(),
                    },
                ))
                .with_host_os(AUTOMATION_OS),
        );
        let err = converter
            .convert_to_pdf(OfficeKind::Presentation, &input, &output)
            .unwrap_err();
        assert!(matches!(
            err,
            LockerError::ConversionFailed {
                kind: OfficeKind::Presentation,
                failure: ConversionFailure::HostApplicationMissing { .. },
            }
        ));
        assert!(!output.exists());
    }

    #[test]
    fn timeout_is_reported() {
        let (_dir, input, output) = paths();
        let converter = DocumentConverter::new(
            ConversionCapabilities::none().with_word_processor(FakeRenderer::failing(
                ConversionFailure::TimedOut {
                    after: Duration::from_secs(30),
                },
            )),
        );
        let err = converter
            .convert_to_pdf(OfficeKind::WordProcessor, &input, &output)
            .unwrap_err();
        assert!(err.to_string().contains("30"));
    }
}
