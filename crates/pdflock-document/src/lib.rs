// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdflock-document — PDF inspection and AES-256 protection, plus conversion of
// Office documents to PDF through external renderers.

pub mod convert;
pub mod pdf;
pub mod render;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

// Re-export the primary structs so callers can use `pdflock_document::PdfEncryptor` etc.
pub use convert::{ConversionCapabilities, DocumentConverter, PdfRenderer};
pub use pdf::{DocumentMetadata, PdfEncryptor, PdfReader, is_protected};
pub use render::{OfficeAutomationRenderer, SofficeRenderer};
