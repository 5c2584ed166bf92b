// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — inspecting, rebuilding and password-protecting PDFs.

pub mod encryptor;
pub mod reader;
mod rebuild;

pub use encryptor::PdfEncryptor;
pub use reader::{DocumentMetadata, PdfReader, is_protected};
