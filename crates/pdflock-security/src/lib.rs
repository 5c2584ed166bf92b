// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdflock-security — password policy and integrity helpers.
//
// Validates user passwords, derives passwords from identifiers found in file
// names, and fingerprints protected outputs. The AES-256 work itself happens
// in `pdflock-document`, which owns the PDF security handler.

pub mod integrity;
pub mod password;

pub use integrity::{fingerprint, short_fingerprint};
pub use password::{
    PasswordPattern, PasswordSpec, derive_password, extract_identifier, validate_date,
    validate_password,
};
