// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output fingerprints — SHA-256 over protected PDF bytes.

use sha2::{Digest, Sha256};

/// Hex length of the abbreviated fingerprint used in log lines.
const SHORT_LEN: usize = 12;

/// SHA-256 of `data` as a lowercase hex string.
///
/// Recorded on every successful `ProcessResult` so users can confirm the file
/// they send is the one that was produced.
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// First 12 hex characters of [`fingerprint`].
pub fn short_fingerprint(full: &str) -> &str {
    full.get(..SHORT_LEN).unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn short_form() {
        let full = fingerprint(b"hello");
        assert_eq!(short_fingerprint(&full), "2cf24dba5fb0");
        assert_eq!(short_fingerprint("abc"), "abc");
    }
}
