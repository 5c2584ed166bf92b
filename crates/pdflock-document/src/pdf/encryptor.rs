// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF encryptor — password-protect a PDF with AES-256.
//
// The input is rebuilt into a fresh document (pages in order plus /Info) and
// sealed with lopdf's standard security handler, revision 6. The same
// password opens the file and controls its permissions.

use std::collections::BTreeMap;
use std::sync::Arc;

use lopdf::encryption::crypt_filters::{Aes256CryptFilter, CryptFilter};
use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};
use pdflock_core::error::{LockerError, Result};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, info, instrument};

use super::reader::trailer_names_encrypt;
use super::rebuild::rebuild;

/// Name of the single crypt filter used for streams and strings.
const CRYPT_FILTER_NAME: &[u8] = b"StdCF";

/// Applies password protection to PDF bytes.
pub struct PdfEncryptor {
    rng: SystemRandom,
}

impl PdfEncryptor {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Protect `pdf_bytes` with `password` and return the encrypted PDF.
    ///
    /// # Errors
    ///
    /// - `AlreadyEncrypted` if the input already carries a password;
    /// - `CorruptDocument` if it cannot be parsed or has no pages;
    /// - `EncryptionFailed` if sealing or serialisation fails.
    #[instrument(skip_all, fields(bytes_len = pdf_bytes.len()))]
    pub fn encrypt(&self, pdf_bytes: &[u8], password: &str) -> Result<Vec<u8>> {
        let source = match Document::load_mem(pdf_bytes) {
            Ok(source) => source,
            Err(err) if trailer_names_encrypt(pdf_bytes) => {
                debug!(%err, "unparseable PDF with an encryption dictionary");
                return Err(LockerError::AlreadyEncrypted);
            }
            Err(err) => {
                return Err(LockerError::CorruptDocument(format!(
                    "failed to parse PDF: {err}"
                )));
            }
        };
        if source.trailer.get(b"Encrypt").is_ok() {
            return Err(LockerError::AlreadyEncrypted);
        }

        let mut target = rebuild(&source)?;
        self.assign_file_id(&mut target)?;

        let state = self.security_handler(password)?;
        target
            .encrypt(&state)
            .map_err(|err| LockerError::EncryptionFailed(format!("encryption failed: {err}")))?;

        let mut output = Vec::new();
        target.save_to(&mut output).map_err(|err| {
            LockerError::EncryptionFailed(format!("failed to serialise encrypted PDF: {err}"))
        })?;

        info!(
            pages = target.get_pages().len(),
            output_len = output.len(),
            "PDF protected"
        );
        Ok(output)
    }

    /// AES-256 standard security handler with a fresh random file key.
    fn security_handler(&self, password: &str) -> Result<EncryptionState> {
        let mut file_key = [0u8; 32];
        self.fill_random(&mut file_key)?;

        let filter: Arc<dyn CryptFilter> = Arc::new(Aes256CryptFilter);
        let version = EncryptionVersion::V5 {
            encrypt_metadata: true,
            crypt_filters: BTreeMap::from([(CRYPT_FILTER_NAME.to_vec(), filter)]),
            file_encryption_key: &file_key,
            stream_filter: CRYPT_FILTER_NAME.to_vec(),
            string_filter: CRYPT_FILTER_NAME.to_vec(),
            owner_password: password,
            user_password: password,
            permissions: Permissions::all(),
        };

        let state = EncryptionState::try_from(version).map_err(|err| {
            LockerError::EncryptionFailed(format!("cannot set up security handler: {err}"))
        })?;
        debug!("AES-256 security handler ready");
        Ok(state)
    }

    /// Set the trailer /ID pair to fresh random identifiers.
    fn assign_file_id(&self, document: &mut Document) -> Result<()> {
        let mut id = [0u8; 16];
        self.fill_random(&mut id)?;
        let id = Object::String(id.to_vec(), StringFormat::Hexadecimal);
        document.trailer.set("ID", vec![id.clone(), id]);
        Ok(())
    }

    fn fill_random(&self, buf: &mut [u8]) -> Result<()> {
        self.rng.fill(buf).map_err(|_| {
            LockerError::EncryptionFailed("system random number generator unavailable".into())
        })
    }
}

impl Default for PdfEncryptor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::pdf::reader::{PdfReader, is_protected};

    #[test]
    fn output_opens_only_with_password() {
        let input = fixtures::sample_pdf(2, Some("Board minutes"));
        let encrypted = PdfEncryptor::new().encrypt(&input, "s3cret!").expect("encrypt");

        assert!(is_protected(&encrypted));

        let reader = PdfReader::unlock(&encrypted, "s3cret!").expect("unlock");
        assert_eq!(reader.page_count(), 2);
        assert_eq!(reader.metadata().title.as_deref(), Some("Board minutes"));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let input = fixtures::sample_pdf(1, None);
        let encrypted = PdfEncryptor::new().encrypt(&input, "right-one").expect("encrypt");
        assert!(PdfReader::unlock(&encrypted, "wrong-one").is_err());
    }

    #[test]
    fn refuses_already_encrypted_input() {
        let encryptor = PdfEncryptor::new();
        let once = encryptor
            .encrypt(&fixtures::sample_pdf(1, None), "first")
            .expect("encrypt");
        let again = encryptor.encrypt(&once, "second");
        assert!(matches!(again, Err(LockerError::AlreadyEncrypted)));
    }

    #[test]
    fn plain_pdf_mentioning_encrypt_is_protected() {
        let input = fixtures::sample_pdf_with_text(
            Some("Notes on /Encrypt"),
            "(See the /Encrypt entry of the trailer) Tj",
        );
        let encrypted = PdfEncryptor::new().encrypt(&input, "s3cret!").expect("encrypt");

        let reader = PdfReader::unlock(&encrypted, "s3cret!").expect("unlock");
        assert_eq!(reader.page_count(), 1);
        assert_eq!(reader.metadata().title.as_deref(), Some("Notes on /Encrypt"));
    }

    #[test]
    fn non_pdf_input_is_corrupt() {
        let result = PdfEncryptor::new().encrypt(b"%PDF-1.4\nnothing here", "pw12");
        assert!(matches!(result, Err(LockerError::CorruptDocument(_))));
    }

    #[test]
    fn each_run_uses_fresh_keys() {
        let encryptor = PdfEncryptor::new();
        let input = fixtures::sample_pdf(1, None);
        let first = encryptor.encrypt(&input, "same").expect("encrypt");
        let second = encryptor.encrypt(&input, "same").expect("encrypt");
        assert_ne!(first, second);
    }
}
