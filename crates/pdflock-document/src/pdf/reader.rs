// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open and inspect existing PDF documents using the `lopdf` crate.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lopdf::xref::XrefEntry;
use lopdf::{Dictionary, Document, Object, ObjectId, Reader};
use pdflock_core::error::{LockerError, Result};
use tracing::{debug, info, instrument, warn};

/// Document information dictionary entries shown to users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

impl DocumentMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document`. Protected files can be opened with
/// [`PdfReader::unlock`].
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let data = std::fs::read(path_ref).map_err(|source| LockerError::SourceUnreadable {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let mut reader = Self::from_bytes(&data)?;
        reader.source_path = Some(path_ref.display().to_string());
        Ok(reader)
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            LockerError::CorruptDocument(format!("failed to load PDF from memory: {err}"))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    /// Load a protected PDF and decrypt it with `password`.
    ///
    /// Unprotected input is loaded as by [`PdfReader::from_bytes`].
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn unlock(data: &[u8], password: &str) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            LockerError::CorruptDocument(format!("failed to load PDF from memory: {err}"))
        })?;
        if !document.is_encrypted() {
            return Ok(Self {
                document,
                source_path: None,
            });
        }

        document
            .authenticate_password(password)
            .map_err(|_| LockerError::CorruptDocument("cannot unlock PDF: wrong password".into()))?;

        // lopdf decrypts files whose user password is empty while loading.
        let document = if document.encryption_state.is_some() {
            document
        } else {
            let mut document = load_encrypted_objects(data, document);
            document
                .decrypt(password)
                .map_err(|err| LockerError::CorruptDocument(format!("cannot unlock PDF: {err}")))?;
            document
        };
        debug!(pages = document.get_pages().len(), "PDF decrypted");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Whether the loaded document still carries an encryption dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.document.is_encrypted()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Entries of the trailer's `/Info` dictionary.
    pub fn metadata(&self) -> DocumentMetadata {
        let Some(info) = info_dictionary(&self.document) else {
            return DocumentMetadata::default();
        };

        DocumentMetadata {
            title: text_entry(info, b"Title"),
            author: text_entry(info, b"Author"),
            subject: text_entry(info, b"Subject"),
            keywords: text_entry(info, b"Keywords"),
            creator: text_entry(info, b"Creator"),
            producer: text_entry(info, b"Producer"),
        }
    }
}

/// Whether a PDF is password protected, i.e. its trailer names an
/// encryption dictionary.
///
/// Falls back to scanning the raw trailer sections when the file does not
/// parse.
pub fn is_protected(data: &[u8]) -> bool {
    match Document::load_mem(data) {
        Ok(document) => document.trailer.get(b"Encrypt").is_ok(),
        Err(err) => {
            debug!(%err, "PDF does not parse, scanning trailers");
            trailer_names_encrypt(data)
        }
    }
}

/// Raw scan of every `trailer` dictionary for an `/Encrypt` key.
pub(crate) fn trailer_names_encrypt(data: &[u8]) -> bool {
    const TRAILER: &[u8] = b"trailer";
    const KEY: &[u8] = b"/Encrypt";

    find_all(data, TRAILER).any(|start| {
        let section = &data[start + TRAILER.len()..];
        let end = find_all(section, b"startxref")
            .next()
            .unwrap_or(section.len());
        let section = &section[..end];
        // `/EncryptMetadata` lives inside the encryption dictionary itself.
        find_all(section, KEY).any(|at| {
            section
                .get(at + KEY.len())
                .is_none_or(|next| !next.is_ascii_alphanumeric())
        })
    })
}

fn find_all<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(move |(_, window)| *window == needle)
        .map(|(start, _)| start)
}

/// Parse every indirect object of a protected file, still encrypted.
///
/// `Document::load_mem` only materialises the objects of an encrypted file
/// when the empty user password opens it; otherwise `document` holds just the
/// encryption dictionary. Objects inside object streams appear once
/// `Document::decrypt` unpacks their containers.
fn load_encrypted_objects(data: &[u8], document: Document) -> Document {
    let start = find_all(data, b"%PDF-").next().unwrap_or(0);
    let ids: Vec<ObjectId> = document
        .reference_table
        .entries
        .iter()
        .filter_map(|(&number, entry)| match *entry {
            XrefEntry::Normal { generation, .. } => Some((number, generation)),
            _ => None,
        })
        .collect();

    let reader = Reader {
        buffer: &data[start..],
        document,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };

    let mut objects = BTreeMap::new();
    for id in ids {
        match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => {
                objects.insert(id, object);
            }
            Err(err) => warn!(object = ?id, %err, "skipping unreadable object"),
        }
    }

    let mut document = reader.document;
    for (id, object) in objects {
        document.objects.entry(id).or_insert(object);
    }
    debug!(objects = document.objects.len(), "encrypted objects parsed");
    document
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, otherwise
/// single-byte (PDFDocEncoding is Latin-1 for printable text).
fn decode_text(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}
