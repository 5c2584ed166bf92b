// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rebuild a PDF into a fresh document: every page in order plus the trailer
// /Info dictionary, with all transitively referenced objects copied once.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use pdflock_core::error::{LockerError, Result};
use tracing::{debug, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards the /Parent walk against cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// PDF version written when the source is older; AES-256 needs 1.7 or later.
const MIN_VERSION: &str = "1.7";

/// Copy the pages and document information of `source` into a new document.
pub(crate) fn rebuild(source: &Document) -> Result<Document> {
    let pages = source.get_pages();
    if pages.is_empty() {
        return Err(LockerError::CorruptDocument(
            "the document has no pages".into(),
        ));
    }

    let version = if source.version.as_str() < MIN_VERSION {
        MIN_VERSION.to_string()
    } else {
        source.version.clone()
    };
    let mut copier = ObjectCopier::new(source, Document::with_version(version));

    // The old page tree root maps onto the new one so that stray /Parent
    // references elsewhere do not drag the old tree along.
    let pages_id = copier.target.new_object_id();
    if let Some(root) = page_tree_root(source) {
        copier.copied.insert(root, pages_id);
    }

    // Reserve ids for all pages first so cross-page references (links,
    // annotations) resolve to the copies instead of duplicating pages.
    let mut kids = Vec::with_capacity(pages.len());
    let mut pending = Vec::with_capacity(pages.len());
    for &page_id in pages.values() {
        let new_id = match copier.copied.get(&page_id) {
            Some(&existing) => existing,
            None => {
                let new_id = copier.target.new_object_id();
                copier.copied.insert(page_id, new_id);
                pending.push((page_id, new_id));
                new_id
            }
        };
        kids.push(Object::Reference(new_id));
    }

    for (page_id, new_id) in pending {
        let page = copier.copy_page(page_id, pages_id)?;
        copier.target.objects.insert(new_id, Object::Dictionary(page));
    }

    let page_count = kids.len() as i64;
    copier.target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );

    let catalog_id = copier.target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    copier.target.trailer.set("Root", catalog_id);

    copier.copy_info();

    debug!(
        pages = page_count,
        objects = copier.target.objects.len(),
        "document rebuilt"
    );
    Ok(copier.target)
}

fn page_tree_root(document: &Document) -> Option<ObjectId> {
    document
        .catalog()
        .ok()?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .ok()
}

/// Walk up the /Parent chain of `page` looking for `key`.
fn inherited_attribute(source: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node_id = current?;
        let node = source.get_object(node_id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Deep copier from one document into another.
///
/// Each source object is copied at most once; the id is reserved before its
/// children are visited, so reference cycles terminate.
struct ObjectCopier<'a> {
    source: &'a Document,
    target: Document,
    copied: BTreeMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: Document) -> Self {
        Self {
            source,
            target,
            copied: BTreeMap::new(),
        }
    }

    /// Copy a page dictionary, materialising inherited attributes and
    /// pointing /Parent at the new page tree root.
    fn copy_page(&mut self, page_id: ObjectId, parent_id: ObjectId) -> Result<Dictionary> {
        let source = self.source;
        let original = source
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|err| {
                LockerError::CorruptDocument(format!("cannot read page object {page_id:?}: {err}"))
            })?;

        let mut page = Dictionary::new();
        for (key, value) in original.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            let value = self.copy_object(value);
            page.set(key.clone(), value);
        }

        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, original, key) {
                let value = self.copy_object(&value);
                page.set(key.to_vec(), value);
            }
        }

        page.set("Parent", Object::Reference(parent_id));
        Ok(page)
    }

    /// Copy the trailer /Info entry, whether referenced or inline.
    fn copy_info(&mut self) {
        let source = self.source;
        match source.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => {
                let new_id = self.copy_reference(*id);
                self.target.trailer.set("Info", new_id);
            }
            Ok(Object::Dictionary(info)) => {
                let info = self.copy_dictionary(info);
                let new_id = self.target.add_object(info);
                self.target.trailer.set("Info", new_id);
            }
            _ => {}
        }
    }

    fn copy_reference(&mut self, id: ObjectId) -> ObjectId {
        if let Some(&mapped) = self.copied.get(&id) {
            return mapped;
        }
        let new_id = self.target.new_object_id();
        self.copied.insert(id, new_id);

        let source = self.source;
        let copy = match source.get_object(id) {
            Ok(object) => self.copy_object(object),
            Err(err) => {
                warn!(?id, %err, "cannot resolve reference, using Null");
                Object::Null
            }
        };
        self.target.objects.insert(new_id, copy);
        new_id
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            let value = self.copy_object(value);
            copy.set(key.clone(), value);
        }
        copy
    }

    fn copy_object(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.copy_reference(*id)),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy_object(item)).collect())
            }
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(&stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn keeps_page_order_and_inherited_resources() {
        let source = Document::load_mem(&fixtures::sample_pdf(4, Some("Order"))).expect("load");
        let rebuilt = rebuild(&source).expect("rebuild");

        let pages = rebuilt.get_pages();
        assert_eq!(pages.len(), 4);

        for (number, page_id) in pages {
            let page = rebuilt
                .get_object(page_id)
                .and_then(Object::as_dict)
                .expect("page dictionary");
            // Resources and MediaBox live on the Pages node in the fixture.
            assert!(page.has(b"Resources"), "page {number} lost its resources");
            assert!(page.has(b"MediaBox"), "page {number} lost its media box");

            let content = rebuilt.get_page_content(page_id).expect("content");
            let text = String::from_utf8_lossy(&content);
            assert!(text.contains(&format!("(Page {number})")));
        }
    }

    #[test]
    fn copies_info_dictionary() {
        let source = Document::load_mem(&fixtures::sample_pdf(1, Some("Minutes"))).expect("load");
        let rebuilt = rebuild(&source).expect("rebuild");
        assert!(rebuilt.trailer.get(b"Info").is_ok());
        assert_eq!(rebuilt.version, MIN_VERSION);
    }

    #[test]
    fn empty_document_is_corrupt() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0i64,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        assert!(matches!(rebuild(&doc), Err(LockerError::CorruptDocument(_))));
    }
}
