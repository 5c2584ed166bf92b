// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures: small PDFs built in memory with lopdf.

use lopdf::{Document, Object, Stream, dictionary};

/// A PDF with `pages` pages, each showing "Page N".
///
/// Fonts and the media box sit on the /Pages node, so pages rely on
/// inheritance. `title` becomes the /Info title when given.
pub fn sample_pdf(pages: usize, title: Option<&str>) -> Vec<u8> {
    build(pages, title, |number| format!("(Page {number}) Tj"))
}

/// A one-page PDF whose uncompressed content stream shows `operators`.
pub fn sample_pdf_with_text(title: Option<&str>, operators: &str) -> Vec<u8> {
    build(1, title, |_| operators.to_string())
}

fn build(pages: usize, title: Option<&str>, text: impl Fn(usize) -> String) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::with_capacity(pages);
    for number in 1..=pages {
        let content = format!("BT /F1 24 Tf 72 720 Td {} ET", text(number));
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let media_box: Vec<Object> = [0, 0, 595, 842].into_iter().map(Object::Integer).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Producer" => Object::string_literal("pdflock fixtures"),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture PDF serialises");
    out
}

/// A sample PDF already protected with `password`.
pub fn protected_pdf(password: &str) -> Vec<u8> {
    protected_pdf_with(1, Some("Protected"), password)
}

/// [`sample_pdf`] with `pages` and `title`, protected with `password`.
pub fn protected_pdf_with(pages: usize, title: Option<&str>, password: &str) -> Vec<u8> {
    crate::pdf::PdfEncryptor::new()
        .encrypt(&sample_pdf(pages, title), password)
        .expect("fixture PDF encrypts")
}
