// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for PDF protection in the pdflock-document crate.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use pdflock_document::PdfEncryptor;
use pdflock_document::fixtures::sample_pdf;

/// Rebuild and seal a 20-page document.
fn bench_encrypt(c: &mut Criterion) {
    let input = sample_pdf(20, Some("Benchmark"));
    let encryptor = PdfEncryptor::new();

    c.bench_function("encrypt (20 pages)", |b| {
        b.iter(|| {
            let sealed = encryptor
                .encrypt(black_box(&input), black_box("bench-password"))
                .expect("encrypt");
            black_box(sealed);
        });
    });
}

criterion_group!(benches, bench_encrypt);
criterion_main!(benches);
