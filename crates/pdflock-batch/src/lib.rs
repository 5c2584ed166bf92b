// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdflock-batch — Drives a batch of documents through classification,
// conversion, protection and persistence, with one temporary workspace per
// batch that is always removed.

pub mod orchestrator;
pub mod output;
pub mod workspace;

pub use orchestrator::{BatchHandle, BatchOrchestrator};
pub use output::{OutputPolicy, OutputTarget};
pub use workspace::TempWorkspace;
