// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Machine-readable batch report for `lock --json`.

use pdflock_core::error::FailureKind;
use pdflock_core::types::{BatchOutcome, BatchResult, OutputLocation};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub outcome: BatchOutcome,
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<ItemReport>,
}

#[derive(Debug, Serialize)]
pub struct ItemReport {
    pub file: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&BatchResult> for BatchReport {
    fn from(batch: &BatchResult) -> Self {
        let items = batch
            .results
            .iter()
            .map(|result| ItemReport {
                file: result.original_filename.clone(),
                success: result.success(),
                output: match &result.output {
                    Some(OutputLocation::Path(path)) => Some(path.display().to_string()),
                    Some(OutputLocation::Bytes(bytes)) => Some(format!("<{} bytes>", bytes.len())),
                    None => None,
                },
                fingerprint: result.fingerprint.clone(),
                error_kind: result.failure.as_ref().map(|f| f.kind),
                error: result.failure.as_ref().map(|f| f.message.clone()),
            })
            .collect();

        let succeeded = batch.success_count();
        Self {
            batch_id: batch.id.to_string(),
            outcome: batch.outcome(),
            succeeded,
            failed: batch.total() - succeeded,
            items,
        }
    }
}
