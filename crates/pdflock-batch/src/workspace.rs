// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-batch scratch directory for converted intermediates.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

const PREFIX: &str = "pdflock-";

/// A private temporary directory owned by one batch.
///
/// Removed by [`TempWorkspace::release`], or on drop if release was skipped
/// (for example when a batch unwinds).
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    /// Create a workspace under `root`, or the system temp directory.
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }?;

        debug!(path = %dir.path().display(), "workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for an intermediate of item `index`. Distinct items never share a
    /// path, even when their file names are equal.
    pub fn scratch_path(&self, index: usize, name: &str) -> PathBuf {
        self.dir.path().join(format!("{index:04}-{name}"))
    }

    /// Remove the workspace and everything in it.
    ///
    /// Removal problems are logged, never returned: they must not change the
    /// outcome of a batch whose outputs are already written.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "workspace removed"),
            Err(err) => warn!(path = %path.display(), %err, "cannot remove workspace"),
        }
    }
}
