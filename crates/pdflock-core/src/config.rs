// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LockerError, Result};

/// Folder created on the desktop for `FixedDirectory` output.
pub const DEFAULT_FIXED_DIR_NAME: &str = "Password Protected PDFs";

/// Persistent settings shared by every front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockerConfig {
    /// Prepended to the original file stem when naming outputs.
    pub output_prefix: String,
    /// Shortest literal password accepted.
    pub min_password_length: usize,
    /// Well-known folder used by the fixed-directory output policy.
    pub fixed_output_dir: Option<PathBuf>,
    /// Parent of per-batch scratch directories (system temp dir if unset).
    pub workspace_root: Option<PathBuf>,
    /// Kill the external converter after this many seconds. No limit if unset.
    pub conversion_timeout_secs: Option<u64>,
    /// LibreOffice executable used for Word documents.
    pub soffice_program: String,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            output_prefix: "locked_".into(),
            min_password_length: 4,
            fixed_output_dir: None,
            workspace_root: None,
            conversion_timeout_secs: None,
            soffice_program: "soffice".into(),
        }
    }
}

impl LockerConfig {
    /// Read a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.check()?;
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.min_password_length == 0 {
            return Err(LockerError::Config(
                "min_password_length must be at least 1".into(),
            ));
        }
        if self.conversion_timeout_secs == Some(0) {
            return Err(LockerError::Config(
                "conversion_timeout_secs must be positive when set".into(),
            ));
        }
        Ok(())
    }

    pub fn conversion_timeout(&self) -> Option<Duration> {
        self.conversion_timeout_secs.map(Duration::from_secs)
    }

    /// The configured fixed output folder, or `~/Desktop/Password Protected PDFs`.
    pub fn resolved_fixed_output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.fixed_output_dir {
            return dir.clone();
        }
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        home.join("Desktop").join(DEFAULT_FIXED_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: LockerConfig = serde_json::from_str(r#"{"output_prefix": "secure_"}"#)
            .expect("parse");
        assert_eq!(config.output_prefix, "secure_");
        assert_eq!(config.min_password_length, 4);
        assert!(config.conversion_timeout().is_none());
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = LockerConfig {
            conversion_timeout_secs: Some(0),
            ..LockerConfig::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn explicit_fixed_dir_wins() {
        let config = LockerConfig {
            fixed_output_dir: Some("/srv/locked".into()),
            ..LockerConfig::default()
        };
        assert_eq!(config.resolved_fixed_output_dir(), PathBuf::from("/srv/locked"));
    }
}
