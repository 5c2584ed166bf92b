// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Config file location and loading.

use std::path::{Path, PathBuf};

use pdflock_core::config::LockerConfig;
use pdflock_core::error::Result;
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.json";

/// `$XDG_CONFIG_HOME/pdflock`, or `~/.config/pdflock`.
pub fn config_dir() -> PathBuf {
    let base = if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        PathBuf::from(home).join(".config")
    } else {
        std::env::temp_dir()
    };
    base.join("pdflock")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Load the config.
///
/// An explicitly named file must load. The default file is optional: when
/// absent or unreadable the defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<LockerConfig> {
    if let Some(path) = explicit {
        return LockerConfig::load(path);
    }

    let path = default_config_path();
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(LockerConfig::default());
    }
    match LockerConfig::load(&path) {
        Ok(config) => Ok(config),
        Err(err) => {
            warn!(path = %path.display(), %err, "ignoring unreadable config file");
            Ok(LockerConfig::default())
        }
    }
}
