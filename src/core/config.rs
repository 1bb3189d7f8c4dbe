// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Board configuration, loaded from TOML.
//!
//! Mirrors how keybindings are persisted elsewhere in this codebase: a
//! plain serde struct round-tripped through [`toml`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{ConfigLoadError, EmulatorError, Result};
use crate::core::soc::Nrf51Variant;

fn default_variant() -> String {
    "aa".to_string()
}

fn default_rows() -> u8 {
    3
}

fn default_cols() -> u8 {
    9
}

fn default_strobe_row() -> bool {
    true
}

/// User-editable board configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_variant")]
    pub variant: String,
    #[serde(default = "default_rows")]
    pub matrix_rows: u8,
    #[serde(default = "default_cols")]
    pub matrix_cols: u8,
    #[serde(default = "default_strobe_row")]
    pub strobe_row: bool,
    #[serde(default)]
    pub firmware: Option<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            variant: default_variant(),
            matrix_rows: default_rows(),
            matrix_cols: default_cols(),
            strobe_row: default_strobe_row(),
            firmware: None,
        }
    }
}

impl BoardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EmulatorError::ConfigLoad {
            path: path.display().to_string(),
            source: ConfigLoadError::Io(e),
        })?;
        toml::from_str(&text).map_err(|e| EmulatorError::ConfigLoad {
            path: path.display().to_string(),
            source: ConfigLoadError::Toml(e),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).expect("BoardConfig always serializes");
        std::fs::write(path, text).map_err(|e| EmulatorError::ConfigLoad {
            path: path.display().to_string(),
            source: ConfigLoadError::Io(e),
        })
    }

    pub fn variant(&self) -> std::result::Result<Nrf51Variant, String> {
        self.variant.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_stock_microbit() {
        let cfg = BoardConfig::default();
        assert_eq!(cfg.variant, "aa");
        assert_eq!(cfg.matrix_rows, 3);
        assert_eq!(cfg.matrix_cols, 9);
        assert!(cfg.strobe_row);
    }

    #[test]
    fn round_trips_through_toml() {
        let file = NamedTempFile::new().unwrap();
        let cfg = BoardConfig {
            variant: "ab".to_string(),
            matrix_rows: 4,
            matrix_cols: 4,
            strobe_row: false,
            firmware: Some("firmware.bin".to_string()),
        };
        cfg.save(file.path()).unwrap();
        let loaded = BoardConfig::load(file.path()).unwrap();
        assert_eq!(loaded.variant, "ab");
        assert_eq!(loaded.matrix_rows, 4);
        assert_eq!(loaded.firmware.as_deref(), Some("firmware.bin"));
    }

    #[test]
    fn missing_file_is_a_config_load_error() {
        let err = BoardConfig::load(Path::new("/nonexistent/board.toml")).unwrap_err();
        assert!(matches!(err, EmulatorError::ConfigLoad { .. }));
    }
}
