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

//! Error types for the micro:bit emulator core.
//!
//! Two distinct failure classes exist in this crate. Configuration-time
//! failures, where a device cannot be brought up at all, are represented by
//! [`EmulatorError`] and returned from constructors and loaders. Guest-visible
//! misbehavior, such as a running firmware image touching an unmapped
//! register or shorting a GPIO pin, is never represented as an `Err`; it is
//! logged at [`log::Level::Warn`] and the access degenerates to a benign
//! default. See the `gpio`, `nvmc`, and `address_space` modules for that path.

use std::fmt;

/// Result alias used throughout this crate for configuration-time failures.
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Errors that abort bringing up or restoring a device.
///
/// These are always fatal to the operation that produced them: a `realize()`
/// call does not return a half-initialized device, and a firmware or
/// save-state load either fully succeeds or leaves prior state untouched.
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    /// A device was realized before its SoC variant was selected.
    #[error("SoC variant was not set before realization")]
    VariantNotSet,

    /// A device was realized without its backing memory region configured.
    #[error("memory property was not set")]
    MemoryNotConfigured,

    /// LED matrix dimensions fall outside the supported `[1, 64]` range.
    #[error("invalid LED matrix dimensions: {rows}x{cols} (each must be in 1..=64)")]
    InvalidMatrixDimensions { rows: u32, cols: u32 },

    /// The supplied coordinate table does not have `2 * rows * cols` entries.
    #[error("matrix_coords length mismatch: expected {expected}, got {got}")]
    MatrixCoordsLengthMismatch { expected: usize, got: usize },

    /// NVMC page size is smaller than the UICR it must be able to hold.
    #[error("NVMC page_size {page_size} is smaller than minimum {minimum}")]
    PageTooSmall { page_size: u32, minimum: u32 },

    /// Firmware image could not be found or opened.
    #[error("firmware image not found: {0}")]
    FirmwareNotFound(String),

    /// Firmware image is larger than the flash region it is loaded into.
    #[error("firmware image too large for flash: expected at most {expected} bytes, got {got}")]
    InvalidFirmwareSize { expected: usize, got: usize },

    /// A save-state blob was produced by an incompatible layout version.
    #[error("incompatible save-state version: found {found}, expected {expected}")]
    IncompatibleSaveState { found: u32, expected: u32 },

    /// A save-state blob failed to decode.
    #[error("failed to decode save-state: {0}")]
    SaveStateDecode(String),

    /// Board configuration file could not be read or parsed.
    #[error("failed to load board configuration from {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: ConfigLoadError,
    },

    /// The legacy `-kernel` CLI flag was used instead of `--firmware`.
    #[error("the -kernel flag is no longer supported; use --firmware <PATH> instead")]
    LegacyKernelFlag,

    /// The CLI's machine selector named something other than "microbit".
    #[error("unsupported machine '{0}': only 'microbit' is supported")]
    UnsupportedMachine(String),

    /// A board or CLI `--variant` selector did not name a known nRF51 part.
    #[error("unknown nRF51 variant: {0}")]
    UnknownVariant(String),
}

/// Underlying cause of a [`EmulatorError::ConfigLoad`] failure.
#[derive(Debug)]
pub enum ConfigLoadError {
    Io(std::io::Error),
    Toml(toml::de::Error),
}

impl fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLoadError::Io(e) => write!(f, "{e}"),
            ConfigLoadError::Toml(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigLoadError::Io(e) => Some(e),
            ConfigLoadError::Toml(e) => Some(e),
        }
    }
}
