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

//! Persisted save/restore layout for GPIO and NVMC/UICR state.
//!
//! Encoded with `bincode` over a versioned envelope so a save file produced
//! by an older layout is rejected explicitly rather than silently
//! misinterpreted.

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use crate::core::error::{EmulatorError, Result};
use crate::core::gpio::NUM_PINS;
use crate::core::nvram::UICR_WORDS;

pub const SAVE_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioSaveState {
    pub out: u32,
    pub in_: u32,
    pub in_mask: u32,
    pub dir: u32,
    pub cnf: [u32; NUM_PINS],
    pub old_out: u32,
    pub old_out_connected: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NvmcSaveState {
    #[serde(with = "BigArray")]
    pub uicr_content: [u32; UICR_WORDS],
    pub config: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub gpio: GpioSaveState,
    pub nvmc: NvmcSaveState,
}

impl SaveState {
    pub fn new(gpio: GpioSaveState, nvmc: NvmcSaveState) -> Self {
        Self {
            version: SAVE_STATE_VERSION,
            gpio,
            nvmc,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .expect("save-state encoding is infallible for plain data")
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (state, _): (SaveState, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| EmulatorError::SaveStateDecode(e.to_string()))?;
        if state.version != SAVE_STATE_VERSION {
            return Err(EmulatorError::IncompatibleSaveState {
                found: state.version,
                expected: SAVE_STATE_VERSION,
            });
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SaveState {
        SaveState::new(
            GpioSaveState {
                out: 1,
                in_: 2,
                in_mask: 3,
                dir: 4,
                cnf: [5; NUM_PINS],
                old_out: 6,
                old_out_connected: 7,
            },
            NvmcSaveState {
                uicr_content: [0xFF; UICR_WORDS],
                config: 3,
            },
        )
    }

    #[test]
    fn round_trips_through_bincode() {
        let state = sample();
        let bytes = state.encode();
        let decoded = SaveState::decode(&bytes).unwrap();
        assert_eq!(decoded.gpio.out, 1);
        assert_eq!(decoded.nvmc.config, 3);
    }

    #[test]
    fn rejects_mismatched_version() {
        let mut state = sample();
        state.version = 2;
        let bytes = state.encode();
        let err = SaveState::decode(&bytes).unwrap_err();
        assert!(matches!(err, EmulatorError::IncompatibleSaveState { .. }));
    }
}
