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

//! Factory (FICR) and user (UICR) information configuration registers.
//!
//! FICR is a read-only fixture seeded at construction with the same values a
//! real nRF51822 reports (device ID, code page/size, RAM block layout).
//! UICR starts erased (`0xFF` words) and is read/write; it can only be
//! erased back to that state through the NVMC (see [`super::nvmc`]).

use crate::core::address_space::{read_le, write_le, Region};

pub const FICR_SIZE: usize = 0x100;
pub const UICR_SIZE: usize = 0x100;
pub const UICR_WORDS: usize = UICR_SIZE / 4;

/// Factory-seeded fixture values, word-indexed (offset `>> 2`).
///
/// Index 4: code page size (0x400). Index 5: code size in pages (0x100).
/// Index 8: NUMRAMBLOCK. Indices 9-11: SIZERAMBLOCK[0..3]. Index 24:
/// CONFIGID. Indices 25-26: DEVICEID[0..1].
const FICR_CONTENT: [u32; 64] = [
    0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0x0000_0400, 0x0000_0100, 0xFFFF_FFFF,
    0xFFFF_FFFF, 0x0000_0002, 0x0000_2000, 0x0000_2000, 0x0000_2000, 0xFFFF_FFFF, 0xFFFF_FFFF,
    0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF,
    0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0x0000_0003, 0x1234_5678, 0x9ABC_DEF1, 0xFFFF_FFFF,
    0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF,
    0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF,
    0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF,
    0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF,
    0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF,
    0xFFFF_FFFF,
];

/// Read-only factory information configuration registers.
pub struct Ficr {
    content: [u8; FICR_SIZE],
}

impl Default for Ficr {
    fn default() -> Self {
        Self::new()
    }
}

impl Ficr {
    pub fn new() -> Self {
        let mut content = [0u8; FICR_SIZE];
        for (i, word) in FICR_CONTENT.iter().enumerate() {
            content[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        Self { content }
    }
}

impl Region for Ficr {
    fn name(&self) -> &str {
        "ficr"
    }

    fn len(&self) -> u64 {
        FICR_SIZE as u64
    }

    fn read(&mut self, offset: u64, size: u8) -> u32 {
        read_le(&self.content, offset, size, "ficr")
    }

    fn write(&mut self, offset: u64, size: u8, _value: u32) {
        log::warn!("guest write to read-only FICR at offset {offset:#x} (size {size})");
    }
}

/// User information configuration registers.
///
/// Erased to all-`0xFF` at reset and by [`super::nvmc::Nvmc`] `ERASEUICR`/
/// `ERASEALL` commands.
#[derive(Debug)]
pub struct Uicr {
    content: [u8; UICR_SIZE],
}

impl Default for Uicr {
    fn default() -> Self {
        Self::new()
    }
}

impl Uicr {
    pub fn new() -> Self {
        Self {
            content: [0xFF; UICR_SIZE],
        }
    }

    /// Reset every word back to `0xFFFF_FFFF`.
    pub fn erase(&mut self) {
        self.content = [0xFF; UICR_SIZE];
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    /// Read back the persisted word layout (see [`crate::core::save_state`]).
    pub fn words(&self) -> [u32; UICR_WORDS] {
        let mut words = [0u32; UICR_WORDS];
        for (i, w) in words.iter_mut().enumerate() {
            *w = read_le(&self.content, (i * 4) as u64, 4, "uicr");
        }
        words
    }

    pub fn restore_words(&mut self, words: &[u32; UICR_WORDS]) {
        for (i, w) in words.iter().enumerate() {
            write_le(&mut self.content, (i * 4) as u64, 4, *w, "uicr");
        }
    }
}

impl Region for Uicr {
    fn name(&self) -> &str {
        "uicr"
    }

    fn len(&self) -> u64 {
        UICR_SIZE as u64
    }

    fn read(&mut self, offset: u64, size: u8) -> u32 {
        read_le(&self.content, offset, size, "uicr")
    }

    fn write(&mut self, offset: u64, size: u8, value: u32) {
        write_le(&mut self.content, offset, size, value, "uicr")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ficr_reports_code_page_and_size() {
        let mut ficr = Ficr::new();
        assert_eq!(ficr.read(0x10, 4), 0x0000_0400);
        assert_eq!(ficr.read(0x14, 4), 0x0000_0100);
    }

    #[test]
    fn ficr_device_id_matches_fixture() {
        let mut ficr = Ficr::new();
        assert_eq!(ficr.read(0x60, 4), 0x1234_5678);
        assert_eq!(ficr.read(0x64, 4), 0x9ABC_DEF1);
    }

    #[test]
    fn ficr_ignores_guest_writes() {
        let mut ficr = Ficr::new();
        ficr.write(0x10, 4, 0);
        assert_eq!(ficr.read(0x10, 4), 0x0000_0400);
    }

    #[test]
    fn uicr_starts_erased() {
        let uicr = Uicr::new();
        assert!(uicr.as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn uicr_round_trips_and_erases() {
        let mut uicr = Uicr::new();
        uicr.write(0, 4, 0x1122_3344);
        assert_eq!(uicr.read(0, 4), 0x1122_3344);
        uicr.erase();
        assert_eq!(uicr.read(0, 4), 0xFFFF_FFFF);
    }
}
