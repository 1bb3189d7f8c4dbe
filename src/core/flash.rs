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

//! Code flash backing storage.
//!
//! Flash is read-only from the CPU's point of view; only the NVMC's
//! privileged erase/load paths (see [`crate::core::nvmc`]) may mutate it.
//! It is shared between the region the CPU reads through and the NVMC that
//! erases it, so it lives behind an [`Rc<RefCell<_>>`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::address_space::{read_le, Region};

/// Flash storage shared between the CPU-facing read-only region and the
/// NVMC's privileged erase/load paths.
#[derive(Debug)]
pub struct Flash {
    data: Vec<u8>,
}

impl Flash {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite `data.len()` bytes starting at `addr`, bypassing the
    /// read-only guest path. Used by the NVMC's page-erase engine and by
    /// firmware loading.
    pub fn privileged_write(&mut self, addr: usize, bytes: &[u8]) {
        let end = (addr + bytes.len()).min(self.data.len());
        if addr >= self.data.len() {
            return;
        }
        let n = end - addr;
        self.data[addr..end].copy_from_slice(&bytes[..n]);
    }
}

/// A handle to [`Flash`] shared between its owning SoC and the NVMC.
pub type FlashHandle = Rc<RefCell<Flash>>;

/// The CPU-facing view of flash: reads pass through, writes are guest
/// errors (use [`Flash::privileged_write`] via the NVMC instead).
pub struct FlashRegion {
    flash: FlashHandle,
}

impl FlashRegion {
    pub fn new(flash: FlashHandle) -> Self {
        Self { flash }
    }
}

impl Region for FlashRegion {
    fn name(&self) -> &str {
        "flash"
    }

    fn len(&self) -> u64 {
        self.flash.borrow().data.len() as u64
    }

    fn read(&mut self, offset: u64, size: u8) -> u32 {
        read_le(&self.flash.borrow().data, offset, size, "flash")
    }

    fn write(&mut self, offset: u64, size: u8, _value: u32) {
        log::warn!("guest write to read-only flash at offset {offset:#x} (size {size})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_writes_are_ignored_but_privileged_writes_land() {
        let flash = Rc::new(RefCell::new(Flash::new(0x1000)));
        let mut region = FlashRegion::new(flash.clone());
        region.write(0, 4, 0xAAAA_AAAA);
        assert_eq!(region.read(0, 4), 0);

        flash.borrow_mut().privileged_write(0, &0xAAAA_AAAAu32.to_le_bytes());
        assert_eq!(region.read(0, 4), 0xAAAA_AAAA);
    }

    #[test]
    fn privileged_write_past_end_is_clamped() {
        let flash = Rc::new(RefCell::new(Flash::new(4)));
        flash.borrow_mut().privileged_write(2, &[1, 2, 3, 4]);
        assert_eq!(flash.borrow().as_slice(), &[0, 0, 1, 2]);
    }
}
