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

//! UART, RNG, and timer bus-attachment stubs.
//!
//! These peripherals are referenced by the SoC's memory map but their
//! internal behavior is out of scope for this core: each is a bare register
//! file that stores whatever the guest writes and logs reads of registers
//! it never set, so firmware probing these addresses observes a
//! non-crashing, inert device rather than an unmapped-access fault.

use log::trace;

use crate::core::address_space::Region;

const REG_COUNT: usize = 0x400;

/// A generic register-file stub: reads return whatever was last written
/// (0 if never written), writes are stored verbatim.
pub struct RegisterFileStub {
    name: String,
    regs: Vec<u32>,
}

impl RegisterFileStub {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            regs: vec![0; REG_COUNT],
        }
    }
}

impl Region for RegisterFileStub {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        0x1000
    }

    fn min_access_size(&self) -> u8 {
        4
    }

    fn max_access_size(&self) -> u8 {
        4
    }

    fn allows_unaligned(&self) -> bool {
        false
    }

    fn read(&mut self, offset: u64, size: u8) -> u32 {
        let idx = (offset / 4) as usize;
        let value = self.regs.get(idx).copied().unwrap_or(0);
        trace!("{}: read offset {offset:#x} (size {size}) -> {value:#x}", self.name);
        value
    }

    fn write(&mut self, offset: u64, size: u8, value: u32) {
        trace!("{}: write offset {offset:#x} = {value:#x} (size {size})", self.name);
        let idx = (offset / 4) as usize;
        if let Some(slot) = self.regs.get_mut(idx) {
            *slot = value;
        }
    }
}

/// Character UART stub, mapped at `0x4000_2000`.
pub type Uart = RegisterFileStub;

/// Hardware RNG stub, mapped at `0x4000_D000`.
pub type Rng = RegisterFileStub;

/// One of the three general-purpose timer instances, mapped at
/// `0x4000_8000 + n * 0x1000`.
pub type Timer = RegisterFileStub;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_register_reads_zero() {
        let mut uart = Uart::new("uart");
        assert_eq!(uart.read(0x10, 4), 0);
    }

    #[test]
    fn register_round_trips() {
        let mut rng = Rng::new("rng");
        rng.write(0x508, 4, 0x42);
        assert_eq!(rng.read(0x508, 4), 0x42);
    }
}
