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

//! Priority-ordered, overlap-aware physical address space.
//!
//! The nRF51 SoC composes its address space from several regions that may
//! overlap. Most notably, the board-level "unimplemented" fallback region
//! spans the entire 32-bit space at the lowest priority so any address with
//! no more specific peripheral still resolves to *something*. On every
//! access, [`AddressSpace`] scans the regions covering the address and picks
//! the one with the highest priority, breaking ties by insertion order.
//!
//! # Example
//!
//! ```
//! use microbit_core::core::address_space::{AddressSpace, Ram};
//!
//! let mut space = AddressSpace::new();
//! space.add_region(0x2000_0000, Box::new(Ram::new(1024)), 0);
//!
//! space.write(0x2000_0004, 4, 0xdead_beef);
//! assert_eq!(space.read(0x2000_0004, 4), 0xdead_beef);
//! ```

use log::warn;

/// A memory-mapped region: plain storage or a peripheral's register file.
///
/// Implementors receive offsets relative to their own base address, never
/// absolute addresses. `size` is the access width in bytes (1, 2, or 4).
pub trait Region {
    /// Human-readable name, used in guest-error log messages.
    fn name(&self) -> &str;

    /// Length of this region in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest access size in bytes this region accepts. RAM/flash-backed
    /// regions default to 1 (any size up to [`Region::max_access_size`]).
    fn min_access_size(&self) -> u8 {
        1
    }

    /// Largest access size in bytes this region accepts.
    fn max_access_size(&self) -> u8 {
        4
    }

    /// Whether accesses whose offset is not a multiple of `size` are
    /// permitted. MMIO register files in this SoC require aligned accesses;
    /// RAM/flash-backed regions default to allowing any offset.
    fn allows_unaligned(&self) -> bool {
        true
    }

    /// Read `size` bytes at `offset`. The dispatcher in [`AddressSpace`]
    /// guarantees `size`/`offset` already satisfy this region's access
    /// policy before calling this method.
    fn read(&mut self, offset: u64, size: u8) -> u32;

    /// Write `size` bytes at `offset`. The dispatcher in [`AddressSpace`]
    /// guarantees `size`/`offset` already satisfy this region's access
    /// policy before calling this method.
    fn write(&mut self, offset: u64, size: u8, value: u32);
}

struct Mapping {
    base: u64,
    len: u64,
    priority: i32,
    region: Box<dyn Region>,
}

/// A composed physical address space built from overlapping, prioritized
/// [`Region`]s.
#[derive(Default)]
pub struct AddressSpace {
    mappings: Vec<Mapping>,
}

impl std::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("mapping_count", &self.mappings.len())
            .finish_non_exhaustive()
    }
}

impl AddressSpace {
    pub fn new() -> Self {
        Self {
            mappings: Vec::new(),
        }
    }

    /// Map `region` at `base` with the given overlap `priority`. Higher
    /// priority wins on overlap; negative priorities model fallback/stub
    /// regions.
    pub fn add_region(&mut self, base: u64, region: Box<dyn Region>, priority: i32) {
        let len = region.len();
        self.mappings.push(Mapping {
            base,
            len,
            priority,
            region,
        });
    }

    fn winner_index(&self, addr: u64) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, m) in self.mappings.iter().enumerate() {
            if addr >= m.base && addr < m.base + m.len {
                match best {
                    None => best = Some(i),
                    Some(b) => {
                        if m.priority > self.mappings[b].priority {
                            best = Some(i);
                        }
                    }
                }
            }
        }
        best
    }

    /// Read `size` bytes (1, 2, or 4) at guest physical address `addr`.
    ///
    /// An address with no covering region, or an access violating the
    /// covering region's size/alignment policy, logs a guest error and
    /// returns 0.
    pub fn read(&mut self, addr: u64, size: u8) -> u32 {
        match self.winner_index(addr) {
            Some(i) => {
                let base = self.mappings[i].base;
                let offset = addr - base;
                let region = &mut *self.mappings[i].region;
                if !access_allowed(&*region, offset, size) {
                    warn!(
                        "misaligned or out-of-policy read on '{}' at offset {offset:#x} (size {size})",
                        region.name()
                    );
                    return 0;
                }
                region.read(offset, size)
            }
            None => {
                warn!("unmapped read at {addr:#010x} (size {size})");
                0
            }
        }
    }

    /// Write `size` bytes (1, 2, or 4) at guest physical address `addr`.
    ///
    /// An address with no covering region, or an access violating the
    /// covering region's size/alignment policy, logs a guest error and the
    /// write is otherwise ignored.
    pub fn write(&mut self, addr: u64, size: u8, value: u32) {
        match self.winner_index(addr) {
            Some(i) => {
                let base = self.mappings[i].base;
                let offset = addr - base;
                let region = &mut *self.mappings[i].region;
                if !access_allowed(&*region, offset, size) {
                    warn!(
                        "misaligned or out-of-policy write on '{}' at offset {offset:#x} (size {size}, value {value:#010x})",
                        region.name()
                    );
                    return;
                }
                region.write(offset, size, value);
            }
            None => {
                warn!("unmapped write at {addr:#010x} (size {size}, value {value:#010x})");
            }
        }
    }

    /// Name of the region currently winning at `addr`, if any.
    pub fn region_name_at(&self, addr: u64) -> Option<&str> {
        self.winner_index(addr).map(|i| self.mappings[i].region.name())
    }
}

/// Plain read/write RAM-backed region.
pub struct Ram {
    name: String,
    data: Vec<u8>,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Self {
            name: "ram".to_string(),
            data: vec![0u8; size],
        }
    }

    pub fn named(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            data: vec![0u8; size],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Region for Ram {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, offset: u64, size: u8) -> u32 {
        read_le(&self.data, offset, size, &self.name)
    }

    fn write(&mut self, offset: u64, size: u8, value: u32) {
        let name = self.name.clone();
        write_le(&mut self.data, offset, size, value, &name)
    }
}

/// Read-only RAM-backed region. Guest writes are logged and ignored; a
/// privileged owner may still mutate the backing bytes directly through
/// [`Rom::as_mut_slice`] (used by the NVMC's erase path).
pub struct Rom {
    name: String,
    data: Vec<u8>,
}

impl Rom {
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            data: vec![0u8; size],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Region for Rom {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, offset: u64, size: u8) -> u32 {
        read_le(&self.data, offset, size, &self.name)
    }

    fn write(&mut self, offset: u64, size: u8, _value: u32) {
        warn!(
            "guest write to read-only region '{}' at offset {offset:#x} (size {size})",
            self.name
        );
    }
}

/// Fallback region that services any access with a fixed value, used for the
/// unimplemented peripheral window and CPU-private space.
pub struct Unimplemented {
    name: String,
    len: u64,
}

impl Unimplemented {
    pub fn new(name: &str, len: u64) -> Self {
        Self {
            name: name.to_string(),
            len,
        }
    }
}

impl Region for Unimplemented {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn read(&mut self, offset: u64, size: u8) -> u32 {
        warn!(
            "read from unimplemented region '{}' at offset {offset:#x} (size {size})",
            self.name
        );
        0
    }

    fn write(&mut self, offset: u64, size: u8, value: u32) {
        warn!(
            "write to unimplemented region '{}' at offset {offset:#x} (size {size}, value {value:#010x})",
            self.name
        );
    }
}

fn access_allowed(region: &dyn Region, offset: u64, size: u8) -> bool {
    if size < region.min_access_size() || size > region.max_access_size() {
        return false;
    }
    region.allows_unaligned() || offset % size as u64 == 0
}

pub(crate) fn read_le(data: &[u8], offset: u64, size: u8, name: &str) -> u32 {
    let offset = offset as usize;
    let size = size as usize;
    if offset + size > data.len() {
        warn!("out-of-range read on '{name}' at offset {offset:#x} (size {size})");
        return 0;
    }
    let mut buf = [0u8; 4];
    buf[..size].copy_from_slice(&data[offset..offset + size]);
    u32::from_le_bytes(buf)
}

pub(crate) fn write_le(data: &mut [u8], offset: u64, size: u8, value: u32, name: &str) {
    let offset = offset as usize;
    let size = size as usize;
    if offset + size > data.len() {
        warn!("out-of-range write on '{name}' at offset {offset:#x} (size {size})");
        return;
    }
    let bytes = value.to_le_bytes();
    data[offset..offset + size].copy_from_slice(&bytes[..size]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec as pvec;
    use proptest::prelude::*;

    #[test]
    fn ram_round_trips() {
        let mut space = AddressSpace::new();
        space.add_region(0x2000_0000, Box::new(Ram::new(0x1000)), 0);
        space.write(0x2000_0010, 4, 0x1234_5678);
        assert_eq!(space.read(0x2000_0010, 4), 0x1234_5678);
    }

    #[test]
    fn higher_priority_region_wins_on_overlap() {
        let mut space = AddressSpace::new();
        space.add_region(0, Box::new(Unimplemented::new("fallback", u64::MAX)), -1500);
        space.add_region(0x1000, Box::new(Ram::new(0x1000)), 0);
        space.write(0x1000, 4, 42);
        assert_eq!(space.read(0x1000, 4), 42);
        // address only covered by the fallback still resolves, not faults
        assert_eq!(space.read(0x500, 4), 0);
    }

    #[test]
    fn unmapped_access_returns_zero() {
        let mut space = AddressSpace::new();
        assert_eq!(space.read(0xdead_beef, 4), 0);
    }

    #[test]
    fn rom_ignores_guest_writes() {
        let mut space = AddressSpace::new();
        space.add_region(0, Box::new(Rom::new("flash", 0x100)), 0);
        space.write(0, 4, 0xffff_ffff);
        assert_eq!(space.read(0, 4), 0);
    }

    struct StrictMmio {
        value: u32,
    }

    impl Region for StrictMmio {
        fn name(&self) -> &str {
            "strict-mmio"
        }

        fn len(&self) -> u64 {
            0x10
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

        fn read(&mut self, _offset: u64, _size: u8) -> u32 {
            self.value
        }

        fn write(&mut self, _offset: u64, _size: u8, value: u32) {
            self.value = value;
        }
    }

    #[test]
    fn mmio_region_rejects_non_word_access_size() {
        let mut space = AddressSpace::new();
        space.add_region(0x5000_0000, Box::new(StrictMmio { value: 0xAABB_CCDD }), 0);
        assert_eq!(space.read(0x5000_0504, 1), 0);
        assert_eq!(space.read(0x5000_0504, 4), 0xAABB_CCDD);
    }

    #[test]
    fn mmio_region_rejects_unaligned_access() {
        let mut space = AddressSpace::new();
        space.add_region(0x5000_0000, Box::new(StrictMmio { value: 0xAABB_CCDD }), 0);
        assert_eq!(space.read(0x5000_0501, 4), 0);
        space.write(0x5000_0501, 4, 0x1111_1111);
        assert_eq!(space.read(0x5000_0500, 4), 0xAABB_CCDD);
    }

    struct TaggedRegion {
        id: u32,
        len: u64,
    }

    impl Region for TaggedRegion {
        fn name(&self) -> &str {
            "tagged"
        }

        fn len(&self) -> u64 {
            self.len
        }

        fn read(&mut self, _offset: u64, _size: u8) -> u32 {
            self.id
        }

        fn write(&mut self, _offset: u64, _size: u8, _value: u32) {}
    }

    proptest! {
        #[test]
        fn highest_priority_covering_region_always_wins(
            regions in pvec((0u64..64, 1u64..64, -10i32..10), 1..12),
            addr in 0u64..128,
        ) {
            let mut expected: Option<(usize, i32)> = None;
            for (idx, &(base, len, priority)) in regions.iter().enumerate() {
                if addr >= base && addr < base + len {
                    let better = match expected {
                        None => true,
                        Some((_, best)) => priority > best,
                    };
                    if better {
                        expected = Some((idx, priority));
                    }
                }
            }

            let mut space = AddressSpace::new();
            for (idx, &(base, len, priority)) in regions.iter().enumerate() {
                space.add_region(base, Box::new(TaggedRegion { id: idx as u32, len }), priority);
            }

            let winner = space.read(addr, 1);
            match expected {
                Some((idx, _)) => prop_assert_eq!(winner, idx as u32),
                None => prop_assert_eq!(winner, 0),
            }
        }
    }
}
