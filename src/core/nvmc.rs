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

//! Non-Volatile Memory Controller.
//!
//! Manages page erases of [`Flash`] and [`Uicr`]. The model is intentionally
//! not cycle-accurate: every erase completes synchronously inside the write
//! handler and `READY` always reads 1. `CONFIG`'s write-enable/erase-enable
//! bits are stored and read back but never enforced against writes or
//! erases, matching the physical part's own documented inaccuracy.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::core::address_space::Region;
use crate::core::error::{EmulatorError, Result};
use crate::core::flash::FlashHandle;
use crate::core::nvram::{Uicr, UICR_SIZE};

const REG_READY: u64 = 0x400;
const REG_CONFIG: u64 = 0x504;
const REG_ERASEPCR1: u64 = 0x508;
const REG_ERASEPCR0: u64 = 0x510;
const REG_ERASEALL: u64 = 0x50C;
const REG_ERASEUICR: u64 = 0x514;

const CONFIG_MASK: u32 = 0x03;
const ERASE_TRIGGER: u32 = 0x01;

/// Non-Volatile Memory Controller register window, mapped at `0x4001_E000`.
#[derive(Debug)]
pub struct Nvmc {
    flash: FlashHandle,
    uicr: Rc<RefCell<Uicr>>,
    config: u32,
    page_size: u32,
    code_size: u32,
}

impl Nvmc {
    /// `page_size` is in bytes, `code_size` in pages. `page_size` must be at
    /// least large enough to hold a UICR image (per the part's own erase
    /// granularity requirement).
    pub fn new(
        flash: FlashHandle,
        uicr: Rc<RefCell<Uicr>>,
        page_size: u32,
        code_size: u32,
    ) -> Result<Self> {
        if page_size < UICR_SIZE as u32 {
            return Err(EmulatorError::PageTooSmall {
                page_size,
                minimum: UICR_SIZE as u32,
            });
        }
        Ok(Self {
            flash,
            uicr,
            config: 0,
            page_size,
            code_size,
        })
    }

    fn erase_page(&mut self, addr: u32) {
        let addr = addr & !(self.page_size - 1);
        if (addr as u64) < (self.code_size as u64 * self.page_size as u64) {
            let page = vec![0xFFu8; self.page_size as usize];
            self.flash.borrow_mut().privileged_write(addr as usize, &page);
            debug!("nvmc: erased flash page at {addr:#x}");
        } else {
            warn!("nvmc: erase address {addr:#x} outside code region, ignored");
        }
    }

    fn erase_all(&mut self) {
        for i in 0..self.code_size {
            self.erase_page(i * self.page_size);
        }
        self.uicr.borrow_mut().erase();
        debug!("nvmc: erased all flash pages and UICR");
    }

    fn erase_uicr(&mut self) {
        self.uicr.borrow_mut().erase();
        debug!("nvmc: erased UICR");
    }

    pub fn config(&self) -> u32 {
        self.config
    }

    pub fn restore_config(&mut self, config: u32) {
        self.config = config & CONFIG_MASK;
    }
}

impl Region for Nvmc {
    fn name(&self) -> &str {
        "nvmc"
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
        trace!("nvmc: read offset {offset:#x} (size {size})");
        match offset {
            REG_READY => 1,
            REG_CONFIG => self.config,
            _ => {
                warn!("nvmc: bad read offset {offset:#x}");
                0
            }
        }
    }

    fn write(&mut self, offset: u64, size: u8, value: u32) {
        trace!("nvmc: write offset {offset:#x} = {value:#010x} (size {size})");
        match offset {
            REG_CONFIG => self.config = value & CONFIG_MASK,
            REG_ERASEPCR0 | REG_ERASEPCR1 => self.erase_page(value),
            REG_ERASEALL => {
                if value == ERASE_TRIGGER {
                    self.erase_all();
                }
            }
            REG_ERASEUICR => {
                if value == ERASE_TRIGGER {
                    self.erase_uicr();
                }
            }
            _ => warn!("nvmc: bad write offset {offset:#x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flash::Flash;

    fn harness(code_size: u32) -> (Nvmc, FlashHandle, Rc<RefCell<Uicr>>) {
        let flash = Rc::new(RefCell::new(Flash::new((code_size * 1024) as usize)));
        let uicr = Rc::new(RefCell::new(Uicr::new()));
        let nvmc = Nvmc::new(flash.clone(), uicr.clone(), 1024, code_size).unwrap();
        (nvmc, flash, uicr)
    }

    #[test]
    fn page_too_small_is_rejected() {
        let flash = Rc::new(RefCell::new(Flash::new(1024)));
        let uicr = Rc::new(RefCell::new(Uicr::new()));
        let err = Nvmc::new(flash, uicr, 0x80, 1).unwrap_err();
        assert!(matches!(err, EmulatorError::PageTooSmall { .. }));
    }

    #[test]
    fn ready_always_reads_one() {
        let (mut nvmc, ..) = harness(4);
        assert_eq!(nvmc.read(REG_READY, 4), 1);
        nvmc.write(REG_ERASEALL, 4, 1);
        assert_eq!(nvmc.read(REG_READY, 4), 1);
    }

    #[test]
    fn config_round_trips_masked() {
        let (mut nvmc, ..) = harness(4);
        nvmc.write(REG_CONFIG, 4, 0xFFFF_FFFF);
        assert_eq!(nvmc.read(REG_CONFIG, 4), 0x03);
    }

    #[test]
    fn erase_all_fills_flash_and_uicr_with_ff() {
        let (mut nvmc, flash, uicr) = harness(4);
        flash.borrow_mut().privileged_write(0x100, &[0x00]);
        nvmc.write(REG_ERASEALL, 4, 1);
        assert!(flash.borrow().as_slice().iter().all(|&b| b == 0xFF));
        assert!(uicr.borrow().as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn page_erase_is_masked_to_alignment_and_bounded() {
        let (mut nvmc, flash, _) = harness(4);
        flash.borrow_mut().privileged_write(0, &[0x11; 4096]);
        nvmc.write(REG_ERASEPCR0, 4, 0x0000_047C);
        let f = flash.borrow();
        assert!(f.as_slice()[0..0x400].iter().all(|&b| b == 0x11));
        assert!(f.as_slice()[0x400..0x800].iter().all(|&b| b == 0xFF));
        assert!(f.as_slice()[0x800..].iter().all(|&b| b == 0x11));
    }

    #[test]
    fn erase_out_of_code_range_is_ignored() {
        let (mut nvmc, flash, _) = harness(1);
        flash.borrow_mut().privileged_write(0, &[0x11; 1024]);
        nvmc.write(REG_ERASEPCR0, 4, 0x1000_0000);
        assert!(flash.borrow().as_slice().iter().all(|&b| b == 0x11));
    }
}
