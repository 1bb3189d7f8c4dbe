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

//! Nordic nRF51 system-on-chip: composes flash, SRAM, FICR/UICR, NVMC,
//! GPIO, and the bus-attachment stubs into a single physical address space.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;

use crate::core::address_space::{AddressSpace, Ram, Region, Unimplemented};
use crate::core::error::{EmulatorError, Result};
use crate::core::flash::{Flash, FlashHandle, FlashRegion};
use crate::core::gpio::Gpio;
use crate::core::interrupt::InterruptController;
use crate::core::nvmc::Nvmc;
use crate::core::nvram::{Ficr, Uicr};
use crate::core::peripherals::{Rng, Timer, Uart};
use crate::core::save_state::{GpioSaveState, NvmcSaveState};

pub const FLASH_BASE: u64 = 0x0000_0000;
pub const FICR_BASE: u64 = 0x1000_0000;
pub const UICR_BASE: u64 = 0x1000_1000;
pub const SRAM_BASE: u64 = 0x2000_0000;
pub const IOMEM_BASE: u64 = 0x4000_0000;
pub const IOMEM_SIZE: u64 = 0x2000_0000;
pub const UART_BASE: u64 = 0x4000_2000;
pub const TIMER_BASE: u64 = 0x4000_8000;
pub const RNG_BASE: u64 = 0x4000_D000;
pub const NVMC_BASE: u64 = 0x4001_E000;
pub const GPIO_BASE: u64 = 0x5000_0000;
pub const CPU_PRIVATE_BASE: u64 = 0xF000_0000;
pub const CPU_PRIVATE_SIZE: u64 = 0x1000_0000;

const NUM_TIMERS: u64 = 3;
const FALLBACK_PRIORITY: i32 = -1500;
const NORMAL_PRIORITY: i32 = 0;

const DEFAULT_PAGE_SIZE: u32 = 0x400;

/// Product variants of the nRF51822, differing in flash and RAM capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nrf51Variant {
    /// QFAA: 256KB flash, 16KB RAM.
    Aa,
    /// QFAB: 128KB flash, 16KB RAM.
    Ab,
    /// QFAC: 256KB flash, 32KB RAM.
    Ac,
}

impl Nrf51Variant {
    pub fn flash_size(self) -> usize {
        match self {
            Nrf51Variant::Aa => 256 * 1024,
            Nrf51Variant::Ab => 128 * 1024,
            Nrf51Variant::Ac => 256 * 1024,
        }
    }

    pub fn sram_size(self) -> usize {
        match self {
            Nrf51Variant::Aa => 16 * 1024,
            Nrf51Variant::Ab => 16 * 1024,
            Nrf51Variant::Ac => 32 * 1024,
        }
    }
}

impl std::str::FromStr for Nrf51Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aa" => Ok(Nrf51Variant::Aa),
            "ab" => Ok(Nrf51Variant::Ab),
            "ac" => Ok(Nrf51Variant::Ac),
            other => Err(format!("unknown nRF51 variant '{other}'")),
        }
    }
}

/// The nRF51 SoC: owns every on-chip peripheral and the address space that
/// composes them.
#[derive(Debug)]
pub struct Nrf51Soc {
    pub variant: Nrf51Variant,
    pub address_space: AddressSpace,
    pub gpio: Rc<RefCell<Gpio>>,
    pub nvmc: Rc<RefCell<Nvmc>>,
    pub flash: FlashHandle,
    pub uicr: Rc<RefCell<Uicr>>,
    pub interrupts: InterruptController,
}

impl Nrf51Soc {
    /// Build and wire up the SoC for `variant`. `page_size` is the NVMC's
    /// flash erase granularity in bytes (defaults to 1024 if `None`).
    pub fn new(variant: Nrf51Variant, page_size: Option<u32>) -> Result<Self> {
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let flash_size = variant.flash_size();
        let sram_size = variant.sram_size();
        let code_size = (flash_size as u32) / page_size;

        let flash: FlashHandle = Rc::new(RefCell::new(Flash::new(flash_size)));
        let uicr = Rc::new(RefCell::new(Uicr::new()));
        let nvmc = Rc::new(RefCell::new(Nvmc::new(
            flash.clone(),
            uicr.clone(),
            page_size,
            code_size,
        )?));
        let gpio = Rc::new(RefCell::new(Gpio::new()));

        let mut address_space = AddressSpace::new();
        address_space.add_region(
            IOMEM_BASE,
            Box::new(Unimplemented::new("nrf51_soc.io", IOMEM_SIZE)),
            FALLBACK_PRIORITY,
        );
        address_space.add_region(
            FLASH_BASE,
            Box::new(FlashRegion::new(flash.clone())),
            NORMAL_PRIORITY,
        );
        address_space.add_region(SRAM_BASE, Box::new(Ram::named("sram", sram_size)), NORMAL_PRIORITY);
        address_space.add_region(FICR_BASE, Box::new(Ficr::new()), NORMAL_PRIORITY);
        address_space.add_region(
            UICR_BASE,
            Box::new(UicrRegion(uicr.clone())),
            NORMAL_PRIORITY,
        );
        address_space.add_region(NVMC_BASE, Box::new(NvmcRegion(nvmc.clone())), NORMAL_PRIORITY);
        address_space.add_region(GPIO_BASE, Box::new(GpioRegion(gpio.clone())), NORMAL_PRIORITY);
        address_space.add_region(UART_BASE, Box::new(Uart::new("uart")), NORMAL_PRIORITY);
        address_space.add_region(RNG_BASE, Box::new(Rng::new("rng")), NORMAL_PRIORITY);
        for n in 0..NUM_TIMERS {
            address_space.add_region(
                TIMER_BASE + n * 0x1000,
                Box::new(Timer::new(&format!("timer{n}"))),
                NORMAL_PRIORITY,
            );
        }
        address_space.add_region(
            CPU_PRIVATE_BASE,
            Box::new(Unimplemented::new("nrf51_soc.private", CPU_PRIVATE_SIZE)),
            NORMAL_PRIORITY,
        );

        info!(
            "nrf51_soc: realized variant {variant:?} (flash {flash_size} bytes, sram {sram_size} bytes)"
        );

        Ok(Self {
            variant,
            address_space,
            gpio,
            nvmc,
            flash,
            uicr,
            interrupts: InterruptController::new(),
        })
    }

    pub fn reset(&mut self) {
        self.gpio.borrow_mut().reset();
    }

    /// Load a firmware image into flash starting at address 0.
    pub fn load_firmware(&mut self, image: &[u8]) -> Result<()> {
        let flash_size = self.flash.borrow().size();
        if image.len() > flash_size {
            return Err(EmulatorError::InvalidFirmwareSize {
                expected: flash_size,
                got: image.len(),
            });
        }
        self.flash.borrow_mut().privileged_write(0, image);
        Ok(())
    }

    pub fn gpio_save_state(&self) -> GpioSaveState {
        let gpio = self.gpio.borrow();
        GpioSaveState {
            out: gpio.out(),
            in_: gpio.in_value(),
            in_mask: gpio.in_mask(),
            dir: gpio.dir(),
            cnf: gpio.cnf(),
            old_out: gpio.old_out(),
            old_out_connected: gpio.old_out_connected(),
        }
    }

    pub fn restore_gpio(&mut self, state: &GpioSaveState) {
        self.gpio.borrow_mut().restore(
            state.out,
            state.in_,
            state.in_mask,
            state.dir,
            state.cnf,
            state.old_out,
            state.old_out_connected,
        );
    }

    pub fn nvmc_save_state(&self) -> NvmcSaveState {
        NvmcSaveState {
            uicr_content: self.uicr.borrow().words(),
            config: self.nvmc.borrow().config(),
        }
    }

    pub fn restore_nvmc(&mut self, state: &NvmcSaveState) {
        self.uicr.borrow_mut().restore_words(&state.uicr_content);
        self.nvmc.borrow_mut().restore_config(state.config);
    }
}

/// Thin [`Region`] adapters so shared peripherals (owned via `Rc<RefCell<_>>`
/// so other components can reach them directly) can also be mapped into the
/// [`AddressSpace`], which owns its regions by value.
struct UicrRegion(Rc<RefCell<Uicr>>);
impl Region for UicrRegion {
    fn name(&self) -> &str {
        "uicr"
    }
    fn len(&self) -> u64 {
        self.0.borrow().as_bytes().len() as u64
    }
    fn read(&mut self, offset: u64, size: u8) -> u32 {
        self.0.borrow_mut().read(offset, size)
    }
    fn write(&mut self, offset: u64, size: u8, value: u32) {
        self.0.borrow_mut().write(offset, size, value)
    }
}

struct NvmcRegion(Rc<RefCell<Nvmc>>);
impl Region for NvmcRegion {
    fn name(&self) -> &str {
        "nvmc"
    }
    fn len(&self) -> u64 {
        self.0.borrow().len()
    }
    fn read(&mut self, offset: u64, size: u8) -> u32 {
        self.0.borrow_mut().read(offset, size)
    }
    fn write(&mut self, offset: u64, size: u8, value: u32) {
        self.0.borrow_mut().write(offset, size, value)
    }
}

struct GpioRegion(Rc<RefCell<Gpio>>);
impl Region for GpioRegion {
    fn name(&self) -> &str {
        "gpio"
    }
    fn len(&self) -> u64 {
        self.0.borrow().len()
    }
    fn read(&mut self, offset: u64, size: u8) -> u32 {
        self.0.borrow_mut().read(offset, size)
    }
    fn write(&mut self, offset: u64, size: u8, value: u32) {
        self.0.borrow_mut().write(offset, size, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_sizes_match_table() {
        let soc = Nrf51Soc::new(Nrf51Variant::Aa, None).unwrap();
        assert_eq!(soc.flash.borrow().size(), 256 * 1024);
    }

    #[test]
    fn flash_and_sram_are_mapped_at_expected_bases() {
        let mut soc = Nrf51Soc::new(Nrf51Variant::Aa, None).unwrap();
        soc.address_space.write(SRAM_BASE + 4, 4, 0xCAFEBABE);
        assert_eq!(soc.address_space.read(SRAM_BASE + 4, 4), 0xCAFEBABE);
        // flash is read-only from the bus
        soc.address_space.write(FLASH_BASE, 4, 0xFFFF_FFFF);
        assert_eq!(soc.address_space.read(FLASH_BASE, 4), 0);
    }

    #[test]
    fn nvmc_erase_reaches_real_flash_through_shared_handle() {
        let mut soc = Nrf51Soc::new(Nrf51Variant::Aa, None).unwrap();
        soc.flash.borrow_mut().privileged_write(0x100, &[0x00]);
        soc.address_space.write(NVMC_BASE + 0x50C, 4, 1);
        assert_eq!(soc.flash.borrow().as_slice()[0x100], 0xFF);
    }

    #[test]
    fn unmapped_window_falls_back_to_unimplemented_device() {
        let mut soc = Nrf51Soc::new(Nrf51Variant::Aa, None).unwrap();
        assert_eq!(soc.address_space.read(IOMEM_BASE + 0x1234, 4), 0);
    }

    #[test]
    fn firmware_larger_than_flash_is_rejected() {
        let mut soc = Nrf51Soc::new(Nrf51Variant::Ab, None).unwrap();
        let big = vec![0u8; soc.flash.borrow().size() + 1];
        assert!(soc.load_firmware(&big).is_err());
    }
}
