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

//! Core emulation components for the BBC micro:bit / nRF51 memory and
//! peripheral model.
//!
//! # Modules
//!
//! - [`address_space`]: priority-ordered, overlap-aware physical memory map
//! - [`flash`]: code flash backing storage, shared between the CPU-facing
//!   read-only view and the NVMC's privileged erase path
//! - [`nvram`]: FICR (factory fixture) and UICR (erasable user config)
//! - [`nvmc`]: non-volatile memory controller (page erase engine)
//! - [`gpio`]: 32-pin GPIO block
//! - [`led_matrix`]: LED matrix demultiplexer and duty-cycle renderer
//! - [`interrupt`]: nRF51 32-line interrupt model
//! - [`peripherals`]: UART/RNG/timer bus-attachment stubs
//! - [`soc`]: composes the above into the nRF51 SoC's address space
//! - [`board`]: BBC micro:bit board wiring
//! - [`config`]: board configuration (TOML)
//! - [`save_state`]: persisted save/restore layout (bincode)
//! - [`error`]: error types

pub mod address_space;
pub mod board;
pub mod config;
pub mod error;
pub mod flash;
pub mod gpio;
pub mod interrupt;
pub mod led_matrix;
pub mod nvmc;
pub mod nvram;
pub mod peripherals;
pub mod save_state;
pub mod soc;
