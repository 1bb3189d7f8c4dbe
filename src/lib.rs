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

//! microbit-core: a memory-map and peripheral core for a BBC micro:bit
//! (nRF51) emulator.
//!
//! This crate models the hard part of emulating the board: composing the
//! nRF51's address space out of overlapping, prioritized regions; the
//! non-volatile memory controller's page-erase semantics; the GPIO block's
//! per-pin drive/pull/short-circuit resolution; and the LED matrix's
//! duty-cycle integration over scanned row/column edges. It does not
//! include a CPU execution engine; it is meant to sit behind one.
//!
//! # Architecture
//!
//! - [`core`]: all emulation components (address space, flash, NVMC, GPIO,
//!   LED matrix, SoC composition, board wiring)
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use microbit_core::core::board::Microbit;
//! use microbit_core::core::led_matrix::VirtualClock;
//!
//! struct FixedClock(Cell<u64>);
//! impl VirtualClock for FixedClock {
//!     fn now_us(&self) -> u64 { self.0.get() }
//! }
//!
//! let clock = Rc::new(FixedClock(Cell::new(0)));
//! let mut board = Microbit::new(clock)?;
//! board.reset();
//! # Ok::<(), microbit_core::EmulatorError>(())
//! ```
//!
//! # Error Handling
//!
//! Configuration-time failures (bad dimensions, unrealized devices,
//! malformed save-states) return [`core::error::Result<T>`]. Guest-visible
//! misbehavior (unmapped accesses, short circuits) is never an `Err`; it
//! is logged through the `log` crate and degenerates to a benign default.

pub mod core;

// Re-export commonly used types
pub use core::error::{EmulatorError, Result};
