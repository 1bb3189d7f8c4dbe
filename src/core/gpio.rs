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

//! 32-pin GPIO block.
//!
//! Every register write re-derives the full per-pin state: whether the pin
//! is internally driving, whether it is also driven externally (a short
//! circuit, logged but not fatal), and the resulting `IN` level. Output
//! changes are reported to an attached [`GpioLineSink`] with the same
//! hi-Z-as-`-1` convention the board wiring and LED matrix expect.

use log::{trace, warn};
use std::cell::RefCell;
use std::rc::Rc;

use crate::core::address_space::Region;

pub const NUM_PINS: usize = 32;

const REG_OUT: u64 = 0x504;
const REG_OUTSET: u64 = 0x508;
const REG_OUTCLR: u64 = 0x50C;
const REG_IN: u64 = 0x510;
const REG_DIR: u64 = 0x514;
const REG_DIRSET: u64 = 0x518;
const REG_DIRCLR: u64 = 0x51C;
const REG_CNF_START: u64 = 0x700;
const REG_CNF_END: u64 = 0x700 + 4 * NUM_PINS as u64 - 1;

const PULL_DOWN: u32 = 1;
const PULL_UP: u32 = 3;

/// Receives GPIO output-line transitions. `level` is `0`/`1` when the pin is
/// internally driving, or `-1` when it has gone high-impedance. Receivers
/// that only understand `0`/`1` should treat `-1` as "no change".
pub trait GpioLineSink {
    fn gpio_line_changed(&mut self, pin: usize, level: i32);
}

/// 32-pin GPIO register block, mapped at `0x5000_0000`.
pub struct Gpio {
    out: u32,
    dir: u32,
    in_: u32,
    in_mask: u32,
    cnf: [u32; NUM_PINS],
    old_out: u32,
    old_out_connected: u32,
    sink: Option<Rc<RefCell<dyn GpioLineSink>>>,
}

impl std::fmt::Debug for Gpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gpio")
            .field("out", &self.out)
            .field("dir", &self.dir)
            .field("in_", &self.in_)
            .field("in_mask", &self.in_mask)
            .field("cnf", &self.cnf)
            .field("old_out", &self.old_out)
            .field("old_out_connected", &self.old_out_connected)
            .field("sink_present", &self.sink.is_some())
            .finish()
    }
}

impl Default for Gpio {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpio {
    pub fn new() -> Self {
        let mut gpio = Self {
            out: 0,
            dir: 0,
            in_: 0,
            in_mask: 0,
            cnf: [0; NUM_PINS],
            old_out: 0,
            old_out_connected: 0,
            sink: None,
        };
        gpio.reset();
        gpio
    }

    /// Attach the sink that receives output-line edges (board wiring).
    pub fn set_sink(&mut self, sink: Rc<RefCell<dyn GpioLineSink>>) {
        self.sink = Some(sink);
    }

    pub fn reset(&mut self) {
        self.out = 0;
        self.dir = 0;
        self.in_ = 0;
        self.in_mask = 0;
        self.old_out = 0;
        self.old_out_connected = 0;
        self.cnf = [0x0000_0002; NUM_PINS];
    }

    /// Drive (or release, with `value < 0`) pin `pin` from outside the SoC:
    /// a button press, a wired peripheral, or board-level pull-up.
    pub fn set_line(&mut self, pin: usize, value: i32) {
        assert!(pin < NUM_PINS, "GPIO pin {pin} out of range");
        let externally_driven = value >= 0;
        self.in_mask = set_bit(self.in_mask, pin, externally_driven);
        self.in_ = set_bit(self.in_, pin, value > 0);
        self.update_state();
    }

    pub fn out(&self) -> u32 {
        self.out
    }

    pub fn dir(&self) -> u32 {
        self.dir
    }

    pub fn in_value(&self) -> u32 {
        self.in_
    }

    pub fn in_mask(&self) -> u32 {
        self.in_mask
    }

    pub fn cnf(&self) -> [u32; NUM_PINS] {
        self.cnf
    }

    pub fn old_out(&self) -> u32 {
        self.old_out
    }

    pub fn old_out_connected(&self) -> u32 {
        self.old_out_connected
    }

    pub fn restore(
        &mut self,
        out: u32,
        in_: u32,
        in_mask: u32,
        dir: u32,
        cnf: [u32; NUM_PINS],
        old_out: u32,
        old_out_connected: u32,
    ) {
        self.out = out;
        self.in_ = in_;
        self.in_mask = in_mask;
        self.dir = dir;
        self.cnf = cnf;
        self.old_out = old_out;
        self.old_out_connected = old_out_connected;
    }

    fn reflect_dir_into_cnf(&mut self) {
        for i in 0..NUM_PINS {
            self.cnf[i] = (self.cnf[i] & !1) | ((self.dir >> i) & 1);
        }
    }

    fn drive_connected(cnf: u32, level: bool) -> bool {
        let drive = (cnf >> 8) & 0x7;
        match drive {
            0..=3 => true,
            4 | 5 => level,
            6 | 7 => !level,
            _ => unreachable!("3-bit field cannot exceed 7"),
        }
    }

    fn update_output_irq(&mut self, i: usize, connected: bool, level: bool) {
        let irq_level: i32 = if connected { level as i32 } else { -1 };
        let old_connected = bit(self.old_out_connected, i);
        let old_level = bit(self.old_out, i);

        if old_connected != connected || old_level != level {
            if let Some(sink) = &self.sink {
                sink.borrow_mut().gpio_line_changed(i, irq_level);
            }
            trace!("gpio: pin {i} output irq -> {irq_level}");
        }

        self.old_out = set_bit(self.old_out, i, level);
        self.old_out_connected = set_bit(self.old_out_connected, i, connected);
    }

    fn update_state(&mut self) {
        for i in 0..NUM_PINS {
            let cnf = self.cnf[i];
            let pull = (cnf >> 2) & 0x3;
            let dir = bit(self.dir, i);
            let externally_driven = bit(self.in_mask, i);
            let out = bit(self.out, i);
            let input_enabled = !bit(cnf, 1);
            let internally_driving = Self::drive_connected(cnf, out) && dir;

            self.update_output_irq(i, internally_driving, out);

            if internally_driving && externally_driven {
                warn!("gpio: pin {i} short circuited");
            }

            if !input_enabled || (input_enabled && !externally_driven && !internally_driving) {
                if pull == PULL_DOWN {
                    self.in_ = set_bit(self.in_, i, false);
                } else if pull == PULL_UP {
                    self.in_ = set_bit(self.in_, i, true);
                }
            }

            if internally_driving && !externally_driven && input_enabled {
                self.in_ = set_bit(self.in_, i, out);
            }
        }
    }
}

fn bit(value: u32, i: usize) -> bool {
    (value >> i) & 1 != 0
}

fn set_bit(value: u32, i: usize, set: bool) -> u32 {
    if set {
        value | (1 << i)
    } else {
        value & !(1 << i)
    }
}

impl Region for Gpio {
    fn name(&self) -> &str {
        "gpio"
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

    fn read(&mut self, offset: u64, _size: u8) -> u32 {
        match offset {
            REG_OUT..=REG_OUTCLR => self.out,
            REG_IN => self.in_,
            REG_DIR..=REG_DIRCLR => self.dir,
            REG_CNF_START..=REG_CNF_END => {
                let idx = ((offset - REG_CNF_START) / 4) as usize;
                self.cnf[idx]
            }
            _ => {
                warn!("gpio: bad read offset {offset:#x}");
                0
            }
        }
    }

    fn write(&mut self, offset: u64, _size: u8, value: u32) {
        match offset {
            REG_OUT => self.out = value,
            REG_OUTSET => self.out |= value,
            REG_OUTCLR => self.out &= !value,
            REG_DIR => {
                self.dir = value;
                self.reflect_dir_into_cnf();
            }
            REG_DIRSET => {
                self.dir |= value;
                self.reflect_dir_into_cnf();
            }
            REG_DIRCLR => {
                self.dir &= !value;
                self.reflect_dir_into_cnf();
            }
            REG_CNF_START..=REG_CNF_END => {
                let idx = ((offset - REG_CNF_START) / 4) as usize;
                self.cnf[idx] = value;
                self.dir = (self.dir & !(1 << idx)) | ((value & 1) << idx);
            }
            _ => {
                warn!("gpio: bad write offset {offset:#x}");
                return;
            }
        }
        self.update_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec as pvec;
    use proptest::prelude::*;

    #[derive(Default)]
    struct RecordingSink {
        edges: Vec<(usize, i32)>,
    }

    impl GpioLineSink for RecordingSink {
        fn gpio_line_changed(&mut self, pin: usize, level: i32) {
            self.edges.push((pin, level));
        }
    }

    #[test]
    fn reset_sets_cnf_to_disconnected_input() {
        let gpio = Gpio::new();
        assert!(gpio.cnf.iter().all(|&c| c == 0x0000_0002));
        assert_eq!(gpio.out, 0);
        assert_eq!(gpio.dir, 0);
    }

    #[test]
    fn dir_and_cnf_bit_zero_stay_synchronized() {
        let mut gpio = Gpio::new();
        gpio.write(REG_DIR, 4, 0x0000_0001);
        assert_eq!(gpio.cnf[0] & 1, 1);

        gpio.write(REG_CNF_START, 4, 0x0000_0002);
        assert_eq!(gpio.dir & 1, 0);
    }

    #[test]
    fn out_register_round_trips_via_set_and_clr() {
        let mut gpio = Gpio::new();
        gpio.write(REG_OUTSET, 4, 0b101);
        assert_eq!(gpio.read(REG_OUT, 4), 0b101);
        gpio.write(REG_OUTCLR, 4, 0b100);
        assert_eq!(gpio.read(REG_OUT, 4), 0b001);
    }

    #[test]
    fn output_pin_self_stimulates_input_when_no_external_drive() {
        let mut gpio = Gpio::new();
        // pin 0: output, standard drive (cnf bits 8:10 = 0), input buffer connected
        gpio.write(REG_CNF_START, 4, 0x0000_0001);
        gpio.write(REG_OUTSET, 4, 1);
        assert_eq!(gpio.read(REG_IN, 4) & 1, 1);
    }

    #[test]
    fn short_circuit_lets_external_drive_win_for_in() {
        let mut gpio = Gpio::new();
        gpio.write(REG_CNF_START, 4, 0x0000_0001);
        gpio.write(REG_OUTSET, 4, 1);
        gpio.set_line(0, 0);
        assert_eq!(gpio.read(REG_IN, 4) & 1, 0);
    }

    #[test]
    fn pull_up_sets_in_when_input_disconnected_and_unused() {
        let mut gpio = Gpio::new();
        // pull-up (bits 2:3 = 0b11), input buffer connected, input direction
        gpio.write(REG_CNF_START, 4, 0b1100);
        assert_eq!(gpio.read(REG_IN, 4) & 1, 1);
    }

    #[test]
    fn output_edge_emits_only_on_change() {
        let gpio = Rc::new(RefCell::new(Gpio::new()));
        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        gpio.borrow_mut().set_sink(sink.clone());

        gpio.borrow_mut().write(REG_CNF_START, 4, 1);
        gpio.borrow_mut().write(REG_OUTSET, 4, 1);
        gpio.borrow_mut().write(REG_OUTSET, 4, 1);

        let edges = &sink.borrow().edges;
        assert_eq!(edges.iter().filter(|(pin, _)| *pin == 0).count(), 2);
    }

    #[derive(Clone, Debug)]
    enum DirOp {
        Dir(u32),
        DirSet(u32),
        DirClr(u32),
        Cnf(usize, u32),
    }

    fn dir_op_strategy() -> impl Strategy<Value = DirOp> {
        prop_oneof![
            any::<u32>().prop_map(DirOp::Dir),
            any::<u32>().prop_map(DirOp::DirSet),
            any::<u32>().prop_map(DirOp::DirClr),
            (0..NUM_PINS, any::<u32>()).prop_map(|(pin, v)| DirOp::Cnf(pin, v)),
        ]
    }

    proptest! {
        #[test]
        fn dir_and_cnf_bit_zero_stay_synchronized_under_random_writes(
            ops in pvec(dir_op_strategy(), 1..50),
        ) {
            let mut gpio = Gpio::new();
            for op in ops {
                match op {
                    DirOp::Dir(v) => gpio.write(REG_DIR, 4, v),
                    DirOp::DirSet(v) => gpio.write(REG_DIRSET, 4, v),
                    DirOp::DirClr(v) => gpio.write(REG_DIRCLR, 4, v),
                    DirOp::Cnf(pin, v) => gpio.write(REG_CNF_START + 4 * pin as u64, 4, v),
                }
                for i in 0..NUM_PINS {
                    prop_assert_eq!(bit(gpio.dir, i), (gpio.cnf[i] & 1) != 0);
                }
            }
        }
    }
}
