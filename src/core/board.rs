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

//! BBC micro:bit board: wires the nRF51 SoC's GPIO outs to the LED matrix
//! and asserts the board-level button pull-ups on reset.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::config::BoardConfig;
use crate::core::error::{EmulatorError, Result};
use crate::core::gpio::GpioLineSink;
use crate::core::led_matrix::{ColSink, LedMatrix, RowSink, VirtualClock};
use crate::core::soc::Nrf51Soc;

/// First GPIO pin driving an LED matrix column; columns occupy consecutive
/// pins starting here, matching the stock board's pins 4-12 for 9 columns.
const FIRST_COL_PIN: usize = 4;
/// First GPIO pin driving an LED matrix row; rows occupy consecutive pins
/// starting here, matching the stock board's pins 13-15 for 3 rows.
const FIRST_ROW_PIN: usize = 13;

const BUTTON_A_PIN: usize = 17;
const BUTTON_B_PIN: usize = 26;

const STOCK_ROWS: usize = 3;
const STOCK_COLS: usize = 9;

fn col_pins(cols: usize) -> Vec<usize> {
    (0..cols).map(|i| FIRST_COL_PIN + i).collect()
}

fn row_pins(rows: usize) -> Vec<usize> {
    (0..rows).map(|i| FIRST_ROW_PIN + i).collect()
}

/// The BBC micro:bit's physical LED layout: row `r`, column `c` lights the
/// physical pixel at `(col_to_x(r, c), row)`, except for the four corners
/// that have no LED (the stock board's matrix skips them).
fn stock_matrix_coords() -> Vec<Option<(i32, i32)>> {
    let skip = [(0usize, 0usize), (0, 4), (0, 8), (2, 0), (2, 4), (2, 8)];
    (0..STOCK_ROWS)
        .flat_map(|r| (0..STOCK_COLS).map(move |c| (r, c)))
        .map(|(r, c)| {
            if skip.contains(&(r, c)) {
                None
            } else {
                Some((c as i32, r as i32))
            }
        })
        .collect()
}

/// A plain fully-populated grid, used for any matrix geometry other than the
/// stock 3x9 layout (which has the four-corner gap above).
fn full_matrix_coords(rows: usize, cols: usize) -> Vec<Option<(i32, i32)>> {
    (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .map(|(r, c)| Some((c as i32, r as i32)))
        .collect()
}

fn matrix_coords_for(rows: usize, cols: usize) -> Vec<Option<(i32, i32)>> {
    if rows == STOCK_ROWS && cols == STOCK_COLS {
        stock_matrix_coords()
    } else {
        full_matrix_coords(rows, cols)
    }
}

/// BBC micro:bit board: an nRF51 SoC wired to an LED matrix with two
/// pulled-up buttons, shaped by a [`BoardConfig`].
#[derive(Debug)]
pub struct Microbit {
    pub soc: Nrf51Soc,
    pub led_matrix: Rc<RefCell<LedMatrix>>,
}

impl Microbit {
    pub fn new(clock: Rc<dyn VirtualClock>, config: &BoardConfig) -> Result<Self> {
        let variant = config
            .variant()
            .map_err(EmulatorError::UnknownVariant)?;
        let rows = config.matrix_rows as usize;
        let cols = config.matrix_cols as usize;

        let mut soc = Nrf51Soc::new(variant, None)?;
        let led_matrix = Rc::new(RefCell::new(LedMatrix::new(
            rows,
            cols,
            config.strobe_row,
            matrix_coords_for(rows, cols),
            clock,
        )?));

        // The SoC's GPIO only has one output sink; route row vs column
        // edges to the matrix via a single adapter that knows both pin sets
        // (see CombinedSink below) rather than attaching two sinks.
        let sink: Rc<RefCell<dyn crate::core::gpio::GpioLineSink>> =
            Rc::new(RefCell::new(CombinedSink {
                rows: RowSink::new(led_matrix.clone(), row_pins(rows)),
                cols: ColSink::new(led_matrix.clone(), col_pins(cols)),
            }));
        soc.gpio.borrow_mut().set_sink(sink);

        Ok(Self { soc, led_matrix })
    }

    /// Reset the board: resets every on-chip peripheral, then asserts the
    /// board-level pull-up on the two button input pins.
    pub fn reset(&mut self) {
        self.soc.reset();
        self.soc.gpio.borrow_mut().set_line(BUTTON_A_PIN, 1);
        self.soc.gpio.borrow_mut().set_line(BUTTON_B_PIN, 1);
    }

    pub fn press_button_a(&mut self) {
        self.soc.gpio.borrow_mut().set_line(BUTTON_A_PIN, 0);
    }

    pub fn release_button_a(&mut self) {
        self.soc.gpio.borrow_mut().set_line(BUTTON_A_PIN, 1);
    }

    pub fn press_button_b(&mut self) {
        self.soc.gpio.borrow_mut().set_line(BUTTON_B_PIN, 0);
    }

    pub fn release_button_b(&mut self) {
        self.soc.gpio.borrow_mut().set_line(BUTTON_B_PIN, 1);
    }
}

struct CombinedSink {
    rows: RowSink,
    cols: ColSink,
}

impl GpioLineSink for CombinedSink {
    fn gpio_line_changed(&mut self, pin: usize, level: i32) {
        self.rows.gpio_line_changed(pin, level);
        self.cols.gpio_line_changed(pin, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address_space::Region;
    use std::cell::Cell;

    struct FakeClock {
        now: Cell<u64>,
    }

    impl VirtualClock for FakeClock {
        fn now_us(&self) -> u64 {
            self.now.get()
        }
    }

    #[test]
    fn reset_asserts_button_pull_ups() {
        let clock = Rc::new(FakeClock { now: Cell::new(0) });
        let mut board = Microbit::new(clock, &BoardConfig::default()).unwrap();
        board.reset();
        assert_eq!(board.soc.gpio.borrow().in_value() & (1 << BUTTON_A_PIN), 1 << BUTTON_A_PIN);
        assert_eq!(board.soc.gpio.borrow().in_value() & (1 << BUTTON_B_PIN), 1 << BUTTON_B_PIN);
    }

    #[test]
    fn pressing_button_drives_pin_low() {
        let clock = Rc::new(FakeClock { now: Cell::new(0) });
        let mut board = Microbit::new(clock, &BoardConfig::default()).unwrap();
        board.reset();
        board.press_button_a();
        assert_eq!(board.soc.gpio.borrow().in_value() & (1 << BUTTON_A_PIN), 0);
    }

    #[test]
    fn gpio_output_edges_reach_the_led_matrix() {
        let clock = Rc::new(FakeClock { now: Cell::new(0) });
        let mut board = Microbit::new(clock, &BoardConfig::default()).unwrap();
        board.reset();

        // Drive column 0 (pin 4) low and row 0 (pin 13) high, configuring
        // both as outputs first.
        {
            let mut gpio = board.soc.gpio.borrow_mut();
            gpio.write(0x700 + 4 * 4, 4, 0x0000_0001); // pin 4 output
            gpio.write(0x700 + 4 * 13, 4, 0x0000_0001); // pin 13 output
            gpio.write(0x50C, 4, 1 << 4); // OUTCLR pin 4 -> column active (low)
            gpio.write(0x508, 4, 1 << 13); // OUTSET pin 13 -> row active (high)
        }

        assert_eq!(board.led_matrix.borrow().row_state(), 1 << 0);
        assert_eq!(board.led_matrix.borrow().col_state(), 0);
    }

    #[test]
    fn board_config_selects_variant_and_geometry() {
        let clock = Rc::new(FakeClock { now: Cell::new(0) });
        let config = BoardConfig {
            variant: "ab".to_string(),
            matrix_rows: 2,
            matrix_cols: 2,
            strobe_row: false,
            firmware: None,
        };
        let board = Microbit::new(clock, &config).unwrap();
        assert_eq!(board.soc.flash.borrow().size(), 128 * 1024);

        let mut gpio = board.soc.gpio.borrow_mut();
        // custom 2x2 geometry wires columns to pins 4-5 and rows to 13-14
        gpio.write(0x700 + 4 * 5, 4, 0x0000_0001); // pin 5 output
        gpio.write(0x508, 4, 1 << 5); // OUTSET pin 5 -> column index 1 high
        drop(gpio);
        assert_eq!(board.led_matrix.borrow().col_state(), 1 << 1);
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let clock = Rc::new(FakeClock { now: Cell::new(0) });
        let config = BoardConfig {
            variant: "zz".to_string(),
            ..BoardConfig::default()
        };
        let err = Microbit::new(clock, &config).unwrap_err();
        assert!(matches!(err, EmulatorError::UnknownVariant(_)));
    }
}
