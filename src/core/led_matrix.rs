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

//! LED matrix demultiplexer.
//!
//! The matrix never sees instantaneous brightness, only scanned GPIO
//! edges. It integrates, per logical `(row, col)` LED, how many
//! microseconds it was lit during the current refresh period, and hands a
//! snapshot of that duty-cycle buffer to a [`FrameSink`] whenever the scan
//! strobe completes a period.

use log::debug;

use crate::core::error::{EmulatorError, Result};
use crate::core::gpio::GpioLineSink;

const DOT_W: i32 = 5;
const DOT_H: i32 = 10;

/// Host-provided monotonic microsecond clock. Must never decrease or jump.
pub trait VirtualClock {
    fn now_us(&self) -> u64;
}

/// Receives a rendered frame. `width`/`height` describe the logical pixel
/// grid (`2*DOT_W*5` by `2*DOT_H*5` in the physical board's native geometry,
/// but this trait is display-agnostic); `draw_box` receives pixel-space
/// coordinates and an 8-bit red intensity (green/blue are always 0 for this
/// single-color display).
pub trait FrameSink {
    fn clear(&mut self);
    fn draw_box(&mut self, x0: i32, y0: i32, w: i32, h: i32, red: u8);
    fn present(&mut self);
}

/// LED matrix demultiplexer state.
pub struct LedMatrix {
    rows: usize,
    cols: usize,
    strobe_row: bool,
    /// `matrix_coords[r*cols+c] = Some((x, y))` or `None` for an
    /// unpopulated row/column intersection.
    matrix_coords: Vec<Option<(i32, i32)>>,
    working_dc: Vec<i64>,
    frame_dc: Vec<i64>,
    row: u64,
    col: u64,
    timestamp: u64,
    regeneration_start: u64,
    regeneration_period: i64,
    redraw: bool,
    clock: std::rc::Rc<dyn VirtualClock>,
}

impl std::fmt::Debug for LedMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedMatrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("strobe_row", &self.strobe_row)
            .field("matrix_coords", &self.matrix_coords)
            .field("working_dc", &self.working_dc)
            .field("frame_dc", &self.frame_dc)
            .field("row", &self.row)
            .field("col", &self.col)
            .field("timestamp", &self.timestamp)
            .field("regeneration_start", &self.regeneration_start)
            .field("regeneration_period", &self.regeneration_period)
            .field("redraw", &self.redraw)
            .finish_non_exhaustive()
    }
}

impl LedMatrix {
    /// `matrix_coords` has `rows * cols` entries, `None` where no physical
    /// LED sits at that row/column intersection.
    pub fn new(
        rows: usize,
        cols: usize,
        strobe_row: bool,
        matrix_coords: Vec<Option<(i32, i32)>>,
        clock: std::rc::Rc<dyn VirtualClock>,
    ) -> Result<Self> {
        if rows == 0 || rows > 64 {
            return Err(EmulatorError::InvalidMatrixDimensions {
                rows: rows as u32,
                cols: cols as u32,
            });
        }
        if cols == 0 || cols > 64 {
            return Err(EmulatorError::InvalidMatrixDimensions {
                rows: rows as u32,
                cols: cols as u32,
            });
        }
        if matrix_coords.len() != rows * cols {
            return Err(EmulatorError::MatrixCoordsLengthMismatch {
                expected: rows * cols,
                got: matrix_coords.len(),
            });
        }

        let now = clock.now_us();
        Ok(Self {
            rows,
            cols,
            strobe_row,
            matrix_coords,
            working_dc: vec![0; rows * cols],
            frame_dc: vec![0; rows * cols],
            row: 0,
            col: 0,
            timestamp: now,
            regeneration_start: now,
            regeneration_period: 1,
            redraw: false,
            clock,
        })
    }

    /// Current raw row-line bitmask (test/inspection helper).
    pub fn row_state(&self) -> u64 {
        self.row
    }

    /// Current raw column-line bitmask (test/inspection helper).
    pub fn col_state(&self) -> u64 {
        self.col
    }

    fn led_was_on(&self, x: usize, y: usize) -> bool {
        let row_level = (self.row >> x) & 1 != 0;
        let col_level = (self.col >> y) & 1 != 0;
        row_level && !col_level
    }

    fn update_on_times(&mut self) -> u64 {
        let now = self.clock.now_us();
        let diff = now.saturating_sub(self.timestamp) as i64;
        self.timestamp = now;
        for x in 0..self.rows {
            for y in 0..self.cols {
                if self.led_was_on(x, y) {
                    self.working_dc[x * self.cols + y] += diff;
                }
            }
        }
        now
    }

    fn end_refresh_period(&mut self, now: u64) {
        self.regeneration_period = now.saturating_sub(self.regeneration_start) as i64;
        self.regeneration_start = now;
        self.frame_dc.copy_from_slice(&self.working_dc);
        self.working_dc.iter_mut().for_each(|v| *v = 0);
        self.redraw = true;
    }

    /// Deliver an edge on row line `row`. `level` is `0`/`1`, or `-1` for
    /// hi-Z (ignored; this device only understands a driven 0/1).
    pub fn on_row_edge(&mut self, row: usize, level: i32) {
        if level < 0 {
            return;
        }
        let now = self.update_on_times();
        let rising = level > 0;
        self.row = set_bit(self.row, row, rising);
        if self.strobe_row && row == self.rows - 1 && rising {
            self.end_refresh_period(now);
            debug!("led_matrix: completed refresh period of {}us", self.regeneration_period);
        }
    }

    /// Deliver an edge on column line `col`. See [`Self::on_row_edge`].
    pub fn on_col_edge(&mut self, col: usize, level: i32) {
        if level < 0 {
            return;
        }
        let now = self.update_on_times();
        let rising = level > 0;
        self.col = set_bit(self.col, col, rising);
        if !self.strobe_row && col == self.cols - 1 && rising {
            self.end_refresh_period(now);
            debug!("led_matrix: completed refresh period of {}us", self.regeneration_period);
        }
    }

    /// Render the current frame into `sink` if a refresh period has
    /// completed since the last render; otherwise a no-op.
    pub fn render(&mut self, sink: &mut dyn FrameSink) {
        if !self.redraw {
            return;
        }
        sink.clear();

        let amplitude = if self.strobe_row { self.rows } else { self.cols } as i64;
        for x in 0..self.rows {
            for y in 0..self.cols {
                let idx = x * self.cols + y;
                let Some((phys_x, phys_y)) = self.matrix_coords[idx] else {
                    continue;
                };
                let red = if self.regeneration_period > 0 {
                    (self.frame_dc[idx] * 256 * amplitude / self.regeneration_period)
                        .clamp(0, 255) as u8
                } else {
                    0
                };
                sink.draw_box(phys_x * 2 * DOT_W, phys_y * 2 * DOT_H, DOT_W, DOT_H, red);
            }
        }

        self.redraw = false;
        sink.present();
    }
}

fn set_bit(value: u64, i: usize, set: bool) -> u64 {
    if set {
        value | (1 << i)
    } else {
        value & !(1 << i)
    }
}

/// Adapts a [`LedMatrix`]'s row inputs to a [`GpioLineSink`] for board
/// wiring, given the GPIO pins that drive each row line.
pub struct RowSink {
    matrix: std::rc::Rc<std::cell::RefCell<LedMatrix>>,
    pins: Vec<usize>,
}

impl RowSink {
    pub fn new(matrix: std::rc::Rc<std::cell::RefCell<LedMatrix>>, pins: Vec<usize>) -> Self {
        Self { matrix, pins }
    }
}

impl GpioLineSink for RowSink {
    fn gpio_line_changed(&mut self, pin: usize, level: i32) {
        if let Some(row) = self.pins.iter().position(|&p| p == pin) {
            self.matrix.borrow_mut().on_row_edge(row, level);
        }
    }
}

/// Adapts a [`LedMatrix`]'s column inputs to a [`GpioLineSink`], given the
/// GPIO pins that drive each column line.
pub struct ColSink {
    matrix: std::rc::Rc<std::cell::RefCell<LedMatrix>>,
    pins: Vec<usize>,
}

impl ColSink {
    pub fn new(matrix: std::rc::Rc<std::cell::RefCell<LedMatrix>>, pins: Vec<usize>) -> Self {
        Self { matrix, pins }
    }
}

impl GpioLineSink for ColSink {
    fn gpio_line_changed(&mut self, pin: usize, level: i32) {
        if let Some(col) = self.pins.iter().position(|&p| p == pin) {
            self.matrix.borrow_mut().on_col_edge(col, level);
        }
    }
}
