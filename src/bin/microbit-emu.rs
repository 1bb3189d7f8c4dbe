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

//! Command-line entry point for the micro:bit core.
//!
//! Brings up a [`Microbit`] board, loads a firmware image into flash, and
//! hands back a realized board for a host runtime to drive. This binary
//! does not itself execute guest code; there is no CPU model in this crate.
//! It exists to exercise the construction and firmware-loading path end to
//! end and to give the board configuration a command line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use log::{error, info};

use microbit_core::core::board::Microbit;
use microbit_core::core::config::BoardConfig;
use microbit_core::core::error::EmulatorError;
use microbit_core::core::led_matrix::VirtualClock;

/// A wall-clock-backed virtual clock for standalone runs of this binary.
struct WallClock {
    start: std::time::Instant,
}

impl WallClock {
    fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl VirtualClock for WallClock {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

#[derive(Parser, Debug)]
#[command(name = "microbit-emu", about = "BBC micro:bit (nRF51) emulator core")]
struct Cli {
    /// Machine to emulate. Only "microbit" is supported.
    #[arg(default_value = "microbit")]
    machine: String,

    /// Firmware image to load into flash before release.
    #[arg(long, value_name = "PATH")]
    firmware: Option<PathBuf>,

    /// Board configuration file (TOML). Explicit flags override its values.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// nRF51822 product variant to emulate (overrides the config file).
    #[arg(long, value_parser = ["aa", "ab", "ac"])]
    variant: Option<String>,

    /// Rejected legacy flag; use --firmware instead.
    #[arg(long = "kernel", value_name = "PATH", hide = true)]
    legacy_kernel: Option<PathBuf>,
}

fn run() -> microbit_core::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_default_env().init();

    let cli = Cli::parse();

    if cli.legacy_kernel.is_some() {
        return Err(EmulatorError::LegacyKernelFlag);
    }
    if cli.machine != "microbit" {
        return Err(EmulatorError::UnsupportedMachine(cli.machine));
    }

    let mut config = match &cli.config {
        Some(path) => BoardConfig::load(path)?,
        None => BoardConfig::default(),
    };
    if let Some(variant) = &cli.variant {
        config.variant = variant.clone();
    }

    let clock = Rc::new(WallClock::new());
    let mut board = Microbit::new(clock, &config)?;
    board.reset();
    info!("microbit: board realized and reset");

    let firmware_path = cli.firmware.or_else(|| config.firmware.map(PathBuf::from));
    if let Some(path) = firmware_path {
        let image = std::fs::read(&path)
            .map_err(|_| EmulatorError::FirmwareNotFound(path.display().to_string()))?;
        board.soc.load_firmware(&image)?;
        info!("microbit: loaded firmware image {} ({} bytes)", path.display(), image.len());
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
