// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host-side sender for COMfiltrat0r devices.
//!
//! Usage:
//!   comfil-upload --port /dev/ttyACM0 probe
//!   comfil-upload --port /dev/ttyACM0 send report.txt
//!   comfil-upload --port /dev/ttyACM0 send dump.bin --name DUMP.BIN --chunk-size 2000

mod cli;
mod commands;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
