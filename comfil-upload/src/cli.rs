// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use comfil_common::config::DEFAULT_BAUD;

use crate::commands::{self, DEFAULT_CHUNK_HEX};
use crate::transport::{Transport, DEFAULT_TIMEOUT_MS};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "comfil-upload")]
#[command(about = "Send files to a COMfiltrat0r over its serial port")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyACM0)
    #[arg(short, long)]
    pub port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// How long to wait for each reply, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Check that the device is ready
    Probe,

    /// Send a file
    Send {
        /// File to send
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Name of the file on the device (defaults to the file's name)
        #[arg(short, long)]
        name: Option<String>,

        /// Hex characters per chunk line (two per byte)
        #[arg(short, long, default_value_t = DEFAULT_CHUNK_HEX)]
        chunk_size: usize,
    },
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let mut transport = Transport::open(&cli.port, cli.baud, cli.timeout_ms)?;

    match cli.command {
        Commands::Probe => commands::probe(&mut transport),
        Commands::Send {
            file,
            name,
            chunk_size,
        } => commands::send(&mut transport, &file, name.as_deref(), chunk_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_defaults() {
        let cli = Cli::try_parse_from(["comfil-upload", "-p", "/dev/ttyACM0", "send", "a.bin"])
            .unwrap();
        assert_eq!(cli.baud, 115_200);
        assert_eq!(cli.timeout_ms, 5000);
        match cli.command {
            Commands::Send {
                file,
                name,
                chunk_size,
            } => {
                assert_eq!(file, PathBuf::from("a.bin"));
                assert_eq!(name, None);
                assert_eq!(chunk_size, 10_000);
            }
            Commands::Probe => panic!("expected send"),
        }
    }

    #[test]
    fn test_send_overrides() {
        let cli = Cli::try_parse_from([
            "comfil-upload",
            "--port",
            "COM3",
            "--timeout-ms",
            "100",
            "send",
            "a.bin",
            "--name",
            "LOOT.TXT",
            "--chunk-size",
            "200",
        ])
        .unwrap();
        assert_eq!(cli.port, "COM3");
        assert_eq!(cli.timeout_ms, 100);
        assert!(matches!(
            cli.command,
            Commands::Send { ref name, chunk_size: 200, .. } if name.as_deref() == Some("LOOT.TXT")
        ));
    }

    #[test]
    fn test_port_is_required() {
        assert!(Cli::try_parse_from(["comfil-upload", "probe"]).is_err());
    }
}
