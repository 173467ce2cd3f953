// This file is part of fpgamem, a tool to access the memory banks and compute units of FPGA accelerator cards.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// fpgamem is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// fpgamem is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Command-line access to the memory banks of FPGA accelerator cards.
//!
//! # Usage
//!
//! ```bash
//! fpgamem [--device <BDF>] [--verbose] [--config <PATH>] <COMMAND>
//! ```
//!
//! | command | what it does |
//! |---|---|
//! | `read <ADDRESS> <SIZE> -o <FILE>` | dump device memory into a file |
//! | `write <ADDRESS> <SIZE> (-f <BYTE> \| -i <FILE>)` | fill device memory or copy a file into it |
//! | `banks` | list the usable memory banks |
//! | `cu` | list compute units and their status |
//!
//! # Common Concepts
//!
//! ## Device Handles
//!
//! A card is named by its PCI BDF, e.g. `0000:d8:00.1`; the domain may be left out and
//! case does not matter. Without `--device` the first card found under the configured
//! PCI devices directory is used.
//!
//! ## Addresses and Sizes
//!
//! Numbers take a `0x` prefix for hexadecimal or a leading `0` for octal. An address of
//! `0` means the lowest bank; a size of `0` means everything from the address to the end
//! of the last bank.
//!
//! ## Error Handling
//!
//! Every failure is logged, printed to stderr as `FpgamemError::<Kind>: <message>` and
//! ends the process with exit status 1.

mod banks;
mod cu;
mod number;
mod read;
mod write;

use crate::banks::banks_handler;
use crate::cu::cu_handler;
use crate::number::{parse_fill, parse_number};
use crate::read::read_handler;
use crate::write::{WriteInput, write_handler};
use clap::{Parser, Subcommand, arg, command};
use fpgamem::config::Config;
use fpgamem::cu::read_stats_enabled;
use fpgamem::device::{SysfsDevice, first_device};
use fpgamem::error::FpgamemError;
use log::{debug, error};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fpgamem")]
#[command(bin_name = "fpgamem")]
#[command(about = "Read and write the memory banks of FPGA accelerator cards")]
struct Cli {
    #[arg(
        short = 'd',
        long = "device",
        help = r#"PCI BDF of the card to be used for operations, e.g. 0000:d8:00.1.
Default value for this option is calculated in runtime and application
picks the first card found in the system (under /sys/bus/pci/devices)."#
    )]
    device: Option<String>,
    #[arg(short = 'v', long = "verbose", help = "Log every transfer block")]
    verbose: bool,
    #[arg(
        short = 'c',
        long = "config",
        help = "Configuration file to use instead of /etc/fpgamem/config.toml"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read device memory into a file
    Read {
        /// Start address, 0 for the lowest bank
        #[arg(value_parser = parse_number)]
        address: u64,
        /// Number of bytes, 0 to read up to the end of the last bank
        #[arg(value_parser = parse_number)]
        size: u64,
        /// File receiving the data
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
    /// Write a fill byte or a file into device memory
    Write {
        /// Start address, 0 for the lowest bank
        #[arg(value_parser = parse_number)]
        address: u64,
        /// Number of bytes, 0 to write up to the end of the last bank (or the whole file if shorter)
        #[arg(value_parser = parse_number)]
        size: u64,
        /// Byte written over the whole range
        #[arg(
            short = 'f',
            long = "fill",
            value_parser = parse_fill,
            conflicts_with = "input",
            required_unless_present = "input"
        )]
        fill: Option<u8>,
        /// File copied into device memory
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
    },
    /// List the usable memory banks
    Banks,
    /// List compute units and their status
    Cu,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Open the card named on the command line, or the first one found.
fn open_device(config: &Config, device: &Option<String>) -> Result<SysfsDevice, FpgamemError> {
    let bdf = match device {
        Some(bdf) => bdf.clone(),
        None => first_device(config)?,
    };
    SysfsDevice::open(config, &bdf)
}

fn run(cli: Cli) -> Result<String, FpgamemError> {
    let config = Config::load(cli.config.as_deref())?;
    debug!("using configuration {config:?}");
    let device = open_device(&config, &cli.device)?;
    match cli.command {
        Commands::Read {
            address,
            size,
            output,
        } => read_handler(&device, address, size, &output, config.block_size),
        Commands::Write {
            address,
            size,
            fill,
            input,
        } => {
            let input = WriteInput::from_options(fill, input)?;
            write_handler(&device, address, size, &input, config.block_size)
        }
        Commands::Banks => banks_handler(&device),
        Commands::Cu => cu_handler(&device, read_stats_enabled()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!("parsed cli command with {cli:?}");
    match run(cli) {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use fpgamem::device::Device;
    use googletest::prelude::*;
    use rstest::*;
    use std::cell::{Cell, RefCell};

    /// A card with 4 KiB banks at 0x0 and 0x2000 whose memory initially holds the low
    /// byte of each address.
    pub(crate) struct FakeCard {
        pub memory: RefCell<Vec<u8>>,
        pub reads: Cell<usize>,
        pub topology: Vec<u8>,
        pub ip_layout: Vec<u8>,
        pub custat: Vec<String>,
    }

    impl FakeCard {
        pub fn with_pattern() -> FakeCard {
            FakeCard {
                memory: RefCell::new((0..0x3000u32).map(|a| a as u8).collect()),
                reads: Cell::new(0),
                topology: FakeCard::topology(&[(0x2000, 4, "bank1"), (0x0, 4, "bank0")]),
                ip_layout: FakeCard::ip_layout(&[
                    (0, 0x0, "dna"),
                    (1, 0x1800000, "vadd:vadd_1"),
                ]),
                custat: vec!["CU[@0x1800000] : 5 status : 5".to_string()],
            }
        }

        /// Encode used DDR banks as `(base_address, size_kib, tag)`.
        pub fn topology(banks: &[(u64, u64, &str)]) -> Vec<u8> {
            let mut raw = (banks.len() as i32).to_le_bytes().to_vec();
            raw.extend_from_slice(&[0u8; 4]);
            for (base, size_kib, tag) in banks {
                raw.extend_from_slice(&[1, 1, 0, 0, 0, 0, 0, 0]);
                raw.extend_from_slice(&size_kib.to_le_bytes());
                raw.extend_from_slice(&base.to_le_bytes());
                let mut field = [0u8; 16];
                field[..tag.len()].copy_from_slice(tag.as_bytes());
                raw.extend_from_slice(&field);
            }
            raw
        }

        /// Encode IPs as `(type, base_address, name)`.
        pub fn ip_layout(ips: &[(u32, u64, &str)]) -> Vec<u8> {
            let mut raw = (ips.len() as i32).to_le_bytes().to_vec();
            raw.extend_from_slice(&[0u8; 4]);
            for (ip_type, base, name) in ips {
                raw.extend_from_slice(&ip_type.to_le_bytes());
                raw.extend_from_slice(&[0u8; 4]);
                raw.extend_from_slice(&base.to_le_bytes());
                let mut field = [0u8; 64];
                field[..name.len()].copy_from_slice(name.as_bytes());
                raw.extend_from_slice(&field);
            }
            raw
        }
    }

    impl Device for FakeCard {
        fn handle(&self) -> &str {
            "0000:3b:00.1"
        }

        fn mem_topology_raw(&self) -> std::result::Result<Vec<u8>, FpgamemError> {
            Ok(self.topology.clone())
        }

        fn ip_layout_raw(&self) -> std::result::Result<Vec<u8>, FpgamemError> {
            Ok(self.ip_layout.clone())
        }

        fn kds_custat(&self) -> std::result::Result<Vec<String>, FpgamemError> {
            Ok(self.custat.clone())
        }

        fn unmgd_pread(&self, buf: &mut [u8], offset: u64) -> std::result::Result<usize, FpgamemError> {
            self.reads.set(self.reads.get() + 1);
            let start = offset as usize;
            buf.copy_from_slice(&self.memory.borrow()[start..start + buf.len()]);
            Ok(buf.len())
        }

        fn unmgd_pwrite(&self, buf: &[u8], offset: u64) -> std::result::Result<usize, FpgamemError> {
            let start = offset as usize;
            self.memory.borrow_mut()[start..start + buf.len()].copy_from_slice(buf);
            Ok(buf.len())
        }
    }

    #[gtest]
    #[rstest]
    #[case::read(&["fpgamem", "read", "0x1000", "0", "-o", "out.bin"])]
    #[case::write_fill(&["fpgamem", "-d", "3b:00.1", "write", "0", "16", "--fill", "0xff"])]
    #[case::write_input(&["fpgamem", "write", "0x2000", "0", "-i", "in.bin"])]
    #[case::banks(&["fpgamem", "--verbose", "banks"])]
    #[case::cu(&["fpgamem", "--config", "/tmp/fpgamem.toml", "cu"])]
    fn accepted_command_lines(#[case] args: &[&str]) {
        expect_that!(Cli::try_parse_from(args.iter().copied()).is_ok(), eq(true));
    }

    #[gtest]
    #[rstest]
    #[case::missing_output(&["fpgamem", "read", "0", "0"])]
    #[case::bad_address(&["fpgamem", "read", "0xzz", "0", "-o", "out.bin"])]
    #[case::fill_too_big(&["fpgamem", "write", "0", "0", "--fill", "256"])]
    #[case::fill_and_input(&["fpgamem", "write", "0", "0", "-f", "1", "-i", "in.bin"])]
    #[case::no_data(&["fpgamem", "write", "0", "0"])]
    #[case::no_command(&["fpgamem"])]
    fn rejected_command_lines(#[case] args: &[&str]) {
        expect_that!(Cli::try_parse_from(args.iter().copied()).is_err(), eq(true));
    }

    #[gtest]
    fn numbers_are_parsed_by_clap() {
        let cli = Cli::try_parse_from(["fpgamem", "write", "0x2000", "010", "-f", "0xab"]).unwrap();
        match cli.command {
            Commands::Write {
                address,
                size,
                fill,
                input,
            } => {
                expect_that!(address, eq(0x2000));
                expect_that!(size, eq(8));
                expect_that!(fill, eq(Some(0xab)));
                expect_that!(input.is_none(), eq(true));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[gtest]
    fn explicit_missing_config_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            device: None,
            verbose: false,
            config: Some(dir.path().join("missing.toml")),
            command: Commands::Banks,
        };
        expect_that!(
            run(cli),
            err(displays_as(contains_substring("FpgamemError::IORead")))
        );
    }

    #[gtest]
    fn run_against_a_fake_sysfs_tree() {
        let dir = tempfile::tempdir().unwrap();
        let card_dir = dir.path().join("0000:3b:00.1");
        std::fs::create_dir(&card_dir).unwrap();
        std::fs::write(
            card_dir.join("mem_topology"),
            FakeCard::topology(&[(0x0, 4, "bank0")]),
        )
        .unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            format!(
                "[system_paths]\npci_devices_dir = \"{}\"\n",
                dir.path().display()
            ),
        )
        .unwrap();

        let cli = Cli {
            device: None,
            verbose: false,
            config: Some(config_path),
            command: Commands::Banks,
        };
        expect_that!(run(cli).unwrap(), contains_substring("| 0 | bank0 | 0x0 | 0x1000 |"));
    }
}
