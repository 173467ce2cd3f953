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

//! Write command implementation.
//!
//! Fills a range of device memory with a byte, or copies a file into it. With an input
//! file, at most the file length is written.

use fpgamem::device::Device;
use fpgamem::error::FpgamemError;
use fpgamem::memops::mem_write;
use fpgamem::range::TransferRequest;
use fpgamem::system_io::fs_read_bytes;
use fpgamem::transfer::WriteSource;
use log::debug;
use std::path::PathBuf;

/// What the user asked to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteInput {
    Fill(u8),
    File(PathBuf),
}

impl WriteInput {
    /// Build the input from the mutually exclusive `--fill` and `--input` options.
    pub fn from_options(fill: Option<u8>, input: Option<PathBuf>) -> Result<WriteInput, FpgamemError> {
        match (fill, input) {
            (Some(byte), None) => Ok(WriteInput::Fill(byte)),
            (None, Some(path)) => Ok(WriteInput::File(path)),
            _ => Err(FpgamemError::Argument(
                "exactly one of --fill and --input is required".to_string(),
            )),
        }
    }

    fn source(&self) -> Result<WriteSource, FpgamemError> {
        match self {
            WriteInput::Fill(byte) => Ok(WriteSource::Fill(*byte)),
            WriteInput::File(path) => Ok(WriteSource::Bytes(fs_read_bytes(path)?)),
        }
    }
}

/// Main handler for the write command.
///
/// # Arguments
///
/// * `device` - The card to write to
/// * `address` - Start address, `0` for the lowest bank
/// * `size` - Number of bytes, `0` for everything up to the end of the last bank (or the
///   whole input file if it is shorter)
/// * `input` - Fill byte or input file
/// * `block_size` - Largest single driver transfer
///
/// # Returns: `Result<String, FpgamemError>`
/// * `Ok(String)` - Message with the number of bytes written
/// * `Err(FpgamemError)` - Input, topology, range or transfer failure
///
/// # Examples
///
/// ```bash
/// fpgamem write 0x0 0x1000 --fill 0xaa
/// fpgamem write 0x4000000000 0 --input pattern.bin
/// ```
pub fn write_handler(
    device: &(impl Device + ?Sized),
    address: u64,
    size: u64,
    input: &WriteInput,
    block_size: u64,
) -> Result<String, FpgamemError> {
    let source = input.source()?;
    let mut request = TransferRequest::new(address, size);
    let summary = mem_write(device, &mut request, &source, block_size)?;
    debug!("write finished: {summary:?}");
    Ok(format!(
        "Wrote {} bytes to DDR/HBM/PLRAM address {:#x}",
        summary.bytes_transferred, summary.start_address
    ))
}
