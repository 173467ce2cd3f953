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

//! Read command implementation.
//!
//! Dumps a range of device memory into a file. An address of `0` starts at the lowest
//! bank and a size of `0` reads everything from the address to the end of the last bank.
//! The range may span several banks; gaps between banks are skipped, so the file holds
//! the banks' contents back to back.

use fpgamem::device::Device;
use fpgamem::error::FpgamemError;
use fpgamem::memops::mem_read;
use fpgamem::range::TransferRequest;
use fpgamem::system_io::fs_create;
use log::debug;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Main handler for the read command.
///
/// The output file is created (or truncated) before the device is touched. On failure
/// it holds whatever was read up to the failing block.
///
/// # Arguments
///
/// * `device` - The card to read from
/// * `address` - Start address, `0` for the lowest bank
/// * `size` - Number of bytes, `0` for everything up to the end of the last bank
/// * `output` - File receiving the data
/// * `block_size` - Largest single driver transfer
///
/// # Returns: `Result<String, FpgamemError>`
/// * `Ok(String)` - Message naming the file and the number of bytes saved
/// * `Err(FpgamemError)` - Output, topology, range or transfer failure
///
/// # Examples
///
/// ```bash
/// fpgamem read 0x0 0x1000 -o bank0.bin
/// fpgamem --device 0000:d8:00.1 read 0x4000000000 0 -o hbm.bin
/// ```
pub fn read_handler(
    device: &(impl Device + ?Sized),
    address: u64,
    size: u64,
    output: &Path,
    block_size: u64,
) -> Result<String, FpgamemError> {
    let mut writer = BufWriter::new(fs_create(output)?);
    let to_write_error = |e: std::io::Error| FpgamemError::IOWrite {
        file: output.to_path_buf(),
        e,
    };

    let mut request = TransferRequest::new(address, size);
    let summary = mem_read(device, &mut request, block_size, |block| {
        writer.write_all(block).map_err(to_write_error)
    })?;
    writer.flush().map_err(to_write_error)?;
    debug!("read finished: {summary:?}");

    Ok(format!(
        "Read data saved in file: {}; Num of bytes: {} bytes",
        output.display(),
        summary.bytes_transferred
    ))
}
