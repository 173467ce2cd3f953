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

//! Block-level execution of a [`TransferPlan`].
//!
//! Each segment of a plan is covered by consecutive driver transfers of at most
//! `block_size` bytes. The physical address and the running buffer offset advance by the
//! size of each block. The first failed or short transfer aborts the whole operation; no
//! block is retried.

use crate::config::MAX_BLOCK_SIZE;
use crate::device::Device;
use crate::error::FpgamemError;
use crate::range::TransferPlan;
use log::debug;

/// Data to write into device memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteSource {
    /// Repeat one byte over the whole range.
    Fill(u8),
    /// Copy a buffer, starting at its first byte.
    Bytes(Vec<u8>),
}

impl WriteSource {
    /// How many bytes the source can provide, `None` when unbounded.
    pub fn len(&self) -> Option<u64> {
        match self {
            WriteSource::Fill(_) => None,
            WriteSource::Bytes(data) => Some(data.len() as u64),
        }
    }
}

fn block_len(block_size: u64) -> Result<u64, FpgamemError> {
    if block_size == 0 {
        return Err(FpgamemError::Argument(
            "block size must be greater than zero".to_string(),
        ));
    }
    if block_size > MAX_BLOCK_SIZE {
        return Err(FpgamemError::Argument(format!(
            "block size {block_size:#x} is larger than {MAX_BLOCK_SIZE:#x}"
        )));
    }
    Ok(block_size)
}

/// Size of the scratch buffer a plan needs: one block, or less for small plans.
fn scratch_len(plan: &TransferPlan, block_size: u64) -> usize {
    let largest = plan
        .segments()
        .iter()
        .map(|s| s.segment_size)
        .max()
        .unwrap_or(0);
    largest.min(block_size) as usize
}

fn check_transferred(
    result: Result<usize, FpgamemError>,
    address: u64,
    requested: u64,
    completed: u64,
) -> Result<(), FpgamemError> {
    match result {
        Ok(n) if n as u64 == requested => Ok(()),
        Ok(n) => Err(FpgamemError::TransferFailure {
            address,
            requested,
            transferred: n as u64,
            completed,
            reason: "short transfer".to_string(),
        }),
        Err(e) => Err(FpgamemError::TransferFailure {
            address,
            requested,
            transferred: 0,
            completed,
            reason: e.to_string(),
        }),
    }
}

/// Read every segment of `plan` from `device`, handing each block to `on_block`.
///
/// # Arguments
///
/// * `device` - The card to read from
/// * `plan` - A resolved plan
/// * `block_size` - Largest single driver transfer, between 1 and [`MAX_BLOCK_SIZE`]
/// * `on_block` - Receives each block with its physical address, in plan order
///
/// # Returns: `Result<u64, FpgamemError>`
/// * `Ok(u64)` - Bytes read, equal to the plan size
/// * `Err(FpgamemError::TransferFailure)` - A read failed or came back short
/// * `Err(FpgamemError::Argument)` - Zero block size
/// * `Err(FpgamemError)` - Whatever `on_block` returned
pub fn read_plan<D, F>(
    device: &D,
    plan: &TransferPlan,
    block_size: u64,
    mut on_block: F,
) -> Result<u64, FpgamemError>
where
    D: Device + ?Sized,
    F: FnMut(u64, &[u8]) -> Result<(), FpgamemError>,
{
    let block_size = block_len(block_size)?;
    let mut buf = vec![0u8; scratch_len(plan, block_size)];
    let mut completed = 0u64;
    for segment in plan.segments() {
        let mut done = 0u64;
        while done < segment.segment_size {
            let len = block_size.min(segment.segment_size - done);
            let address = segment.segment_base_address + done;
            let block = &mut buf[..len as usize];
            check_transferred(device.unmgd_pread(block, address), address, len, completed)?;
            on_block(address, block)?;
            done += len;
            completed += len;
            debug!(
                "Read size {len:#x} B from addr {address:#x}. Total Read so far {completed:#x}"
            );
        }
    }
    Ok(completed)
}

/// Write every segment of `plan` to `device` from `source`.
///
/// The source is consumed in plan order: the first byte of a [`WriteSource::Bytes`]
/// buffer lands at the plan's start address, and the buffer offset keeps advancing across
/// bank boundaries.
///
/// # Returns: `Result<u64, FpgamemError>`
/// * `Ok(u64)` - Bytes written, equal to the plan size
/// * `Err(FpgamemError::TransferFailure)` - A write failed or came back short
/// * `Err(FpgamemError::Argument)` - Block size out of range, or a buffer smaller than the plan
pub fn write_plan<D>(
    device: &D,
    plan: &TransferPlan,
    block_size: u64,
    source: &WriteSource,
) -> Result<u64, FpgamemError>
where
    D: Device + ?Sized,
{
    let block_size = block_len(block_size)?;
    if let Some(available) = source.len() {
        if available < plan.size_bytes {
            return Err(FpgamemError::Argument(format!(
                "input provides {available} bytes but {} are to be written",
                plan.size_bytes
            )));
        }
    }
    let pattern = match source {
        WriteSource::Fill(byte) => vec![*byte; scratch_len(plan, block_size)],
        WriteSource::Bytes(_) => Vec::new(),
    };

    let mut completed = 0u64;
    for segment in plan.segments() {
        let mut done = 0u64;
        while done < segment.segment_size {
            let len = block_size.min(segment.segment_size - done);
            let address = segment.segment_base_address + done;
            let block = match source {
                WriteSource::Fill(_) => &pattern[..len as usize],
                WriteSource::Bytes(data) => {
                    let start = completed as usize;
                    &data[start..start + len as usize]
                }
            };
            check_transferred(device.unmgd_pwrite(block, address), address, len, completed)?;
            done += len;
            completed += len;
            debug!(
                "Wrote size {len:#x} B to addr {address:#x}. Total Written so far {completed:#x}"
            );
        }
    }
    Ok(completed)
}
