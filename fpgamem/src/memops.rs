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

//! Whole memory reads and writes against a device.
//!
//! These tie the pieces together: fetch the topology, build the [`BankTable`], resolve the
//! request into a plan and run it block by block.

use crate::device::Device;
use crate::error::FpgamemError;
use crate::range::{TransferPlan, TransferRequest, resolve};
use crate::topology::BankTable;
use crate::transfer::{WriteSource, read_plan, write_plan};
use log::info;

/// What a finished read or write covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSummary {
    pub start_address: u64,
    pub size_bytes: u64,
    pub bank_count: usize,
    pub bytes_transferred: u64,
}

fn plan_for(
    device: &(impl Device + ?Sized),
    request: &mut TransferRequest,
) -> Result<TransferPlan, FpgamemError> {
    let table = BankTable::build(&device.mem_topology_raw()?)?;
    resolve(&table, request)
}

/// Resolve a write, capping the range at the buffer length of `source`.
///
/// An unspecified size first takes all the space left from the start address, then
/// shrinks to the buffer if that is shorter. `request` is only rewritten on success.
fn write_plan_for(
    device: &(impl Device + ?Sized),
    request: &mut TransferRequest,
    source: &WriteSource,
) -> Result<TransferPlan, FpgamemError> {
    let Some(available) = source.len() else {
        return plan_for(device, request);
    };
    if available == 0 {
        return Err(FpgamemError::Argument(
            "nothing to write, the input is empty".to_string(),
        ));
    }
    let table = BankTable::build(&device.mem_topology_raw()?)?;
    let mut capped = *request;
    if let Some(size) = capped.size_bytes {
        capped.size_bytes = Some(size.min(available));
    }
    let mut plan = resolve(&table, &mut capped)?;
    if plan.size_bytes > available {
        capped = capped.with_size(available);
        plan = resolve(&table, &mut capped)?;
    }
    *request = capped;
    Ok(plan)
}

fn announce(verb: &str, preposition: &str, plan: &TransferPlan) {
    if plan.bank_count() > 1 {
        info!(
            "{verb} {} bytes {preposition} DDR/HBM/PLRAM address {:#x} straddles {} banks",
            plan.size_bytes,
            plan.start_address,
            plan.bank_count()
        );
    } else {
        info!(
            "{verb} single bank, {} bytes {preposition} DDR/HBM/PLRAM address {:#x}",
            plan.size_bytes, plan.start_address
        );
    }
}

/// Read a range of device memory.
///
/// # Arguments
///
/// * `device` - The card to read from
/// * `request` - Requested range, normalized in place
/// * `block_size` - Largest single driver transfer
/// * `on_block` - Receives the data block by block, in address order
///
/// # Returns: `Result<TransferSummary, FpgamemError>`
/// * `Ok(TransferSummary)` - The normalized range and the bytes read
/// * `Err(FpgamemError)` - Topology, range or transfer failure
pub fn mem_read<F>(
    device: &(impl Device + ?Sized),
    request: &mut TransferRequest,
    block_size: u64,
    mut on_block: F,
) -> Result<TransferSummary, FpgamemError>
where
    F: FnMut(&[u8]) -> Result<(), FpgamemError>,
{
    let plan = plan_for(device, request)?;
    announce("Reading", "from", &plan);
    let bytes_transferred = read_plan(device, &plan, block_size, |_, block| on_block(block))?;
    Ok(TransferSummary {
        start_address: plan.start_address,
        size_bytes: plan.size_bytes,
        bank_count: plan.bank_count(),
        bytes_transferred,
    })
}

/// Write a byte pattern or a buffer into device memory.
///
/// With a [`WriteSource::Bytes`] buffer the size is capped at the buffer length. An
/// unspecified size covers the space left from the start address, or the whole buffer if
/// that is shorter. `request` keeps its original value when the call fails before any
/// transfer.
///
/// # Returns: `Result<TransferSummary, FpgamemError>`
/// * `Ok(TransferSummary)` - The normalized range and the bytes written
/// * `Err(FpgamemError::Argument)` - An empty buffer
/// * `Err(FpgamemError)` - Topology, range or transfer failure
pub fn mem_write(
    device: &(impl Device + ?Sized),
    request: &mut TransferRequest,
    source: &WriteSource,
    block_size: u64,
) -> Result<TransferSummary, FpgamemError> {
    let plan = write_plan_for(device, request, source)?;
    announce("Writing", "to", &plan);
    let bytes_transferred = write_plan(device, &plan, block_size, source)?;
    Ok(TransferSummary {
        start_address: plan.start_address,
        size_bytes: plan.size_bytes,
        bank_count: plan.bank_count(),
        bytes_transferred,
    })
}

/// The usable banks of a device.
pub fn bank_table(device: &(impl Device + ?Sized)) -> Result<BankTable, FpgamemError> {
    BankTable::build(&device.mem_topology_raw()?)
}
