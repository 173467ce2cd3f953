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

//! Range resolution over a [`BankTable`].
//!
//! [`resolve`] validates a requested `(address, size)` against the usable banks, fills in
//! unspecified values, and splits the request into one [`BankSegment`] per bank it touches.
//!
//! The walk follows table order starting at the bank holding the start address. It does
//! not require the banks to be adjacent in the address space: a request that runs off the
//! end of one bank continues at the base of the next one.
//!
//! # Examples
//!
//! ```rust
//! # use fpgamem::range::{resolve, TransferRequest};
//! # use fpgamem::topology::{BankTable, MemoryBank};
//! let table = BankTable::from_banks(vec![
//!     MemoryBank::new(0x0, 0x1000, 0),
//!     MemoryBank::new(0x2000, 0x1000, 1),
//! ]);
//! let mut request = TransferRequest::new(0x0, 0x1800);
//! let plan = resolve(&table, &mut request).unwrap();
//! assert_eq!(plan.bank_count(), 2);
//! assert_eq!(plan.segments()[1].segment_base_address, 0x2000);
//! assert_eq!(plan.segments()[1].segment_size, 0x800);
//! ```

use crate::error::FpgamemError;
use crate::topology::BankTable;
use log::debug;

/// A requested range. `None` means the caller left the value unspecified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferRequest {
    pub start_address: Option<u64>,
    pub size_bytes: Option<u64>,
}

impl TransferRequest {
    /// Build a request from command-line style values, where `0` means "unspecified".
    pub fn new(start_address: u64, size_bytes: u64) -> TransferRequest {
        TransferRequest {
            start_address: (start_address != 0).then_some(start_address),
            size_bytes: (size_bytes != 0).then_some(size_bytes),
        }
    }

    pub fn with_address(self, start_address: u64) -> TransferRequest {
        TransferRequest {
            start_address: Some(start_address),
            ..self
        }
    }

    pub fn with_size(self, size_bytes: u64) -> TransferRequest {
        TransferRequest {
            size_bytes: Some(size_bytes),
            ..self
        }
    }
}

/// The part of a request that falls within one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankSegment {
    /// Position of the bank in the [`BankTable`], not in the raw topology.
    pub bank_index_into_table: usize,
    pub segment_base_address: u64,
    pub segment_size: u64,
}

/// Bank-ordered segments covering a resolved request without gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub start_address: u64,
    pub size_bytes: u64,
    segments: Vec<BankSegment>,
}

impl TransferPlan {
    pub fn segments(&self) -> &[BankSegment] {
        &self.segments
    }

    /// Number of banks the request straddles.
    pub fn bank_count(&self) -> usize {
        self.segments.len()
    }

    pub fn total_size(&self) -> u64 {
        self.segments.iter().map(|s| s.segment_size).sum()
    }
}

/// Validate and normalize `request` against `table` and split it into bank segments.
///
/// An unspecified address becomes the lowest bank's base address, and an unspecified size
/// becomes everything reachable from the start address by walking the rest of the table.
///
/// # Arguments
///
/// * `table` - Usable banks of the device
/// * `request` - The requested range; rewritten with the normalized address and size on
///   success, untouched on failure
///
/// # Returns: `Result<TransferPlan, FpgamemError>`
/// * `Ok(TransferPlan)` - Segments whose sizes add up to the normalized size
/// * `Err(FpgamemError::EmptyTopology)` - The table has no banks
/// * `Err(FpgamemError::AddressOutOfRange)` - No bank contains the start address
/// * `Err(FpgamemError::SizeExceedsCapacity)` - The size is larger than what the walk from
///   the start address can cover
pub fn resolve(
    table: &BankTable,
    request: &mut TransferRequest,
) -> Result<TransferPlan, FpgamemError> {
    let lowest = table.lowest().ok_or(FpgamemError::EmptyTopology)?;
    let start_address = request.start_address.unwrap_or(lowest.base_address);

    let banks = table.banks();
    let start_bank = banks
        .iter()
        .position(|bank| bank.contains(start_address))
        .ok_or_else(|| FpgamemError::AddressOutOfRange {
            address: start_address,
            banks: table.to_string(),
        })?;

    let offset_in_bank = start_address - banks[start_bank].base_address;
    let available_size = banks[start_bank..]
        .iter()
        .fold(0u64, |acc, bank| acc.saturating_add(bank.size_bytes))
        - offset_in_bank;

    let size_bytes = match request.size_bytes {
        Some(size) if size > available_size => {
            return Err(FpgamemError::SizeExceedsCapacity {
                address: start_address,
                requested: size,
                available: available_size,
            });
        }
        Some(size) => size,
        None => available_size,
    };

    let mut segments = Vec::new();
    let mut remaining = size_bytes;
    for (i, bank) in banks.iter().enumerate().skip(start_bank) {
        if remaining == 0 {
            break;
        }
        let (segment_base_address, available_in_bank) = if i == start_bank {
            (start_address, bank.size_bytes - offset_in_bank)
        } else {
            (bank.base_address, bank.size_bytes)
        };
        let segment_size = remaining.min(available_in_bank);
        segments.push(BankSegment {
            bank_index_into_table: i,
            segment_base_address,
            segment_size,
        });
        remaining -= segment_size;
    }

    let plan = TransferPlan {
        start_address,
        size_bytes,
        segments,
    };
    debug!("Resolved {request:?} to {plan:?}");
    *request = TransferRequest {
        start_address: Some(start_address),
        size_bytes: Some(size_bytes),
    };
    Ok(plan)
}
