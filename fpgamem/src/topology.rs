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

//! Usable memory banks of a programmed device.
//!
//! A [`BankTable`] is built from the raw `mem_topology` section the driver exposes for the
//! currently programmed image. Only banks that are marked used and are not streaming
//! memory are kept, and the table is sorted by base address so that range resolution
//! (see [`range`](crate::range)) can walk it in order.
//!
//! # Raw layout
//!
//! ```text
//! offset  size  field
//! 0       4     m_count (i32)
//! 4       4     padding
//! 8+40*i  40    m_mem_data[i]
//!
//! m_mem_data:
//! 0       1     m_type (u8, 3 = streaming)
//! 1       1     m_used (u8)
//! 2       6     padding
//! 8       8     m_size (u64, KiB)
//! 16      8     m_base_address (u64)
//! 24      16    m_tag (NUL padded)
//! ```

use crate::error::FpgamemError;
use crate::layout::Section;
use log::trace;
use std::fmt;

/// Size of one `mem_data` record.
pub const MEM_DATA_LEN: usize = 40;

/// `m_type` value of streaming memory, which cannot be addressed by reads and writes.
pub const MEM_STREAMING: u8 = 3;

/// Topology sizes are expressed in KiB.
const SIZE_UNIT: u64 = 1024;

/// One addressable region of device memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBank {
    pub base_address: u64,
    pub size_bytes: u64,
    /// Position of the record in the raw topology.
    pub index: i32,
    pub tag: String,
}

impl MemoryBank {
    pub fn new(base_address: u64, size_bytes: u64, index: i32) -> MemoryBank {
        MemoryBank {
            base_address,
            size_bytes,
            index,
            tag: String::new(),
        }
    }

    /// Whether `address` lies in `[base_address, base_address + size_bytes)`.
    pub fn contains(&self, address: u64) -> bool {
        address >= self.base_address && address - self.base_address < self.size_bytes
    }

    /// Last address of the bank, inclusive.
    pub fn end_address(&self) -> u64 {
        self.base_address
            .saturating_add(self.size_bytes.saturating_sub(1))
    }
}

impl fmt::Display for MemoryBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {:#x}-{:#x} ({} bytes)",
            self.index,
            if self.tag.is_empty() { "-" } else { &self.tag },
            self.base_address,
            self.end_address(),
            self.size_bytes
        )
    }
}

/// Used, addressable banks of a device sorted by base address.
///
/// Banks are assumed not to overlap; the topology is trusted on that point. An empty
/// table is valid and means the device exposes no usable memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankTable {
    banks: Vec<MemoryBank>,
}

impl BankTable {
    /// Decode a raw `mem_topology` section.
    ///
    /// # Arguments
    ///
    /// * `raw` - The section exactly as read from the driver
    ///
    /// # Returns: `Result<BankTable, FpgamemError>`
    /// * `Ok(BankTable)` - Used, non-streaming, non-empty banks sorted by base address, each
    ///   keeping its record position as `index`
    /// * `Err(FpgamemError::InvalidTopology)` - Empty buffer, zero declared banks, or a
    ///   buffer too short for the declared banks
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use fpgamem::topology::BankTable;
    /// # fn example(raw: &[u8]) -> Result<(), fpgamem::error::FpgamemError> {
    /// let table = BankTable::build(raw)?;
    /// println!("{} banks, {} bytes", table.len(), table.total_size());
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(raw: &[u8]) -> Result<BankTable, FpgamemError> {
        let section = Section::new("mem_topology", raw);
        let mut banks = Vec::new();
        for (i, record) in section.records(MEM_DATA_LEN)?.iter().enumerate() {
            let mem_type = record.u8(0)?;
            let used = record.u8(1)? != 0;
            if !used || mem_type == MEM_STREAMING {
                trace!("Skipping mem_data[{i}]: used={used}, type={mem_type}");
                continue;
            }
            let size_kib = record.u64(8)?;
            let size_bytes = size_kib.checked_mul(SIZE_UNIT).ok_or_else(|| {
                FpgamemError::InvalidTopology(format!(
                    "mem_data[{i}] size of {size_kib} KiB does not fit in 64 bits"
                ))
            })?;
            if size_bytes == 0 {
                trace!("Skipping mem_data[{i}]: zero size");
                continue;
            }
            banks.push(MemoryBank {
                base_address: record.u64(16)?,
                size_bytes,
                index: i as i32,
                tag: record.c_string(24, 16)?,
            });
        }
        Ok(BankTable::from_banks(banks))
    }

    /// Build a table from already decoded banks, sorting them by base address.
    pub fn from_banks(mut banks: Vec<MemoryBank>) -> BankTable {
        banks.sort_by_key(|bank| bank.base_address);
        BankTable { banks }
    }

    pub fn banks(&self) -> &[MemoryBank] {
        &self.banks
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// The bank with the lowest base address.
    pub fn lowest(&self) -> Option<&MemoryBank> {
        self.banks.first()
    }

    /// Sum of all bank sizes.
    pub fn total_size(&self) -> u64 {
        self.banks
            .iter()
            .fold(0u64, |acc, bank| acc.saturating_add(bank.size_bytes))
    }
}

impl fmt::Display for BankTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listed: Vec<String> = self.banks.iter().map(ToString::to_string).collect();
        write!(f, "{}", listed.join(", "))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;

    /// One `mem_data` record as the driver lays it out.
    pub(crate) struct RawBank {
        pub mem_type: u8,
        pub used: bool,
        pub size_kib: u64,
        pub base_address: u64,
        pub tag: &'static str,
    }

    pub(crate) fn used_bank(base_address: u64, size_kib: u64, tag: &'static str) -> RawBank {
        RawBank {
            mem_type: 1,
            used: true,
            size_kib,
            base_address,
            tag,
        }
    }

    pub(crate) fn raw_topology(banks: &[RawBank]) -> Vec<u8> {
        let mut raw = (banks.len() as i32).to_le_bytes().to_vec();
        raw.extend_from_slice(&[0u8; 4]);
        for bank in banks {
            raw.push(bank.mem_type);
            raw.push(u8::from(bank.used));
            raw.extend_from_slice(&[0u8; 6]);
            raw.extend_from_slice(&bank.size_kib.to_le_bytes());
            raw.extend_from_slice(&bank.base_address.to_le_bytes());
            let mut tag = [0u8; 16];
            tag[..bank.tag.len()].copy_from_slice(bank.tag.as_bytes());
            raw.extend_from_slice(&tag);
        }
        raw
    }

    #[gtest]
    fn build_filters_and_sorts() {
        let raw = raw_topology(&[
            used_bank(0x4_0000_0000, 16, "bank1"),
            RawBank {
                mem_type: MEM_STREAMING,
                ..used_bank(0x1000, 4, "stream0")
            },
            used_bank(0x0, 16, "bank0"),
            RawBank {
                used: false,
                ..used_bank(0x8_0000_0000, 16, "bank2")
            },
            used_bank(0x2_0000_0000, 8, "PLRAM[0]"),
        ]);
        let table = BankTable::build(&raw).unwrap();

        let bases: Vec<u64> = table.banks().iter().map(|b| b.base_address).collect();
        expect_that!(bases, elements_are![eq(&0x0), eq(&0x2_0000_0000), eq(&0x4_0000_0000)]);
        let indices: Vec<i32> = table.banks().iter().map(|b| b.index).collect();
        expect_that!(indices, elements_are![eq(&2), eq(&4), eq(&0)]);
        expect_that!(table.banks()[1].tag.as_str(), eq("PLRAM[0]"));
        expect_that!(table.banks()[0].size_bytes, eq(16 * 1024));
        expect_that!(table.total_size(), eq(40 * 1024));
    }

    #[gtest]
    fn build_keeps_an_all_streaming_topology_as_empty_table() {
        let raw = raw_topology(&[RawBank {
            mem_type: MEM_STREAMING,
            ..used_bank(0x1000, 4, "stream0")
        }]);
        let table = BankTable::build(&raw).unwrap();
        expect_that!(table.is_empty(), eq(true));
        expect_that!(table.total_size(), eq(0));
    }

    #[gtest]
    fn build_skips_zero_sized_banks() {
        let raw = raw_topology(&[used_bank(0x1000, 0, "empty"), used_bank(0x2000, 1, "b")]);
        let table = BankTable::build(&raw).unwrap();
        expect_that!(table.len(), eq(1));
        expect_that!(table.banks()[0].index, eq(1));
    }

    #[gtest]
    #[rstest]
    #[case::empty(vec![])]
    #[case::no_banks(raw_topology(&[]))]
    #[case::truncated({
        let mut raw = raw_topology(&[used_bank(0x0, 4, "bank0")]);
        raw.truncate(30);
        raw
    })]
    #[case::size_overflow(raw_topology(&[used_bank(0x0, u64::MAX, "bank0")]))]
    fn build_rejects_invalid_topology(#[case] raw: Vec<u8>) {
        expect_that!(
            BankTable::build(&raw),
            err(displays_as(contains_substring("FpgamemError::InvalidTopology")))
        );
    }

    #[gtest]
    fn bank_contains_is_half_open() {
        let bank = MemoryBank::new(0x1000, 0x1000, 0);
        expect_that!(bank.contains(0xfff), eq(false));
        expect_that!(bank.contains(0x1000), eq(true));
        expect_that!(bank.contains(0x1fff), eq(true));
        expect_that!(bank.contains(0x2000), eq(false));
    }

    #[gtest]
    fn bank_at_top_of_address_space_does_not_overflow() {
        let bank = MemoryBank::new(u64::MAX - 0xff, 0x100, 0);
        expect_that!(bank.contains(u64::MAX), eq(true));
        expect_that!(bank.end_address(), eq(u64::MAX));
    }

    #[gtest]
    fn from_banks_sorts_by_base_address() {
        let table = BankTable::from_banks(vec![
            MemoryBank::new(0x3000, 0x100, 0),
            MemoryBank::new(0x1000, 0x100, 1),
        ]);
        expect_that!(table.lowest().map(|b| b.base_address), eq(Some(0x1000)));
    }
}
