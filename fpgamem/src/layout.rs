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

//! Bounds-checked decoding of the driver's fixed-layout binary sections.
//!
//! The driver exposes `mem_topology` and `ip_layout` as C structs made of an `i32` record
//! count followed (after 4 bytes of alignment padding) by an array of fixed-size records.
//! Every multi-byte field is little-endian. Nothing here reinterprets memory; each field is
//! copied out of the buffer after its range has been checked, so a truncated or malformed
//! blob surfaces as [`FpgamemError::InvalidTopology`] rather than an out-of-bounds read.

use crate::error::FpgamemError;

/// Offset of the first record in a section: `i32` count plus alignment padding.
pub const RECORDS_OFFSET: usize = 8;

/// A named view over a byte buffer with checked field accessors.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    name: &'static str,
    data: &'a [u8],
}

impl<'a> Section<'a> {
    pub fn new(name: &'static str, data: &'a [u8]) -> Section<'a> {
        Section { name, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], FpgamemError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                FpgamemError::InvalidTopology(format!(
                    "{} is truncated: need {len} bytes at offset {offset}, have {}",
                    self.name,
                    self.data.len()
                ))
            })
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N], FpgamemError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(offset, N)?);
        Ok(out)
    }

    pub fn u8(&self, offset: usize) -> Result<u8, FpgamemError> {
        Ok(self.array::<1>(offset)?[0])
    }

    pub fn u32(&self, offset: usize) -> Result<u32, FpgamemError> {
        Ok(u32::from_le_bytes(self.array(offset)?))
    }

    pub fn i32(&self, offset: usize) -> Result<i32, FpgamemError> {
        Ok(i32::from_le_bytes(self.array(offset)?))
    }

    pub fn u64(&self, offset: usize) -> Result<u64, FpgamemError> {
        Ok(u64::from_le_bytes(self.array(offset)?))
    }

    /// Decode a NUL-padded fixed-width text field, lossily.
    pub fn c_string(&self, offset: usize, len: usize) -> Result<String, FpgamemError> {
        let raw = self.bytes(offset, len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    /// Split a `{ i32 count; record[count] }` section into per-record views.
    ///
    /// # Returns: `Result<Vec<Section>, FpgamemError>`
    /// * `Ok(Vec<Section>)` - One view per declared record, in source order
    /// * `Err(FpgamemError::InvalidTopology)` - Empty buffer, non-positive count, or fewer
    ///   bytes than the declared records need
    pub fn records(&self, record_len: usize) -> Result<Vec<Section<'a>>, FpgamemError> {
        if self.is_empty() {
            return Err(FpgamemError::InvalidTopology(format!("{} is empty", self.name)));
        }
        let count = self.i32(0)?;
        if count <= 0 {
            return Err(FpgamemError::InvalidTopology(format!(
                "{} declares {count} records",
                self.name
            )));
        }
        (0..count as usize)
            .map(|i| {
                let offset = RECORDS_OFFSET + i * record_len;
                self.bytes(offset, record_len)
                    .map(|data| Section::new(self.name, data))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;

    fn section_with_count(count: i32, payload: usize) -> Vec<u8> {
        let mut data = count.to_le_bytes().to_vec();
        data.extend_from_slice(&[0u8; 4]);
        data.extend(std::iter::repeat_n(0xAAu8, payload));
        data
    }

    #[gtest]
    fn reads_little_endian_fields() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let section = Section::new("test", &data);
        expect_that!(section.u8(1).unwrap(), eq(0x02));
        expect_that!(section.u32(0).unwrap(), eq(0x0403_0201));
        expect_that!(section.i32(4).unwrap(), eq(0x0807_0605));
        expect_that!(section.u64(0).unwrap(), eq(0x0807_0605_0403_0201));
    }

    #[gtest]
    fn out_of_bounds_field_is_an_error() {
        let data = [0u8; 6];
        let section = Section::new("test", &data);
        expect_that!(
            section.u64(0),
            err(displays_as(contains_substring("test is truncated")))
        );
        expect_that!(section.bytes(usize::MAX, 2), err(anything()));
    }

    #[gtest]
    fn c_string_stops_at_nul() {
        let data = *b"bank0\0\0\0";
        let section = Section::new("test", &data);
        expect_that!(section.c_string(0, 8).unwrap(), eq("bank0"));
    }

    #[gtest]
    #[rstest]
    #[case::empty(vec![], "is empty")]
    #[case::zero_count(section_with_count(0, 16), "declares 0 records")]
    #[case::negative_count(section_with_count(-3, 16), "declares -3 records")]
    #[case::truncated(section_with_count(2, 20), "is truncated")]
    fn malformed_record_arrays(#[case] data: Vec<u8>, #[case] message: &str) {
        let section = Section::new("mem_topology", &data);
        expect_that!(
            section.records(16),
            err(displays_as(contains_substring(message)))
        );
    }

    #[gtest]
    fn record_views_are_sliced_in_order() {
        let mut data = section_with_count(2, 0);
        data.extend_from_slice(&[1, 1, 2, 2]);
        let section = Section::new("test", &data);
        let records = section.records(2).unwrap();
        expect_that!(records.len(), eq(2));
        expect_that!(records[0].u8(0).unwrap(), eq(1));
        expect_that!(records[1].u8(1).unwrap(), eq(2));
    }
}
