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

//! CU command implementation.
//!
//! Prints every compute unit of the programmed image with its usage counter and status.
//! Set `FPGAMEM_SKIP_CU_READ` to leave the scheduler statistics alone.

use fpgamem::cu::compute_units;
use fpgamem::device::Device;
use fpgamem::error::FpgamemError;

/// Main handler for the cu command.
///
/// # Arguments
///
/// * `device` - The card to query
/// * `read_stats` - Whether to read usage and status counters
///
/// # Returns: `Result<String, FpgamemError>`
/// * `Ok(String)` - One block per compute unit
/// * `Err(FpgamemError)` - The IP layout could not be read or decoded
pub fn cu_handler(device: &(impl Device + ?Sized), read_stats: bool) -> Result<String, FpgamemError> {
    let units = compute_units(device, read_stats)?;
    let mut ret_string = format!("---- COMPUTE UNITS ({}) ----\n", device.handle());
    if units.is_empty() {
        ret_string += "  No compute units found";
    }
    let blocks: Vec<String> = units.iter().map(ToString::to_string).collect();
    ret_string += blocks.join("\n").as_str();
    Ok(ret_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::FakeCard;
    use googletest::prelude::*;

    #[gtest]
    fn reports_each_kernel() {
        let card = FakeCard::with_pattern();
        expect_that!(
            cu_handler(&card, true).unwrap(),
            all![
                starts_with("---- COMPUTE UNITS (0000:3b:00.1) ----"),
                contains_substring("vadd:vadd_1"),
                contains_substring("Usage           : 5"),
                contains_substring("Status          : (START|IDLE)"),
            ]
        );
    }

    #[gtest]
    fn skipping_stats_reports_no_activity() {
        let card = FakeCard::with_pattern();
        expect_that!(
            cu_handler(&card, false).unwrap(),
            all![
                contains_substring("Usage           : 0"),
                contains_substring("Status          : (--)"),
            ]
        );
    }

    #[gtest]
    fn image_without_kernels() {
        let card = FakeCard {
            ip_layout: FakeCard::ip_layout(&[(0, 0x0, "dna")]),
            ..FakeCard::with_pattern()
        };
        expect_that!(
            cu_handler(&card, true).unwrap(),
            ends_with("No compute units found")
        );
    }

    #[gtest]
    fn empty_ip_layout_is_rejected() {
        let card = FakeCard {
            ip_layout: Vec::new(),
            ..FakeCard::with_pattern()
        };
        expect_that!(
            cu_handler(&card, true),
            err(displays_as(contains_substring("FpgamemError::InvalidTopology")))
        );
    }
}
