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

//! Banks command implementation.
//!
//! Lists the memory banks that `read` and `write` can reach, in address order.

use fpgamem::device::Device;
use fpgamem::error::FpgamemError;
use fpgamem::memops::bank_table;
use fpgamem::topology::BankTable;

/// Render a bank table as an ascii table.
fn bank_table_message(device_handle: &str, table: &BankTable) -> String {
    let mut ret_string = format!(
        "---- MEMORY BANKS ({device_handle}) ----\n\
        | index | tag | base address | size |\n"
    );
    for bank in table.banks() {
        ret_string += format!(
            "| {} | {} | {:#x} | {:#x} |\n",
            bank.index, bank.tag, bank.base_address, bank.size_bytes
        )
        .as_str();
    }
    ret_string += format!(
        "\nTotal capacity: {:#x} bytes in {} banks",
        table.total_size(),
        table.len()
    )
    .as_str();
    ret_string
}

/// Main handler for the banks command.
///
/// # Returns: `Result<String, FpgamemError>`
/// * `Ok(String)` - Ascii table of the usable banks
/// * `Err(FpgamemError)` - The topology could not be read or decoded
pub fn banks_handler(device: &(impl Device + ?Sized)) -> Result<String, FpgamemError> {
    let table = bank_table(device)?;
    Ok(bank_table_message(device.handle(), &table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::FakeCard;
    use googletest::prelude::*;

    #[gtest]
    fn lists_banks_and_capacity() {
        let card = FakeCard::with_pattern();
        expect_that!(
            banks_handler(&card).unwrap(),
            all![
                starts_with("---- MEMORY BANKS (0000:3b:00.1) ----"),
                contains_substring("| 1 | bank0 | 0x0 | 0x1000 |"),
                contains_substring("| 0 | bank1 | 0x2000 | 0x1000 |"),
                ends_with("Total capacity: 0x2000 bytes in 2 banks"),
            ]
        );
    }

    #[gtest]
    fn empty_table_still_reports_capacity() {
        let message = bank_table_message("0000:3b:00.1", &BankTable::default());
        expect_that!(message, ends_with("Total capacity: 0x0 bytes in 0 banks"));
    }
}
