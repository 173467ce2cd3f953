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

//! Numeric command-line values.
//!
//! Addresses, sizes and the fill byte follow the C base-0 convention: a `0x` prefix is
//! hexadecimal, a leading `0` is octal and anything else is decimal.

/// Parse an address or size, e.g. `0x4000000`, `0100` or `4096`.
pub fn parse_number(value: &str) -> Result<u64, String> {
    let trimmed = value.trim();
    let (digits, radix) = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        (hex, 16)
    } else if trimmed.len() > 1 && trimmed.starts_with('0') {
        (&trimmed[1..], 8)
    } else {
        (trimmed, 10)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(format!("'{value}' is not a number"));
    }
    u64::from_str_radix(digits, radix).map_err(|e| format!("'{value}' is not a number: {e}"))
}

/// Parse the byte used to fill memory.
pub fn parse_fill(value: &str) -> Result<u8, String> {
    parse_number(value)
        .ok()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| "Value supplied to fill must be a value between 0 and 255".to_string())
}
