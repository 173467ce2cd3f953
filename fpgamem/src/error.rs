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

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FpgamemError {
    #[error(
        "FpgamemError::InvalidTopology: Memory topology is not available, ensure that a valid bitstream is programmed onto the card: {0}"
    )]
    InvalidTopology(String),
    #[error("FpgamemError::EmptyTopology: Memory topology contains no usable memory banks")]
    EmptyTopology,
    #[error(
        "FpgamemError::AddressOutOfRange: Start address {address:#x} is not valid. Available memory banks: {banks}"
    )]
    AddressOutOfRange { address: u64, banks: String },
    #[error(
        "FpgamemError::SizeExceedsCapacity: Cannot access {requested} bytes of memory from start address {address:#x}, only {available} bytes are available"
    )]
    SizeExceedsCapacity {
        address: u64,
        requested: u64,
        available: u64,
    },
    #[error(
        "FpgamemError::TransferFailure: Transferred {transferred:#x} of {requested:#x} bytes at address {address:#x} ({completed} bytes completed before the failure): {reason}"
    )]
    TransferFailure {
        address: u64,
        requested: u64,
        transferred: u64,
        completed: u64,
        reason: String,
    },
    #[error("FpgamemError::Argument: {0}")]
    Argument(String),
    #[error("FpgamemError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("FpgamemError::IOWrite: An IO error occurred when writing to {file:?}: {e}")]
    IOWrite { file: PathBuf, e: std::io::Error },
    #[error("FpgamemError::IOReadDir: An IO error occurred when reading directory {dir:?}: {e}")]
    IOReadDir { dir: PathBuf, e: std::io::Error },
    #[error("FpgamemError::TomlDe: Failed to parse config file {file:?}: {e}")]
    TomlDe { file: PathBuf, e: toml::de::Error },
    #[error("FpgamemError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}
