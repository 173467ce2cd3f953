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

//! fpgamem - Memory bank access for FPGA accelerator cards.
//!
//! A card exposes its device memory as a set of disjoint banks (DDR, HBM, PLRAM) described
//! by the `mem_topology` of the programmed image. This crate:
//! - Decodes the topology into a sorted table of usable banks ([`topology`])
//! - Validates a requested `(address, size)` and splits it per bank ([`range`])
//! - Runs the resulting plan as fixed-size driver transfers ([`transfer`], [`memops`])
//! - Reports compute unit status from the image's IP layout ([`cu`])
//!
//! Device access goes through the [`device::Device`] trait; [`device::SysfsDevice`] is
//! the implementation used by the `fpgamem` command-line tool.
//!
//! # Environment Variables
//!
//! - `FPGAMEM_SKIP_CU_READ` - When set, compute unit counters are not read.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fpgamem::config::Config;
//! # use fpgamem::device::{SysfsDevice, first_device};
//! # use fpgamem::memops::mem_read;
//! # use fpgamem::range::TransferRequest;
//! # fn example() -> Result<(), fpgamem::error::FpgamemError> {
//! let config = Config::load(None)?;
//! let device = SysfsDevice::open(&config, &first_device(&config)?)?;
//! let mut request = TransferRequest::new(0, 0x1000);
//! let mut data = Vec::new();
//! mem_read(&device, &mut request, config.block_size, |block| {
//!     data.extend_from_slice(block);
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cu;
pub mod device;
pub mod error;
pub mod layout;
pub mod memops;
pub mod range;
pub mod system_io;
pub mod topology;
pub mod transfer;
