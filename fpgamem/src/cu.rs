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

//! Compute unit status.
//!
//! Compute units are the kernel entries of the image's `ip_layout`. Their usage counters
//! and status registers come from the scheduler statistics, one line per unit:
//!
//! ```text
//! CU[@0x1800000] : 12 status : 4
//! ```
//!
//! # Raw `ip_layout` layout
//!
//! ```text
//! offset  size  field
//! 0       4     m_count (i32)
//! 4       4     padding
//! 8+80*i  80    m_ip_data[i]
//!
//! m_ip_data:
//! 0       4     m_type (u32, 1 = kernel)
//! 4       4     properties
//! 8       8     m_base_address (u64)
//! 16      64    m_name (NUL padded)
//! ```

use crate::device::Device;
use crate::error::FpgamemError;
use crate::layout::Section;
use log::{debug, warn};
use std::fmt;

/// Size of one `ip_data` record.
pub const IP_DATA_LEN: usize = 80;

/// `m_type` of a kernel, i.e. a compute unit.
pub const IP_KERNEL: u32 = 1;

/// When set, scheduler statistics are not read and counters are reported as zero.
pub static SKIP_CU_READ_ENV: &str = "FPGAMEM_SKIP_CU_READ";

/// One IP of the programmed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpData {
    pub ip_type: u32,
    pub base_address: u64,
    pub name: String,
}

/// Decode a raw `ip_layout` section.
///
/// # Returns: `Result<Vec<IpData>, FpgamemError>`
/// * `Ok(Vec<IpData>)` - Every IP, in source order
/// * `Err(FpgamemError::InvalidTopology)` - Empty, zero-count or truncated section
pub fn parse_ip_layout(raw: &[u8]) -> Result<Vec<IpData>, FpgamemError> {
    Section::new("ip_layout", raw)
        .records(IP_DATA_LEN)?
        .iter()
        .map(|record| {
            Ok(IpData {
                ip_type: record.u32(0)?,
                base_address: record.u64(8)?,
                name: record.c_string(16, 64)?,
            })
        })
        .collect()
}

/// Which counter of a scheduler statistics line to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuStat {
    Usage,
    Status,
}

/// Split `CU[@0x<base>] : <usage> status : <status>` into its three numbers.
fn parse_custat_line(line: &str) -> Option<(u64, u32, u32)> {
    let rest = line.trim().strip_prefix("CU[@")?;
    let (base, rest) = rest.split_once(']')?;
    let base = u64::from_str_radix(base.trim_start_matches("0x").trim_start_matches("0X"), 16)
        .ok()?;
    let rest = rest.trim_start().strip_prefix(':')?;
    let (usage, rest) = rest.split_once("status")?;
    let usage = usage.trim().parse().ok()?;
    let status = rest.trim_start().strip_prefix(':')?.trim().parse().ok()?;
    Some((base, usage, status))
}

/// Look up a counter for the unit at `base_address`.
///
/// Returns 0 when no line matches or the matching line cannot be parsed.
pub fn parse_cu_stat(custat: &[String], base_address: u64, kind: CuStat) -> u32 {
    custat
        .iter()
        .filter_map(|line| parse_custat_line(line))
        .find(|(base, _, _)| *base == base_address)
        .map_or(0, |(_, usage, status)| match kind {
            CuStat::Usage => usage,
            CuStat::Status => status,
        })
}

/// Render the status register of a compute unit, e.g. `(START|IDLE)`.
pub fn cu_status_string(status: u32) -> String {
    const BITS: [(u32, &str); 5] = [
        (0x1, "START"),
        (0x2, "DONE"),
        (0x4, "IDLE"),
        (0x8, "READY"),
        (0x10, "RESTART"),
    ];
    if status == u32::MAX {
        return "(UNKNOWN)".to_string();
    }
    let names: Vec<&str> = BITS
        .iter()
        .filter(|(bit, _)| status & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if !names.is_empty() {
        format!("({})", names.join("|"))
    } else if status == 0 {
        "(--)".to_string()
    } else {
        "(UNKNOWN)".to_string()
    }
}

/// A compute unit with its scheduler counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeUnit {
    pub name: String,
    pub base_address: u64,
    pub usage: u32,
    pub status: u32,
}

impl fmt::Display for ComputeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {:<16}", self.name)?;
        writeln!(f, "    {:<16}: {:#x}", "Base Address", self.base_address)?;
        writeln!(f, "    {:<16}: {}", "Usage", self.usage)?;
        write!(f, "    {:<16}: {}", "Status", cu_status_string(self.status))
    }
}

/// Collect the compute units of a device.
///
/// # Arguments
///
/// * `device` - The card to query
/// * `read_stats` - Whether to read scheduler statistics; counters are zero otherwise
///
/// # Returns: `Result<Vec<ComputeUnit>, FpgamemError>`
/// * `Ok(Vec<ComputeUnit>)` - Kernel IPs in layout order
/// * `Err(FpgamemError)` - The IP layout could not be read or decoded
pub fn compute_units(
    device: &(impl Device + ?Sized),
    read_stats: bool,
) -> Result<Vec<ComputeUnit>, FpgamemError> {
    let layout = parse_ip_layout(&device.ip_layout_raw()?)?;
    let custat = if read_stats {
        device.kds_custat().unwrap_or_else(|e| {
            warn!("Scheduler statistics unavailable: {e}");
            Vec::new()
        })
    } else {
        debug!("Skipping scheduler statistics");
        Vec::new()
    };
    Ok(layout
        .into_iter()
        .filter(|ip| ip.ip_type == IP_KERNEL)
        .map(|ip| ComputeUnit {
            usage: parse_cu_stat(&custat, ip.base_address, CuStat::Usage),
            status: parse_cu_stat(&custat, ip.base_address, CuStat::Status),
            name: ip.name,
            base_address: ip.base_address,
        })
        .collect())
}

/// Whether scheduler statistics should be read, per [`SKIP_CU_READ_ENV`].
pub fn read_stats_enabled() -> bool {
    std::env::var_os(SKIP_CU_READ_ENV).is_none()
}
