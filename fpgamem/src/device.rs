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

//! Device access.
//!
//! The [`Device`] trait is everything the rest of the crate needs from a card: the raw
//! sections describing the programmed image and an unmanaged positioned read/write into
//! device memory. [`SysfsDevice`] implements it on top of the files the driver exposes
//! for each PCI function.
//!
//! # A sysfs map of an accelerator card
//!
//! ```text
//! /sys/bus/pci/devices/0000:d8:00.1
//! ├── ip_layout       binary, compute units and other IPs of the image
//! ├── kds_custat      text, one `CU[@0x...] : <usage> status : <status>` line per CU
//! ├── mem_topology    binary, memory banks of the image
//! └── mem             device memory, addressed by physical address
//! ```
//!
//! The name of the memory node and the devices directory come from [`Config`].

use crate::config::Config;
use crate::error::FpgamemError;
use crate::system_io::{fs_open, fs_read, fs_read_bytes, fs_read_dir};
use log::{debug, trace};
use std::cell::OnceCell;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Trait for talking to one accelerator card
pub trait Device {
    /// The PCI BDF identifying the card, e.g. `0000:d8:00.1`.
    fn handle(&self) -> &str;

    /// Raw `mem_topology` section of the programmed image.
    ///
    /// # Returns: `Result<Vec<u8>, FpgamemError>`
    /// * `Ok(Vec<u8>)` - The section bytes, possibly empty when nothing is programmed
    /// * `Err(FpgamemError::IORead)` - The section could not be read
    fn mem_topology_raw(&self) -> Result<Vec<u8>, FpgamemError>;

    /// Raw `ip_layout` section of the programmed image.
    fn ip_layout_raw(&self) -> Result<Vec<u8>, FpgamemError>;

    /// Scheduler statistics, one line per compute unit.
    fn kds_custat(&self) -> Result<Vec<String>, FpgamemError>;

    /// Read up to `buf.len()` bytes of device memory starting at physical address `offset`.
    ///
    /// # Returns: `Result<usize, FpgamemError>`
    /// * `Ok(usize)` - Number of bytes actually read, which may be short
    /// * `Err(FpgamemError)` - The driver rejected the transfer
    fn unmgd_pread(&self, buf: &mut [u8], offset: u64) -> Result<usize, FpgamemError>;

    /// Write up to `buf.len()` bytes to device memory starting at physical address `offset`.
    ///
    /// # Returns: `Result<usize, FpgamemError>`
    /// * `Ok(usize)` - Number of bytes actually written, which may be short
    /// * `Err(FpgamemError)` - The driver rejected the transfer
    fn unmgd_pwrite(&self, buf: &[u8], offset: u64) -> Result<usize, FpgamemError>;
}

/// A card driven through its sysfs directory.
#[derive(Debug)]
pub struct SysfsDevice {
    bdf: String,
    dir: PathBuf,
    memory_path: PathBuf,
    reader: OnceCell<File>,
    writer: OnceCell<File>,
}

impl SysfsDevice {
    /// Open the card identified by `bdf`.
    ///
    /// The BDF is normalized (see [`normalize_bdf`]) and the device directory must exist.
    /// The memory node is only opened on the first transfer.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the devices directory and memory node name
    /// * `bdf` - `dddd:bb:dd.f` or `bb:dd.f`, any case
    ///
    /// # Returns: `Result<SysfsDevice, FpgamemError>`
    /// * `Ok(SysfsDevice)` - Handle for the card
    /// * `Err(FpgamemError::Argument)` - Malformed BDF or no such device
    pub fn open(config: &Config, bdf: &str) -> Result<SysfsDevice, FpgamemError> {
        let bdf = normalize_bdf(bdf)?;
        let dir = config.device_dir(&bdf);
        if !dir.is_dir() {
            return Err(FpgamemError::Argument(format!(
                "No device {bdf} found in {:?}",
                config.pci_devices_dir
            )));
        }
        debug!("Opened device {bdf} at {dir:?}");
        Ok(SysfsDevice {
            memory_path: dir.join(&config.memory_node),
            bdf,
            dir,
            reader: OnceCell::new(),
            writer: OnceCell::new(),
        })
    }

    fn memory<'a>(
        &self,
        cell: &'a OnceCell<File>,
        writable: bool,
    ) -> Result<&'a File, FpgamemError> {
        if let Some(file) = cell.get() {
            return Ok(file);
        }
        let file = fs_open(&self.memory_path, writable)?;
        Ok(cell.get_or_init(|| file))
    }

    fn attribute(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Device for SysfsDevice {
    fn handle(&self) -> &str {
        &self.bdf
    }

    fn mem_topology_raw(&self) -> Result<Vec<u8>, FpgamemError> {
        fs_read_bytes(&self.attribute("mem_topology"))
    }

    fn ip_layout_raw(&self) -> Result<Vec<u8>, FpgamemError> {
        fs_read_bytes(&self.attribute("ip_layout"))
    }

    fn kds_custat(&self) -> Result<Vec<String>, FpgamemError> {
        let text = fs_read(&self.attribute("kds_custat"))?;
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn unmgd_pread(&self, buf: &mut [u8], offset: u64) -> Result<usize, FpgamemError> {
        trace!("pread {:#x} bytes at {offset:#x} on {}", buf.len(), self.bdf);
        self.memory(&self.reader, false)?
            .read_at(buf, offset)
            .map_err(|e| FpgamemError::IORead {
                file: self.memory_path.clone(),
                e,
            })
    }

    fn unmgd_pwrite(&self, buf: &[u8], offset: u64) -> Result<usize, FpgamemError> {
        trace!("pwrite {:#x} bytes at {offset:#x} on {}", buf.len(), self.bdf);
        self.memory(&self.writer, true)?
            .write_at(buf, offset)
            .map_err(|e| FpgamemError::IOWrite {
                file: self.memory_path.clone(),
                e,
            })
    }
}

/// Lower-case a PCI BDF and add the `0000` domain when it is missing.
///
/// # Returns: `Result<String, FpgamemError>`
/// * `Ok(String)` - `dddd:bb:dd.f`
/// * `Err(FpgamemError::Argument)` - Not a BDF
pub fn normalize_bdf(bdf: &str) -> Result<String, FpgamemError> {
    let lowered = bdf.trim().to_lowercase();
    let bad = || FpgamemError::Argument(format!("'{bdf}' is not a valid Bus:Device.Function"));
    let is_hex = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit());

    let parts: Vec<&str> = lowered.split(':').collect();
    let (domain, bus, dev_fn) = match parts.as_slice() {
        [bus, dev_fn] => ("0000", *bus, *dev_fn),
        [domain, bus, dev_fn] => (*domain, *bus, *dev_fn),
        _ => return Err(bad()),
    };
    let (device, function) = dev_fn.split_once('.').ok_or_else(bad)?;
    if !(is_hex(domain, 4) && is_hex(bus, 2) && is_hex(device, 2) && is_hex(function, 1)) {
        return Err(bad());
    }
    Ok(format!("{domain}:{bus}:{device}.{function}"))
}

/// List the cards under the configured devices directory, sorted by BDF.
///
/// Only entries exposing a `mem_topology` section are accelerator cards.
pub fn find_devices(config: &Config) -> Result<Vec<String>, FpgamemError> {
    let mut devices: Vec<String> = fs_read_dir(&config.pci_devices_dir)?
        .into_iter()
        .filter(|entry| has_topology(&config.device_dir(entry)))
        .collect();
    devices.sort();
    trace!("Found devices {devices:?}");
    Ok(devices)
}

fn has_topology(dir: &Path) -> bool {
    dir.join("mem_topology").is_file()
}

/// The first card found, used when the user does not name one.
pub fn first_device(config: &Config) -> Result<String, FpgamemError> {
    find_devices(config)?.into_iter().next().ok_or_else(|| {
        FpgamemError::Argument(format!(
            "No accelerator card found in {:?}",
            config.pci_devices_dir
        ))
    })
}
