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

#![allow(dead_code)]

use fpgamem::config::Config;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// `mem_topology` record type of DDR4, any non-streaming type works.
pub const MEM_DDR4: u8 = 1;
pub const MEM_STREAMING: u8 = 3;

/// Encode a `mem_topology` section from `(type, used, size_kib, base_address, tag)` records.
pub fn raw_topology(banks: &[(u8, bool, u64, u64, &str)]) -> Vec<u8> {
    let mut raw = (banks.len() as i32).to_le_bytes().to_vec();
    raw.extend_from_slice(&[0u8; 4]);
    for (mem_type, used, size_kib, base, tag) in banks {
        raw.push(*mem_type);
        raw.push(u8::from(*used));
        raw.extend_from_slice(&[0u8; 6]);
        raw.extend_from_slice(&size_kib.to_le_bytes());
        raw.extend_from_slice(&base.to_le_bytes());
        let mut field = [0u8; 16];
        field[..tag.len()].copy_from_slice(tag.as_bytes());
        raw.extend_from_slice(&field);
    }
    raw
}

/// Encode an `ip_layout` section from `(type, base_address, name)` records.
pub fn raw_ip_layout(ips: &[(u32, u64, &str)]) -> Vec<u8> {
    let mut raw = (ips.len() as i32).to_le_bytes().to_vec();
    raw.extend_from_slice(&[0u8; 4]);
    for (ip_type, base, name) in ips {
        raw.extend_from_slice(&ip_type.to_le_bytes());
        raw.extend_from_slice(&[0u8; 4]);
        raw.extend_from_slice(&base.to_le_bytes());
        let mut field = [0u8; 64];
        field[..name.len()].copy_from_slice(name.as_bytes());
        raw.extend_from_slice(&field);
    }
    raw
}

/// A throwaway devices directory laid out like `/sys/bus/pci/devices`.
pub struct FakeSysfs {
    pub root: TempDir,
}

impl FakeSysfs {
    pub fn new() -> FakeSysfs {
        FakeSysfs {
            root: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    pub fn config(&self) -> Config {
        Config {
            pci_devices_dir: self.root.path().to_path_buf(),
            ..Config::default()
        }
    }

    pub fn device_dir(&self, bdf: &str) -> PathBuf {
        self.root.path().join(bdf)
    }

    /// Add a card with a topology and a zero-filled memory node of `memory_len` bytes.
    pub fn add_card(&self, bdf: &str, topology: &[u8], memory_len: u64) -> PathBuf {
        let dir = self.device_dir(bdf);
        fs::create_dir_all(&dir).expect("failed to create device dir");
        fs::write(dir.join("mem_topology"), topology).expect("failed to write mem_topology");
        let mem = fs::File::create(dir.join("mem")).expect("failed to create mem");
        mem.set_len(memory_len).expect("failed to size mem");
        dir
    }

    /// Add a PCI function that is not an accelerator card.
    pub fn add_other_function(&self, bdf: &str) {
        fs::create_dir_all(self.device_dir(bdf)).expect("failed to create device dir");
    }

    pub fn add_compute_units(&self, bdf: &str, ip_layout: &[u8], custat: &str) {
        let dir = self.device_dir(bdf);
        fs::write(dir.join("ip_layout"), ip_layout).expect("failed to write ip_layout");
        fs::write(dir.join("kds_custat"), custat).expect("failed to write kds_custat");
    }

    pub fn memory(&self, bdf: &str) -> Vec<u8> {
        fs::read(self.device_dir(bdf).join("mem")).expect("failed to read mem")
    }
}

/// Two 4 KiB DDR banks with a gap between them, plus a streaming bank.
pub fn gapped_topology() -> Vec<u8> {
    raw_topology(&[
        (MEM_DDR4, true, 4, 0x4000, "bank1"),
        (MEM_STREAMING, true, 4, 0x8000, "stream0"),
        (MEM_DDR4, true, 4, 0x0, "bank0"),
    ])
}
