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

//! Error Wrapping File System I/O Helpers
//!
//! This module provides thin wrappers around standard Rust file system operations,
//! with automatic conversion to `FpgamemError` types. All functions include trace logging
//! and keep the offending path in the returned error.
//!
//! Includes: text and binary reads, file creation/opening and directory listing.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fpgamem::system_io::{fs_read, fs_read_bytes};
//! # use std::path::Path;
//!
//! # fn example() -> Result<(), fpgamem::error::FpgamemError> {
//! // Read a text attribute
//! let custat = fs_read(Path::new("/sys/bus/pci/devices/0000:d8:00.1/kds_custat"))?;
//!
//! // Read a binary attribute
//! let topology = fs_read_bytes(Path::new("/sys/bus/pci/devices/0000:d8:00.1/mem_topology"))?;
//! # Ok(())
//! # }
//! ```

use crate::error::FpgamemError;
use log::trace;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::Path;

/// Read the contents of a text attribute to a String.
///
/// # Arguments
///
/// * `file_path` - Path to the file to read
///
/// # Returns: `Result<String, FpgamemError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(FpgamemError::IORead)` - If the file cannot be read (doesn't exist, permissions,
///   not valid UTF-8, etc.)
pub fn fs_read(file_path: &Path) -> Result<String, FpgamemError> {
    let bytes = fs_read_bytes(file_path)?;
    String::from_utf8(bytes).map_err(|e| FpgamemError::IORead {
        file: file_path.into(),
        e: io::Error::new(io::ErrorKind::InvalidData, e),
    })
}

/// Read the contents of a file as raw bytes.
///
/// Used for binary sysfs attributes such as `mem_topology` and `ip_layout`, and for
/// the input file of a memory write.
///
/// # Arguments
///
/// * `file_path` - Path to the file to read
///
/// # Returns: `Result<Vec<u8>, FpgamemError>`
/// * `Ok(Vec<u8>)` - The complete contents of the file
/// * `Err(FpgamemError::IORead)` - If the file cannot be read
pub fn fs_read_bytes(file_path: &Path) -> Result<Vec<u8>, FpgamemError> {
    trace!("Attempting to read bytes from {file_path:?}");
    let mut buf: Vec<u8> = Vec::new();
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| f.read_to_end(&mut buf));

    match result {
        Ok(n) => {
            trace!("Read {n} bytes from {file_path:?}");
            Ok(buf)
        }
        Err(e) => Err(FpgamemError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Create (or truncate) a file for writing.
///
/// # Arguments
///
/// * `file_path` - Path of the file to create
///
/// # Returns: `Result<File, FpgamemError>`
/// * `Ok(File)` - Handle opened for writing
/// * `Err(FpgamemError::IOWrite)` - If the file cannot be created
pub fn fs_create(file_path: &Path) -> Result<File, FpgamemError> {
    trace!("Attempting to create {file_path:?}");
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(file_path)
        .map_err(|e| FpgamemError::IOWrite {
            file: file_path.into(),
            e,
        })
}

/// Open an existing file for positioned reads, and for writes when `writable` is set.
///
/// The file is never created or truncated, which makes this suitable for device nodes.
///
/// # Returns: `Result<File, FpgamemError>`
/// * `Ok(File)` - The opened handle
/// * `Err(FpgamemError::IOWrite)` - If the file cannot be opened with `writable` set
/// * `Err(FpgamemError::IORead)` - If the file cannot be opened read-only
pub fn fs_open(file_path: &Path, writable: bool) -> Result<File, FpgamemError> {
    trace!("Attempting to open {file_path:?} (writable: {writable})");
    OpenOptions::new()
        .read(true)
        .write(writable)
        .open(file_path)
        .map_err(|e| {
            let file = file_path.to_path_buf();
            if writable {
                FpgamemError::IOWrite { file, e }
            } else {
                FpgamemError::IORead { file, e }
            }
        })
}

/// Read the contents of a directory and return entry names.
///
/// Entries that cannot be read are silently skipped.
///
/// # Arguments
///
/// * `dir` - The directory path to list
///
/// # Returns: `Result<Vec<String>, FpgamemError>`
/// * `Ok(Vec<String>)` - List of entry names in the directory
/// * `Err(FpgamemError::IOReadDir)` - If the directory cannot be read
pub fn fs_read_dir(dir: &Path) -> Result<Vec<String>, FpgamemError> {
    trace!("Attempting to list {dir:?}");
    let entries = std::fs::read_dir(dir).map_err(|e| FpgamemError::IOReadDir {
        dir: dir.to_owned(),
        e,
    })?;
    let names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    trace!("Found {} entries in {dir:?}", names.len());
    Ok(names)
}
