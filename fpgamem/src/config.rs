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

//! Configuration for locating devices and sizing transfers.
//!
//! Values come from a TOML file (by default [`CONFIG_PATH`]) and fall back, field by field,
//! to the hard-coded defaults below. The resulting [`Config`] is a plain value handed to
//! whoever needs it; nothing here is global.
//!
//! ```toml
//! [system_paths]
//! pci_devices_dir = "/sys/bus/pci/devices/"
//! memory_node = "mem"
//!
//! [transfer]
//! block_size = 0x20000
//! ```

use crate::error::FpgamemError;
use crate::system_io::fs_read;
use log::{trace, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The default location of the configuration file.
pub static CONFIG_PATH: &str = "/etc/fpgamem/config.toml";

/// Where the kernel lists PCI functions. Each accelerator card appears as `<dir>/<bdf>/`.
pub static PCI_DEVICES_DIR: &str = "/sys/bus/pci/devices/";

/// Name of the node, inside the device directory, that maps device memory.
pub static MEMORY_NODE: &str = "mem";

/// Largest amount of memory moved by a single driver transfer.
pub const DEFAULT_BLOCK_SIZE: u64 = 0x20000;

/// Upper bound for the block size. One block is buffered in memory during a transfer.
pub const MAX_BLOCK_SIZE: u64 = 0x400_0000;

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub pci_devices_dir: PathBuf,
    pub memory_node: String,
    pub block_size: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            pci_devices_dir: PathBuf::from(PCI_DEVICES_DIR),
            memory_node: MEMORY_NODE.to_string(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// This is the top level struct which holds all sections
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    system_paths: Option<SystemPaths>,
    transfer: Option<Transfer>,
}

/// This is the "system_paths" section struct
#[derive(Debug, Default, Deserialize)]
struct SystemPaths {
    pci_devices_dir: Option<String>,
    memory_node: Option<String>,
}

/// This is the "transfer" section struct
#[derive(Debug, Default, Deserialize)]
struct Transfer {
    block_size: Option<u64>,
}

impl TryFrom<TomlConfig> for Config {
    type Error = FpgamemError;

    fn try_from(value: TomlConfig) -> Result<Self, Self::Error> {
        trace!("User provided config: {value:?}");
        let paths = value.system_paths.unwrap_or_default();
        let transfer = value.transfer.unwrap_or_default();
        let block_size = transfer.block_size.unwrap_or_else(|| {
            trace!("No block_size provided. Using hardcoded value.");
            DEFAULT_BLOCK_SIZE
        });
        if block_size == 0 {
            return Err(FpgamemError::Argument(
                "transfer.block_size must be greater than zero".to_string(),
            ));
        }
        if block_size > MAX_BLOCK_SIZE {
            return Err(FpgamemError::Argument(format!(
                "transfer.block_size {block_size:#x} is larger than {MAX_BLOCK_SIZE:#x}"
            )));
        }
        Ok(Config {
            pci_devices_dir: paths.pci_devices_dir.map(PathBuf::from).unwrap_or_else(|| {
                trace!("No pci_devices_dir provided. Using hardcoded value.");
                PathBuf::from(PCI_DEVICES_DIR)
            }),
            memory_node: paths.memory_node.unwrap_or_else(|| {
                trace!("No memory_node provided. Using hardcoded value.");
                MEMORY_NODE.to_string()
            }),
            block_size,
        })
    }
}

impl Config {
    /// Parse a configuration from TOML text. `origin` is only used for error reporting.
    pub fn from_toml_str(toml_string: &str, origin: &Path) -> Result<Config, FpgamemError> {
        let config: TomlConfig =
            toml::from_str(toml_string).map_err(|e| FpgamemError::TomlDe {
                file: origin.to_owned(),
                e,
            })?;
        config.try_into()
    }

    /// Read and parse a configuration file.
    pub fn from_file(config_path: &Path) -> Result<Config, FpgamemError> {
        let toml_string = fs_read(config_path)?;
        Config::from_toml_str(&toml_string, config_path)
    }

    /// Load the configuration the way the command-line tool does.
    ///
    /// An explicitly requested file must exist and parse. Without one, [`CONFIG_PATH`] is
    /// tried and any problem with it only results in a warning and the hard-coded defaults.
    ///
    /// # Arguments
    ///
    /// * `explicit` - A file named by the user, if any
    ///
    /// # Returns: `Result<Config, FpgamemError>`
    /// * `Ok(Config)` - The loaded or default configuration
    /// * `Err(FpgamemError::IORead)` - The explicit file could not be read
    /// * `Err(FpgamemError::TomlDe)` - The explicit file is not valid TOML for this schema
    /// * `Err(FpgamemError::Argument)` - The explicit file holds an invalid value
    pub fn load(explicit: Option<&Path>) -> Result<Config, FpgamemError> {
        if let Some(path) = explicit {
            return Config::from_file(path);
        }
        let config_path = Path::new(CONFIG_PATH);
        if !config_path.is_file() {
            trace!("Config file not found in {config_path:?}. Using hardcoded defaults");
            return Ok(Config::default());
        }
        match Config::from_file(config_path) {
            Ok(config) => {
                trace!("Successfully loaded config: {config:?}");
                Ok(config)
            }
            Err(e) => {
                warn!("Using hardcoded defaults because failed to load config: {e}");
                Ok(Config::default())
            }
        }
    }

    /// Directory of one device, e.g. `/sys/bus/pci/devices/0000:d8:00.1/`.
    pub fn device_dir(&self, bdf: &str) -> PathBuf {
        self.pci_devices_dir.join(bdf)
    }
}
