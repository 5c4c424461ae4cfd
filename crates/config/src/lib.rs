// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_delay() -> u32 {
    1
}

fn default_timeout() -> u64 {
    1_000_000
}

/// Which bus protocol a memory device speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    #[serde(alias = "axilite", alias = "axi-lite")]
    Lite,
    #[serde(alias = "axifull", alias = "axi-full", alias = "axi4")]
    Full,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceConfig {
    pub port: u8,
    pub name: String,
    #[serde(default)]
    pub kind: DeviceKind,
    pub base: u32,
    pub size: String, // e.g. "16KB"
    #[serde(default = "default_delay")]
    pub read_delay: u32,
    #[serde(default = "default_delay")]
    pub write_delay: u32,
}

impl DeviceConfig {
    pub fn size_bytes(&self) -> Result<u64> {
        parse_size(&self.size)
            .with_context(|| format!("Invalid size for device '{}'", self.name))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CpuConfig {
    #[serde(default)]
    pub imem_port: u8,
    #[serde(default = "default_dmem_port")]
    pub dmem_port: u8,
    /// Cycles between accepting an instruction fetch and presenting its response.
    #[serde(default = "default_delay")]
    pub imem_latency: u32,
    /// Cycles between accepting a data access and presenting its response.
    #[serde(default = "default_delay")]
    pub dmem_latency: u32,
    /// Cycle budget used by `run(0)` and `run_until`. Zero disables it.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub reset_vector: u32,
    #[serde(default)]
    pub trace: bool,
}

fn default_dmem_port() -> u8 {
    1
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            imem_port: 0,
            dmem_port: default_dmem_port(),
            imem_latency: default_delay(),
            dmem_latency: default_delay(),
            timeout: default_timeout(),
            reset_vector: 0,
            trace: false,
        }
    }
}

fn default_devices() -> Vec<DeviceConfig> {
    vec![
        DeviceConfig {
            port: 0,
            name: "imem".to_string(),
            kind: DeviceKind::Lite,
            base: 0x0000_0000,
            size: "4KiB".to_string(),
            read_delay: 1,
            write_delay: 1,
        },
        DeviceConfig {
            port: 1,
            name: "dmem".to_string(),
            kind: DeviceKind::Lite,
            base: 0x8000_0000,
            size: "16KiB".to_string(),
            read_delay: 1,
            write_delay: 1,
        },
    ]
}

/// Top-level harness description: the device map plus CPU driver settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HarnessConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub cpu: CpuConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: "rv32i-testbench".to_string(),
            devices: default_devices(),
            cpu: CpuConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read harness config {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("In harness config {:?}", path))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).context("Failed to parse harness config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn device(&self, port: u8) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.port == port)
    }

    /// Rejects maps the harness cannot build. Overlapping ranges are only
    /// reported: the router resolves them by lowest port.
    pub fn validate(&self) -> Result<()> {
        let mut ports = HashSet::new();
        let mut ranges = Vec::with_capacity(self.devices.len());

        for dev in &self.devices {
            if !ports.insert(dev.port) {
                bail!("Duplicate device port {} ('{}')", dev.port, dev.name);
            }
            let size = dev.size_bytes()?;
            if size == 0 {
                bail!("Device '{}' has zero size", dev.name);
            }
            let end = dev.base as u64 + size;
            if end > 1 << 32 {
                bail!(
                    "Device '{}' [{:#010x} + {:#x}] exceeds the 32-bit address space",
                    dev.name,
                    dev.base,
                    size
                );
            }
            ranges.push((dev.port, dev.name.as_str(), dev.base as u64, end));
        }

        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                if a.2 < b.3 && b.2 < a.3 {
                    tracing::warn!(
                        "Devices '{}' (port {}) and '{}' (port {}) overlap; lower port wins",
                        a.1,
                        a.0,
                        b.1,
                        b.0
                    );
                }
            }
        }

        for (role, port) in [("imem", self.cpu.imem_port), ("dmem", self.cpu.dmem_port)] {
            if self.device(port).is_none() {
                bail!("cpu.{}_port {} does not name a configured device", role, port);
            }
        }

        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
