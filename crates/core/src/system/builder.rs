// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{AxiFullMemory, AxiLiteMemory, DeviceRegistry, Slave};
use crate::model::PortKind;
use anyhow::{bail, Context};
use tickbench_config::{DeviceKind, HarnessConfig};
use tracing::info;

/// Builds a DeviceRegistry with one memory slave per configured device.
pub fn build_registry(config: &HarnessConfig) -> anyhow::Result<DeviceRegistry> {
    info!("Building device map for '{}'", config.name);
    let mut registry = DeviceRegistry::new();
    for dev in &config.devices {
        let size = usize::try_from(dev.size_bytes()?)
            .with_context(|| format!("Device '{}' is too large for this host", dev.name))?;
        let created = registry.try_register(dev.port, &dev.name, || match dev.kind {
            DeviceKind::Lite => {
                AxiLiteMemory::new(size, dev.base, dev.read_delay, dev.write_delay).map(Slave::from)
            }
            DeviceKind::Full => {
                AxiFullMemory::new(size, dev.base, dev.read_delay, dev.write_delay).map(Slave::from)
            }
        });
        if created.is_none() {
            bail!("Could not create device '{}' on port {}", dev.name, dev.port);
        }
    }
    Ok(registry)
}

/// `(port, kind)` table for laying out a SoC model's signal bundles.
pub fn signal_table(config: &HarnessConfig) -> Vec<(usize, PortKind)> {
    config
        .devices
        .iter()
        .map(|d| (d.port as usize, d.kind.into()))
        .collect()
}
