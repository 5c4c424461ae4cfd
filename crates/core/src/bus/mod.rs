// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod full;
pub mod lite;

pub use full::{AxiBurst, AxiFullMemory, BurstMode, ReadBeat, WriteAck};
pub use lite::AxiLiteMemory;

use crate::memory::{ByteStore, ProgramImage};
use crate::{Addr, SimResult, SimulationError, Word};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// xRESP encoding. Only the codes a memory slave produces are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Resp {
    #[default]
    Okay = 0,
    SlvErr = 2,
}

impl Resp {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_err(self) -> bool {
        self != Resp::Okay
    }
}

bitflags::bitflags! {
    /// WSTRB: one bit per byte lane of a 32-bit word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Strobe: u8 {
        const LANE0 = 0b0001;
        const LANE1 = 0b0010;
        const LANE2 = 0b0100;
        const LANE3 = 0b1000;
    }
}

impl Strobe {
    pub fn has_lane(self, lane: u32) -> bool {
        lane < 4 && self.bits() & (1 << lane) != 0
    }
}

/// Rejects store geometries that cannot be mapped into the 32-bit space.
pub(crate) fn check_geometry(size: usize, base: Addr) -> SimResult<()> {
    if size == 0 {
        return Err(SimulationError::InvalidDevice(format!(
            "zero-sized store at {:#010x}",
            base
        )));
    }
    if base as u64 + size as u64 > 1 << 32 {
        return Err(SimulationError::InvalidDevice(format!(
            "store [{:#010x} + {:#x}] exceeds the 32-bit address space",
            base, size
        )));
    }
    Ok(())
}

/// Capabilities shared by every memory slave, independent of the channel protocol.
pub trait BusSlave {
    fn store(&self) -> &ByteStore;
    fn store_mut(&mut self) -> &mut ByteStore;

    /// Advances the slave's internal pipeline by one clock.
    fn clock_tick(&mut self);

    /// Drops every in-flight transaction and zeroes the backing store.
    fn reset(&mut self);

    fn base_address(&self) -> Addr {
        self.store().base_address()
    }

    fn address_range(&self) -> u64 {
        self.store().size() as u64
    }

    fn owns_address(&self, addr: Addr) -> bool {
        self.store().contains(addr)
    }
}

/// The closed set of slave variants a port can hold.
#[derive(Debug)]
pub enum Slave {
    Lite(AxiLiteMemory),
    Full(AxiFullMemory),
}

impl Slave {
    pub fn as_slave(&self) -> &dyn BusSlave {
        match self {
            Slave::Lite(m) => m,
            Slave::Full(m) => m,
        }
    }

    pub fn as_slave_mut(&mut self) -> &mut dyn BusSlave {
        match self {
            Slave::Lite(m) => m,
            Slave::Full(m) => m,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Slave::Lite(_) => "axi-lite",
            Slave::Full(_) => "axi-full",
        }
    }

    pub fn as_lite_mut(&mut self) -> Option<&mut AxiLiteMemory> {
        match self {
            Slave::Lite(m) => Some(m),
            Slave::Full(_) => None,
        }
    }

    pub fn as_full_mut(&mut self) -> Option<&mut AxiFullMemory> {
        match self {
            Slave::Full(m) => Some(m),
            Slave::Lite(_) => None,
        }
    }
}

impl From<AxiLiteMemory> for Slave {
    fn from(m: AxiLiteMemory) -> Self {
        Slave::Lite(m)
    }
}

impl From<AxiFullMemory> for Slave {
    fn from(m: AxiFullMemory) -> Self {
        Slave::Full(m)
    }
}

#[derive(Debug)]
pub struct SlaveEntry {
    pub name: String,
    pub slave: Slave,
}

/// One row of [`DeviceRegistry::device_map`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceMapEntry {
    pub port: usize,
    pub name: String,
    pub kind: &'static str,
    pub base: Addr,
    pub size: u64,
}

impl DeviceMapEntry {
    /// Inclusive end address.
    pub fn end(&self) -> u64 {
        self.base as u64 + self.size - 1
    }
}

/// Sparse port-indexed table of slaves.
///
/// Address resolution is a linear scan in port order and the first owner
/// wins, so overlapping ranges resolve to the lowest port.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    ports: Vec<Option<SlaveEntry>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `slave` at `port`, replacing whatever was there. Ports are
    /// 8-bit, so the table never grows past 256 slots.
    pub fn register(&mut self, port: u8, name: &str, slave: impl Into<Slave>) -> &mut Slave {
        let port = port as usize;
        if self.ports.len() <= port {
            self.ports.resize_with(port + 1, || None);
        }
        let slave = slave.into();
        if let Some(old) = &self.ports[port] {
            tracing::warn!("Port {} ('{}') replaced by '{}'", port, old.name, name);
        }
        tracing::info!(
            "Registered {} '{}' on port {} at {:#010x} ({} bytes)",
            slave.kind(),
            name,
            port,
            slave.as_slave().base_address(),
            slave.as_slave().address_range()
        );
        let entry = self.ports[port].insert(SlaveEntry {
            name: name.to_string(),
            slave,
        });
        &mut entry.slave
    }

    /// Runs `build` and registers its result. A construction failure is
    /// logged and leaves the port empty.
    pub fn try_register<F>(&mut self, port: u8, name: &str, build: F) -> Option<&mut Slave>
    where
        F: FnOnce() -> SimResult<Slave>,
    {
        match build() {
            Ok(slave) => Some(self.register(port, name, slave)),
            Err(e) => {
                tracing::error!("Failed to create device '{}' on port {}: {}", name, port, e);
                None
            }
        }
    }

    pub fn get(&self, port: usize) -> Option<&Slave> {
        self.ports.get(port)?.as_ref().map(|e| &e.slave)
    }

    pub fn get_mut(&mut self, port: usize) -> Option<&mut Slave> {
        self.ports.get_mut(port)?.as_mut().map(|e| &mut e.slave)
    }

    pub fn find_owner_port(&self, addr: Addr) -> Option<usize> {
        let port = self.ports.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|e| e.slave.as_slave().owns_address(addr))
        });
        tracing::trace!("resolve {:#010x} -> {:?}", addr, port);
        port
    }

    pub fn find_owner(&self, addr: Addr) -> Option<&Slave> {
        self.get(self.find_owner_port(addr)?)
    }

    pub fn find_owner_mut(&mut self, addr: Addr) -> Option<&mut Slave> {
        let port = self.find_owner_port(addr)?;
        self.get_mut(port)
    }

    pub fn reset(&mut self) {
        for entry in self.ports.iter_mut().flatten() {
            entry.slave.as_slave_mut().reset();
        }
    }

    pub fn clock_tick(&mut self) {
        for entry in self.ports.iter_mut().flatten() {
            entry.slave.as_slave_mut().clock_tick();
        }
    }

    /// Size of the port table, empty slots included.
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn active_count(&self) -> usize {
        self.ports.iter().flatten().count()
    }

    pub fn has_slave(&self, port: usize) -> bool {
        self.get(port).is_some()
    }

    pub fn name_of(&self, port: usize) -> Option<&str> {
        self.ports.get(port)?.as_ref().map(|e| e.name.as_str())
    }

    pub fn device_map(&self) -> Vec<DeviceMapEntry> {
        self.ports
            .iter()
            .enumerate()
            .filter_map(|(port, slot)| {
                let entry = slot.as_ref()?;
                let slave = entry.slave.as_slave();
                Some(DeviceMapEntry {
                    port,
                    name: entry.name.clone(),
                    kind: entry.slave.kind(),
                    base: slave.base_address(),
                    size: slave.address_range(),
                })
            })
            .collect()
    }

    pub fn dump_device_map(&self) -> String {
        let mut out = String::from("Device map:\n");
        for d in self.device_map() {
            let _ = writeln!(
                out,
                "  Port {:02}: {} [{:#010x} - {:#010x}] ({} bytes)",
                d.port,
                d.name,
                d.base,
                d.end(),
                d.size
            );
        }
        let _ = writeln!(out, "  {} active device(s)", self.active_count());
        out
    }

    // --- Bypass path: direct store access with no protocol timing ---

    pub fn read_word(&self, addr: Addr) -> Word {
        match self.find_owner(addr) {
            Some(slave) => slave.as_slave().store().read_word(addr),
            None => {
                tracing::warn!("Bypass read from unmapped address {:#010x}", addr);
                0
            }
        }
    }

    pub fn write_word(&mut self, addr: Addr, value: Word) {
        match self.find_owner_mut(addr) {
            Some(slave) => slave.as_slave_mut().store_mut().write_word(addr, value),
            None => tracing::warn!("Bypass write to unmapped address {:#010x}", addr),
        }
    }

    pub fn read_byte(&self, addr: Addr) -> u8 {
        self.find_owner(addr)
            .map(|s| s.as_slave().store().read_byte(addr))
            .unwrap_or(0)
    }

    /// Copies every segment into the store that owns its start address.
    pub fn load_image(&mut self, image: &ProgramImage) -> SimResult<()> {
        for seg in &image.segments {
            let loaded = self
                .find_owner_mut(seg.start_addr)
                .is_some_and(|s| s.as_slave_mut().store_mut().load_from_segment(seg));
            if !loaded {
                return Err(SimulationError::SegmentUnmapped {
                    addr: seg.start_addr,
                    len: seg.data.len(),
                });
            }
            tracing::debug!(
                "Loaded segment {:#010x} ({} bytes)",
                seg.start_addr,
                seg.data.len()
            );
        }
        Ok(())
    }

    pub fn dump_memory(&self, start: Addr, len: usize) -> String {
        match self.find_owner(start) {
            Some(slave) => slave.as_slave().store().dump(start, len),
            None => format!("{:08x}: <unmapped>\n", start),
        }
    }
}
