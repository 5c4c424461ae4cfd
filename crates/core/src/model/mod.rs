// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The boundary to a cycle-evaluated hardware model.
//!
//! A model exposes its ports as plain signal structs. The harness writes the
//! inputs, calls [`ClockedModel::evaluate`], and reads the outputs back; it
//! never looks inside the model.

pub mod reference;

pub use reference::ReferenceCore;

use crate::{Addr, Word};

/// Words per request/response line on a CPU memory port.
pub const LINE_WORDS: usize = 4;
/// Bytes per line.
pub const LINE_BYTES: u32 = (LINE_WORDS * 4) as u32;

pub trait ClockedModel {
    fn set_clock(&mut self, high: bool);
    fn set_reset(&mut self, high: bool);
    /// Propagates the current inputs; clocked state updates on a rising edge.
    fn evaluate(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemOp {
    #[default]
    Read,
    Write,
}

/// Request/response signal bundle of one CPU memory interface.
#[derive(Debug, Clone, Default)]
pub struct MemPort {
    // Model -> harness
    pub req_valid: bool,
    pub req_addr: Addr,
    pub req_op: MemOp,
    pub req_data: [Word; LINE_WORDS],
    pub resp_ready: bool,
    // Harness -> model
    pub req_ready: bool,
    pub resp_valid: bool,
    pub resp_data: [Word; LINE_WORDS],
}

impl MemPort {
    pub fn clear_response(&mut self) {
        self.resp_valid = false;
        self.resp_data = [0; LINE_WORDS];
    }
}

/// Observability outputs. Never used for functional behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugSignals {
    pub pc: Addr,
    pub instr: Word,
    pub reg_addr: u8,
    pub reg_data: Word,
    pub reg_we: bool,
    pub icache_access: bool,
    pub icache_miss: bool,
    pub dcache_access: bool,
    pub dcache_miss: bool,
    pub if_instr: Word,
    pub id_instr: Word,
    pub ex_instr: Word,
    pub mem_instr: Word,
    /// Retiring instruction, or the bubble encoding when nothing retires.
    pub wb_instr: Word,
    pub branch_taken: bool,
    pub branch_source: Addr,
    pub branch_target: Addr,
}

impl Default for DebugSignals {
    fn default() -> Self {
        let bubble = crate::decoder::BUBBLE;
        Self {
            pc: 0,
            instr: bubble,
            reg_addr: 0,
            reg_data: 0,
            reg_we: false,
            icache_access: false,
            icache_miss: false,
            dcache_access: false,
            dcache_miss: false,
            if_instr: bubble,
            id_instr: bubble,
            ex_instr: bubble,
            mem_instr: bubble,
            wb_instr: bubble,
            branch_taken: false,
            branch_source: 0,
            branch_target: 0,
        }
    }
}

/// A CPU-style design with split instruction and data memory ports.
pub trait CpuModel: ClockedModel {
    fn imem(&mut self) -> &mut MemPort;
    fn dmem(&mut self) -> &mut MemPort;
    fn debug(&self) -> DebugSignals;
}

/// Master-side AXI-lite signals of one SoC port.
#[derive(Debug, Clone, Default)]
pub struct AxiLiteSignals {
    pub awaddr: Addr,
    pub awvalid: bool,
    pub awready: bool,
    pub wdata: Word,
    pub wstrb: u8,
    pub wvalid: bool,
    pub wready: bool,
    pub bresp: u8,
    pub bvalid: bool,
    pub bready: bool,
    pub araddr: Addr,
    pub arvalid: bool,
    pub arready: bool,
    pub rdata: Word,
    pub rresp: u8,
    pub rvalid: bool,
    pub rready: bool,
}

/// Master-side AXI4 signals of one SoC port.
#[derive(Debug, Clone, Default)]
pub struct AxiFullSignals {
    pub awid: u16,
    pub awaddr: Addr,
    pub awlen: u8,
    pub awsize: u8,
    pub awburst: u8,
    pub awvalid: bool,
    pub awready: bool,
    pub wdata: Word,
    pub wstrb: u8,
    pub wlast: bool,
    pub wvalid: bool,
    pub wready: bool,
    pub bid: u16,
    pub bresp: u8,
    pub bvalid: bool,
    pub bready: bool,
    pub arid: u16,
    pub araddr: Addr,
    pub arlen: u8,
    pub arsize: u8,
    pub arburst: u8,
    pub arvalid: bool,
    pub arready: bool,
    pub rid: u16,
    pub rdata: Word,
    pub rresp: u8,
    pub rlast: bool,
    pub rvalid: bool,
    pub rready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Lite,
    Full,
}

impl From<tickbench_config::DeviceKind> for PortKind {
    fn from(kind: tickbench_config::DeviceKind) -> Self {
        match kind {
            tickbench_config::DeviceKind::Lite => PortKind::Lite,
            tickbench_config::DeviceKind::Full => PortKind::Full,
        }
    }
}

/// Borrowed view of one port's signal bundle.
#[derive(Debug)]
pub enum PortSignals<'a> {
    Lite(&'a mut AxiLiteSignals),
    Full(&'a mut AxiFullSignals),
}

#[derive(Debug, Clone)]
enum Bundle {
    Lite(AxiLiteSignals),
    Full(AxiFullSignals),
}

/// Owns the signal bundles of a SoC model, laid out from a `(port, kind)` table.
#[derive(Debug, Clone, Default)]
pub struct SignalBank {
    ports: Vec<(usize, Bundle)>,
}

impl SignalBank {
    pub fn new(table: &[(usize, PortKind)]) -> Self {
        let ports = table
            .iter()
            .map(|&(port, kind)| {
                let bundle = match kind {
                    PortKind::Lite => Bundle::Lite(AxiLiteSignals::default()),
                    PortKind::Full => Bundle::Full(AxiFullSignals::default()),
                };
                (port, bundle)
            })
            .collect();
        Self { ports }
    }

    pub fn ports(&self) -> impl Iterator<Item = (usize, PortKind)> + '_ {
        self.ports.iter().map(|(p, b)| {
            let kind = match b {
                Bundle::Lite(_) => PortKind::Lite,
                Bundle::Full(_) => PortKind::Full,
            };
            (*p, kind)
        })
    }

    pub fn port(&mut self, port: usize) -> Option<PortSignals<'_>> {
        self.ports
            .iter_mut()
            .find(|(p, _)| *p == port)
            .map(|(_, b)| match b {
                Bundle::Lite(s) => PortSignals::Lite(s),
                Bundle::Full(s) => PortSignals::Full(s),
            })
    }

    pub fn lite(&mut self, port: usize) -> Option<&mut AxiLiteSignals> {
        match self.port(port)? {
            PortSignals::Lite(s) => Some(s),
            PortSignals::Full(_) => None,
        }
    }

    pub fn full(&mut self, port: usize) -> Option<&mut AxiFullSignals> {
        match self.port(port)? {
            PortSignals::Full(s) => Some(s),
            PortSignals::Lite(_) => None,
        }
    }
}

/// A SoC-style design whose ports are AXI masters.
pub trait SocModel: ClockedModel {
    fn port(&mut self, port: usize) -> Option<PortSignals<'_>>;

    /// Debug signals, for models that expose them.
    fn debug(&self) -> Option<DebugSignals> {
        None
    }
}
