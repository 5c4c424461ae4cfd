// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Cycle orchestrator for SoC models whose ports are AXI masters.

use super::RESET_CYCLES;
use crate::bus::{AxiBurst, AxiFullMemory, AxiLiteMemory, BusSlave, DeviceRegistry, Slave, Strobe};
use crate::memory::ProgramImage;
use crate::model::{AxiFullSignals, AxiLiteSignals, PortSignals, SocModel};
use crate::{
    Addr, SimResult, SimulationError, SimulationObserver, StopReason, TerminationCondition,
};
use std::path::Path;
use std::sync::Arc;

/// Moves one cycle of AXI-lite traffic between a master's signals and a slave.
fn drive_lite(sig: &mut AxiLiteSignals, mem: &mut AxiLiteMemory) {
    sig.awready = mem.aw_ready();
    sig.wready = mem.w_ready();
    sig.arready = mem.ar_ready();

    if sig.awvalid && sig.awready {
        mem.accept_write_address(sig.awaddr);
    }
    if sig.wvalid && sig.wready {
        mem.accept_write_data(sig.wdata, Strobe::from_bits_truncate(sig.wstrb));
    }
    if sig.arvalid && sig.arready {
        mem.accept_read_address(sig.araddr);
    }

    match mem.write_response() {
        Some(resp) => {
            sig.bvalid = true;
            sig.bresp = resp.code();
            mem.consume_write_response(sig.bready);
        }
        None => {
            sig.bvalid = false;
            sig.bresp = 0;
        }
    }

    match mem.read_response() {
        Some((data, resp)) => {
            sig.rvalid = true;
            sig.rdata = data;
            sig.rresp = resp.code();
            mem.consume_read_response(sig.rready);
        }
        None => {
            sig.rvalid = false;
            sig.rdata = 0;
            sig.rresp = 0;
        }
    }
}

fn drive_full(sig: &mut AxiFullSignals, mem: &mut AxiFullMemory) {
    sig.awready = mem.aw_ready();
    sig.wready = mem.w_ready();
    sig.arready = mem.ar_ready();

    if sig.awvalid && sig.awready {
        mem.accept_write_address(AxiBurst {
            addr: sig.awaddr,
            id: sig.awid,
            len: sig.awlen,
            size: sig.awsize,
            burst: sig.awburst.into(),
        });
    }
    if sig.wvalid && sig.wready {
        mem.accept_write_data(sig.wdata, Strobe::from_bits_truncate(sig.wstrb), sig.wlast);
    }
    if sig.arvalid && sig.arready {
        mem.accept_read_address(AxiBurst {
            addr: sig.araddr,
            id: sig.arid,
            len: sig.arlen,
            size: sig.arsize,
            burst: sig.arburst.into(),
        });
    }

    match mem.write_response() {
        Some(ack) => {
            sig.bvalid = true;
            sig.bresp = ack.resp.code();
            sig.bid = ack.id;
            mem.consume_write_response(sig.bready);
        }
        None => {
            sig.bvalid = false;
            sig.bresp = 0;
            sig.bid = 0;
        }
    }

    match mem.read_response() {
        Some(beat) => {
            sig.rvalid = true;
            sig.rdata = beat.data;
            sig.rresp = beat.resp.code();
            sig.rid = beat.id;
            sig.rlast = beat.last;
            mem.consume_read_response(sig.rready);
        }
        None => {
            sig.rvalid = false;
            sig.rdata = 0;
            sig.rresp = 0;
            sig.rid = 0;
            sig.rlast = false;
        }
    }
}

pub struct SystemHarness<M: SocModel> {
    model: M,
    registry: DeviceRegistry,
    timeout: u64,
    verbose: bool,
    cycle_count: u64,
    terminated: bool,
    condition: Option<Box<dyn TerminationCondition>>,
    observers: Vec<Arc<dyn SimulationObserver>>,
}

impl<M: SocModel> SystemHarness<M> {
    pub fn new(mut model: M, registry: DeviceRegistry) -> Self {
        for port in 0..registry.port_count() {
            let (Some(slave), Some(signals)) = (registry.get(port), model.port(port)) else {
                continue;
            };
            let matched = matches!(
                (slave, signals),
                (Slave::Lite(_), PortSignals::Lite(_)) | (Slave::Full(_), PortSignals::Full(_))
            );
            if !matched {
                tracing::warn!(
                    "Port {} ('{}'): {} slave does not match the model's port protocol; port ignored",
                    port,
                    registry.name_of(port).unwrap_or("?"),
                    slave.kind()
                );
            }
        }
        tracing::info!("{}", registry.dump_device_map().trim_end());

        Self {
            model,
            registry,
            timeout: 0,
            verbose: false,
            cycle_count: 0,
            terminated: false,
            condition: None,
            observers: Vec::new(),
        }
    }

    pub fn set_timeout(&mut self, cycles: u64) {
        self.timeout = cycles;
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Only consulted when the model exposes debug signals.
    pub fn set_termination(&mut self, condition: impl TerminationCondition + 'static) {
        self.condition = Some(Box::new(condition));
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Resets the model and every slave. Slave memory is cleared, so load
    /// programs afterwards.
    pub fn reset(&mut self) {
        self.model.set_reset(true);
        self.model.set_clock(false);
        self.model.evaluate();
        for _ in 0..RESET_CYCLES {
            self.model.set_clock(true);
            self.model.evaluate();
            self.model.set_clock(false);
            self.model.evaluate();
        }
        self.model.set_reset(false);
        self.model.evaluate();

        self.registry.reset();
        self.cycle_count = 0;
        self.terminated = false;
    }

    pub fn load_bin(&mut self, path: &Path, addr: Addr) -> SimResult<()> {
        let slave = self
            .registry
            .find_owner_mut(addr)
            .ok_or(SimulationError::SegmentUnmapped { addr, len: 0 })?;
        let store = slave.as_slave_mut().store_mut();
        let offset = addr.wrapping_sub(store.base_address()) as usize;
        store.load_binary(path, offset)
    }

    pub fn load_image(&mut self, image: &ProgramImage) -> SimResult<()> {
        self.registry.load_image(image)
    }

    pub fn step(&mut self) {
        self.model.set_clock(false);
        for port in 0..self.registry.port_count() {
            let Some(slave) = self.registry.get_mut(port) else {
                continue;
            };
            match (self.model.port(port), slave) {
                (Some(PortSignals::Lite(sig)), Slave::Lite(mem)) => drive_lite(sig, mem),
                (Some(PortSignals::Full(sig)), Slave::Full(mem)) => drive_full(sig, mem),
                _ => {}
            }
        }
        self.model.evaluate();

        self.model.set_clock(true);
        self.model.evaluate();
        self.registry.clock_tick();
        self.cycle_count += 1;

        if let Some(dbg) = self.model.debug() {
            for observer in &self.observers {
                observer.on_cycle_end(self.cycle_count, &dbg);
            }
            if let Some(cond) = self.condition.as_mut() {
                if cond.should_stop(&dbg) {
                    if self.verbose {
                        tracing::debug!("[TERMINATION] at PC={:#010x}", dbg.pc);
                    }
                    self.terminated = true;
                }
            }
        }
    }

    pub fn step_n(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.step();
        }
    }

    /// Runs until `max_cycles` more cycles have elapsed, the termination
    /// condition fires, or the timeout expires. With neither a cycle limit
    /// nor a timeout the run only ends on termination.
    pub fn run(&mut self, max_cycles: u64) -> StopReason {
        for observer in &self.observers {
            observer.on_simulation_start();
        }
        let first = self.cycle_count;
        let reason = loop {
            let ran = self.cycle_count - first;
            if self.terminated {
                let pc = self.model.debug().map_or(0, |d| d.pc);
                break StopReason::Terminated { pc };
            }
            if max_cycles > 0 && ran >= max_cycles {
                tracing::info!("Reached max cycles: {}", max_cycles);
                break StopReason::MaxCyclesReached;
            }
            if self.timeout > 0 && ran >= self.timeout {
                tracing::warn!("Simulation timeout at cycle {}", self.cycle_count);
                break StopReason::Timeout;
            }
            self.step();
        };
        for observer in &self.observers {
            observer.on_simulation_stop(reason);
        }
        reason
    }

    pub fn dump_memory(&self, start: Addr, len: usize) -> String {
        self.registry.dump_memory(start, len)
    }

    pub fn dump_device_map(&self) -> String {
        self.registry.dump_device_map()
    }
}
