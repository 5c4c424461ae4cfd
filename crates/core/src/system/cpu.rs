// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Cycle orchestrator for CPU-style models with split instruction/data ports.
//!
//! Each [`CpuHarness::step`] is one clock: the memory ports are serviced
//! with the clock low, the model is evaluated, the clock rises and the model
//! is evaluated again, then the debug signals are sampled.

use super::RESET_CYCLES;
use crate::bus::{BusSlave, DeviceRegistry};
use crate::decoder::{disassemble, BUBBLE};
use crate::memory::{ByteStore, ProgramImage};
use crate::metrics::{ipc, CacheCounters, RunStatistics};
use crate::model::{CpuModel, DebugSignals, MemOp, MemPort, LINE_WORDS};
use crate::trace::{ExecutionTrace, TraceEntry};
use crate::{
    Addr, BreakpointOpcode, SimResult, SimulationError, SimulationObserver, StopReason,
    TerminationCondition, Word,
};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tickbench_config::HarnessConfig;

pub const NUM_GPRS: usize = 32;
pub const DEFAULT_TIMEOUT: u64 = 1_000_000;

/// One outstanding request on a CPU memory port.
#[derive(Debug, Clone, Copy, Default)]
struct PendingRequest {
    addr: Addr,
    op: MemOp,
    data: [Word; LINE_WORDS],
    countdown: u32,
    in_flight: bool,
    applied: bool,
}

impl PendingRequest {
    /// Drives `port` for the low half of a cycle. `store` is the memory behind the port.
    fn service(
        &mut self,
        label: &str,
        port: &mut MemPort,
        store: Option<&mut ByteStore>,
        latency: u32,
        verbose: bool,
    ) {
        port.req_ready = !self.in_flight;

        if !self.in_flight {
            port.clear_response();
            if port.req_valid && port.req_ready {
                *self = PendingRequest {
                    addr: port.req_addr,
                    op: port.req_op,
                    data: port.req_data,
                    countdown: latency.max(1),
                    in_flight: true,
                    applied: false,
                };
                if verbose {
                    tracing::debug!("[{} REQ] {:?} addr={:#010x}", label, self.op, self.addr);
                }
            }
            return;
        }

        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            port.clear_response();
            return;
        }

        match self.op {
            MemOp::Read => {
                let mut line = [0; LINE_WORDS];
                for (i, word) in line.iter_mut().enumerate() {
                    let addr = self.addr.wrapping_add(4 * i as Addr);
                    *word = store.as_deref().map_or(0, |s| s.read_word(addr));
                    if verbose {
                        tracing::debug!("[{} READ] addr={:#010x} data={:#010x}", label, addr, *word);
                    }
                }
                port.resp_data = line;
            }
            MemOp::Write => {
                if !self.applied {
                    match store {
                        Some(store) => {
                            for (i, word) in self.data.iter().enumerate() {
                                let addr = self.addr.wrapping_add(4 * i as Addr);
                                store.write_word(addr, *word);
                                if verbose {
                                    tracing::debug!(
                                        "[{} WRITE] addr={:#010x} data={:#010x}",
                                        label,
                                        addr,
                                        word
                                    );
                                }
                            }
                        }
                        None => tracing::warn!(
                            "[{} WRITE] no device behind port, {:#010x} dropped",
                            label,
                            self.addr
                        ),
                    }
                    self.applied = true;
                }
                port.resp_data = [0; LINE_WORDS];
            }
        }
        port.resp_valid = true;
        if port.resp_ready {
            self.in_flight = false;
        }
    }
}

pub struct CpuHarness<M: CpuModel> {
    model: M,
    registry: DeviceRegistry,
    imem_port: usize,
    dmem_port: usize,
    imem_latency: u32,
    dmem_latency: u32,
    imem_req: PendingRequest,
    dmem_req: PendingRequest,
    timeout: u64,
    verbose: bool,
    show_pipeline: bool,
    trace_enabled: bool,
    trace: ExecutionTrace,
    registers: [Word; NUM_GPRS],
    cycle_count: u64,
    instr_count: u64,
    icache: CacheCounters,
    dcache: CacheCounters,
    terminated: bool,
    last_stop: Option<StopReason>,
    wall_time: Duration,
    condition: Box<dyn TerminationCondition>,
    observers: Vec<Arc<dyn SimulationObserver>>,
}

impl<M: CpuModel> CpuHarness<M> {
    pub fn new(model: M, registry: DeviceRegistry, imem_port: usize, dmem_port: usize) -> Self {
        Self {
            model,
            registry,
            imem_port,
            dmem_port,
            imem_latency: 1,
            dmem_latency: 1,
            imem_req: PendingRequest::default(),
            dmem_req: PendingRequest::default(),
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
            show_pipeline: false,
            trace_enabled: false,
            trace: ExecutionTrace::new(),
            registers: [0; NUM_GPRS],
            cycle_count: 0,
            instr_count: 0,
            icache: CacheCounters::default(),
            dcache: CacheCounters::default(),
            terminated: false,
            last_stop: None,
            wall_time: Duration::ZERO,
            condition: Box::new(BreakpointOpcode::default()),
            observers: Vec::new(),
        }
    }

    /// Builds the device map from `config` and applies its CPU settings.
    pub fn from_config(model: M, config: &HarnessConfig) -> anyhow::Result<Self> {
        let registry = super::build_registry(config)?;
        let cpu = &config.cpu;
        let mut harness = Self::new(model, registry, cpu.imem_port as usize, cpu.dmem_port as usize);
        harness.set_latency(cpu.imem_latency, cpu.dmem_latency);
        harness.set_timeout(cpu.timeout);
        harness.enable_trace(cpu.trace);
        Ok(harness)
    }

    pub fn set_latency(&mut self, imem: u32, dmem: u32) {
        self.imem_latency = imem.max(1);
        self.dmem_latency = dmem.max(1);
    }

    /// Cycle budget for `run(0)` and `run_until`. Zero disables it.
    pub fn set_timeout(&mut self, cycles: u64) {
        self.timeout = cycles;
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_show_pipeline(&mut self, show: bool) {
        self.show_pipeline = show;
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_enabled = enabled;
    }

    pub fn set_termination(&mut self, condition: impl TerminationCondition + 'static) {
        self.condition = Box::new(condition);
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

    /// Holds reset over a few clock pulses and clears all harness state.
    /// Memory contents are kept, so a program may be loaded before or after.
    pub fn reset(&mut self) {
        self.model.set_reset(true);
        self.model.set_clock(false);
        let imem = self.model.imem();
        imem.req_ready = true;
        imem.clear_response();
        let dmem = self.model.dmem();
        dmem.req_ready = true;
        dmem.clear_response();
        self.model.evaluate();

        for _ in 0..RESET_CYCLES {
            self.model.set_clock(true);
            self.model.evaluate();
            self.model.set_clock(false);
            self.model.evaluate();
        }

        self.model.set_reset(false);
        self.model.evaluate();

        self.cycle_count = 0;
        self.instr_count = 0;
        self.registers = [0; NUM_GPRS];
        self.trace.clear();
        self.imem_req = PendingRequest::default();
        self.dmem_req = PendingRequest::default();
        self.icache = CacheCounters::default();
        self.dcache = CacheCounters::default();
        self.terminated = false;
        self.last_stop = None;
        tracing::debug!("Harness reset");
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

        let store = self
            .registry
            .get_mut(self.imem_port)
            .map(|s| s.as_slave_mut().store_mut());
        self.imem_req.service(
            "IMEM",
            self.model.imem(),
            store,
            self.imem_latency,
            self.verbose,
        );
        let store = self
            .registry
            .get_mut(self.dmem_port)
            .map(|s| s.as_slave_mut().store_mut());
        self.dmem_req.service(
            "DMEM",
            self.model.dmem(),
            store,
            self.dmem_latency,
            self.verbose,
        );
        self.model.evaluate();

        self.model.set_clock(true);
        self.model.evaluate();

        self.cycle_count += 1;
        let dbg = self.model.debug();
        self.sample(&dbg);

        for observer in &self.observers {
            observer.on_cycle_end(self.cycle_count, &dbg);
        }
        if !self.terminated && self.condition.should_stop(&dbg) {
            if self.verbose {
                tracing::debug!("[TERMINATION] {:#010x} at PC={:#010x}", dbg.instr, dbg.pc);
            }
            self.terminated = true;
        }
    }

    fn sample(&mut self, dbg: &DebugSignals) {
        self.icache.record(dbg.icache_access, dbg.icache_miss);
        self.dcache.record(dbg.dcache_access, dbg.dcache_miss);

        let wrote = dbg.reg_addr != 0 && dbg.reg_we;
        if wrote {
            self.registers[dbg.reg_addr as usize % NUM_GPRS] = dbg.reg_data;
        }
        // Retirements without a register write (stores, branches, ebreak)
        // still get a row, marked as having no destination.
        if self.trace_enabled && (wrote || dbg.wb_instr != BUBBLE) {
            self.trace.push(TraceEntry {
                cycle: self.cycle_count,
                pc: dbg.pc,
                instruction: dbg.instr,
                disassembly: disassemble(dbg.instr),
                rd: if wrote { dbg.reg_addr } else { 0 },
                rd_value: if wrote { dbg.reg_data } else { 0 },
                register_written: wrote,
            });
        }

        if self.show_pipeline {
            tracing::info!(
                "Cycle {:6} | IF: {:08x} | ID: {:08x} | EX: {:08x} | MEM: {:08x} | WB: {:08x}",
                self.cycle_count,
                dbg.if_instr,
                dbg.id_instr,
                dbg.ex_instr,
                dbg.mem_instr,
                dbg.wb_instr
            );
        }

        if dbg.branch_taken && self.verbose {
            tracing::debug!(
                "[BRANCH TAKEN] Source={:#010x} | Target={:#010x}",
                dbg.branch_source,
                dbg.branch_target
            );
        }

        if dbg.wb_instr != BUBBLE {
            self.instr_count += 1;
            if self.verbose {
                tracing::debug!(
                    "Cycle {:6} | PC={:#010x} | Inst={:#010x} ({})",
                    self.cycle_count,
                    dbg.pc,
                    dbg.wb_instr,
                    disassemble(dbg.wb_instr)
                );
            }
        }
    }

    pub fn step_n(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.step();
        }
    }

    /// Runs until `max_cycles` more cycles have elapsed (zero: the timeout
    /// alone bounds the run), the termination condition fires, or the timeout
    /// expires, whichever is first.
    pub fn run(&mut self, max_cycles: u64) -> StopReason {
        let limit = match (max_cycles, self.timeout) {
            (0, t) => t,
            (m, 0) => m,
            (m, t) => m.min(t),
        };
        self.run_loop(|h, ran| {
            if h.terminated {
                Some(StopReason::Terminated { pc: h.model.debug().pc })
            } else if max_cycles != 0 && ran >= max_cycles {
                Some(StopReason::MaxCyclesReached)
            } else if limit != 0 && ran >= limit {
                Some(StopReason::Timeout)
            } else {
                None
            }
        })
    }

    /// Runs until the model's PC debug signal equals `target`, the
    /// termination condition fires, or the timeout expires.
    pub fn run_until(&mut self, target: Addr) -> StopReason {
        let timeout = self.timeout;
        self.run_loop(|h, ran| {
            let pc = h.model.debug().pc;
            if pc == target {
                Some(StopReason::PcReached { pc })
            } else if h.terminated {
                Some(StopReason::Terminated { pc })
            } else if timeout != 0 && ran >= timeout {
                Some(StopReason::Timeout)
            } else {
                None
            }
        })
    }

    fn run_loop<F>(&mut self, mut check: F) -> StopReason
    where
        F: FnMut(&Self, u64) -> Option<StopReason>,
    {
        for observer in &self.observers {
            observer.on_simulation_start();
        }
        let started = Instant::now();
        let first_cycle = self.cycle_count;

        let reason = loop {
            if let Some(reason) = check(self, self.cycle_count - first_cycle) {
                break reason;
            }
            self.step();
        };

        self.wall_time = started.elapsed();
        self.last_stop = Some(reason);
        match reason {
            StopReason::Timeout => {
                tracing::warn!("Simulation timeout at cycle {}", self.cycle_count)
            }
            _ => tracing::info!(
                "Simulation stopped after {} cycles: {:?}",
                self.cycle_count,
                reason
            ),
        }
        for observer in &self.observers {
            observer.on_simulation_stop(reason);
        }
        reason
    }

    pub fn terminated(&self) -> bool {
        self.terminated
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn instruction_count(&self) -> u64 {
        self.instr_count
    }

    pub fn ipc(&self) -> f64 {
        ipc(self.instr_count, self.cycle_count)
    }

    pub fn icache_hit_rate(&self) -> f64 {
        self.icache.hit_rate()
    }

    pub fn dcache_hit_rate(&self) -> f64 {
        self.dcache.hit_rate()
    }

    /// Shadow copy of register `n`, as last reported by the model.
    pub fn reg(&self, n: usize) -> Word {
        if n == 0 {
            0
        } else {
            self.registers.get(n).copied().unwrap_or(0)
        }
    }

    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    pub fn save_trace(&self, path: &Path) -> SimResult<()> {
        self.trace.save(path)
    }

    pub fn read_mem(&self, addr: Addr) -> Word {
        self.registry.read_word(addr)
    }

    pub fn write_mem(&mut self, addr: Addr, value: Word) {
        self.registry.write_word(addr, value);
    }

    pub fn dump_registers(&self) -> String {
        let mut out = String::from("Register Dump:\n");
        for i in 0..NUM_GPRS {
            let _ = write!(out, "x{:02} = {:#010x}", i, self.reg(i));
            out.push_str(if i % 4 == 3 { "\n" } else { "  " });
        }
        out
    }

    pub fn dump_memory(&self, start: Addr, len: usize) -> String {
        format!(
            "Memory dump [{:#010x} - {:#010x}]:\n{}",
            start,
            start as u64 + len as u64,
            self.registry.dump_memory(start, len)
        )
    }

    pub fn stats(&self) -> RunStatistics {
        RunStatistics {
            cycles: self.cycle_count,
            instructions: self.instr_count,
            ipc: self.ipc(),
            icache: self.icache,
            dcache: self.dcache,
            final_pc: self.model.debug().pc,
            stop_reason: self.last_stop,
            wall_time_ms: self.wall_time.as_millis(),
        }
    }
}
