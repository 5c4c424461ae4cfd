// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::decoder::BUBBLE;
use crate::model::DebugSignals;
use crate::{Addr, SimulationObserver, StopReason};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Access/miss counters for one cache, fed from the model's debug flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    pub accesses: u64,
    pub misses: u64,
}

impl CacheCounters {
    pub fn record(&mut self, access: bool, miss: bool) {
        if access {
            self.accesses += 1;
            if miss {
                self.misses += 1;
            }
        }
    }

    /// Hit rate in percent; zero when nothing was accessed.
    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            (self.accesses - self.misses) as f64 * 100.0 / self.accesses as f64
        }
    }
}

/// Summary of one harness run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub cycles: u64,
    pub instructions: u64,
    pub ipc: f64,
    pub icache: CacheCounters,
    pub dcache: CacheCounters,
    pub final_pc: Addr,
    pub stop_reason: Option<StopReason>,
    pub wall_time_ms: u128,
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation statistics:")?;
        writeln!(f, "  Cycles:        {}", self.cycles)?;
        writeln!(f, "  Instructions:  {}", self.instructions)?;
        writeln!(f, "  IPC:           {:.3}", self.ipc)?;
        writeln!(
            f,
            "  L1 I-cache:    {:.2}% hit ({} accesses, {} misses)",
            self.icache.hit_rate(),
            self.icache.accesses,
            self.icache.misses
        )?;
        writeln!(
            f,
            "  L1 D-cache:    {:.2}% hit ({} accesses, {} misses)",
            self.dcache.hit_rate(),
            self.dcache.accesses,
            self.dcache.misses
        )?;
        writeln!(f, "  Final PC:      {:#010x}", self.final_pc)?;
        match self.stop_reason {
            Some(reason) => writeln!(f, "  Stop reason:   {:?}", reason)?,
            None => writeln!(f, "  Stop reason:   -")?,
        }
        write!(f, "  Wall time:     {} ms", self.wall_time_ms)
    }
}

pub fn ipc(instructions: u64, cycles: u64) -> f64 {
    if cycles == 0 {
        0.0
    } else {
        instructions as f64 / cycles as f64
    }
}

/// Observer that counts cycles and retirements independently of the harness.
#[derive(Debug)]
pub struct PerformanceMetrics {
    cycle_count: AtomicU64,
    retired_count: AtomicU64,
    running: AtomicBool,
    start_time: Mutex<Instant>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            cycle_count: AtomicU64::new(0),
            retired_count: AtomicU64::new(0),
            running: AtomicBool::new(false),
            start_time: Mutex::new(Instant::now()),
        }
    }

    pub fn reset(&self) {
        self.cycle_count.store(0, Ordering::SeqCst);
        self.retired_count.store(0, Ordering::SeqCst);
    }

    pub fn get_cycles(&self) -> u64 {
        self.cycle_count.load(Ordering::SeqCst)
    }

    pub fn get_instructions(&self) -> u64 {
        self.retired_count.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Simulated cycles per wall-clock second since the last start.
    pub fn get_cps(&self) -> f64 {
        let elapsed = self
            .start_time
            .lock()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        if elapsed > 0.0 {
            self.get_cycles() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl SimulationObserver for PerformanceMetrics {
    fn on_simulation_start(&self) {
        self.running.store(true, Ordering::SeqCst);
        if let Ok(mut t) = self.start_time.lock() {
            *t = Instant::now();
        }
    }

    fn on_simulation_stop(&self, _reason: StopReason) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn on_cycle_end(&self, _cycle: u64, debug: &DebugSignals) {
        self.cycle_count.fetch_add(1, Ordering::SeqCst);
        if debug.wb_instr != BUBBLE {
            self.retired_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
