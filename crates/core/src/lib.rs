// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod decoder;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod system;
pub mod trace;

use model::DebugSignals;
use std::path::PathBuf;

pub type Addr = u32;
pub type Word = u32;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Image of {len} bytes at offset {offset:#x} does not fit in {size} bytes of memory")]
    ImageTooLarge { offset: usize, len: usize, size: usize },
    #[error("Segment at {addr:#010x} ({len} bytes) is not backed by any device")]
    SegmentUnmapped { addr: Addr, len: usize },
    #[error("Invalid device: {0}")]
    InvalidDevice(String),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Why a `run` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StopReason {
    /// A termination condition fired; `pc` is the model's program counter at that point.
    Terminated { pc: Addr },
    MaxCyclesReached,
    /// The configured cycle budget ran out. A normal outcome, not an error.
    Timeout,
    PcReached { pc: Addr },
}

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self, _reason: StopReason) {}
    fn on_cycle_end(&self, _cycle: u64, _debug: &DebugSignals) {}
}

/// Decides after each cycle whether the run should stop.
pub trait TerminationCondition {
    fn should_stop(&mut self, debug: &DebugSignals) -> bool;
}

impl<F> TerminationCondition for F
where
    F: FnMut(&DebugSignals) -> bool,
{
    fn should_stop(&mut self, debug: &DebugSignals) -> bool {
        self(debug)
    }
}

/// Stops when the model presents a specific instruction word, `ebreak` by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointOpcode(pub Word);

impl Default for BreakpointOpcode {
    fn default() -> Self {
        Self(decoder::EBREAK)
    }
}

impl TerminationCondition for BreakpointOpcode {
    fn should_stop(&mut self, debug: &DebugSignals) -> bool {
        debug.instr == self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoint_opcode_default_is_ebreak() {
        let mut cond = BreakpointOpcode::default();
        let mut dbg = DebugSignals::default();
        assert!(!cond.should_stop(&dbg));
        dbg.instr = 0x0010_0073;
        assert!(cond.should_stop(&dbg));
    }

    #[test]
    fn test_closure_condition() {
        let mut seen = 0;
        let mut cond = |d: &DebugSignals| {
            seen += 1;
            d.pc == 0x40
        };
        let mut dbg = DebugSignals::default();
        assert!(!cond.should_stop(&dbg));
        dbg.pc = 0x40;
        assert!(cond.should_stop(&dbg));
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_error_messages() {
        let err = SimulationError::SegmentUnmapped {
            addr: 0x9000_0000,
            len: 12,
        };
        assert_eq!(
            err.to_string(),
            "Segment at 0x90000000 (12 bytes) is not backed by any device"
        );
    }
}
