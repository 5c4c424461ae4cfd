// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{Addr, SimResult, SimulationError, Word};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub const CSV_HEADER: &str = "Cycle,PC,Instruction,Disassembly,Reg,Value";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub cycle: u64,
    pub pc: Addr,
    pub instruction: Word,
    pub disassembly: String,
    pub rd: u8,
    pub rd_value: Word,
    pub register_written: bool,
}

impl TraceEntry {
    /// One CSV row. Rows without a register write carry `-,-` in the last two columns.
    pub fn to_csv(&self) -> String {
        let dest = if self.register_written {
            format!("x{},{:#010x}", self.rd, self.rd_value)
        } else {
            "-,-".to_string()
        };
        format!(
            "{},{:#010x},{:#010x},{},{}",
            self.cycle,
            self.pc,
            self.instruction,
            self.disassembly.trim_end(),
            dest
        )
    }
}

/// Append-only execution trace.
#[derive(Debug, Default, Clone)]
pub struct ExecutionTrace {
    entries: Vec<TraceEntry>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "{}", CSV_HEADER)?;
        for e in &self.entries {
            writeln!(out, "{}", e.to_csv())?;
        }
        out.flush()
    }

    pub fn save(&self, path: &Path) -> SimResult<()> {
        let io_err = |source| SimulationError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::create(path).map_err(io_err)?;
        self.write_csv(std::io::BufWriter::new(file)).map_err(io_err)?;
        tracing::info!("Wrote {} trace rows to {:?}", self.entries.len(), path);
        Ok(())
    }
}
