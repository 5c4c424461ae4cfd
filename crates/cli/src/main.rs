// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use tickbench_config::HarnessConfig;
use tickbench_core::metrics::{PerformanceMetrics, RunStatistics};
use tickbench_core::model::ReferenceCore;
use tickbench_core::system::CpuHarness;
use tickbench_core::system::cpu::NUM_GPRS;

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;

fn parse_u32_addr(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value '{}': {}", s, e))
    } else {
        u32::from_str(trimmed).map_err(|e| format!("Invalid value '{}': {}", s, e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Tickbench cycle-level testbench",
    long_about = None
)]
struct Cli {
    /// Program image (.bin, .elf or .hex)
    program: PathBuf,

    /// Stop after this many cycles (0: run until termination or timeout)
    #[arg(short, long, default_value = "0")]
    cycles: u64,

    /// Cycle budget for open-ended runs; overrides the config (0 disables)
    #[arg(long)]
    timeout: Option<u64>,

    /// Load address for raw binaries and Verilog hex
    #[arg(short, long, default_value = "0", value_parser = parse_u32_addr)]
    base: u32,

    /// Write a CSV trace of register writes
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Dump memory after the run (repeatable): --dump-mem <ADDR> <SIZE>
    #[arg(
        short = 'm',
        long,
        num_args = 2,
        value_names = ["ADDR", "SIZE"],
        value_parser = parse_u32_addr,
        action = ArgAction::Append
    )]
    dump_mem: Vec<u32>,

    /// Dump registers after the run
    #[arg(short, long)]
    dump_regs: bool,

    /// Run until the PC reaches this address instead of a cycle count
    #[arg(long, value_parser = parse_u32_addr)]
    run_until: Option<u32>,

    /// Harness configuration (YAML); defaults to the built-in CPU testbench map
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every memory access, branch and retirement
    #[arg(short, long)]
    verbose: bool,

    /// Log the pipeline stages every cycle
    #[arg(short = 'p', long)]
    show_pipeline: bool,

    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Print the run summary as a single JSON line
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct MemoryDump {
    addr: u32,
    size: u32,
    dump: String,
}

#[derive(Debug, Serialize)]
struct RunReport {
    #[serde(flatten)]
    stats: RunStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    registers: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    memory: Vec<MemoryDump>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut level: tracing::Level = cli.log_level.into();
    if cli.verbose && level < tracing::Level::DEBUG {
        level = tracing::Level::DEBUG;
    }
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::from(EXIT_PASS),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    info!("Starting Tickbench");

    let config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };

    info!("Loading program: {:?}", cli.program);
    let image = tickbench_loader::load_program(&cli.program, cli.base)?;
    let reset_vector = config.cpu.reset_vector;
    if image.entry_point != reset_vector {
        warn!(
            "Program entry {:#010x} differs from the reset vector {:#010x}",
            image.entry_point, reset_vector
        );
    }

    let mut harness = CpuHarness::from_config(ReferenceCore::new(reset_vector), &config)?;
    if let Some(timeout) = cli.timeout {
        harness.set_timeout(timeout);
    }
    harness.set_verbose(cli.verbose);
    harness.set_show_pipeline(cli.show_pipeline);
    harness.enable_trace(cli.trace.is_some() || config.cpu.trace);

    let metrics = Arc::new(PerformanceMetrics::new());
    harness.add_observer(metrics.clone());

    harness.reset();
    harness
        .load_image(&image)
        .context("Program does not fit the device map")?;
    info!(
        "Program loaded: {} segment(s), {} bytes",
        image.segments.len(),
        image.total_bytes()
    );

    let reason = match cli.run_until {
        Some(pc) => harness.run_until(pc),
        None => harness.run(cli.cycles),
    };
    info!(
        "Stopped: {:?} ({:.0} cycles/s)",
        reason,
        metrics.get_cps()
    );

    if let Some(path) = &cli.trace {
        harness.save_trace(path)?;
        info!("Trace written to {:?} ({} rows)", path, harness.trace().len());
    }

    let dumps: Vec<MemoryDump> = cli
        .dump_mem
        .chunks_exact(2)
        .map(|pair| MemoryDump {
            addr: pair[0],
            size: pair[1],
            dump: harness.dump_memory(pair[0], pair[1] as usize),
        })
        .collect();

    if cli.json {
        let report = RunReport {
            stats: harness.stats(),
            registers: cli
                .dump_regs
                .then(|| (0..NUM_GPRS).map(|i| harness.reg(i)).collect()),
            memory: dumps,
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", harness.stats());
        if cli.dump_regs {
            print!("{}", harness.dump_registers());
        }
        for d in &dumps {
            print!("{}", d.dump);
        }
    }

    Ok(())
}
