// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Drives the SoC harness with a scripted bus master in place of a compiled design.

use std::collections::VecDeque;
use tickbench_config::HarnessConfig;
use tickbench_core::bus::{AxiBurst, BurstMode};
use tickbench_core::model::{ClockedModel, PortKind, PortSignals, SignalBank, SocModel};
use tickbench_core::system::{build_registry, signal_table, SystemHarness};
use tickbench_core::StopReason;

const LITE_PORT: usize = 0;
const FULL_PORT: usize = 1;

#[derive(Debug, Clone)]
enum Op {
    LiteWrite { addr: u32, data: u32, strb: u8 },
    LiteRead { addr: u32 },
    BurstWrite { burst: AxiBurst, data: Vec<u32> },
    BurstRead { burst: AxiBurst },
}

#[derive(Debug, Default)]
struct Completed {
    write_resps: Vec<u8>,
    lite_reads: Vec<(u32, u8)>,
    burst_acks: Vec<(u16, u8)>,
    burst_beats: Vec<(u32, u16, bool)>,
}

/// Issues one operation at a time and waits for its response before the next.
struct ScriptedMaster {
    bank: SignalBank,
    clock: bool,
    last_clock: bool,
    reset: bool,
    script: VecDeque<Op>,
    busy: bool,
    pending_beats: VecDeque<u32>,
    done: Completed,
}

impl ScriptedMaster {
    fn new(table: &[(usize, PortKind)], script: Vec<Op>) -> Self {
        Self {
            bank: SignalBank::new(table),
            clock: false,
            last_clock: false,
            reset: false,
            script: script.into(),
            busy: false,
            pending_beats: VecDeque::new(),
            done: Completed::default(),
        }
    }

    fn idle(&self) -> bool {
        !self.busy && self.script.is_empty()
    }

    fn posedge(&mut self) {
        if let Some(s) = self.bank.lite(LITE_PORT) {
            if s.awvalid && s.awready {
                s.awvalid = false;
            }
            if s.wvalid && s.wready {
                s.wvalid = false;
            }
            if s.arvalid && s.arready {
                s.arvalid = false;
            }
            if s.bvalid && s.bready {
                self.done.write_resps.push(s.bresp);
                s.bready = false;
                self.busy = false;
            }
            if s.rvalid && s.rready {
                self.done.lite_reads.push((s.rdata, s.rresp));
                s.rready = false;
                self.busy = false;
            }
        }

        if let Some(s) = self.bank.full(FULL_PORT) {
            if s.awvalid && s.awready {
                s.awvalid = false;
            }
            if s.wvalid && s.wready {
                match self.pending_beats.pop_front() {
                    Some(data) => {
                        s.wdata = data;
                        s.wlast = self.pending_beats.is_empty();
                    }
                    None => s.wvalid = false,
                }
            }
            if s.arvalid && s.arready {
                s.arvalid = false;
            }
            if s.bvalid && s.bready {
                self.done.burst_acks.push((s.bid, s.bresp));
                s.bready = false;
                self.busy = false;
            }
            if s.rvalid && s.rready {
                self.done.burst_beats.push((s.rdata, s.rid, s.rlast));
                if s.rlast {
                    s.rready = false;
                    self.busy = false;
                }
            }
        }

        if !self.busy {
            if let Some(op) = self.script.pop_front() {
                self.issue(op);
            }
        }
    }

    fn issue(&mut self, op: Op) {
        self.busy = true;
        match op {
            Op::LiteWrite { addr, data, strb } => {
                if let Some(s) = self.bank.lite(LITE_PORT) {
                    s.awaddr = addr;
                    s.awvalid = true;
                    s.wdata = data;
                    s.wstrb = strb;
                    s.wvalid = true;
                    s.bready = true;
                }
            }
            Op::LiteRead { addr } => {
                if let Some(s) = self.bank.lite(LITE_PORT) {
                    s.araddr = addr;
                    s.arvalid = true;
                    s.rready = true;
                }
            }
            Op::BurstWrite { burst, data } => {
                self.pending_beats = data.into();
                if let Some(s) = self.bank.full(FULL_PORT) {
                    s.awid = burst.id;
                    s.awaddr = burst.addr;
                    s.awlen = burst.len;
                    s.awsize = burst.size;
                    s.awburst = burst.burst.into();
                    s.awvalid = true;
                    s.wdata = self.pending_beats.pop_front().unwrap_or(0);
                    s.wstrb = 0xF;
                    s.wlast = self.pending_beats.is_empty();
                    s.wvalid = true;
                    s.bready = true;
                }
            }
            Op::BurstRead { burst } => {
                if let Some(s) = self.bank.full(FULL_PORT) {
                    s.arid = burst.id;
                    s.araddr = burst.addr;
                    s.arlen = burst.len;
                    s.arsize = burst.size;
                    s.arburst = burst.burst.into();
                    s.arvalid = true;
                    s.rready = true;
                }
            }
        }
    }
}

impl ClockedModel for ScriptedMaster {
    fn set_clock(&mut self, high: bool) {
        self.clock = high;
    }

    fn set_reset(&mut self, high: bool) {
        self.reset = high;
    }

    fn evaluate(&mut self) {
        let rising = self.clock && !self.last_clock;
        self.last_clock = self.clock;
        if rising && !self.reset {
            self.posedge();
        }
    }
}

impl SocModel for ScriptedMaster {
    fn port(&mut self, port: usize) -> Option<PortSignals<'_>> {
        self.bank.port(port)
    }
}

const CONFIG: &str = r#"
devices:
  - port: 0
    name: regs
    kind: lite
    base: 0x40000000
    size: "1KiB"
    read_delay: 2
    write_delay: 1
  - port: 1
    name: dram
    kind: full
    base: 0x80000000
    size: "4KiB"
    read_delay: 1
    write_delay: 1
"#;

fn soc(script: Vec<Op>) -> SystemHarness<ScriptedMaster> {
    let config = HarnessConfig::from_yaml(CONFIG).unwrap();
    let registry = build_registry(&config).unwrap();
    let master = ScriptedMaster::new(&signal_table(&config), script);
    let mut h = SystemHarness::new(master, registry);
    h.reset();
    h
}

fn run_to_idle(h: &mut SystemHarness<ScriptedMaster>) {
    for _ in 0..200 {
        if h.model().idle() {
            return;
        }
        h.step();
    }
    panic!("script did not complete");
}

#[test]
fn test_lite_write_then_read() {
    let mut h = soc(vec![
        Op::LiteWrite {
            addr: 0x4000_0010,
            data: 0xDEAD_BEEF,
            strb: 0xF,
        },
        Op::LiteWrite {
            addr: 0x4000_0010,
            data: 0x0000_0011,
            strb: 0x1,
        },
        Op::LiteRead { addr: 0x4000_0010 },
        Op::LiteRead { addr: 0x4000_0400 },
    ]);
    run_to_idle(&mut h);

    let done = &h.model().done;
    assert_eq!(done.write_resps, vec![0, 0]);
    assert_eq!(done.lite_reads, vec![(0xDEAD_BE11, 0), (0, 2)]);
    assert_eq!(h.registry().read_word(0x4000_0010), 0xDEAD_BE11);
}

#[test]
fn test_full_burst_write_then_wrap_read() {
    let mut h = soc(vec![
        Op::BurstWrite {
            burst: AxiBurst::incr(0x8000_0100, 5, 3),
            data: vec![0x10, 0x11, 0x12, 0x13],
        },
        Op::BurstRead {
            burst: AxiBurst {
                addr: 0x8000_0108,
                id: 6,
                len: 3,
                size: 2,
                burst: BurstMode::Wrap,
            },
        },
    ]);
    run_to_idle(&mut h);

    let done = &h.model().done;
    assert_eq!(done.burst_acks, vec![(5, 0)]);
    assert_eq!(
        done.burst_beats,
        vec![
            (0x12, 6, false),
            (0x13, 6, false),
            (0x10, 6, false),
            (0x11, 6, true)
        ]
    );
    assert_eq!(h.registry().read_word(0x8000_010C), 0x13);
}

#[test]
fn test_reset_clears_slave_memory_and_load_afterwards() {
    let mut h = soc(Vec::new());
    h.registry_mut().write_word(0x8000_0000, 0x1234);
    h.reset();
    assert_eq!(h.registry().read_word(0x8000_0000), 0);

    let mut image = tickbench_core::memory::ProgramImage::new(0x8000_0000);
    image.add_segment(0x8000_0000, vec![0x78, 0x56, 0x34, 0x12]);
    h.load_image(&image).unwrap();
    assert_eq!(h.registry().read_word(0x8000_0000), 0x1234_5678);
    assert!(h.dump_memory(0x8000_0000, 4).contains("78 56 34 12"));
}

#[test]
fn test_run_without_debug_signals_stops_on_limits() {
    let mut h = soc(Vec::new());
    assert_eq!(h.run(25), StopReason::MaxCyclesReached);
    assert_eq!(h.cycle_count(), 25);

    h.set_timeout(10);
    assert_eq!(h.run(0), StopReason::Timeout);
    assert_eq!(h.cycle_count(), 35);
    assert!(h.dump_device_map().contains("Port 01: dram"));
}

#[test]
fn test_protocol_mismatch_leaves_port_idle() {
    let config = HarnessConfig::from_yaml(CONFIG).unwrap();
    let registry = build_registry(&config).unwrap();
    // Model claims a full-protocol master on the lite slave's port.
    let master = ScriptedMaster::new(
        &[(LITE_PORT, PortKind::Full), (FULL_PORT, PortKind::Full)],
        Vec::new(),
    );
    let mut h = SystemHarness::new(master, registry);
    h.reset();
    h.step_n(5);
    assert_eq!(h.cycle_count(), 5);
}
