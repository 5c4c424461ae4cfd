// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Burst-capable AXI4 memory slave.
//!
//! Write bursts are serviced one at a time, one data beat per tick, and
//! produce a single B response. A read burst is expanded into all of its
//! R beats on the tick its address is dequeued; the beats then leave the
//! R FIFO strictly in order, each gated by the read delay.

use super::{check_geometry, BusSlave, Resp, Strobe};
use crate::memory::ByteStore;
use crate::{Addr, SimResult, Word};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BurstMode {
    Fixed,
    #[default]
    Incr,
    Wrap,
}

impl From<u8> for BurstMode {
    /// AxBURST encoding. The reserved value 3 addresses like INCR.
    fn from(raw: u8) -> Self {
        match raw {
            0 => BurstMode::Fixed,
            2 => BurstMode::Wrap,
            _ => BurstMode::Incr,
        }
    }
}

impl From<BurstMode> for u8 {
    fn from(mode: BurstMode) -> u8 {
        match mode {
            BurstMode::Fixed => 0,
            BurstMode::Incr => 1,
            BurstMode::Wrap => 2,
        }
    }
}

/// Address-phase payload shared by the AW and AR channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxiBurst {
    pub addr: Addr,
    pub id: u16,
    /// Beats minus one (AxLEN).
    pub len: u8,
    /// log2 of bytes per beat (AxSIZE).
    pub size: u8,
    pub burst: BurstMode,
}

impl AxiBurst {
    pub fn single(addr: Addr, id: u16) -> Self {
        Self {
            addr,
            id,
            len: 0,
            size: 2,
            burst: BurstMode::Incr,
        }
    }

    pub fn incr(addr: Addr, id: u16, len: u8) -> Self {
        Self {
            len,
            ..Self::single(addr, id)
        }
    }

    pub fn beats(&self) -> u32 {
        self.len as u32 + 1
    }

    pub fn bytes_per_beat(&self) -> u32 {
        // AXI caps AxSIZE at 128 bytes per beat.
        1 << self.size.min(7)
    }

    /// Address of beat `beat` under this burst's addressing mode.
    pub fn beat_address(&self, beat: u32) -> Addr {
        let bpb = self.bytes_per_beat();
        match self.burst {
            BurstMode::Fixed => self.addr,
            BurstMode::Incr => self.addr.wrapping_add(beat.wrapping_mul(bpb)),
            BurstMode::Wrap => {
                // Non-power-of-two windows near the top of the address
                // space can run past 4 GiB; the result wraps.
                let total = (self.beats() * bpb) as u64;
                let addr = self.addr as u64;
                let boundary = (addr / total) * total;
                let offset = (addr - boundary + beat as u64 * bpb as u64) % total;
                (boundary + offset) as Addr
            }
        }
    }
}

/// Presentable head of the B channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    pub resp: Resp,
    pub id: u16,
}

/// Presentable head of the R channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBeat {
    pub data: Word,
    pub resp: Resp,
    pub id: u16,
    pub last: bool,
}

#[derive(Debug, Clone, Copy)]
struct WriteBeat {
    data: Word,
    strobe: Strobe,
    last: bool,
}

#[derive(Debug, Clone, Copy)]
struct ActiveWrite {
    burst: AxiBurst,
    beat: u32,
    error: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingAck {
    ack: WriteAck,
    delay: u32,
}

#[derive(Debug, Clone, Copy)]
struct PendingBeat {
    beat: ReadBeat,
    delay: u32,
    presentable: bool,
}

#[derive(Debug)]
pub struct AxiFullMemory {
    store: ByteStore,
    read_delay: u32,
    write_delay: u32,
    write_addrs: VecDeque<AxiBurst>,
    write_beats: VecDeque<WriteBeat>,
    active_write: Option<ActiveWrite>,
    write_acks: VecDeque<PendingAck>,
    read_addrs: VecDeque<AxiBurst>,
    read_beats: VecDeque<PendingBeat>,
}

impl AxiFullMemory {
    pub fn new(size: usize, base: Addr, read_delay: u32, write_delay: u32) -> SimResult<Self> {
        check_geometry(size, base)?;
        Ok(Self {
            store: ByteStore::new(size, base),
            read_delay,
            write_delay,
            write_addrs: VecDeque::new(),
            write_beats: VecDeque::new(),
            active_write: None,
            write_acks: VecDeque::new(),
            read_addrs: VecDeque::new(),
            read_beats: VecDeque::new(),
        })
    }

    pub fn set_read_delay(&mut self, cycles: u32) {
        self.read_delay = cycles;
    }

    pub fn set_write_delay(&mut self, cycles: u32) {
        self.write_delay = cycles;
    }

    pub fn aw_ready(&self) -> bool {
        true
    }

    pub fn accept_write_address(&mut self, burst: AxiBurst) {
        self.write_addrs.push_back(burst);
    }

    pub fn w_ready(&self) -> bool {
        true
    }

    pub fn accept_write_data(&mut self, data: Word, strobe: Strobe, last: bool) {
        self.write_beats.push_back(WriteBeat { data, strobe, last });
    }

    pub fn write_response(&self) -> Option<WriteAck> {
        self.write_acks
            .front()
            .filter(|a| a.delay == 0)
            .map(|a| a.ack)
    }

    pub fn consume_write_response(&mut self, ready: bool) -> Option<WriteAck> {
        let ack = self.write_response().filter(|_| ready)?;
        self.write_acks.pop_front();
        Some(ack)
    }

    pub fn ar_ready(&self) -> bool {
        true
    }

    pub fn accept_read_address(&mut self, burst: AxiBurst) {
        self.read_addrs.push_back(burst);
    }

    pub fn read_response(&self) -> Option<ReadBeat> {
        self.read_beats
            .front()
            .filter(|b| b.presentable)
            .map(|b| b.beat)
    }

    pub fn consume_read_response(&mut self, ready: bool) -> Option<ReadBeat> {
        let beat = self.read_response().filter(|_| ready)?;
        self.read_beats.pop_front();
        Some(beat)
    }

    pub fn write_burst_active(&self) -> bool {
        self.active_write.is_some()
    }

    pub fn queued_read_beats(&self) -> usize {
        self.read_beats.len()
    }

    fn process_writes(&mut self) {
        if self.active_write.is_none() {
            self.active_write = self.write_addrs.pop_front().map(|burst| ActiveWrite {
                burst,
                beat: 0,
                error: false,
            });
        }
        let Some(active) = self.active_write.as_mut() else {
            return;
        };
        let Some(w) = self.write_beats.pop_front() else {
            return;
        };

        let addr = active.burst.beat_address(active.beat);
        let lanes = active.burst.bytes_per_beat().min(4);
        for lane in 0..lanes {
            if !w.strobe.has_lane(lane) {
                continue;
            }
            let byte_addr = addr.wrapping_add(lane);
            if self.store.contains(byte_addr) {
                self.store.write_byte(byte_addr, (w.data >> (lane * 8)) as u8);
            } else {
                active.error = true;
            }
        }

        if w.last || active.beat >= active.burst.len as u32 {
            let resp = if active.error { Resp::SlvErr } else { Resp::Okay };
            tracing::trace!(
                "full write burst id={} {:#010x} x{} done: {:?}",
                active.burst.id,
                active.burst.addr,
                active.beat + 1,
                resp
            );
            self.write_acks.push_back(PendingAck {
                ack: WriteAck {
                    resp,
                    id: active.burst.id,
                },
                delay: self.write_delay,
            });
            self.active_write = None;
        } else {
            active.beat += 1;
        }
    }

    fn update_delays(&mut self) {
        if let Some(head) = self.write_acks.front_mut() {
            head.delay = head.delay.saturating_sub(1);
        }
    }

    fn process_reads(&mut self) {
        if let Some(burst) = self.read_addrs.pop_front() {
            let bpb = burst.bytes_per_beat();
            for beat in 0..burst.beats() {
                let addr = burst.beat_address(beat);
                let valid = self.store.is_valid(addr, bpb as usize);
                let mut data: Word = 0;
                if valid {
                    for lane in 0..bpb.min(4) {
                        data |= (self.store.read_byte(addr.wrapping_add(lane)) as Word) << (lane * 8);
                    }
                }
                self.read_beats.push_back(PendingBeat {
                    beat: ReadBeat {
                        data,
                        resp: if valid { Resp::Okay } else { Resp::SlvErr },
                        id: burst.id,
                        last: beat == burst.len as u32,
                    },
                    delay: self.read_delay,
                    presentable: false,
                });
            }
        }

        if let Some(head) = self.read_beats.front_mut().filter(|b| !b.presentable) {
            if head.delay > 0 {
                head.delay -= 1;
            } else {
                head.presentable = true;
            }
        }
    }
}

impl BusSlave for AxiFullMemory {
    fn store(&self) -> &ByteStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut ByteStore {
        &mut self.store
    }

    fn clock_tick(&mut self) {
        self.process_writes();
        self.update_delays();
        self.process_reads();
    }

    fn reset(&mut self) {
        self.store.clear();
        self.write_addrs.clear();
        self.write_beats.clear();
        self.active_write = None;
        self.write_acks.clear();
        self.read_addrs.clear();
        self.read_beats.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_reads(m: &mut AxiFullMemory, max_ticks: usize) -> Vec<ReadBeat> {
        let mut out = Vec::new();
        for _ in 0..max_ticks {
            m.clock_tick();
            if let Some(beat) = m.consume_read_response(true) {
                out.push(beat);
            }
        }
        out
    }

    #[test]
    fn test_wrap_addresses() {
        let burst = AxiBurst {
            addr: 0x1C,
            id: 0,
            len: 3,
            size: 2,
            burst: BurstMode::Wrap,
        };
        let addrs: Vec<_> = (0..4).map(|b| burst.beat_address(b)).collect();
        assert_eq!(addrs, vec![0x1C, 0x10, 0x14, 0x18]);
    }

    #[test]
    fn test_fixed_and_incr_addresses() {
        let mut burst = AxiBurst::incr(0x100, 0, 3);
        assert_eq!(burst.beat_address(3), 0x10C);
        burst.size = 0;
        assert_eq!(burst.beat_address(3), 0x103);
        burst.burst = BurstMode::Fixed;
        assert_eq!(burst.beat_address(3), 0x100);
    }

    #[test]
    fn test_reserved_burst_mode_falls_back_to_incr() {
        assert_eq!(BurstMode::from(3), BurstMode::Incr);
        assert_eq!(BurstMode::from(0), BurstMode::Fixed);
        assert_eq!(u8::from(BurstMode::Wrap), 2);
    }

    #[test]
    fn test_incr_read_burst_beats_and_last() {
        let mut m = AxiFullMemory::new(0x100, 0, 1, 1).unwrap();
        for i in 0..4u32 {
            m.store_mut().write_word(0x20 + i * 4, 0x100 + i);
        }
        m.accept_read_address(AxiBurst::incr(0x20, 7, 3));
        let beats = drain_reads(&mut m, 10);
        assert_eq!(beats.len(), 4);
        assert_eq!(
            beats.iter().map(|b| b.data).collect::<Vec<_>>(),
            vec![0x100, 0x101, 0x102, 0x103]
        );
        assert_eq!(beats.iter().filter(|b| b.last).count(), 1);
        assert!(beats[3].last);
        assert!(beats.iter().all(|b| b.id == 7 && b.resp == Resp::Okay));
    }

    #[test]
    fn test_write_burst_single_response() {
        let mut m = AxiFullMemory::new(0x100, 0x4000, 1, 1).unwrap();
        m.accept_write_address(AxiBurst::incr(0x4010, 3, 2));
        for i in 0..3u32 {
            m.accept_write_data(0xA0 + i, Strobe::all(), i == 2);
        }
        let mut acks = Vec::new();
        for _ in 0..6 {
            m.clock_tick();
            if let Some(ack) = m.consume_write_response(true) {
                acks.push(ack);
            }
        }
        assert_eq!(acks, vec![WriteAck { resp: Resp::Okay, id: 3 }]);
        assert_eq!(m.store().read_word(0x4014), 0xA1);
        assert_eq!(m.store().read_word(0x4018), 0xA2);
        assert!(!m.write_burst_active());
    }

    #[test]
    fn test_write_burst_ends_at_len_without_last() {
        let mut m = AxiFullMemory::new(0x100, 0, 1, 1).unwrap();
        m.accept_write_address(AxiBurst::incr(0x0, 1, 1));
        m.accept_write_data(1, Strobe::all(), false);
        m.accept_write_data(2, Strobe::all(), false);
        m.clock_tick();
        m.clock_tick();
        assert_eq!(m.consume_write_response(true).map(|a| a.id), Some(1));
    }

    #[test]
    fn test_partial_oob_beat_writes_valid_bytes_and_errors() {
        let mut m = AxiFullMemory::new(0x10, 0, 1, 1).unwrap();
        m.accept_write_address(AxiBurst::single(0x0E, 9));
        m.accept_write_data(0xDDCC_BBAA, Strobe::all(), true);
        m.clock_tick();
        let ack = m.consume_write_response(true).unwrap();
        assert_eq!(ack.resp, Resp::SlvErr);
        assert_eq!(m.store().read_half(0x0E), 0xBBAA);
    }

    #[test]
    fn test_error_sticks_across_beats() {
        let mut m = AxiFullMemory::new(0x10, 0, 1, 1).unwrap();
        // Beat 0 straddles the end of the store, beat 1 writes nothing.
        m.accept_write_address(AxiBurst::incr(0x0E, 0, 1));
        m.accept_write_data(0xFFFF_FFFF, Strobe::all(), false);
        m.accept_write_data(0, Strobe::empty(), true);
        m.clock_tick();
        m.clock_tick();
        assert_eq!(m.consume_write_response(true).unwrap().resp, Resp::SlvErr);

        m.accept_write_address(AxiBurst::incr(0x8, 0, 1));
        m.accept_write_data(1, Strobe::all(), false);
        m.accept_write_data(2, Strobe::empty(), true);
        m.clock_tick();
        m.clock_tick();
        assert_eq!(m.consume_write_response(true).unwrap().resp, Resp::Okay);
    }

    #[test]
    fn test_read_beat_out_of_range() {
        let mut m = AxiFullMemory::new(0x8, 0, 1, 1).unwrap();
        m.accept_read_address(AxiBurst::incr(0x4, 2, 1));
        let beats = drain_reads(&mut m, 4);
        assert_eq!(beats.len(), 2);
        assert_eq!(beats[0].resp, Resp::Okay);
        assert_eq!(beats[1].resp, Resp::SlvErr);
        assert_eq!(beats[1].data, 0);
    }

    #[test]
    fn test_read_delay_gates_head_only() {
        let mut m = AxiFullMemory::new(0x100, 0, 2, 1).unwrap();
        m.accept_read_address(AxiBurst::incr(0x0, 0, 1));
        m.clock_tick();
        assert_eq!(m.queued_read_beats(), 2);
        assert!(m.read_response().is_none());
        m.clock_tick();
        assert!(m.read_response().is_none());
        m.clock_tick();
        assert!(!m.consume_read_response(true).unwrap().last);
        // The second beat only counts down once it is at the head.
        m.clock_tick();
        m.clock_tick();
        assert!(m.read_response().is_none());
        m.clock_tick();
        assert!(m.consume_read_response(true).unwrap().last);
    }

    #[test]
    fn test_zero_read_delay_presents_a_beat_per_tick() {
        let mut m = AxiFullMemory::new(0x100, 0, 0, 1).unwrap();
        m.accept_read_address(AxiBurst::incr(0x0, 4, 1));
        m.clock_tick();
        assert!(!m.consume_read_response(true).unwrap().last);
        m.clock_tick();
        assert!(m.consume_read_response(true).unwrap().last);
    }

    #[test]
    fn test_wrap_near_top_of_address_space() {
        let burst = AxiBurst {
            addr: 0xFFFF_FFFE,
            id: 0,
            len: 2,
            size: 2,
            burst: BurstMode::Wrap,
        };
        // 12-byte window starting at 0xFFFF_FFFC runs past 4 GiB and wraps.
        assert_eq!(burst.beat_address(0), 0xFFFF_FFFE);
        assert_eq!(burst.beat_address(1), 0x0000_0002);
        assert_eq!(burst.beat_address(2), 0x0000_0006);

        let mut m = AxiFullMemory::new(16, 0, 1, 1).unwrap();
        m.accept_read_address(burst);
        let beats = drain_reads(&mut m, 8);
        assert_eq!(beats.len(), 3);
        assert_eq!(beats[0].resp, Resp::SlvErr);
        assert!(beats[2].last);
    }
}
