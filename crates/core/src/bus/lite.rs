// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Single-beat AXI-lite memory slave.
//!
//! Every channel is always ready. Accepted addresses and data sit in FIFOs
//! until [`AxiLiteMemory::clock_tick`] pairs them up, so several reads and
//! writes may be in flight at once.

use super::{check_geometry, BusSlave, Resp, Strobe};
use crate::memory::ByteStore;
use crate::{Addr, SimResult, Word};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
struct WriteData {
    data: Word,
    strobe: Strobe,
}

#[derive(Debug, Clone, Copy)]
struct WriteResponse {
    resp: Resp,
    delay: u32,
}

#[derive(Debug, Clone, Copy)]
struct PendingRead {
    addr: Addr,
    data: Word,
    resp: Resp,
    delay: u32,
    processed: bool,
}

#[derive(Debug)]
pub struct AxiLiteMemory {
    store: ByteStore,
    read_delay: u32,
    write_delay: u32,
    write_addrs: VecDeque<Addr>,
    write_data: VecDeque<WriteData>,
    write_resps: VecDeque<WriteResponse>,
    reads: VecDeque<PendingRead>,
}

impl AxiLiteMemory {
    pub fn new(size: usize, base: Addr, read_delay: u32, write_delay: u32) -> SimResult<Self> {
        check_geometry(size, base)?;
        Ok(Self {
            store: ByteStore::new(size, base),
            read_delay,
            write_delay,
            write_addrs: VecDeque::new(),
            write_data: VecDeque::new(),
            write_resps: VecDeque::new(),
            reads: VecDeque::new(),
        })
    }

    pub fn read_delay(&self) -> u32 {
        self.read_delay
    }

    pub fn write_delay(&self) -> u32 {
        self.write_delay
    }

    /// Applies to reads accepted from now on.
    pub fn set_read_delay(&mut self, cycles: u32) {
        self.read_delay = cycles;
    }

    /// Applies to writes completed from now on.
    pub fn set_write_delay(&mut self, cycles: u32) {
        self.write_delay = cycles;
    }

    // --- AW channel ---

    pub fn aw_ready(&self) -> bool {
        true
    }

    pub fn accept_write_address(&mut self, addr: Addr) {
        self.write_addrs.push_back(addr);
    }

    // --- W channel ---

    pub fn w_ready(&self) -> bool {
        true
    }

    pub fn accept_write_data(&mut self, data: Word, strobe: Strobe) {
        self.write_data.push_back(WriteData { data, strobe });
    }

    // --- B channel ---

    pub fn write_response(&self) -> Option<Resp> {
        self.write_resps
            .front()
            .filter(|r| r.delay == 0)
            .map(|r| r.resp)
    }

    /// Pops the head response when `ready` is high and it is presentable.
    pub fn consume_write_response(&mut self, ready: bool) -> Option<Resp> {
        let resp = self.write_response().filter(|_| ready)?;
        self.write_resps.pop_front();
        Some(resp)
    }

    // --- AR channel ---

    pub fn ar_ready(&self) -> bool {
        true
    }

    pub fn accept_read_address(&mut self, addr: Addr) {
        self.reads.push_back(PendingRead {
            addr,
            data: 0,
            resp: Resp::Okay,
            delay: self.read_delay,
            processed: false,
        });
    }

    // --- R channel ---

    pub fn read_response(&self) -> Option<(Word, Resp)> {
        self.reads
            .front()
            .filter(|r| r.processed)
            .map(|r| (r.data, r.resp))
    }

    pub fn consume_read_response(&mut self, ready: bool) -> Option<(Word, Resp)> {
        let beat = self.read_response().filter(|_| ready)?;
        self.reads.pop_front();
        Some(beat)
    }

    pub fn outstanding_writes(&self) -> usize {
        self.write_addrs.len().max(self.write_data.len()) + self.write_resps.len()
    }

    pub fn outstanding_reads(&self) -> usize {
        self.reads.len()
    }

    fn process_writes(&mut self) {
        if self.write_addrs.is_empty() || self.write_data.is_empty() {
            return;
        }
        let (Some(addr), Some(beat)) = (self.write_addrs.pop_front(), self.write_data.pop_front())
        else {
            return;
        };

        let resp = if self.store.is_valid(addr, 4) {
            Resp::Okay
        } else {
            Resp::SlvErr
        };
        for lane in 0..4u32 {
            if beat.strobe.has_lane(lane) {
                let byte_addr = addr.wrapping_add(lane);
                self.store.write_byte(byte_addr, (beat.data >> (lane * 8)) as u8);
            }
        }
        tracing::trace!(
            "lite write {:#010x} <= {:#010x} strb={:04b} {:?}",
            addr,
            beat.data,
            beat.strobe.bits(),
            resp
        );
        self.write_resps.push_back(WriteResponse {
            resp,
            delay: self.write_delay,
        });
    }

    fn update_delays(&mut self) {
        if let Some(head) = self.write_resps.front_mut() {
            head.delay = head.delay.saturating_sub(1);
        }
    }

    fn process_reads(&mut self) {
        let Some(head) = self.reads.front_mut() else {
            return;
        };
        if head.processed {
            return;
        }
        if head.delay > 0 {
            head.delay -= 1;
            return;
        }
        if self.store.is_valid(head.addr, 4) {
            head.data = self.store.read_word(head.addr);
            head.resp = Resp::Okay;
        } else {
            head.data = 0;
            head.resp = Resp::SlvErr;
        }
        head.processed = true;
    }
}

impl BusSlave for AxiLiteMemory {
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
        self.write_data.clear();
        self.write_resps.clear();
        self.reads.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem() -> AxiLiteMemory {
        AxiLiteMemory::new(0x100, 0x1000, 1, 1).unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let mut m = mem();
        m.accept_write_address(0x1010);
        m.accept_write_data(0xCAFE_BABE, Strobe::all());
        m.clock_tick();
        assert_eq!(m.consume_write_response(true), Some(Resp::Okay));

        m.accept_read_address(0x1010);
        m.clock_tick();
        assert_eq!(m.consume_read_response(true), None);
        m.clock_tick();
        assert_eq!(m.consume_read_response(true), Some((0xCAFE_BABE, Resp::Okay)));
        assert_eq!(m.outstanding_reads(), 0);
    }

    #[test]
    fn test_address_without_data_waits() {
        let mut m = mem();
        m.accept_write_address(0x1000);
        m.clock_tick();
        m.clock_tick();
        assert_eq!(m.write_response(), None);

        m.accept_write_data(0x11, Strobe::LANE0);
        m.clock_tick();
        assert_eq!(m.write_response(), Some(Resp::Okay));
        assert_eq!(m.store().read_word(0x1000), 0x11);
    }

    #[test]
    fn test_strobe_partial_write() {
        let mut m = mem();
        m.accept_write_address(0x1020);
        m.accept_write_data(0xAABB_CCDD, Strobe::from_bits_truncate(0b0101));
        m.clock_tick();
        assert_eq!(m.store().read_word(0x1020), 0x00BB_00DD);
    }

    #[test]
    fn test_response_not_consumed_without_ready() {
        let mut m = mem();
        m.accept_write_address(0x1000);
        m.accept_write_data(1, Strobe::all());
        m.clock_tick();
        assert_eq!(m.consume_write_response(false), None);
        assert_eq!(m.consume_write_response(true), Some(Resp::Okay));
        assert_eq!(m.consume_write_response(true), None);
    }

    #[test]
    fn test_write_straddling_end_is_slverr() {
        let mut m = mem();
        m.accept_write_address(0x10FE);
        m.accept_write_data(0x4433_2211, Strobe::all());
        m.clock_tick();
        assert_eq!(m.consume_write_response(true), Some(Resp::SlvErr));
        // The lanes that land inside the store are still written.
        assert_eq!(m.store().read_half(0x10FE), 0x2211);
    }

    #[test]
    fn test_out_of_range_read_is_slverr() {
        let mut m = mem();
        m.accept_read_address(0x2000);
        m.clock_tick();
        m.clock_tick();
        assert_eq!(m.consume_read_response(true), Some((0, Resp::SlvErr)));
    }

    #[test]
    fn test_read_latency() {
        let mut m = AxiLiteMemory::new(0x100, 0, 3, 1).unwrap();
        m.store_mut().write_word(0x40, 0x1234_5678);
        m.accept_read_address(0x40);
        // Three countdown ticks, then the word is sampled on the fourth.
        for _ in 0..3 {
            m.clock_tick();
            assert_eq!(m.read_response(), None);
        }
        m.clock_tick();
        assert_eq!(m.read_response(), Some((0x1234_5678, Resp::Okay)));
    }

    #[test]
    fn test_zero_read_delay_samples_on_first_tick() {
        let mut m = AxiLiteMemory::new(0x100, 0, 0, 1).unwrap();
        m.store_mut().write_word(0x8, 0x55);
        m.accept_read_address(0x8);
        assert_eq!(m.read_response(), None);
        m.clock_tick();
        assert_eq!(m.consume_read_response(true), Some((0x55, Resp::Okay)));
    }

    #[test]
    fn test_write_responses_are_fifo() {
        let mut m = AxiLiteMemory::new(0x100, 0, 1, 2).unwrap();
        m.accept_write_address(0x0);
        m.accept_write_data(1, Strobe::all());
        m.accept_write_address(0x200);
        m.accept_write_data(2, Strobe::all());

        m.clock_tick();
        assert_eq!(m.write_response(), None);
        m.clock_tick();
        assert_eq!(m.consume_write_response(true), Some(Resp::Okay));
        // Second response only starts counting down once it reaches the head.
        m.clock_tick();
        assert_eq!(m.write_response(), None);
        m.clock_tick();
        assert_eq!(m.consume_write_response(true), Some(Resp::SlvErr));
    }

    #[test]
    fn test_reset_drops_in_flight_and_clears_store() {
        let mut m = mem();
        m.store_mut().write_word(0x1000, 0xFFFF_FFFF);
        m.accept_read_address(0x1000);
        m.accept_write_address(0x1004);
        m.reset();
        m.clock_tick();
        assert_eq!(m.read_response(), None);
        assert_eq!(m.outstanding_writes(), 0);
        assert_eq!(m.store().read_word(0x1000), 0);
    }

    #[test]
    fn test_rejects_zero_size() {
        assert!(AxiLiteMemory::new(0, 0, 1, 1).is_err());
        assert!(AxiLiteMemory::new(0x2000, 0xFFFF_F000, 1, 1).is_err());
    }
}
