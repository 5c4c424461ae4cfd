// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{Addr, SimResult, SimulationError, Word};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start_addr: Addr,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramImage {
    pub entry_point: Addr,
    pub segments: Vec<Segment>,
}

impl ProgramImage {
    pub fn new(entry_point: Addr) -> Self {
        Self {
            entry_point,
            segments: Vec::new(),
        }
    }

    pub fn add_segment(&mut self, start_addr: Addr, data: Vec<u8>) {
        self.segments.push(Segment { start_addr, data });
    }

    pub fn total_bytes(&self) -> usize {
        self.segments.iter().map(|s| s.data.len()).sum()
    }
}

/// A flat, bounds-checked byte store mapped at `base_addr`.
///
/// Reads outside the store return zero and writes outside it are dropped.
/// Multi-byte accesses are little-endian and need not be aligned.
#[derive(Debug, Clone)]
pub struct ByteStore {
    data: Vec<u8>,
    base_addr: Addr,
}

impl ByteStore {
    pub fn new(size: usize, base_addr: Addr) -> Self {
        Self {
            data: vec![0; size],
            base_addr,
        }
    }

    pub fn base_address(&self) -> Addr {
        self.base_addr
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Offset of `addr` if the `width`-byte span starting there is inside the store.
    fn offset_of(&self, addr: Addr, width: usize) -> Option<usize> {
        // Addresses below the base wrap to huge offsets and fail the check.
        let offset = addr.wrapping_sub(self.base_addr) as usize;
        if offset.checked_add(width)? <= self.data.len() {
            Some(offset)
        } else {
            None
        }
    }

    pub fn is_valid(&self, addr: Addr, width: usize) -> bool {
        self.offset_of(addr, width).is_some()
    }

    pub fn contains(&self, addr: Addr) -> bool {
        self.is_valid(addr, 1)
    }

    pub fn read_byte(&self, addr: Addr) -> u8 {
        match self.offset_of(addr, 1) {
            Some(off) => self.data[off],
            None => 0,
        }
    }

    pub fn read_half(&self, addr: Addr) -> u16 {
        match self.offset_of(addr, 2) {
            Some(off) => u16::from_le_bytes([self.data[off], self.data[off + 1]]),
            None => 0,
        }
    }

    pub fn read_word(&self, addr: Addr) -> Word {
        match self.offset_of(addr, 4) {
            Some(off) => u32::from_le_bytes([
                self.data[off],
                self.data[off + 1],
                self.data[off + 2],
                self.data[off + 3],
            ]),
            None => 0,
        }
    }

    pub fn write_byte(&mut self, addr: Addr, value: u8) {
        if let Some(off) = self.offset_of(addr, 1) {
            self.data[off] = value;
        }
    }

    pub fn write_half(&mut self, addr: Addr, value: u16) {
        if let Some(off) = self.offset_of(addr, 2) {
            self.data[off..off + 2].copy_from_slice(&value.to_le_bytes());
        }
    }

    pub fn write_word(&mut self, addr: Addr, value: Word) {
        if let Some(off) = self.offset_of(addr, 4) {
            self.data[off..off + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Copies `bytes` verbatim to `offset` (relative to the base address).
    pub fn load_bytes(&mut self, offset: usize, bytes: &[u8]) -> SimResult<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= self.data.len())
            .ok_or(SimulationError::ImageTooLarge {
                offset,
                len: bytes.len(),
                size: self.data.len(),
            })?;
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn load_binary(&mut self, path: &Path, offset: usize) -> SimResult<()> {
        let bytes = std::fs::read(path).map_err(|source| SimulationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_bytes(offset, &bytes)?;
        tracing::debug!(
            "Loaded {} bytes from {:?} at {:#010x}",
            bytes.len(),
            path,
            self.base_addr.wrapping_add(offset as Addr)
        );
        Ok(())
    }

    pub fn load_from_segment(&mut self, segment: &Segment) -> bool {
        if segment.data.is_empty() {
            return self.contains(segment.start_addr);
        }
        match self.offset_of(segment.start_addr, segment.data.len()) {
            Some(off) => {
                self.data[off..off + segment.data.len()].copy_from_slice(&segment.data);
                true
            }
            None => false,
        }
    }

    /// Hex dump, 16 bytes per row with an ASCII gutter. Rows stop at the end of the store.
    pub fn dump(&self, start: Addr, len: usize) -> String {
        let mut out = String::new();
        let mut row_addr = start;
        let mut remaining = len;
        while remaining > 0 && self.contains(row_addr) {
            let row_len = remaining.min(16);
            let _ = write!(out, "{:08x}: ", row_addr);
            let mut ascii = String::with_capacity(16);
            for i in 0..16 {
                if i == 8 {
                    out.push(' ');
                }
                let addr = row_addr.wrapping_add(i as Addr);
                if i < row_len && self.contains(addr) {
                    let b = self.read_byte(addr);
                    let _ = write!(out, "{:02x} ", b);
                    ascii.push(if (32..127).contains(&b) { b as char } else { '.' });
                } else {
                    out.push_str("   ");
                }
            }
            let _ = writeln!(out, " |{}|", ascii);
            remaining -= row_len;
            row_addr = row_addr.wrapping_add(16);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_round_trip() {
        let mut mem = ByteStore::new(1024, 0x1000);
        for (addr, val) in [(0x1000, 0xDEAD_BEEF), (0x13FC, 0x0102_0304), (0x1201, 7)] {
            mem.write_word(addr, val);
            assert_eq!(mem.read_word(addr), val);
        }
    }

    #[test]
    fn test_little_endian_layout() {
        let mut mem = ByteStore::new(16, 0);
        mem.write_word(0, 0xAABB_CCDD);
        assert_eq!(mem.read_byte(0), 0xDD);
        assert_eq!(mem.read_byte(3), 0xAA);
        assert_eq!(mem.read_half(1), 0xBBCC);
        mem.write_half(8, 0x1234);
        assert_eq!(mem.as_slice()[8..10], [0x34, 0x12]);
    }

    #[test]
    fn test_out_of_range_reads_zero_and_drops_writes() {
        let mut mem = ByteStore::new(1024, 0x1000);

        // Straddles the end: must be rejected as a whole.
        mem.write_word(0x13FE, 0xFFFF_FFFF);
        assert_eq!(mem.read_byte(0x13FE), 0);
        assert_eq!(mem.read_word(0x13FE), 0);

        mem.write_word(0x1400, 1);
        mem.write_byte(0x0FFF, 1);
        assert_eq!(mem.read_word(0x1400), 0);
        assert_eq!(mem.read_byte(0x0FFF), 0);
        assert_eq!(mem.read_word(u32::MAX), 0);
        assert!(mem.as_slice().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_load_from_segment() {
        let mut mem = ByteStore::new(1024, 0x1000);

        let seg1 = Segment {
            start_addr: 0x1000,
            data: vec![1, 2, 3],
        };
        assert!(mem.load_from_segment(&seg1));
        assert_eq!(mem.read_byte(0x1000), 1);

        // Overlaps the end boundary: rejected without a partial write.
        let seg2 = Segment {
            start_addr: 0x13FE,
            data: vec![10, 20, 30],
        };
        assert!(!mem.load_from_segment(&seg2));
        assert_eq!(mem.read_byte(0x13FF), 0);

        let seg3 = Segment {
            start_addr: 0x13FE,
            data: vec![0xAA, 0xBB],
        };
        assert!(mem.load_from_segment(&seg3));
        assert_eq!(mem.read_half(0x13FE), 0xBBAA);
    }

    #[test]
    fn test_load_bytes_too_large() {
        let mut mem = ByteStore::new(8, 0);
        assert!(mem.load_bytes(4, &[1, 2, 3, 4]).is_ok());
        let err = mem.load_bytes(5, &[1, 2, 3, 4]).unwrap_err();
        assert!(matches!(err, SimulationError::ImageTooLarge { size: 8, .. }));
    }

    #[test]
    fn test_load_binary_missing_file() {
        let mut mem = ByteStore::new(8, 0);
        let err = mem
            .load_binary(Path::new("/nonexistent/tickbench/image.bin"), 0)
            .unwrap_err();
        assert!(matches!(err, SimulationError::Io { .. }));
    }

    #[test]
    fn test_load_binary_from_disk() {
        let path = std::env::temp_dir().join(format!("tickbench-store-{}.bin", std::process::id()));
        std::fs::write(&path, [0x13, 0x05, 0x10, 0x00]).unwrap();

        let mut mem = ByteStore::new(64, 0x100);
        mem.load_binary(&path, 8).unwrap();
        assert_eq!(mem.read_word(0x108), 0x0010_0513);

        let mut tiny = ByteStore::new(6, 0);
        assert!(tiny.load_binary(&path, 4).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_clear_and_dump() {
        let mut mem = ByteStore::new(32, 0x2000);
        mem.load_bytes(0, b"Hello, bus!").unwrap();
        let dump = mem.dump(0x2000, 16);
        assert!(dump.starts_with("00002000: 48 65"));
        assert!(dump.contains("|Hello, bus!.....|"));
        mem.clear();
        assert_eq!(mem.read_word(0x2000), 0);
    }
}
