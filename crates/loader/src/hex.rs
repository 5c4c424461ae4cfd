// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::Path;
use tickbench_core::memory::ProgramImage;
use tickbench_core::Addr;
use tracing::{debug, warn};

const REC_DATA: u8 = 0x00;
const REC_EOF: u8 = 0x01;
const REC_EXT_LINEAR: u8 = 0x04;
const REC_START_LINEAR: u8 = 0x05;

pub fn load_intel_hex(path: &Path) -> Result<ProgramImage> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read HEX file: {:?}", path))?;
    parse_intel_hex(&text).with_context(|| format!("Invalid Intel HEX: {:?}", path))
}

pub fn load_verilog_hex(path: &Path, base: Addr) -> Result<ProgramImage> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read HEX file: {:?}", path))?;
    parse_verilog_hex(&text, base).with_context(|| format!("Invalid Verilog hex: {:?}", path))
}

fn decode_record(line: &str) -> Result<Vec<u8>> {
    let body = line
        .strip_prefix(':')
        .ok_or_else(|| anyhow!("record does not start with ':'"))?;
    if !body.is_ascii() || body.len() % 2 != 0 || body.len() < 10 {
        bail!("malformed record");
    }
    (0..body.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&body[i..i + 2], 16).map_err(|e| anyhow!("bad hex digit: {}", e)))
        .collect()
}

/// Parses Intel HEX text. Contiguous data records become one segment; a
/// start-linear-address record sets the entry point, otherwise the first
/// data address is used.
pub fn parse_intel_hex(text: &str) -> Result<ProgramImage> {
    let mut segments: Vec<(Addr, Vec<u8>)> = Vec::new();
    let mut upper: Addr = 0;
    let mut entry = None;

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let bytes = decode_record(line).with_context(|| format!("line {}", n + 1))?;
        let count = bytes[0] as usize;
        if bytes.len() != count + 5 {
            bail!("line {}: byte count {} does not match record length", n + 1, count);
        }
        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != 0 {
            bail!("line {}: checksum mismatch", n + 1);
        }

        let offset = u16::from_be_bytes([bytes[1], bytes[2]]) as Addr;
        let payload = &bytes[4..4 + count];
        match bytes[3] {
            REC_DATA => {
                let addr = upper.wrapping_add(offset);
                match segments.last_mut() {
                    Some((start, data))
                        if start.wrapping_add(data.len() as Addr) == addr =>
                    {
                        data.extend_from_slice(payload)
                    }
                    _ => segments.push((addr, payload.to_vec())),
                }
            }
            REC_EOF => break,
            REC_EXT_LINEAR if count == 2 => {
                upper = (u16::from_be_bytes([payload[0], payload[1]]) as Addr) << 16;
            }
            REC_START_LINEAR if count == 4 => {
                entry = Some(Addr::from_be_bytes([
                    payload[0], payload[1], payload[2], payload[3],
                ]));
            }
            other => warn!("line {}: ignoring record type {:#04x}", n + 1, other),
        }
    }

    if segments.is_empty() {
        bail!("no data records");
    }
    let entry = entry.unwrap_or(segments[0].0);
    let mut image = ProgramImage::new(entry);
    for (addr, data) in segments {
        debug!("HEX segment {:#010x} ({} bytes)", addr, data.len());
        image.add_segment(addr, data);
    }
    Ok(image)
}

/// Parses `$readmemh`-style text: one 32-bit word per line, stored
/// little-endian from `base`.
pub fn parse_verilog_hex(text: &str, base: Addr) -> Result<ProgramImage> {
    let mut data = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let word: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        if word.is_empty() || word.starts_with('/') || word.starts_with('#') {
            continue;
        }
        let value = u32::from_str_radix(&word, 16)
            .with_context(|| format!("line {}: '{}' is not a hex word", n + 1, word))?;
        data.extend_from_slice(&value.to_le_bytes());
    }
    if data.is_empty() {
        bail!("no words");
    }
    let mut image = ProgramImage::new(base);
    image.add_segment(base, data);
    Ok(image)
}
