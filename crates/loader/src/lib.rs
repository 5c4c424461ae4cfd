// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Program image loaders: ELF32 RISC-V executables, raw binaries and hex files.

mod hex;

pub use hex::{load_intel_hex, load_verilog_hex, parse_intel_hex, parse_verilog_hex};

use anyhow::{anyhow, bail, Context, Result};
use goblin::elf::header::{EM_RISCV, ELFMAG, SELFMAG};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use std::fs;
use std::path::Path;
use tickbench_core::memory::ProgramImage;
use tickbench_core::Addr;
use tracing::{debug, info, warn};

pub fn is_elf(buffer: &[u8]) -> bool {
    buffer.len() >= SELFMAG && &buffer[..SELFMAG] == ELFMAG
}

pub fn load_elf(path: &Path) -> Result<ProgramImage> {
    let buffer = fs::read(path).with_context(|| format!("Failed to read ELF file: {:?}", path))?;
    load_elf_bytes(&buffer).with_context(|| format!("Failed to load ELF file: {:?}", path))
}

pub fn load_elf_bytes(buffer: &[u8]) -> Result<ProgramImage> {
    if !is_elf(buffer) {
        bail!("Not a valid ELF file (bad magic)");
    }
    let elf = Elf::parse(buffer).context("Failed to parse ELF binary")?;

    if elf.is_64 {
        bail!("Only ELF32 images are supported");
    }
    if elf.header.e_machine != EM_RISCV {
        bail!(
            "Not a RISC-V ELF file (machine type {})",
            elf.header.e_machine
        );
    }

    let entry = to_addr(elf.entry, "entry point")?;
    info!("ELF Entry Point: {:#x}", entry);
    let mut program_image = ProgramImage::new(entry);

    for ph in elf.program_headers.iter().filter(|ph| ph.p_type == PT_LOAD) {
        // Physical address (LMA) is where the bytes live before any relocation by startup code.
        let start_addr = to_addr(ph.p_paddr, "segment address")?;
        let size = ph.p_filesz as usize;
        let offset = ph.p_offset as usize;

        if size == 0 {
            debug!("Skipping empty segment at {:#x}", start_addr);
            continue;
        }

        debug!(
            "Found Loadable Segment: Addr={:#x}, Size={} bytes, Offset={:#x}",
            start_addr, size, offset
        );

        let data = offset
            .checked_add(size)
            .and_then(|end| buffer.get(offset..end))
            .ok_or_else(|| anyhow!("Segment out of bounds in ELF file"))?;
        program_image.add_segment(start_addr, data.to_vec());
    }

    if program_image.segments.is_empty() {
        warn!("No loadable segments found in ELF file");
    }

    Ok(program_image)
}

/// Raw binary placed at `base`, which is also the entry point.
pub fn load_binary(path: &Path, base: Addr) -> Result<ProgramImage> {
    let data = fs::read(path).with_context(|| format!("Failed to read binary: {:?}", path))?;
    if data.is_empty() {
        warn!("Binary {:?} is empty", path);
    }
    info!("Binary: {} bytes at {:#010x}", data.len(), base);
    let mut image = ProgramImage::new(base);
    image.add_segment(base, data);
    Ok(image)
}

/// Picks a loader from the file extension. `base` applies to formats that
/// carry no addresses of their own.
pub fn load_program(path: &Path, base: Addr) -> Result<ProgramImage> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("bin") => load_binary(path, base),
        Some("elf") => load_elf(path),
        Some("hex") => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read HEX file: {:?}", path))?;
            let intel = text
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .is_some_and(|l| l.starts_with(':'));
            if intel {
                parse_intel_hex(&text).with_context(|| format!("Invalid Intel HEX: {:?}", path))
            } else {
                parse_verilog_hex(&text, base)
                    .with_context(|| format!("Invalid Verilog hex: {:?}", path))
            }
        }
        _ => bail!(
            "Unsupported program format {:?} (expected .bin, .elf or .hex)",
            path
        ),
    }
}

fn to_addr(value: u64, what: &str) -> Result<Addr> {
    Addr::try_from(value).map_err(|_| anyhow!("{} {:#x} exceeds the 32-bit address space", what, value))
}
