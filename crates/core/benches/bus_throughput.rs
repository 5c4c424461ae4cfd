// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tickbench_config::HarnessConfig;
use tickbench_core::bus::{AxiBurst, AxiFullMemory, AxiLiteMemory, BusSlave, Strobe};
use tickbench_core::memory::ProgramImage;
use tickbench_core::model::ReferenceCore;
use tickbench_core::system::CpuHarness;

fn bench_lite_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("lite_reads");
    for delay in [1u32, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(delay), &delay, |b, &delay| {
            let mut mem = AxiLiteMemory::new(0x1000, 0, delay, 1).unwrap();
            b.iter(|| {
                for i in 0..64u32 {
                    mem.accept_read_address((i * 4) & 0xFFF);
                }
                let mut sum = 0u32;
                while mem.outstanding_reads() > 0 {
                    mem.clock_tick();
                    if let Some((data, _)) = mem.consume_read_response(true) {
                        sum = sum.wrapping_add(data);
                    }
                }
                black_box(sum)
            });
        });
    }
    group.finish();
}

fn bench_full_bursts(c: &mut Criterion) {
    c.bench_function("full_incr16_write_read", |b| {
        let mut mem = AxiFullMemory::new(0x1000, 0, 1, 1).unwrap();
        b.iter(|| {
            mem.accept_write_address(AxiBurst::incr(0x100, 1, 15));
            for i in 0..16u32 {
                mem.accept_write_data(i, Strobe::all(), i == 15);
            }
            while mem.consume_write_response(true).is_none() {
                mem.clock_tick();
            }
            mem.accept_read_address(AxiBurst::incr(0x100, 2, 15));
            let mut beats = 0;
            loop {
                mem.clock_tick();
                if let Some(beat) = mem.consume_read_response(true) {
                    beats += 1;
                    if beat.last {
                        break;
                    }
                }
            }
            black_box(beats)
        });
    });
}

fn bench_reference_core(c: &mut Criterion) {
    // addi x1, x0, 0 ; loop: addi x1, x1, 1 ; jal x0, -4
    let program: Vec<u8> = [0x0000_0093u32, 0x0010_8093, 0xFFDF_F06F]
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .collect();

    c.bench_function("reference_core_10k_cycles", |b| {
        let mut harness =
            CpuHarness::from_config(ReferenceCore::new(0), &HarnessConfig::default()).unwrap();
        let mut image = ProgramImage::new(0);
        image.add_segment(0, program.clone());
        harness.load_image(&image).unwrap();
        b.iter(|| {
            harness.reset();
            harness.step_n(10_000);
            black_box(harness.instruction_count())
        });
    });
}

criterion_group!(benches, bench_lite_reads, bench_full_bursts, bench_reference_core);
criterion_main!(benches);
