// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use criterion::{criterion_group, criterion_main, Criterion};
use edge_viewer::{
    image::{required_size, PixelLayout},
    pipeline::FramePipeline,
    process::ProcessingMode,
    rotate::Rotation,
};

pub fn benchmark_process(c: &mut Criterion) {
    let modes = [
        ProcessingMode::RawColor,
        ProcessingMode::Grayscale,
        ProcessingMode::Edges,
    ];
    let dims = [(320, 240), (640, 480), (1280, 720), (1920, 1080)];
    let pipeline = FramePipeline::default();

    for mode in modes.iter() {
        let mut group = c.benchmark_group(format!("process/{}", mode.name()));
        for dim in dims.iter() {
            let len = required_size(PixelLayout::Nv21, dim.0, dim.1).unwrap();
            let raw: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            for rotation in [Rotation::Rotation0, Rotation::Rotation90] {
                group.bench_with_input(
                    format!("{}x{}-{}", dim.0, dim.1, rotation.degrees()),
                    &raw,
                    |b, raw| b.iter(|| pipeline.process(raw, dim.0, dim.1, *mode, rotation)),
                );
            }
        }
        group.finish();
    }
}

criterion_group!(benches, benchmark_process);
criterion_main!(benches);
