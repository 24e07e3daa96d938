// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use criterion::{criterion_group, criterion_main, Criterion};
use edge_viewer::{
    convert::{decode_chain, decode_fixed_point, ColorMatrix},
    image::{required_size, FrameBuffer, PixelLayout},
};

fn sensor_frame(layout: PixelLayout, width: u32, height: u32) -> Vec<u8> {
    let len = required_size(layout, width, height).unwrap();
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn benchmark_decode(c: &mut Criterion) {
    let layouts = [PixelLayout::Nv21, PixelLayout::Nv12, PixelLayout::I420];
    let dims = [(320, 240), (640, 480), (1280, 720), (1920, 1080)];
    let matrix = ColorMatrix::default();

    for layout in layouts.iter() {
        let mut group = c.benchmark_group(format!("decode/{}", layout));
        for dim in dims.iter() {
            let data = sensor_frame(*layout, dim.0, dim.1);
            let frame = FrameBuffer::new(&data, dim.0, dim.1, *layout).unwrap();
            for strategy in decode_chain(*layout) {
                group.bench_with_input(
                    format!("{}x{}-{:?}", dim.0, dim.1, strategy),
                    &frame,
                    |b, frame| b.iter(|| strategy.decode(frame, matrix)),
                );
            }
        }
        group.finish();
    }
}

pub fn benchmark_fixed_point(c: &mut Criterion) {
    let dims = [(640, 480), (1920, 1080)];
    let mut group = c.benchmark_group("fixed_point");
    for matrix in [ColorMatrix::Bt601Limited, ColorMatrix::Bt601Full] {
        for dim in dims.iter() {
            let data = sensor_frame(PixelLayout::Nv21, dim.0, dim.1);
            let frame = FrameBuffer::new(&data, dim.0, dim.1, PixelLayout::Nv21).unwrap();
            group.bench_with_input(
                format!("{}x{}-{:?}", dim.0, dim.1, matrix),
                &frame,
                |b, frame| b.iter(|| decode_fixed_point(frame, matrix)),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, benchmark_decode, benchmark_fixed_point);
criterion_main!(benches);
