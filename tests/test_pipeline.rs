// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use edge_viewer::{
    convert::ColorMatrix,
    error::PipelineError,
    ffi::{
        edgeviewer_frame_free, edgeviewer_initialize_processor, edgeviewer_process_foreign,
        edgeviewer_process_frame, edgeviewer_processor_free, edgeviewer_processor_new,
        edgeviewer_release_processor, EdgeviewerFrame,
    },
    image::{required_size, PixelLayout},
    lifecycle::ProcessorLifecycle,
    pipeline::{FramePipeline, PipelineConfig},
    process::ProcessingMode,
    rotate::{Mirror, Rotation},
    window::{ForeignBuffer, ForeignSource, ForeignTarget},
};
use libc::c_void;
use serial_test::serial;
use std::{
    error::Error,
    ptr::null_mut,
    sync::atomic::{AtomicUsize, Ordering},
};

/// NV21 frame with a constant luma value and neutral chroma.
fn uniform_nv21(width: u32, height: u32, luma: u8) -> Vec<u8> {
    let pixels = (width * height) as usize;
    let mut data = vec![luma; pixels];
    data.resize(required_size(PixelLayout::Nv21, width, height).unwrap(), 128);
    data
}

/// NV21 frame whose luma rises by one per row.
fn row_gradient_nv21(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    for y in 0..height {
        data.extend(std::iter::repeat(y as u8).take(width as usize));
    }
    data.resize(required_size(PixelLayout::Nv21, width, height).unwrap(), 128);
    data
}

fn unmirrored() -> FramePipeline {
    FramePipeline::new(PipelineConfig {
        mirror: Mirror::None,
        ..Default::default()
    })
}

#[test]
fn test_output_sizes() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();
    let raw = uniform_nv21(64, 48, 90);

    for mode in [
        ProcessingMode::RawColor,
        ProcessingMode::Grayscale,
        ProcessingMode::Edges,
    ] {
        for degrees in [0, 90, 180, 270] {
            let rotation = Rotation::from(degrees);
            let frame = pipeline.process(&raw, 64, 48, mode, rotation)?;
            let (w, h) = rotation.output_size(64, 48);
            println!("{} {}: {}x{}", mode.name(), degrees, frame.width(), frame.height());
            assert_eq!((frame.width(), frame.height()), (w, h));
            assert_eq!(frame.channels(), mode.channels());
            assert_eq!(frame.data().len(), mode.channels() * 64 * 48);
        }
    }
    Ok(())
}

#[test]
fn test_raw_rotated_90() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();
    let raw = uniform_nv21(4, 2, 128);
    assert_eq!(raw.len(), 12);

    let frame = pipeline.process(&raw, 4, 2, ProcessingMode::RawColor, Rotation::Rotation90)?;
    assert_eq!(frame.width(), 2);
    assert_eq!(frame.height(), 4);
    assert_eq!(frame.data().len(), 24);
    Ok(())
}

#[test]
fn test_uniform_color() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::new(PipelineConfig {
        matrix: ColorMatrix::Bt601Limited,
        ..Default::default()
    });

    for luma in [16u8, 90, 128, 200, 235] {
        let raw = uniform_nv21(16, 16, luma);
        let frame = pipeline.process(&raw, 16, 16, ProcessingMode::RawColor, Rotation::Rotation0)?;
        let expected = ColorMatrix::Bt601Limited.decode(luma, 128, 128);
        for px in frame.data().chunks_exact(3) {
            for (got, want) in px.iter().zip(expected) {
                assert!(
                    got.abs_diff(want) <= 2,
                    "luma {luma}: got {px:?} want {expected:?}"
                );
            }
        }
    }
    Ok(())
}

#[test]
fn test_idempotent() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();
    let raw = row_gradient_nv21(32, 24);

    for mode in [
        ProcessingMode::RawColor,
        ProcessingMode::Grayscale,
        ProcessingMode::Edges,
    ] {
        let a = pipeline.process(&raw, 32, 24, mode, Rotation::Rotation270)?;
        let b = pipeline.process(&raw, 32, 24, mode, Rotation::Rotation270)?;
        assert_eq!(a.data(), b.data(), "{} differs between calls", mode.name());
    }
    Ok(())
}

#[test]
fn test_grayscale_is_luma_plane() -> Result<(), Box<dyn Error>> {
    let raw = row_gradient_nv21(8, 6);
    let luma = &raw[..48];

    let frame = unmirrored().process(&raw, 8, 6, ProcessingMode::Grayscale, Rotation::Rotation0)?;
    assert_eq!(frame.channels(), 1);
    assert_eq!(frame.data(), luma);

    // Default vertical mirror reverses the row order.
    let frame = FramePipeline::default().process(
        &raw,
        8,
        6,
        ProcessingMode::Grayscale,
        Rotation::Rotation0,
    )?;
    let flipped: Vec<u8> = luma.chunks(8).rev().flatten().copied().collect();
    assert_eq!(frame.data(), flipped.as_slice());
    Ok(())
}

#[test]
fn test_flat_edges() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();

    let raw = uniform_nv21(4, 4, 128);
    let frame = pipeline.process(&raw, 4, 4, ProcessingMode::Edges, Rotation::Rotation0)?;
    assert_eq!(frame.data(), &[0u8; 16]);

    let raw = uniform_nv21(64, 48, 77);
    let frame = pipeline.process(&raw, 64, 48, ProcessingMode::Edges, Rotation::Rotation90)?;
    assert!(frame.data().iter().all(|&v| v == 0));
    Ok(())
}

#[test]
fn test_step_edges() -> Result<(), Box<dyn Error>> {
    let (width, height) = (32u32, 32u32);
    let mut raw = Vec::new();
    for _ in 0..height {
        for x in 0..width {
            raw.push(if x < width / 2 { 20 } else { 220 });
        }
    }
    raw.resize(required_size(PixelLayout::Nv21, width, height).unwrap(), 128);

    let frame = FramePipeline::default().process(
        &raw,
        width,
        height,
        ProcessingMode::Edges,
        Rotation::Rotation0,
    )?;
    let edges = frame.data().iter().filter(|&&v| v == 255).count();
    println!("edge pixels: {edges}");
    assert!(edges >= height as usize);
    assert!(frame.data().iter().all(|&v| v == 0 || v == 255));
    Ok(())
}

#[test]
fn test_invalid_input_size() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();

    let err = pipeline
        .process(&vec![0u8; 1000], 640, 480, ProcessingMode::RawColor, Rotation::Rotation0)
        .unwrap_err();
    println!("{err}");
    assert_eq!(err.code(), PipelineError::INVALID_INPUT_SIZE);
    match err {
        PipelineError::InvalidInputSize {
            actual, required, ..
        } => {
            assert_eq!(actual, 1000);
            assert_eq!(required, 460800);
        }
        other => panic!("unexpected error {other}"),
    }

    let err = pipeline
        .process(&vec![0u8; 64], 0, 8, ProcessingMode::Edges, Rotation::Rotation0)
        .unwrap_err();
    assert_eq!(err.code(), PipelineError::INVALID_INPUT_SIZE);

    // One byte short of the odd-dimension requirement.
    let required = required_size(PixelLayout::Nv21, 5, 3).unwrap();
    assert_eq!(required, 15 + 2 * 3 * 2);
    let err = pipeline
        .process(&vec![0u8; required - 1], 5, 3, ProcessingMode::Grayscale, Rotation::Rotation0)
        .unwrap_err();
    assert_eq!(err.code(), PipelineError::INVALID_INPUT_SIZE);
    Ok(())
}

#[test]
fn test_trailing_bytes_ignored() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();
    let raw = uniform_nv21(8, 8, 100);
    let mut padded = raw.clone();
    padded.extend([7u8; 64]);

    let a = pipeline.process(&raw, 8, 8, ProcessingMode::RawColor, Rotation::Rotation0)?;
    let b = pipeline.process(&padded, 8, 8, ProcessingMode::RawColor, Rotation::Rotation0)?;
    assert_eq!(a.data(), b.data());
    Ok(())
}

#[test]
fn test_unknown_codes() {
    assert_eq!(ProcessingMode::from(7), ProcessingMode::RawColor);
    assert_eq!(ProcessingMode::from(-1), ProcessingMode::RawColor);
    assert_eq!(ProcessingMode::from(1), ProcessingMode::Edges);
    assert_eq!(ProcessingMode::from(2), ProcessingMode::Grayscale);
    assert_eq!(Rotation::from(45), Rotation::Rotation0);
    assert_eq!(Rotation::from(-90), Rotation::Rotation0);
    assert_eq!(Rotation::from(270), Rotation::Rotation270);
}

#[test]
fn test_process_into() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();
    let raw = uniform_nv21(6, 4, 150);

    let mut target = vec![0xAAu8; 6 * 4 * 3 + 5];
    let info = pipeline.process_into(
        &raw,
        6,
        4,
        ProcessingMode::RawColor,
        Rotation::Rotation90,
        target.as_mut_slice(),
    )?;
    assert_eq!((info.width, info.height, info.channels), (4, 6, 3));
    assert_eq!(info.len, 72);

    let owned = pipeline.process(&raw, 6, 4, ProcessingMode::RawColor, Rotation::Rotation90)?;
    assert_eq!(&target[..72], owned.data());
    assert!(target[72..].iter().all(|&v| v == 0xAA));

    let mut small = vec![0u8; 10];
    let err = pipeline
        .process_into(
            &raw,
            6,
            4,
            ProcessingMode::Grayscale,
            Rotation::Rotation0,
            small.as_mut_slice(),
        )
        .unwrap_err();
    assert_eq!(err.code(), PipelineError::OUTPUT_ALLOCATION_FAILED);
    assert!(small.iter().all(|&v| v == 0));
    Ok(())
}

#[test]
fn test_metadata() -> Result<(), Box<dyn Error>> {
    let raw = uniform_nv21(16, 8, 60);
    let frame = FramePipeline::default().process(
        &raw,
        16,
        8,
        ProcessingMode::Edges,
        Rotation::Rotation90,
    )?;
    let meta = frame.metadata(29.5);
    println!("{meta}");

    assert_eq!(meta["width"], 8);
    assert_eq!(meta["height"], 16);
    assert_eq!(meta["mode"], "edges");
    assert_eq!(meta["fps"].as_f64(), Some(29.5));
    assert!(meta["processingTimeMs"].as_f64().is_some());
    assert!(meta["timestamp"].as_u64().unwrap_or(0) > 0);
    Ok(())
}

#[test]
#[serial]
fn test_timings() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();
    let raw = row_gradient_nv21(640, 480);

    for mode in [
        ProcessingMode::RawColor,
        ProcessingMode::Grayscale,
        ProcessingMode::Edges,
    ] {
        let frame = pipeline.process(&raw, 640, 480, mode, Rotation::Rotation90)?;
        let t = frame.timings();
        println!(
            "{}: total {:?} acquire {:?} convert {:?} process {:?} rotate {:?} output {:?}",
            mode.name(),
            t.total,
            t.acquire,
            t.convert,
            t.process,
            t.rotate,
            t.output
        );
        assert!(t.total >= t.convert);
        assert!(t.total >= t.process);
    }
    Ok(())
}

#[test]
fn test_lifecycle() {
    let lifecycle = ProcessorLifecycle::new();
    assert!(!lifecycle.is_ready());
    assert!(lifecycle.initialize());
    assert!(lifecycle.initialize());
    assert!(lifecycle.is_ready());
    lifecycle.release();
    lifecycle.release();
    assert!(!lifecycle.is_ready());
    assert!(lifecycle.initialize());
}

/// Host buffer that counts lock and unlock calls.
struct HostBuffer {
    data: Vec<u8>,
    locks: AtomicUsize,
    unlocks: AtomicUsize,
    refuse: bool,
}

impl HostBuffer {
    fn new(data: Vec<u8>, refuse: bool) -> Self {
        Self {
            data,
            locks: AtomicUsize::new(0),
            unlocks: AtomicUsize::new(0),
            refuse,
        }
    }

    fn foreign(&mut self) -> ForeignBuffer {
        ForeignBuffer {
            data: null_mut(),
            len: self.data.len(),
            context: self as *mut HostBuffer as *mut c_void,
            lock: Some(host_lock),
            unlock: Some(host_unlock),
        }
    }

    fn counts(&self) -> (usize, usize) {
        (
            self.locks.load(Ordering::SeqCst),
            self.unlocks.load(Ordering::SeqCst),
        )
    }
}

unsafe extern "C" fn host_lock(context: *mut c_void) -> *mut u8 {
    let host = &mut *(context as *mut HostBuffer);
    host.locks.fetch_add(1, Ordering::SeqCst);
    if host.refuse {
        null_mut()
    } else {
        host.data.as_mut_ptr()
    }
}

unsafe extern "C" fn host_unlock(context: *mut c_void, data: *mut u8) {
    let host = &mut *(context as *mut HostBuffer);
    assert_eq!(data, host.data.as_mut_ptr());
    host.unlocks.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn test_foreign_source() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();
    let raw = row_gradient_nv21(8, 8);

    let mut host = HostBuffer::new(raw.clone(), false);
    let source = unsafe { ForeignSource::new(host.foreign()) };
    let frame = pipeline.process(&source, 8, 8, ProcessingMode::Grayscale, Rotation::Rotation0)?;
    assert_eq!(host.counts(), (1, 1));

    let expected = pipeline.process(&raw, 8, 8, ProcessingMode::Grayscale, Rotation::Rotation0)?;
    assert_eq!(frame.data(), expected.data());

    // Size is validated before the host is asked for the buffer.
    let err = pipeline
        .process(&source, 16, 16, ProcessingMode::RawColor, Rotation::Rotation0)
        .unwrap_err();
    assert_eq!(err.code(), PipelineError::INVALID_INPUT_SIZE);
    assert_eq!(host.counts(), (1, 1));
    Ok(())
}

#[test]
fn test_foreign_source_refused() {
    let pipeline = FramePipeline::default();
    let mut host = HostBuffer::new(uniform_nv21(8, 8, 10), true);
    let source = unsafe { ForeignSource::new(host.foreign()) };

    let err = pipeline
        .process(&source, 8, 8, ProcessingMode::RawColor, Rotation::Rotation0)
        .unwrap_err();
    println!("{err}");
    assert_eq!(err.code(), PipelineError::BUFFER_ACQUISITION_FAILED);
    // Nothing was pinned, so nothing is unpinned.
    assert_eq!(host.counts(), (1, 0));
}

#[test]
fn test_foreign_target() -> Result<(), Box<dyn Error>> {
    let pipeline = FramePipeline::default();
    let raw = uniform_nv21(8, 4, 40);

    let mut host = HostBuffer::new(vec![0u8; 32], false);
    let mut target = unsafe { ForeignTarget::new(host.foreign()) };
    let info = pipeline.process_into(
        &raw,
        8,
        4,
        ProcessingMode::Grayscale,
        Rotation::Rotation180,
        &mut target,
    )?;
    assert_eq!(info.len, 32);
    assert_eq!(host.counts(), (1, 1));
    assert!(host.data.iter().all(|&v| v == 40));

    // RGB output does not fit, the host buffer is never locked.
    let mut target = unsafe { ForeignTarget::new(host.foreign()) };
    let err = pipeline
        .process_into(
            &raw,
            8,
            4,
            ProcessingMode::RawColor,
            Rotation::Rotation0,
            &mut target,
        )
        .unwrap_err();
    assert_eq!(err.code(), PipelineError::OUTPUT_ALLOCATION_FAILED);
    assert_eq!(host.counts(), (1, 1));
    Ok(())
}

#[test]
fn test_ffi_round_trip() -> Result<(), Box<dyn Error>> {
    let raw = uniform_nv21(4, 2, 128);
    let processor = edgeviewer_processor_new();
    assert!(!processor.is_null());

    unsafe {
        assert!(edgeviewer_initialize_processor(processor));
        assert!(edgeviewer_initialize_processor(processor));

        let mut frame = EdgeviewerFrame {
            data: null_mut(),
            len: 0,
            width: 0,
            height: 0,
            channels: 0,
        };
        let rc = edgeviewer_process_frame(
            processor,
            raw.as_ptr(),
            raw.len(),
            4,
            2,
            0,
            90,
            &mut frame,
        );
        assert_eq!(rc, 0);
        assert!(!frame.data.is_null());
        assert_eq!((frame.width, frame.height, frame.channels), (2, 4, 3));
        assert_eq!(frame.len, 24);
        edgeviewer_frame_free(&mut frame);
        assert!(frame.data.is_null());
        edgeviewer_frame_free(&mut frame);

        // Undersized input leaves the frame empty.
        let rc = edgeviewer_process_frame(processor, raw.as_ptr(), 5, 4, 2, 1, 0, &mut frame);
        assert_eq!(rc, PipelineError::INVALID_INPUT_SIZE);
        assert!(frame.data.is_null());
        assert_eq!(frame.len, 0);

        let rc = edgeviewer_process_frame(processor, std::ptr::null(), 12, 4, 2, 0, 0, &mut frame);
        assert_eq!(rc, PipelineError::BUFFER_ACQUISITION_FAILED);

        let mut host = HostBuffer::new(uniform_nv21(4, 4, 128), false);
        let buffer = host.foreign();
        let rc = edgeviewer_process_foreign(processor, &buffer, 4, 4, 1, 0, &mut frame);
        assert_eq!(rc, 0);
        assert_eq!(host.counts(), (1, 1));
        assert_eq!(frame.len, 16);
        let edges = std::slice::from_raw_parts(frame.data, frame.len);
        assert!(edges.iter().all(|&v| v == 0));
        edgeviewer_frame_free(&mut frame);

        edgeviewer_release_processor(processor);
        edgeviewer_release_processor(processor);
        edgeviewer_processor_free(processor);
    }
    Ok(())
}

#[test]
fn test_export() -> Result<(), Box<dyn Error>> {
    let raw = row_gradient_nv21(16, 8);
    let pipeline = FramePipeline::default();
    let dir = std::env::temp_dir();

    let gray = pipeline.process(&raw, 16, 8, ProcessingMode::Grayscale, Rotation::Rotation90)?;
    let path = dir.join(format!("edge-viewer-gray-{}.png", std::process::id()));
    edge_viewer::export::save_frame(&path, &gray)?;
    let loaded = image::open(&path)?.into_luma8();
    std::fs::remove_file(&path)?;
    assert_eq!(loaded.dimensions(), (8, 16));
    assert_eq!(loaded.as_raw().as_slice(), gray.data());

    let color = pipeline.process(&raw, 16, 8, ProcessingMode::RawColor, Rotation::Rotation0)?;
    let path = dir.join(format!("edge-viewer-rgb-{}.png", std::process::id()));
    edge_viewer::export::save_frame(&path, &color)?;
    let loaded = image::open(&path)?.into_rgb8();
    std::fs::remove_file(&path)?;
    assert_eq!(loaded.as_raw().as_slice(), color.data());
    Ok(())
}
