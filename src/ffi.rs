// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! C ABI for hosts that drive the pipeline from another runtime.
//!
//! The host owns a [`Processor`] handle for as long as it needs one; there
//! is no global state. Processing calls return `0` on success or a
//! [`PipelineError::code`] on failure, in which case the output frame is
//! left zeroed. No panic crosses this boundary.

use crate::{
    error::PipelineError,
    lifecycle::ProcessorLifecycle,
    pipeline::{FramePipeline, PipelineConfig, ProcessedFrame},
    process::ProcessingMode,
    rotate::Rotation,
    window::{ForeignBuffer, ForeignSource, SourceBuffer},
};
use libc::{c_int, size_t};
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    ptr::{null_mut, slice_from_raw_parts_mut},
    slice::from_raw_parts,
};
use tracing::error;

/// Pipeline plus its lifecycle flag, as seen by the host.
#[derive(Debug, Default)]
pub struct Processor {
    lifecycle: ProcessorLifecycle,
    pipeline: FramePipeline,
}

impl Processor {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            lifecycle: ProcessorLifecycle::new(),
            pipeline: FramePipeline::new(config),
        }
    }

    pub fn lifecycle(&self) -> &ProcessorLifecycle {
        &self.lifecycle
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }
}

/// Output frame handed to the host; release with [`edgeviewer_frame_free`].
#[repr(C)]
#[derive(Debug)]
pub struct EdgeviewerFrame {
    pub data: *mut u8,
    pub len: size_t,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl EdgeviewerFrame {
    fn empty() -> Self {
        Self {
            data: null_mut(),
            len: 0,
            width: 0,
            height: 0,
            channels: 0,
        }
    }
}

impl From<ProcessedFrame> for EdgeviewerFrame {
    fn from(frame: ProcessedFrame) -> Self {
        let width = frame.width();
        let height = frame.height();
        let channels = frame.channels() as u32;
        let data = frame.into_data().into_boxed_slice();
        let len = data.len();
        Self {
            data: Box::into_raw(data) as *mut u8,
            len,
            width,
            height,
            channels,
        }
    }
}

#[no_mangle]
pub extern "C" fn edgeviewer_processor_new() -> *mut Processor {
    Box::into_raw(Box::default())
}

/// # Safety
///
/// `processor` must be null or a handle from [`edgeviewer_processor_new`]
/// that has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn edgeviewer_processor_free(processor: *mut Processor) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// # Safety
///
/// `processor` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn edgeviewer_initialize_processor(processor: *mut Processor) -> bool {
    match processor.as_ref() {
        Some(p) => p.lifecycle.initialize(),
        None => false,
    }
}

/// # Safety
///
/// `processor` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn edgeviewer_release_processor(processor: *mut Processor) {
    if let Some(p) = processor.as_ref() {
        p.lifecycle.release();
    }
}

fn run<S: SourceBuffer + ?Sized>(
    processor: &Processor,
    source: &S,
    width: u32,
    height: u32,
    mode: c_int,
    rotation: c_int,
    out: &mut EdgeviewerFrame,
) -> c_int {
    let mode = ProcessingMode::from(mode);
    let rotation = Rotation::from(rotation);
    let result = catch_unwind(AssertUnwindSafe(|| {
        processor
            .pipeline
            .process(source, width, height, mode, rotation)
    }));
    match result {
        Ok(Ok(frame)) => {
            *out = EdgeviewerFrame::from(frame);
            0
        }
        Ok(Err(e)) => e.code(),
        Err(_) => {
            error!("frame processing panicked");
            PipelineError::PROCESSING_FAILED
        }
    }
}

/// Processes a sensor buffer the host keeps alive for the whole call.
///
/// # Safety
///
/// - `processor` must be null or a live handle
/// - `data` must be null or valid for reads of `len` bytes
/// - `out` must be null or valid for writes
#[no_mangle]
pub unsafe extern "C" fn edgeviewer_process_frame(
    processor: *const Processor,
    data: *const u8,
    len: size_t,
    width: u32,
    height: u32,
    mode: c_int,
    rotation: c_int,
    out: *mut EdgeviewerFrame,
) -> c_int {
    let Some(out) = out.as_mut() else {
        return PipelineError::OUTPUT_ALLOCATION_FAILED;
    };
    *out = EdgeviewerFrame::empty();
    let Some(processor) = processor.as_ref() else {
        return PipelineError::BUFFER_ACQUISITION_FAILED;
    };
    let source: &[u8] = match (data.is_null(), len) {
        (true, 0) => &[],
        (true, _) => return PipelineError::BUFFER_ACQUISITION_FAILED,
        (false, _) => from_raw_parts(data, len),
    };
    run(processor, source, width, height, mode, rotation, out)
}

/// Processes host-owned memory pinned through the buffer's lock/unlock
/// callbacks for the duration of a single copy.
///
/// # Safety
///
/// - `processor` must be null or a live handle
/// - `buffer` must be null or point to a valid [`ForeignBuffer`] whose
///   memory is readable for `len` bytes while locked
/// - `out` must be null or valid for writes
#[no_mangle]
pub unsafe extern "C" fn edgeviewer_process_foreign(
    processor: *const Processor,
    buffer: *const ForeignBuffer,
    width: u32,
    height: u32,
    mode: c_int,
    rotation: c_int,
    out: *mut EdgeviewerFrame,
) -> c_int {
    let Some(out) = out.as_mut() else {
        return PipelineError::OUTPUT_ALLOCATION_FAILED;
    };
    *out = EdgeviewerFrame::empty();
    let (Some(processor), Some(buffer)) = (processor.as_ref(), buffer.as_ref()) else {
        return PipelineError::BUFFER_ACQUISITION_FAILED;
    };
    let source = ForeignSource::new(*buffer);
    run(processor, &source, width, height, mode, rotation, out)
}

/// Releases a frame produced by one of the processing calls. Safe to call
/// on an empty frame and idempotent.
///
/// # Safety
///
/// `frame` must be null or point to a frame filled in by this library.
#[no_mangle]
pub unsafe extern "C" fn edgeviewer_frame_free(frame: *mut EdgeviewerFrame) {
    let Some(frame) = frame.as_mut() else {
        return;
    };
    if !frame.data.is_null() {
        drop(Box::from_raw(slice_from_raw_parts_mut(frame.data, frame.len)));
    }
    *frame = EdgeviewerFrame::empty();
}
