// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use thiserror::Error;

/// Failure reasons reported by the frame pipeline.
///
/// Every failure is surfaced as one of these variants; the pipeline never
/// returns a partially written frame. The numeric [`code`](Self::code) is
/// stable and is what the C ABI hands back to the host.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input buffer is smaller than the layout requires for the declared
    /// dimensions (or the dimensions themselves are unusable).
    #[error("invalid input size: {actual} bytes, {required} required for {width}x{height}")]
    InvalidInputSize {
        actual: usize,
        required: usize,
        width: u32,
        height: u32,
    },

    /// The host could not hand over the raw buffer, or no memory could be
    /// reserved to clone it.
    #[error("buffer acquisition failed: {0}")]
    BufferAcquisitionFailed(String),

    /// Every color decode strategy failed.
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    /// The grayscale or edge kernel rejected its input, a stage panicked or
    /// a stage produced a frame of the wrong geometry.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// No buffer of the required size could be obtained for the result.
    #[error("output allocation failed: {0} bytes")]
    OutputAllocationFailed(usize),
}

impl PipelineError {
    pub const INVALID_INPUT_SIZE: i32 = 1;
    pub const BUFFER_ACQUISITION_FAILED: i32 = 2;
    pub const CONVERSION_FAILED: i32 = 3;
    pub const PROCESSING_FAILED: i32 = 4;
    pub const OUTPUT_ALLOCATION_FAILED: i32 = 5;

    /// Stable reason code, never zero.
    pub fn code(&self) -> i32 {
        match self {
            PipelineError::InvalidInputSize { .. } => Self::INVALID_INPUT_SIZE,
            PipelineError::BufferAcquisitionFailed(_) => Self::BUFFER_ACQUISITION_FAILED,
            PipelineError::ConversionFailed(_) => Self::CONVERSION_FAILED,
            PipelineError::ProcessingFailed(_) => Self::PROCESSING_FAILED,
            PipelineError::OutputAllocationFailed(_) => Self::OUTPUT_ALLOCATION_FAILED,
        }
    }
}
