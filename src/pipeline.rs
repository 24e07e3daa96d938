// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    convert::{ColorMatrix, ColorNeed, Converter},
    error::PipelineError,
    image::{validate_size, ConvertedImage, FrameBuffer, PixelLayout},
    process::{EdgePreset, ModeProcessor, ProcessingMode},
    rotate::{Mirror, Rotation},
    window::{SourceBuffer, TargetBuffer},
};
use serde_json::json;
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, instrument, warn};

/// Static configuration of a [`FramePipeline`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Layout every incoming sensor buffer is assumed to have
    pub layout: PixelLayout,
    /// Sensor mirroring to undo before processing
    pub mirror: Mirror,
    /// YUV to RGB matrix for the color path
    pub matrix: ColorMatrix,
    /// Edge mode smoothing and thresholds
    pub edge_preset: EdgePreset,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            layout: PixelLayout::Nv21,
            mirror: Mirror::default(),
            matrix: ColorMatrix::default(),
            edge_preset: EdgePreset::default(),
        }
    }
}

/// Wall-clock time spent in each stage of one call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTimings {
    pub acquire: Duration,
    pub convert: Duration,
    pub process: Duration,
    pub rotate: Duration,
    pub output: Duration,
    pub total: Duration,
}

/// Geometry of a frame written by [`FramePipeline::process_into`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub len: usize,
    pub timings: FrameTimings,
}

/// An owned, fully processed output frame.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: usize,
    mode: ProcessingMode,
    timings: FrameTimings,
    timestamp: SystemTime,
}

impl ProcessedFrame {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn timings(&self) -> &FrameTimings {
        &self.timings
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Frame metadata as consumed by the web viewer.
    pub fn metadata(&self, fps: f32) -> serde_json::Value {
        let timestamp = self
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        json!({
            "width": self.width,
            "height": self.height,
            "fps": fps,
            "processingTimeMs": self.timings.total.as_secs_f64() * 1000.0,
            "timestamp": timestamp,
            "mode": self.mode.name(),
        })
    }
}

/// Sequences conversion, mode processing and rotation for one frame.
///
/// The pipeline is stateless between calls: every buffer it touches is
/// created for the call and dropped before it returns, so a shared
/// `FramePipeline` can be used from several threads at once.
#[derive(Debug, Clone, Default)]
pub struct FramePipeline {
    config: PipelineConfig,
    converter: Converter,
    processor: ModeProcessor,
}

impl FramePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            converter: Converter::new(config.matrix, config.mirror),
            processor: ModeProcessor::new(config.edge_preset),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes one raw sensor buffer into an owned frame.
    ///
    /// The result buffer is exactly `channels(mode) * width' * height'`
    /// bytes, with the dimensions swapped for 90/270 degree rotations.
    #[instrument(skip(self, raw))]
    pub fn process<S: SourceBuffer + ?Sized>(
        &self,
        raw: &S,
        width: u32,
        height: u32,
        mode: ProcessingMode,
        rotation: Rotation,
    ) -> Result<ProcessedFrame, PipelineError> {
        let start = Instant::now();
        let result = self
            .transform(raw, width, height, mode, rotation, start)
            .and_then(|(img, mut timings)| {
                let stage = Instant::now();
                let out_width = img.width();
                let out_height = img.height();
                let channels = img.channels();
                let expected = img.byte_len();
                let data = img.into_bytes();
                check_serialized(data.len(), expected)?;
                timings.output = stage.elapsed();
                timings.total = start.elapsed();
                Ok(ProcessedFrame {
                    data,
                    width: out_width,
                    height: out_height,
                    channels,
                    mode,
                    timings,
                    timestamp: SystemTime::now(),
                })
            });
        report(&result.as_ref().map(|f| f.timings), start);
        result
    }

    /// Processes one raw sensor buffer and writes the result straight into
    /// `target` through a bounded-access window.
    #[instrument(skip(self, raw, target))]
    pub fn process_into<S, T>(
        &self,
        raw: &S,
        width: u32,
        height: u32,
        mode: ProcessingMode,
        rotation: Rotation,
        target: &mut T,
    ) -> Result<FrameInfo, PipelineError>
    where
        S: SourceBuffer + ?Sized,
        T: TargetBuffer + ?Sized,
    {
        let start = Instant::now();
        let result = self
            .transform(raw, width, height, mode, rotation, start)
            .and_then(|(img, mut timings)| {
                let stage = Instant::now();
                let len = img.byte_len();
                target.acquire_mut(len)?.copy_from_slice(img.as_bytes());
                timings.output = stage.elapsed();
                timings.total = start.elapsed();
                Ok(FrameInfo {
                    width: img.width(),
                    height: img.height(),
                    channels: img.channels(),
                    len,
                    timings,
                })
            });
        report(&result.as_ref().map(|f| f.timings), start);
        result
    }

    /// Validation, input window, conversion, processing and rotation.
    fn transform<S: SourceBuffer + ?Sized>(
        &self,
        raw: &S,
        width: u32,
        height: u32,
        mode: ProcessingMode,
        rotation: Rotation,
        start: Instant,
    ) -> Result<(ConvertedImage, FrameTimings), PipelineError> {
        let mut timings = FrameTimings::default();
        let layout = self.config.layout;
        let required = validate_size(raw.byte_len(), width, height, layout)?;

        // Luma-only modes need just the leading plane of a YUV buffer.
        let need = mode.color_need();
        let (copy_len, copy_layout) = match need {
            ColorNeed::Luma if layout.is_yuv420() => {
                (width as usize * height as usize, PixelLayout::Luma8)
            }
            _ => (required, layout),
        };

        let mut owned = Vec::new();
        owned.try_reserve_exact(copy_len).map_err(|_| {
            PipelineError::BufferAcquisitionFailed(format!("cannot clone {copy_len} bytes"))
        })?;
        owned.resize(copy_len, 0);
        raw.acquire()?.copy_into(&mut owned)?;
        timings.acquire = start.elapsed();

        let frame = FrameBuffer::new(&owned, width, height, copy_layout)?;

        let stages = catch_unwind(AssertUnwindSafe(|| -> Result<_, PipelineError> {
            let stage = Instant::now();
            let img = self
                .converter
                .convert(&frame, need)
                .map_err(|e| PipelineError::ConversionFailed(e.to_string()))?;
            timings.convert = stage.elapsed();

            let stage = Instant::now();
            let img = self
                .processor
                .process(img, mode)
                .map_err(|e| PipelineError::ProcessingFailed(e.to_string()))?;
            timings.process = stage.elapsed();

            let stage = Instant::now();
            let img = rotation.apply(img);
            timings.rotate = stage.elapsed();
            Ok(img)
        }));

        let img = match stages {
            Ok(result) => result?,
            Err(_) => {
                return Err(PipelineError::ProcessingFailed(
                    "processing stage panicked".to_string(),
                ))
            }
        };

        if img.channels() != mode.channels() {
            return Err(PipelineError::ProcessingFailed(format!(
                "{} produced {} channels, expected {}",
                mode.name(),
                img.channels(),
                mode.channels()
            )));
        }
        Ok((img, timings))
    }
}

/// A serialized frame is exactly `channels * width * height` bytes.
fn check_serialized(len: usize, expected: usize) -> Result<(), PipelineError> {
    if len != expected {
        return Err(PipelineError::ProcessingFailed(format!(
            "serialized {len} bytes, expected {expected}"
        )));
    }
    Ok(())
}

fn report(result: &Result<FrameTimings, &PipelineError>, start: Instant) {
    match result {
        Ok(t) => debug!(
            total = ?t.total,
            acquire = ?t.acquire,
            convert = ?t.convert,
            process = ?t.process,
            rotate = ?t.rotate,
            output = ?t.output,
            "frame processed"
        ),
        Err(e) => warn!(error = %e, elapsed = ?start.elapsed(), "frame dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_length_mismatch() {
        assert!(check_serialized(12, 12).is_ok());
        let err = check_serialized(11, 12).unwrap_err();
        assert_eq!(err.code(), PipelineError::PROCESSING_FAILED);
        assert!(err.to_string().contains("11 bytes, expected 12"));
    }
}
