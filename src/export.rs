// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::pipeline::ProcessedFrame;
use image::ColorType;
use std::{error::Error, io, path::Path};
use tracing::debug;

/// Saves a processed frame as an image file.
///
/// Single channel frames are written as 8-bit grayscale, three channel
/// frames as RGB. The format follows the file extension (`png`, `jpg`).
///
/// # Example
///
/// ```no_run
/// use edge_viewer::{export::save_frame, pipeline::FramePipeline};
/// use edge_viewer::{process::ProcessingMode, rotate::Rotation};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let nv21 = std::fs::read("frame.nv21")?;
/// let pipeline = FramePipeline::default();
/// let frame = pipeline.process(&nv21, 640, 480, ProcessingMode::Edges, Rotation::Rotation0)?;
/// save_frame("edges.png", &frame)?;
/// # Ok(())
/// # }
/// ```
pub fn save_frame<P: AsRef<Path>>(path: P, frame: &ProcessedFrame) -> Result<(), Box<dyn Error>> {
    let color = match frame.channels() {
        1 => ColorType::L8,
        3 => ColorType::Rgb8,
        n => {
            return Err(Box::new(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot export {n} channel frame"),
            )));
        }
    };
    image::save_buffer(
        path.as_ref(),
        frame.data(),
        frame.width(),
        frame.height(),
        color,
    )?;
    debug!(path = %path.as_ref().display(), "frame exported");
    Ok(())
}
