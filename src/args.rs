// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edge_viewer::{
    image::PixelLayout, process::ProcessingMode, rotate::Mirror, rotate::Rotation,
};
use std::path::PathBuf;

/// Sensor image mirroring options.
///
/// Determines how the raw frame is flipped before processing. Most sensors
/// deliver frames upside down relative to the display, hence the vertical
/// default.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum MirrorSetting {
    /// No mirroring
    None,
    /// Flip horizontally (left-right)
    Horizontal,
    /// Flip vertically (top-bottom)
    Vertical,
    /// Flip both horizontally and vertically (180-degree rotation)
    Both,
}

impl From<MirrorSetting> for Mirror {
    fn from(setting: MirrorSetting) -> Self {
        match setting {
            MirrorSetting::None => Mirror::None,
            MirrorSetting::Horizontal => Mirror::Horizontal,
            MirrorSetting::Vertical => Mirror::Vertical,
            MirrorSetting::Both => Mirror::Both,
        }
    }
}

/// Byte layout of the raw input dump.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum LayoutSetting {
    /// Y plane then interleaved V/U (Android camera default)
    Nv21,
    /// Y plane then interleaved U/V
    Nv12,
    /// Y, V and U planes
    Yv12,
    /// Y, U and V planes
    I420,
    /// Packed 8-bit RGBA
    Rgba,
    /// Single 8-bit luma plane
    Luma,
}

impl From<LayoutSetting> for PixelLayout {
    fn from(setting: LayoutSetting) -> Self {
        match setting {
            LayoutSetting::Nv21 => PixelLayout::Nv21,
            LayoutSetting::Nv12 => PixelLayout::Nv12,
            LayoutSetting::Yv12 => PixelLayout::Yv12,
            LayoutSetting::I420 => PixelLayout::I420,
            LayoutSetting::Rgba => PixelLayout::Rgba8888,
            LayoutSetting::Luma => PixelLayout::Luma8,
        }
    }
}

/// Processing applied to each frame.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum ModeSetting {
    /// Decoded color, unmodified
    Raw,
    /// Canny edge map
    Edges,
    /// Single channel luma
    Grayscale,
}

impl From<ModeSetting> for ProcessingMode {
    fn from(setting: ModeSetting) -> Self {
        match setting {
            ModeSetting::Raw => ProcessingMode::RawColor,
            ModeSetting::Edges => ProcessingMode::Edges,
            ModeSetting::Grayscale => ProcessingMode::Grayscale,
        }
    }
}

/// Command-line arguments for the Edge Viewer frame tool.
///
/// Replays a raw sensor dump through the frame pipeline the way the viewer
/// processes live camera frames. Arguments can be specified via command line
/// or environment variables.
///
/// # Example
///
/// ```bash
/// # Via command line
/// edge-viewer --input frame.nv21 --frame-size "640 480" --mode edges --output edges.png
///
/// # Via environment variables
/// export INPUT=frame.nv21
/// export MODE=grayscale
/// edge-viewer
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Raw sensor frame dump to process
    #[arg(short, long, env = "INPUT")]
    pub input: PathBuf,

    /// Byte layout of the input dump
    #[arg(long, env = "LAYOUT", default_value = "nv21", value_enum)]
    pub layout: LayoutSetting,

    /// Frame resolution in pixels (width height)
    #[arg(
        long,
        env = "FRAME_SIZE",
        default_value = "640 480",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub frame_size: Vec<u32>,

    /// Processing mode
    #[arg(short, long, env = "MODE", default_value = "raw", value_enum)]
    pub mode: ModeSetting,

    /// Clockwise rotation in degrees (0, 90, 180 or 270)
    #[arg(short, long, env = "ROTATION", default_value = "0")]
    pub rotation: i32,

    /// Sensor image mirroring setting
    #[arg(long, env = "MIRROR", default_value = "vertical", value_enum)]
    pub mirror: MirrorSetting,

    /// Write the last processed frame to this image file (png or jpg)
    #[arg(short, long, env = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Write the last frame's JSON metadata to this file
    #[arg(long, env = "METADATA")]
    pub metadata: Option<PathBuf>,

    /// Stream processed frames to web viewers over WebSocket on this port
    /// (8080 when given without a value)
    #[arg(long, env = "SERVE_PORT", num_args = 0..=1, default_missing_value = "8080")]
    pub serve: Option<u16>,

    /// Number of times the dump is fed through the pipeline
    #[arg(short, long, env = "FRAMES", default_value = "30")]
    pub frames: u32,

    /// Enable verbose debug logging
    #[arg(short, long, env = "VERBOSE")]
    pub verbose: bool,

    /// Enable Tracy profiler for performance analysis
    #[arg(long, env = "TRACY")]
    pub tracy: bool,
}

impl Args {
    pub fn width(&self) -> u32 {
        self.frame_size[0]
    }

    pub fn height(&self) -> u32 {
        self.frame_size[1]
    }

    pub fn rotation(&self) -> Rotation {
        Rotation::from(self.rotation)
    }
}
