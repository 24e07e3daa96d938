// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    convert::ColorNeed,
    image::ConvertedImage,
    kernel::{self, Aperture, GradientNorm, KernelError},
};
use tracing::debug;

/// Display transform applied to each frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Decoded color, untouched
    #[default]
    RawColor,
    /// Canny edge map
    Edges,
    /// Single channel luma
    Grayscale,
}

impl From<i32> for ProcessingMode {
    /// Boundary codes: 0 raw, 1 edges, 2 grayscale. Unknown codes fall back
    /// to raw color.
    fn from(code: i32) -> Self {
        match code {
            1 => ProcessingMode::Edges,
            2 => ProcessingMode::Grayscale,
            _ => ProcessingMode::RawColor,
        }
    }
}

impl ProcessingMode {
    pub fn code(&self) -> i32 {
        match self {
            ProcessingMode::RawColor => 0,
            ProcessingMode::Edges => 1,
            ProcessingMode::Grayscale => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProcessingMode::RawColor => "raw",
            ProcessingMode::Edges => "edges",
            ProcessingMode::Grayscale => "grayscale",
        }
    }

    pub fn color_need(&self) -> ColorNeed {
        match self {
            ProcessingMode::RawColor => ColorNeed::Color,
            ProcessingMode::Edges | ProcessingMode::Grayscale => ColorNeed::Luma,
        }
    }

    /// Channels per pixel of the frames this mode produces.
    pub fn channels(&self) -> usize {
        match self.color_need() {
            ColorNeed::Color => 3,
            ColorNeed::Luma => 1,
        }
    }
}

/// Smoothing and Canny parameters for the edge mode.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EdgePreset {
    pub blur_radius: u32,
    pub blur_sigma: f32,
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub aperture: Aperture,
    pub norm: GradientNorm,
}

impl EdgePreset {
    /// Permissive, cheaper preset for live preview.
    pub const PREVIEW: EdgePreset = EdgePreset {
        blur_radius: 2,
        blur_sigma: 1.5,
        low_threshold: 50.0,
        high_threshold: 150.0,
        aperture: Aperture::Three,
        norm: GradientNorm::L1,
    };

    /// Stricter preset with cleaner output.
    pub const STRICT: EdgePreset = EdgePreset {
        blur_radius: 2,
        blur_sigma: 1.5,
        low_threshold: 100.0,
        high_threshold: 200.0,
        aperture: Aperture::Five,
        norm: GradientNorm::L2,
    };
}

impl Default for EdgePreset {
    fn default() -> Self {
        if cfg!(feature = "strict-edges") {
            EdgePreset::STRICT
        } else {
            EdgePreset::PREVIEW
        }
    }
}

/// Applies a [`ProcessingMode`] to converted images.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeProcessor {
    preset: EdgePreset,
}

impl ModeProcessor {
    pub fn new(preset: EdgePreset) -> Self {
        Self { preset }
    }

    pub fn preset(&self) -> &EdgePreset {
        &self.preset
    }

    pub fn process(
        &self,
        img: ConvertedImage,
        mode: ProcessingMode,
    ) -> Result<ConvertedImage, KernelError> {
        match mode {
            ProcessingMode::RawColor => Ok(img),
            ProcessingMode::Grayscale => grayscale(img),
            ProcessingMode::Edges => self.edges(img),
        }
    }

    fn edges(&self, img: ConvertedImage) -> Result<ConvertedImage, KernelError> {
        let gray = match img {
            ConvertedImage::Luma(gray) => gray,
            ConvertedImage::Rgb(rgb) => kernel::luma_from_rgb(&rgb)?,
        };
        let p = &self.preset;
        let blurred = kernel::gaussian_blur(&gray, p.blur_radius, p.blur_sigma)?;
        let edges = kernel::canny(
            &blurred,
            p.low_threshold,
            p.high_threshold,
            p.aperture,
            p.norm,
        )?;
        debug!(
            width = edges.width(),
            height = edges.height(),
            "canny edge detection completed"
        );
        Ok(ConvertedImage::Luma(edges))
    }
}

fn grayscale(img: ConvertedImage) -> Result<ConvertedImage, KernelError> {
    match img {
        ConvertedImage::Rgb(rgb) => Ok(ConvertedImage::Luma(kernel::luma_from_rgb(&rgb)?)),
        luma => Ok(luma),
    }
}
