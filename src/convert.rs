// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Sensor buffer to RGB / luma conversion.
//!
//! Color decoding walks an ordered list of [`DecodeStrategy`] values: the
//! SIMD decoder for the declared layout, then the same bytes read as the
//! other planar chroma orders, and finally a fixed-point per-pixel decode
//! that cannot fail on a validated [`FrameBuffer`].

use crate::{
    image::{chroma_height, chroma_width, ConvertedImage, FrameBuffer, PixelLayout},
    kernel::rgb_to_luma,
    rotate::Mirror,
};
use image::{GrayImage, RgbImage};
use thiserror::Error;
use tracing::{debug, warn};
use yuvutils_rs::{
    yuv420_to_rgb, yuv_nv12_to_rgb, yuv_nv21_to_rgb, YuvBiPlanarImage, YuvConversionMode,
    YuvPlanarImage, YuvRange, YuvStandardMatrix,
};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("no SIMD decoder for {0}")]
    Unsupported(PixelLayout),

    #[error("{layout} decode failed: {reason}")]
    Library { layout: PixelLayout, reason: String },

    #[error("decoded buffer does not fit {width}x{height}")]
    Geometry { width: u32, height: u32 },

    #[error("all {0} decode strategies failed")]
    Exhausted(usize),
}

/// Fixed-point YUV to RGB coefficients, scaled by 1024.
///
/// Both variants are BT.601; they differ in whether luma uses the video
/// (16-235) or the full (0-255) range. Which one is the default is a build
/// policy, see the `full-range` feature.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColorMatrix {
    Bt601Limited,
    Bt601Full,
}

impl Default for ColorMatrix {
    fn default() -> Self {
        if cfg!(feature = "full-range") {
            ColorMatrix::Bt601Full
        } else {
            ColorMatrix::Bt601Limited
        }
    }
}

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

impl ColorMatrix {
    /// Decodes one sample, each channel clamped to `[0, 255]`.
    #[inline]
    pub fn decode(&self, y: u8, u: u8, v: u8) -> [u8; 3] {
        let u = u as i32 - 128;
        let v = v as i32 - 128;
        match self {
            ColorMatrix::Bt601Limited => {
                let y = (y as i32 - 16).max(0) * 1192;
                [
                    clamp_u8((y + 1634 * v) >> 10),
                    clamp_u8((y - 833 * v - 400 * u) >> 10),
                    clamp_u8((y + 2066 * u) >> 10),
                ]
            }
            ColorMatrix::Bt601Full => {
                let y = (y as i32) << 10;
                [
                    clamp_u8((y + 1436 * v) >> 10),
                    clamp_u8((y - 352 * u - 731 * v) >> 10),
                    clamp_u8((y + 1815 * u) >> 10),
                ]
            }
        }
    }

    fn range(&self) -> YuvRange {
        match self {
            ColorMatrix::Bt601Limited => YuvRange::Limited,
            ColorMatrix::Bt601Full => YuvRange::Full,
        }
    }
}

/// Which representation the selected mode needs from the converter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColorNeed {
    Color,
    Luma,
}

/// One way of turning a buffer into RGB.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// yuvutils decoder reading the bytes as the given layout
    Library(PixelLayout),
    /// Per-pixel integer decode, never fails
    FixedPoint(PixelLayout),
}

/// Planar chroma orders tried after the declared layout: V before U, then U
/// before V.
const PLANAR_FALLBACKS: [PixelLayout; 2] = [PixelLayout::Yv12, PixelLayout::I420];

/// The ordered strategies tried for a layout. The last entry is always the
/// fixed-point decode of the declared layout.
pub fn decode_chain(layout: PixelLayout) -> Vec<DecodeStrategy> {
    let mut chain = Vec::with_capacity(4);
    if layout.is_yuv420() {
        chain.push(DecodeStrategy::Library(layout));
        chain.extend(
            PLANAR_FALLBACKS
                .iter()
                .filter(|alt| **alt != layout)
                .map(|alt| DecodeStrategy::Library(*alt)),
        );
    }
    chain.push(DecodeStrategy::FixedPoint(layout));
    chain
}

impl DecodeStrategy {
    pub fn decode(&self, frame: &FrameBuffer, matrix: ColorMatrix) -> Result<RgbImage, ConvertError> {
        match self {
            DecodeStrategy::Library(layout) => decode_library(frame, *layout, matrix),
            DecodeStrategy::FixedPoint(layout) => {
                let frame = frame
                    .with_layout(*layout)
                    .map_err(|_| ConvertError::Geometry {
                        width: frame.width(),
                        height: frame.height(),
                    })?;
                Ok(decode_fixed_point(&frame, matrix))
            }
        }
    }
}

fn decode_library(
    frame: &FrameBuffer,
    layout: PixelLayout,
    matrix: ColorMatrix,
) -> Result<RgbImage, ConvertError> {
    let (width, height) = (frame.width(), frame.height());
    let cw = chroma_width(width);
    let plane = cw * chroma_height(height);
    let y_plane = frame.luma_plane();
    let chroma = frame.chroma_data();
    if chroma.len() < plane * 2 {
        return Err(ConvertError::Geometry { width, height });
    }

    let rgb_stride = width * 3;
    let mut rgb = vec![0u8; rgb_stride as usize * height as usize];

    let result = match layout {
        PixelLayout::Nv21 | PixelLayout::Nv12 => {
            let image = YuvBiPlanarImage {
                y_plane,
                y_stride: width,
                uv_plane: &chroma[..plane * 2],
                uv_stride: (cw * 2) as u32,
                width,
                height,
            };
            if layout == PixelLayout::Nv21 {
                yuv_nv21_to_rgb(
                    &image,
                    &mut rgb,
                    rgb_stride,
                    matrix.range(),
                    YuvStandardMatrix::Bt601,
                    YuvConversionMode::Balanced,
                )
            } else {
                yuv_nv12_to_rgb(
                    &image,
                    &mut rgb,
                    rgb_stride,
                    matrix.range(),
                    YuvStandardMatrix::Bt601,
                    YuvConversionMode::Balanced,
                )
            }
        }
        PixelLayout::Yv12 | PixelLayout::I420 => {
            let (first, second) = chroma[..plane * 2].split_at(plane);
            let (u_plane, v_plane) = if layout == PixelLayout::I420 {
                (first, second)
            } else {
                (second, first)
            };
            let image = YuvPlanarImage {
                y_plane,
                y_stride: width,
                u_plane,
                u_stride: cw as u32,
                v_plane,
                v_stride: cw as u32,
                width,
                height,
            };
            yuv420_to_rgb(
                &image,
                &mut rgb,
                rgb_stride,
                matrix.range(),
                YuvStandardMatrix::Bt601,
            )
        }
        other => return Err(ConvertError::Unsupported(other)),
    };

    result.map_err(|e| ConvertError::Library {
        layout,
        reason: format!("{e:?}"),
    })?;
    RgbImage::from_raw(width, height, rgb).ok_or(ConvertError::Geometry { width, height })
}

/// (U, V) for chroma sample `index` of a 4:2:0 layout.
#[inline]
fn chroma_at(layout: PixelLayout, chroma: &[u8], index: usize, plane: usize) -> (u8, u8) {
    match layout {
        PixelLayout::Nv21 => (chroma[2 * index + 1], chroma[2 * index]),
        PixelLayout::Nv12 => (chroma[2 * index], chroma[2 * index + 1]),
        PixelLayout::Yv12 => (chroma[plane + index], chroma[index]),
        _ => (chroma[index], chroma[plane + index]),
    }
}

/// Decodes any layout to RGB with integer arithmetic.
pub fn decode_fixed_point(frame: &FrameBuffer, matrix: ColorMatrix) -> RgbImage {
    let (width, height) = (frame.width(), frame.height());
    let data = frame.data();

    match frame.layout() {
        PixelLayout::Rgba8888 => RgbImage::from_fn(width, height, |x, y| {
            let i = (y as usize * width as usize + x as usize) * 4;
            image::Rgb([data[i], data[i + 1], data[i + 2]])
        }),
        PixelLayout::Luma8 => RgbImage::from_fn(width, height, |x, y| {
            let l = data[y as usize * width as usize + x as usize];
            image::Rgb([l, l, l])
        }),
        layout => {
            let luma = frame.luma_plane();
            let chroma = frame.chroma_data();
            let cw = chroma_width(width);
            let plane = cw * chroma_height(height);
            RgbImage::from_fn(width, height, |x, y| {
                let l = luma[y as usize * width as usize + x as usize];
                let index = (y as usize / 2) * cw + x as usize / 2;
                let (u, v) = chroma_at(layout, chroma, index, plane);
                image::Rgb(matrix.decode(l, u, v))
            })
        }
    }
}

/// Extracts 8-bit luma without touching chroma.
pub fn extract_luma(frame: &FrameBuffer) -> Result<GrayImage, ConvertError> {
    let (width, height) = (frame.width(), frame.height());
    match frame.layout() {
        PixelLayout::Rgba8888 => {
            let data = frame.data();
            Ok(GrayImage::from_fn(width, height, |x, y| {
                let i = (y as usize * width as usize + x as usize) * 4;
                image::Luma([rgb_to_luma(data[i], data[i + 1], data[i + 2])])
            }))
        }
        _ => GrayImage::from_raw(width, height, frame.luma_plane().to_vec())
            .ok_or(ConvertError::Geometry { width, height }),
    }
}

/// Pixel format converter.
///
/// Produces display-oriented images: the configured [`Mirror`] is applied to
/// every decoded buffer before it leaves the converter.
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    matrix: ColorMatrix,
    mirror: Mirror,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ColorMatrix::default(), Mirror::default())
    }
}

impl Converter {
    pub fn new(matrix: ColorMatrix, mirror: Mirror) -> Self {
        Self { matrix, mirror }
    }

    pub fn matrix(&self) -> ColorMatrix {
        self.matrix
    }

    pub fn mirror(&self) -> Mirror {
        self.mirror
    }

    pub fn convert(
        &self,
        frame: &FrameBuffer,
        need: ColorNeed,
    ) -> Result<ConvertedImage, ConvertError> {
        let img = match need {
            ColorNeed::Color => ConvertedImage::Rgb(self.decode_color(frame)?),
            ColorNeed::Luma => ConvertedImage::Luma(extract_luma(frame)?),
        };
        Ok(self.mirror.apply(img))
    }

    fn decode_color(&self, frame: &FrameBuffer) -> Result<RgbImage, ConvertError> {
        let chain = decode_chain(frame.layout());
        for (attempt, strategy) in chain.iter().enumerate() {
            match strategy.decode(frame, self.matrix) {
                Ok(rgb) => {
                    if attempt > 0 {
                        warn!(?strategy, declared = %frame.layout(), "decoded with fallback strategy");
                    }
                    return Ok(rgb);
                }
                Err(e) => debug!(?strategy, error = %e, "decode strategy failed"),
            }
        }
        Err(ConvertError::Exhausted(chain.len()))
    }
}
