// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::error::PipelineError;
use core::fmt;
use image::{GrayImage, RgbImage};

/// Pixel layouts a sensor buffer can be interpreted as.
///
/// The YUV 4:2:0 layouts all store the full resolution luma plane first,
/// followed by chroma subsampled 2x2. They differ only in how the chroma
/// samples are arranged.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// Y plane followed by interleaved V/U pairs (Android camera default)
    Nv21,
    /// Y plane followed by interleaved U/V pairs
    Nv12,
    /// Y plane, then V plane, then U plane
    Yv12,
    /// Y plane, then U plane, then V plane
    I420,
    /// Packed 8-bit RGBA
    Rgba8888,
    /// Single 8-bit luma plane
    Luma8,
}

impl PixelLayout {
    pub const fn fourcc(&self) -> [u8; 4] {
        match self {
            PixelLayout::Nv21 => *b"NV21",
            PixelLayout::Nv12 => *b"NV12",
            PixelLayout::Yv12 => *b"YV12",
            PixelLayout::I420 => *b"I420",
            PixelLayout::Rgba8888 => *b"RGBA",
            PixelLayout::Luma8 => *b"GREY",
        }
    }

    /// True for the chroma subsampled YUV 4:2:0 family.
    pub const fn is_yuv420(&self) -> bool {
        matches!(
            self,
            PixelLayout::Nv21 | PixelLayout::Nv12 | PixelLayout::Yv12 | PixelLayout::I420
        )
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fourcc = self.fourcc();
        write!(f, "{}", String::from_utf8_lossy(&fourcc))
    }
}

/// Width of the subsampled chroma planes for a 4:2:0 image.
pub const fn chroma_width(width: u32) -> usize {
    (width as usize).div_ceil(2)
}

/// Height of the subsampled chroma planes for a 4:2:0 image.
pub const fn chroma_height(height: u32) -> usize {
    (height as usize).div_ceil(2)
}

/// Minimum number of bytes a buffer of the given layout and dimensions must
/// hold, or `None` if the size does not fit in `usize`.
///
/// For even dimensions the 4:2:0 size is exactly `width * height * 3 / 2`;
/// odd dimensions round the chroma planes up.
pub fn required_size(layout: PixelLayout, width: u32, height: u32) -> Option<usize> {
    let luma = (width as usize).checked_mul(height as usize)?;
    match layout {
        PixelLayout::Nv21 | PixelLayout::Nv12 | PixelLayout::Yv12 | PixelLayout::I420 => {
            let chroma = chroma_width(width).checked_mul(chroma_height(height))?;
            luma.checked_add(chroma.checked_mul(2)?)
        }
        PixelLayout::Rgba8888 => luma.checked_mul(4),
        PixelLayout::Luma8 => Some(luma),
    }
}

/// Immutable view of a sensor buffer with its declared geometry.
///
/// Construction validates that the buffer holds at least
/// [`required_size`] bytes; trailing bytes are accepted and ignored. A
/// `FrameBuffer` that exists is therefore always safe to decode in full.
#[derive(Debug, Clone, Copy)]
pub struct FrameBuffer<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
}

impl<'a> FrameBuffer<'a> {
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Self, PipelineError> {
        let required = validate_size(data.len(), width, height, layout)?;
        Ok(Self {
            data: &data[..required],
            width,
            height,
            layout,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// The validated bytes, trimmed to the required size.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Leading luma plane of a YUV layout (or the whole buffer for `Luma8`).
    pub fn luma_plane(&self) -> &'a [u8] {
        &self.data[..self.pixels()]
    }

    /// Everything after the luma plane: the chroma data of a YUV layout.
    pub fn chroma_data(&self) -> &'a [u8] {
        &self.data[self.pixels()..]
    }

    /// Reinterprets the same bytes as another layout of equal size.
    pub fn with_layout(&self, layout: PixelLayout) -> Result<Self, PipelineError> {
        FrameBuffer::new(self.data, self.width, self.height, layout)
    }
}

impl fmt::Display for FrameBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{} {} len:{}",
            self.width,
            self.height,
            self.layout,
            self.data.len()
        )
    }
}

/// Checks a byte length against the layout requirement and returns the
/// required size.
pub fn validate_size(
    len: usize,
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<usize, PipelineError> {
    let required = required_size(layout, width, height).unwrap_or(usize::MAX);
    if width == 0 || height == 0 || len < required {
        return Err(PipelineError::InvalidInputSize {
            actual: len,
            required,
            width,
            height,
        });
    }
    Ok(required)
}

/// Owned pixels flowing between the pipeline stages.
///
/// Row-major, tightly packed, either 3-channel RGB or 1-channel luma. Each
/// stage takes the image by value and hands back the one the next stage
/// owns.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertedImage {
    Rgb(RgbImage),
    Luma(GrayImage),
}

impl ConvertedImage {
    pub fn width(&self) -> u32 {
        match self {
            ConvertedImage::Rgb(img) => img.width(),
            ConvertedImage::Luma(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            ConvertedImage::Rgb(img) => img.height(),
            ConvertedImage::Luma(img) => img.height(),
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            ConvertedImage::Rgb(_) => 3,
            ConvertedImage::Luma(_) => 1,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ConvertedImage::Rgb(img) => img.as_raw(),
            ConvertedImage::Luma(img) => img.as_raw(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ConvertedImage::Rgb(img) => img.into_raw(),
            ConvertedImage::Luma(img) => img.into_raw(),
        }
    }

    /// Exact serialized size: `channels * width * height`.
    pub fn byte_len(&self) -> usize {
        self.channels() * self.width() as usize * self.height() as usize
    }
}

impl fmt::Display for ConvertedImage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self {
            ConvertedImage::Rgb(_) => "RGB3",
            ConvertedImage::Luma(_) => "GREY",
        };
        write!(f, "{}x{} {}", self.width(), self.height(), kind)
    }
}
