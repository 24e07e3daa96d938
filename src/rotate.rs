// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::image::ConvertedImage;
use image::imageops;

/// Clockwise rotation applied after mode processing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    /// No rotation (0 degrees)
    #[default]
    Rotation0,
    /// Rotate 90 degrees clockwise
    Rotation90,
    /// Rotate 180 degrees
    Rotation180,
    /// Rotate 270 degrees clockwise (90 degrees counter-clockwise)
    Rotation270,
}

impl From<i32> for Rotation {
    /// Anything other than 0, 90, 180 or 270 degrees means no rotation.
    fn from(degrees: i32) -> Self {
        match degrees {
            90 => Rotation::Rotation90,
            180 => Rotation::Rotation180,
            270 => Rotation::Rotation270,
            _ => Rotation::Rotation0,
        }
    }
}

impl Rotation {
    pub fn degrees(&self) -> i32 {
        match self {
            Rotation::Rotation0 => 0,
            Rotation::Rotation90 => 90,
            Rotation::Rotation180 => 180,
            Rotation::Rotation270 => 270,
        }
    }

    /// True when the rotation exchanges width and height.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Rotation90 | Rotation::Rotation270)
    }

    /// Output dimensions for an input of `width` x `height`.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Rotates the image. `Rotation0` hands the input back untouched.
    pub fn apply(&self, img: ConvertedImage) -> ConvertedImage {
        match (self, img) {
            (Rotation::Rotation0, img) => img,
            (Rotation::Rotation90, ConvertedImage::Rgb(i)) => {
                ConvertedImage::Rgb(imageops::rotate90(&i))
            }
            (Rotation::Rotation90, ConvertedImage::Luma(i)) => {
                ConvertedImage::Luma(imageops::rotate90(&i))
            }
            (Rotation::Rotation180, ConvertedImage::Rgb(mut i)) => {
                imageops::rotate180_in_place(&mut i);
                ConvertedImage::Rgb(i)
            }
            (Rotation::Rotation180, ConvertedImage::Luma(mut i)) => {
                imageops::rotate180_in_place(&mut i);
                ConvertedImage::Luma(i)
            }
            (Rotation::Rotation270, ConvertedImage::Rgb(i)) => {
                ConvertedImage::Rgb(imageops::rotate270(&i))
            }
            (Rotation::Rotation270, ConvertedImage::Luma(i)) => {
                ConvertedImage::Luma(imageops::rotate270(&i))
            }
        }
    }
}

/// Sensor mirroring corrected by the converter.
///
/// Camera sensors deliver frames upside down relative to the display, so
/// the default is a vertical flip.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Mirror {
    /// No mirroring
    None,
    /// Flip horizontally (left-right)
    Horizontal,
    /// Flip vertically (top-bottom)
    #[default]
    Vertical,
    /// Flip both horizontally and vertically (180-degree rotation)
    Both,
}

impl Mirror {
    pub fn apply(&self, img: ConvertedImage) -> ConvertedImage {
        match img {
            ConvertedImage::Rgb(mut i) => {
                self.flip(&mut i);
                ConvertedImage::Rgb(i)
            }
            ConvertedImage::Luma(mut i) => {
                self.flip(&mut i);
                ConvertedImage::Luma(i)
            }
        }
    }

    fn flip<I: image::GenericImage>(&self, img: &mut I) {
        match self {
            Mirror::None => {}
            Mirror::Horizontal => imageops::flip_horizontal_in_place(img),
            Mirror::Vertical => imageops::flip_vertical_in_place(img),
            Mirror::Both => imageops::rotate180_in_place(img),
        }
    }
}
