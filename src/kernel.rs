// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Numeric image kernels used by the mode processor.
//!
//! All kernels work on 8-bit luma and sample outside the image with
//! reflect-101 borders (`gfedcb|abcdefgh|gfedcba`).

use image::{GrayImage, RgbImage};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum KernelError {
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid gaussian kernel: radius {radius} sigma {sigma}")]
    InvalidKernel { radius: u32, sigma: f32 },

    #[error("invalid thresholds: low {low} high {high}")]
    InvalidThresholds { low: f32, high: f32 },

    #[error("{len} bytes do not form a {width}x{height} image")]
    BufferMismatch { width: u32, height: u32, len: usize },
}

/// Sobel operator size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Aperture {
    Three,
    Five,
}

impl Aperture {
    fn derivative(&self) -> &'static [i32] {
        match self {
            Aperture::Three => &[-1, 0, 1],
            Aperture::Five => &[-1, -2, 0, 2, 1],
        }
    }

    fn smoothing(&self) -> &'static [i32] {
        match self {
            Aperture::Three => &[1, 2, 1],
            Aperture::Five => &[1, 4, 6, 4, 1],
        }
    }
}

/// How the gradient magnitude is computed from its components.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GradientNorm {
    /// `|gx| + |gy|`
    L1,
    /// `sqrt(gx² + gy²)`
    L2,
}

/// BT.601 luma weights in 8-bit fixed point (0.299, 0.587, 0.114).
#[inline]
pub fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}

pub fn luma_from_rgb(img: &RgbImage) -> Result<GrayImage, KernelError> {
    let luma = img
        .as_raw()
        .chunks_exact(3)
        .map(|px| rgb_to_luma(px[0], px[1], px[2]))
        .collect();
    gray_from_raw(img.width(), img.height(), luma)
}

fn gray_from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<GrayImage, KernelError> {
    let len = data.len();
    GrayImage::from_raw(width, height, data).ok_or(KernelError::BufferMismatch {
        width,
        height,
        len,
    })
}

#[inline]
fn reflect_101(i: isize, n: isize) -> usize {
    if n == 1 {
        return 0;
    }
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * (n - 1) - i;
        } else {
            return i as usize;
        }
    }
}

fn check_size(img: &GrayImage) -> Result<(usize, usize), KernelError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(KernelError::EmptyImage { width, height });
    }
    Ok((width as usize, height as usize))
}

/// Gaussian weights scaled to sum to exactly 256.
fn gaussian_weights(radius: u32, sigma: f32) -> Result<Vec<u32>, KernelError> {
    if radius == 0 || !sigma.is_finite() || sigma <= 0.0 {
        return Err(KernelError::InvalidKernel { radius, sigma });
    }
    let r = radius as i32;
    let raw: Vec<f32> = (-r..=r)
        .map(|x| (-((x * x) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = raw.iter().sum();
    let mut weights: Vec<u32> = raw
        .iter()
        .map(|v| (v / sum * 256.0).round() as u32)
        .collect();
    let center = radius as usize;
    let others: u32 = weights
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != center)
        .map(|(_, w)| *w)
        .sum();
    weights[center] = 256u32.saturating_sub(others);
    Ok(weights)
}

/// Separable Gaussian smoothing with a `(2 * radius + 1)` tap kernel.
///
/// Uniform images come back unchanged.
pub fn gaussian_blur(img: &GrayImage, radius: u32, sigma: f32) -> Result<GrayImage, KernelError> {
    let (width, height) = check_size(img)?;
    let weights = gaussian_weights(radius, sigma)?;
    let r = radius as isize;
    let src = img.as_raw();

    let mut horizontal = vec![0u32; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            horizontal[y * width + x] = weights
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sx = reflect_101(x as isize + k as isize - r, width as isize);
                    w * row[sx] as u32
                })
                .sum();
        }
    }

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let acc: u32 = weights
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sy = reflect_101(y as isize + k as isize - r, height as isize);
                    w * horizontal[sy * width + x]
                })
                .sum();
            out[y * width + x] = ((acc + (1 << 15)) >> 16).min(255) as u8;
        }
    }

    gray_from_raw(width as u32, height as u32, out)
}

/// Horizontal and vertical derivatives of an image.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub width: usize,
    pub height: usize,
    pub gx: Vec<i32>,
    pub gy: Vec<i32>,
}

fn convolve_separable(
    src: &[i32],
    width: usize,
    height: usize,
    along_x: &[i32],
    along_y: &[i32],
) -> Vec<i32> {
    let rx = (along_x.len() / 2) as isize;
    let ry = (along_y.len() / 2) as isize;

    let mut tmp = vec![0i32; width * height];
    for y in 0..height {
        for x in 0..width {
            tmp[y * width + x] = along_x
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sx = reflect_101(x as isize + k as isize - rx, width as isize);
                    w * src[y * width + sx]
                })
                .sum();
        }
    }

    let mut out = vec![0i32; width * height];
    for y in 0..height {
        for x in 0..width {
            out[y * width + x] = along_y
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sy = reflect_101(y as isize + k as isize - ry, height as isize);
                    w * tmp[sy * width + x]
                })
                .sum();
        }
    }
    out
}

/// Sobel derivatives with the given aperture.
pub fn sobel(img: &GrayImage, aperture: Aperture) -> Result<Gradients, KernelError> {
    let (width, height) = check_size(img)?;
    let src: Vec<i32> = img.as_raw().iter().map(|v| *v as i32).collect();
    let gx = convolve_separable(
        &src,
        width,
        height,
        aperture.derivative(),
        aperture.smoothing(),
    );
    let gy = convolve_separable(
        &src,
        width,
        height,
        aperture.smoothing(),
        aperture.derivative(),
    );
    Ok(Gradients {
        width,
        height,
        gx,
        gy,
    })
}

impl Gradients {
    pub fn magnitude(&self, norm: GradientNorm) -> Vec<f32> {
        self.gx
            .iter()
            .zip(&self.gy)
            .map(|(&gx, &gy)| match norm {
                GradientNorm::L1 => (gx.abs() + gy.abs()) as f32,
                GradientNorm::L2 => ((gx as f32).powi(2) + (gy as f32).powi(2)).sqrt(),
            })
            .collect()
    }
}

// tan(22.5°) in Q15
const TG22: i64 = 13573;

/// Non-maximum suppression: true where the magnitude is a local peak along
/// the gradient direction and above `low`.
fn suppress_non_maxima(grad: &Gradients, mag: &[f32], low: f32) -> Vec<bool> {
    let (width, height) = (grad.width as isize, grad.height as isize);
    let at = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 || x >= width || y >= height {
            0.0
        } else {
            mag[(y * width + x) as usize]
        }
    };

    let mut keep = vec![false; mag.len()];
    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) as usize;
            let m = mag[i];
            if m <= low {
                continue;
            }
            let (gx, gy) = (grad.gx[i] as i64, grad.gy[i] as i64);
            let ax = gx.abs();
            let ay = gy.abs() << 15;
            let tg22x = ax * TG22;

            keep[i] = if ay < tg22x {
                m > at(x - 1, y) && m >= at(x + 1, y)
            } else if ay > tg22x + (ax << 16) {
                m > at(x, y - 1) && m >= at(x, y + 1)
            } else {
                // Gradient along (1, -1) when the signs differ, (1, 1) otherwise
                let s = if (gx ^ gy) < 0 { -1 } else { 1 };
                m > at(x - s, y - 1) && m > at(x + s, y + 1)
            };
        }
    }
    keep
}

/// Canny edge detector on an already smoothed image.
///
/// Produces 255 on edge pixels and 0 elsewhere. Pixels above `high` seed
/// edges, which then grow through 8-connected neighbours above `low`.
/// Swapped thresholds are reordered rather than rejected.
pub fn canny(
    img: &GrayImage,
    low: f32,
    high: f32,
    aperture: Aperture,
    norm: GradientNorm,
) -> Result<GrayImage, KernelError> {
    if !low.is_finite() || !high.is_finite() || low < 0.0 || high < 0.0 {
        return Err(KernelError::InvalidThresholds { low, high });
    }
    let (low, high) = if low > high { (high, low) } else { (low, high) };

    let grad = sobel(img, aperture)?;
    let mag = grad.magnitude(norm);
    let candidate = suppress_non_maxima(&grad, &mag, low);

    let (width, height) = (grad.width, grad.height);
    let mut edges = vec![0u8; width * height];
    let mut stack: Vec<usize> = Vec::new();

    for (i, &m) in mag.iter().enumerate() {
        if candidate[i] && m > high && edges[i] == 0 {
            edges[i] = 255;
            stack.push(i);
        }
    }

    while let Some(i) = stack.pop() {
        let (x, y) = ((i % width) as isize, (i / width) as isize);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let n = ny as usize * width + nx as usize;
                if candidate[n] && edges[n] == 0 {
                    edges[n] = 255;
                    stack.push(n);
                }
            }
        }
    }

    gray_from_raw(width as u32, height as u32, edges)
}
