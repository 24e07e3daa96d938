// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # Edge Viewer Frame Pipeline
//!
//! This library turns raw camera sensor buffers into display-ready frames.
//! Each call validates the buffer, copies it out of host memory through a
//! bounded-access window, decodes YUV 4:2:0 to RGB, applies the selected
//! processing mode and rotates the result.
//!
//! ## Features
//!
//! - **Layouts**: NV21, NV12, YV12 and I420 sensor buffers, plus RGBA and
//!   single-channel luma.
//! - **Decode Fallbacks**: An ordered chain of strategies, ending in a
//!   fixed-point decoder that cannot fail.
//! - **Processing Modes**: Raw color, grayscale and Canny edge detection.
//! - **Rotation**: 0, 90, 180 and 270 degrees, with exact output sizes.
//! - **C ABI**: A handle-based interface in [`ffi`] for host runtimes.
//! - **Streaming**: A WebSocket endpoint in [`broadcast`] that pushes JPEG
//!   frames and their metadata to web viewers.
//!
//! ## Example
//!
//! ```no_run
//! use edge_viewer::{
//!     pipeline::FramePipeline, process::ProcessingMode, rotate::Rotation,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = FramePipeline::default();
//! let nv21 = std::fs::read("frame.nv21")?;
//!
//! // Canny edges of a landscape sensor frame shown in portrait
//! let frame = pipeline.process(&nv21, 640, 480, ProcessingMode::Edges, Rotation::Rotation90)?;
//! assert_eq!((frame.width(), frame.height()), (480, 640));
//! assert_eq!(frame.data().len(), 480 * 640);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `strict-edges`: Use the high-precision edge preset (100/200 thresholds,
//!   5x5 Sobel, L2 gradient) instead of the preview preset.
//! - `full-range`: Decode full-range (JPEG) YUV instead of limited range.
//!
//! ## Safety
//!
//! This library uses `unsafe` code to read and write host-owned memory and
//! to expose the C ABI. All unsafe operations are isolated to [`window`] and
//! [`ffi`] and wrapped with safe APIs.

pub mod broadcast;
pub mod convert;
pub mod error;
pub mod export;
pub mod ffi;
pub mod image;
pub mod kernel;
pub mod lifecycle;
pub mod pipeline;
pub mod process;
pub mod queue;
pub mod rotate;
pub mod stats;
pub mod window;
