// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::rotate::Rotation;
use kanal::{Receiver, Sender};
use std::time::Instant;

/// Frames held between the capture callback and the processing loop.
pub const QUEUE_DEPTH: usize = 3;

/// A captured sensor buffer waiting to be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
    pub captured: Instant,
}

impl QueuedFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, rotation: Rotation) -> Self {
        Self {
            data,
            width,
            height,
            rotation,
            captured: Instant::now(),
        }
    }
}

/// Bounded frame queue that drops new frames instead of blocking.
///
/// The producer never waits on a slow consumer: when the queue is full the
/// incoming frame is discarded. The consumer can skip ahead to the newest
/// frame with [`get_latest_frame`](Self::get_latest_frame).
#[derive(Clone)]
pub struct FrameQueue {
    tx: Sender<QueuedFrame>,
    rx: Receiver<QueuedFrame>,
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(QUEUE_DEPTH)
    }
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = kanal::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Queues a frame, returns `false` if it was dropped.
    pub fn put_frame(&self, frame: QueuedFrame) -> bool {
        self.tx.try_send(frame).unwrap_or(false)
    }

    /// Oldest queued frame, if any.
    pub fn get_frame(&self) -> Option<QueuedFrame> {
        self.rx.try_recv().ok().flatten()
    }

    /// Newest queued frame; every older frame is discarded.
    pub fn get_latest_frame(&self) -> Option<QueuedFrame> {
        let mut latest = None;
        while let Some(frame) = self.get_frame() {
            latest = Some(frame);
        }
        latest
    }

    pub fn clear(&self) {
        while self.get_frame().is_some() {}
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
