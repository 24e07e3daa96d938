// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Readiness flag for the owning application's lifecycle signalling.
///
/// The pipeline keeps no state of its own, so nothing depends on this flag
/// being set; it only reports whether the host has initialized the
/// processor and not yet released it. Both transitions are idempotent.
#[derive(Debug, Default)]
pub struct ProcessorLifecycle {
    ready: AtomicBool,
}

impl ProcessorLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the processor ready and returns the readiness.
    pub fn initialize(&self) -> bool {
        if !self.ready.swap(true, Ordering::AcqRel) {
            debug!("processor initialized");
        }
        true
    }

    pub fn release(&self) {
        if self.ready.swap(false, Ordering::AcqRel) {
            debug!("processor released");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
