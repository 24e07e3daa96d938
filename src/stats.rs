// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use std::time::{Duration, Instant};
use tracing::info;

/// Frame rate averaged over windows of at least one second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
    current: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self {
            frames: 0,
            window_start: Instant::now(),
            current: 0.0,
        }
    }

    /// Counts a frame. Returns the new rate once a window has elapsed.
    pub fn tick(&mut self) -> Option<f32> {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed < Self::WINDOW {
            return None;
        }
        self.current = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        Some(self.current)
    }

    /// Last reported rate, 0 until the first window completes.
    pub fn current_fps(&self) -> f32 {
        self.current
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Named checkpoints measured from a common start.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    start: Instant,
    marks: Vec<(&'static str, Duration)>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// Restarts the clock and forgets every mark.
    pub fn start(&mut self) {
        self.start = Instant::now();
        self.marks.clear();
    }

    /// Records the time since [`start`](Self::start) under `label`,
    /// replacing an earlier mark with the same label.
    pub fn mark(&mut self, label: &'static str) {
        let elapsed = self.start.elapsed();
        match self.marks.iter_mut().find(|(l, _)| *l == label) {
            Some(mark) => mark.1 = elapsed,
            None => self.marks.push((label, elapsed)),
        }
    }

    pub fn timing(&self, label: &str) -> Duration {
        self.marks
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, d)| *d)
            .unwrap_or_default()
    }

    pub fn timings(&self) -> &[(&'static str, Duration)] {
        &self.marks
    }

    /// The latest mark.
    pub fn total(&self) -> Duration {
        self.marks
            .iter()
            .map(|(_, d)| *d)
            .max()
            .unwrap_or_default()
    }

    pub fn log_timings(&self) {
        let total = self.total();
        for (label, time) in &self.marks {
            let share = if total.is_zero() {
                0.0
            } else {
                time.as_secs_f64() / total.as_secs_f64() * 100.0
            };
            info!("{label}: {time:.2?} ({share:.1}%)");
        }
        info!("total: {total:.2?}");
    }
}
