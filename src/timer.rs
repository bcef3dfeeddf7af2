// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A small frame-rate helper for the CLI's `--print-frame-rate` flag.
//!
//! Replaces `original_source/test/timer.c`'s `gettimeofday`-pair with
//! `std::time::Instant`.

use std::time::{Duration, Instant};

/// Tracks elapsed time and frame count since the last [`FrameTimer::reset`],
/// reporting an average frame rate on demand.
pub struct FrameTimer {
    start: Instant,
    frames: u64,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self { start: Instant::now(), frames: 0 }
    }

    /// Records one decoded frame.
    pub fn tick(&mut self) {
        self.frames += 1;
    }

    /// Elapsed time since construction or the last [`FrameTimer::reset`].
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Average frames per second since construction or the last
    /// [`FrameTimer::reset`]. `0.0` if no time has elapsed yet.
    pub fn frames_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.frames as f64 / secs
        }
    }

    /// Restarts the measurement window, returning the accumulated frame
    /// count since the previous reset.
    pub fn reset(&mut self) -> u64 {
        let frames = self.frames;
        self.start = Instant::now();
        self.frames = 0;
        frames
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_accumulates_frames_across_reset() {
        let mut timer = FrameTimer::new();
        timer.tick();
        timer.tick();
        assert_eq!(timer.reset(), 2);
    }

    #[test]
    fn fresh_timer_reports_zero_rate() {
        let timer = FrameTimer::new();
        assert_eq!(timer.frames_per_second(), 0.0);
    }
}
