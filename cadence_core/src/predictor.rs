// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render duration prediction.
//!
//! The scheduler needs to know how early before a vsync it must latch so the
//! renderer can finish in time. [`FramePredictor`] smooths observed render
//! durations with an exponential moving average, pads the result with a
//! safety multiplier, and never asks for more than a fixed fraction of the
//! refresh interval.

use crate::time::Duration;

/// Exponential moving average tracker.
#[derive(Clone, Copy, Debug)]
struct Ema {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl Ema {
    const fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha,
            initialized: false,
        }
    }

    fn update(&mut self, sample: f64) {
        if self.initialized {
            self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        } else {
            self.value = sample;
            self.initialized = true;
        }
    }

    const fn get(&self) -> Option<f64> {
        if self.initialized {
            Some(self.value)
        } else {
            None
        }
    }
}

/// Predicts how long the next render will take.
#[derive(Clone, Copy, Debug)]
pub struct FramePredictor {
    render_ema: Ema,
    safety_multiplier: f64,
    max_render_fraction: f64,
    samples: u64,
}

impl FramePredictor {
    /// Creates a predictor with no observations.
    ///
    /// `alpha` is the EMA smoothing factor (0.0 to 1.0, smaller is smoother).
    #[must_use]
    pub const fn new(alpha: f64, safety_multiplier: f64, max_render_fraction: f64) -> Self {
        Self {
            render_ema: Ema::new(alpha),
            safety_multiplier,
            max_render_fraction,
            samples: 0,
        }
    }

    /// Feeds the duration of a render that reached the display.
    pub fn observe_render_duration(&mut self, d: Duration) {
        self.render_ema.update(d.nanos() as f64);
        self.samples += 1;
    }

    /// Number of observed renders.
    #[must_use]
    pub const fn samples(&self) -> u64 {
        self.samples
    }

    /// Predicted render duration for a display refreshing every
    /// `vsync_interval`. Zero until the first observation.
    #[must_use]
    pub fn predicted_render_duration(&self, vsync_interval: Duration) -> Duration {
        let Some(ema) = self.render_ema.get() else {
            return Duration::ZERO;
        };
        let cap = vsync_interval.nanos() as f64 * self.max_render_fraction;
        let padded = (ema * self.safety_multiplier).min(cap).max(0.0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "clamped to a fraction of the vsync interval, which fits in u64"
        )]
        Duration(padded as u64)
    }
}
