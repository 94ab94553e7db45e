//! Volume ramps used around track swaps.

use std::time::Duration;

pub const FADE_STEPS: u32 = 20;

/// Ease-in-out quadratic curve on `progress` in `[0, 1]`.
pub fn ease_in_out_quad(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    if p < 0.5 {
        2.0 * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
    }
}

/// An in-flight ramp from `from` to `to`, advanced one step per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Fade {
    from: u8,
    to: u8,
    step: u32,
}

impl Fade {
    pub fn new(from: u8, to: u8) -> Self {
        Self { from, to, step: 0 }
    }

    pub fn target(&self) -> u8 {
        self.to
    }

    /// Interval between steps for a ramp lasting `total`.
    pub fn step_interval(total: Duration) -> Duration {
        total / FADE_STEPS
    }

    pub fn is_finished(&self) -> bool {
        self.step >= FADE_STEPS
    }

    /// Advances one step and returns the volume to apply. The last step
    /// lands exactly on the target.
    pub fn advance(&mut self) -> u8 {
        if self.step < FADE_STEPS {
            self.step += 1;
        }
        if self.is_finished() {
            return self.to;
        }
        let eased = ease_in_out_quad(f64::from(self.step) / f64::from(FADE_STEPS));
        let from = f64::from(self.from);
        let value = from + (f64::from(self.to) - from) * eased;
        value.round().clamp(0.0, 100.0) as u8
    }
}
