//! Global slow-motion effect. The scaled `fixed_dt()` is what every vehicle
//! tick and physics step consumes while the effect is active.

use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeScaleConfig {
    pub base_dt: f32,    // s, unscaled fixed tick
    pub slow_scale: f32, // applied while active
}

impl Default for TimeScaleConfig {
    fn default() -> Self {
        Self {
            base_dt: 1.0 / 50.0,
            slow_scale: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    config: TimeScaleConfig,
    scale: f32,
    remaining: Option<f32>, // real seconds left on a timed slow-down
}

impl TimeScale {
    pub fn new(config: TimeScaleConfig) -> Self {
        Self { config, scale: 1.0, remaining: None }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_slowed(&self) -> bool {
        self.scale != 1.0
    }

    pub fn base_dt(&self) -> f32 {
        self.config.base_dt
    }

    pub fn fixed_dt(&self) -> f32 {
        self.config.base_dt * self.scale
    }

    /// Flip between normal and slow. Clears any running timer.
    pub fn toggle(&mut self) {
        self.remaining = None;
        if self.is_slowed() {
            self.set_scale(1.0);
        } else {
            self.set_scale(self.config.slow_scale);
        }
    }

    /// Slow down for `seconds` of real time. Non-positive durations do nothing.
    pub fn activate_for(&mut self, seconds: f32) {
        if !(seconds > 0.0) {
            return;
        }
        self.remaining = Some(seconds);
        self.set_scale(self.config.slow_scale);
    }

    /// Counts real (unscaled) time down on a timed slow-down.
    pub fn advance(&mut self, real_dt: f32) {
        let Some(left) = self.remaining else { return };
        let left = left - real_dt.max(0.0);
        if left <= 0.0 {
            self.cancel();
        } else {
            self.remaining = Some(left);
        }
    }

    /// Restore normal speed immediately.
    pub fn cancel(&mut self) {
        self.remaining = None;
        self.set_scale(1.0);
    }

    fn set_scale(&mut self, scale: f32) {
        if scale != self.scale {
            info!("⏱ time scale {:.2} -> {:.2}", self.scale, scale);
            self.scale = scale;
        }
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(TimeScaleConfig::default())
    }
}
