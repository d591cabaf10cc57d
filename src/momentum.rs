//! Post-release inertia
//!
//! After a pan is released the captured velocity keeps moving the viewport,
//! ramped in by an ease-out over a short window that starts at the gesture
//! start, and decayed by a constant damping ratio every frame.

use crate::config::MomentumConfig;
use crate::geometry::Vec2;
use crate::viewport::Viewport;

/// Quadratic ease-out: `1 - (p - 1)^2`, with `p` clamped to [0, 1]
pub fn ease_out(progress: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (p - 1.0) * (p - 1.0)
}

/// One momentum run, from release until the motion dies out
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumSimulator {
    velocity: Vec2,
    gesture_start_ms: f64,
    config: MomentumConfig,
    steps: u32,
}

impl MomentumSimulator {
    pub fn new(velocity: Vec2, gesture_start_ms: f64, config: MomentumConfig) -> Self {
        let velocity = if velocity.is_finite() {
            velocity
        } else {
            Vec2::ZERO
        };
        Self {
            velocity,
            gesture_start_ms,
            config,
            steps: 0,
        }
    }

    /// Velocity the next step will use
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Steps applied so far
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Displacement the next step would apply at `now_ms`
    pub fn displacement(&self, now_ms: f64) -> Vec2 {
        let elapsed = now_ms - self.gesture_start_ms;
        let progress = if elapsed.is_nan() {
            1.0
        } else {
            (elapsed / self.config.window_ms) as f32
        };
        self.velocity * (self.config.gain * ease_out(progress))
    }

    /// Apply one frame of momentum.
    /// Returns true while the simulation should keep running.
    pub fn step(&mut self, now_ms: f64, viewport: &mut Viewport) -> bool {
        let displacement = self.displacement(now_ms);
        if !displacement.is_finite() {
            viewport.set_velocity(Vec2::ZERO);
            tracing::warn!(steps = self.steps, "momentum stopped on non-finite displacement");
            return false;
        }
        if displacement.x.abs() < self.config.epsilon && displacement.y.abs() < self.config.epsilon {
            viewport.set_velocity(Vec2::ZERO);
            tracing::debug!(steps = self.steps, "momentum settled");
            return false;
        }

        viewport.set_offset(displacement, true);
        self.velocity = self.velocity * self.config.damping;
        viewport.set_velocity(self.velocity);
        self.steps += 1;
        tracing::trace!(dx = displacement.x, dy = displacement.y, "momentum step");
        true
    }
}
