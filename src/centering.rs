//! Timed transition bringing one entry to the middle of the screen

use crate::feed::EntryId;
use crate::geometry::Vec2;
use crate::viewport::Viewport;

/// Cubic ease-in-out over `t` in [0, 1]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
    }
}

/// One in-flight centering tween.
///
/// The clock starts on the first [`step`](Self::step), so a tween can be
/// created from an event handler that has no frame timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct CenteringAnimator {
    target: EntryId,
    from_offset: Vec2,
    from_scale: f32,
    to_offset: Vec2,
    to_scale: f32,
    duration_ms: f64,
    start_ms: Option<f64>,
}

impl CenteringAnimator {
    /// Tween from the viewport's current state to `offset = -position` at
    /// `target_scale` (clamped like any other scale)
    pub fn new(
        target: EntryId,
        position: Vec2,
        target_scale: f32,
        duration_ms: f64,
        viewport: &Viewport,
    ) -> Self {
        let to_scale = if target_scale.is_finite() && target_scale > 0.0 {
            viewport.clamp_scale(target_scale)
        } else {
            viewport.scale()
        };
        Self {
            target,
            from_offset: viewport.offset(),
            from_scale: viewport.scale(),
            // Subtracting from zero keeps an origin target at +0.0
            to_offset: Vec2::ZERO - position,
            to_scale,
            duration_ms,
            start_ms: None,
        }
    }

    pub fn target(&self) -> EntryId {
        self.target
    }

    pub fn to_offset(&self) -> Vec2 {
        self.to_offset
    }

    pub fn to_scale(&self) -> f32 {
        self.to_scale
    }

    /// Place the viewport on the end state right away
    pub fn finish(&self, viewport: &mut Viewport) {
        viewport.jump_to(self.to_offset, self.to_scale);
        tracing::debug!(entry = self.target, "centering finished");
    }

    /// Apply one frame of the tween.
    /// Returns true while the tween should keep running.
    pub fn step(&mut self, now_ms: f64, viewport: &mut Viewport) -> bool {
        let start = *self.start_ms.get_or_insert(now_ms);
        let progress = (now_ms - start) / self.duration_ms;
        if progress.is_nan() || progress >= 1.0 {
            self.finish(viewport);
            return false;
        }

        let eased = ease_in_out_cubic(progress as f32);
        let offset = self.from_offset.lerp(self.to_offset, eased);
        let scale = self.from_scale + (self.to_scale - self.from_scale) * eased;
        viewport.jump_to(offset, scale);
        tracing::trace!(progress, "centering step");
        true
    }
}
