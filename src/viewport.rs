//! Viewport state: pan offset, zoom scale and release velocity
//!
//! This module contains pure calculation logic with no platform dependencies.
//! Every mutation bumps a revision counter; the engine compares it to the
//! revision it last laid entries out at to decide whether they are stale.

use crate::config::ViewportConfig;
use crate::geometry::Vec2;

/// Snap threshold for eased offset transitions, in plane units
const OFFSET_SNAP: f32 = 0.1;

/// Snap threshold for eased scale transitions
const SCALE_SNAP: f32 = 0.001;

/// Viewport state for the wrap-around plane
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Screen width in pixels
    width: f32,
    /// Screen height in pixels
    height: f32,
    /// Translation applied to the plane
    offset: Vec2,
    /// Zoom level (1.0 = natural size)
    scale: f32,
    /// Last pan velocity in plane units per millisecond
    velocity: Vec2,
    /// Target values for eased transitions
    target_offset: Vec2,
    target_scale: f32,
    /// Whether an eased transition is in flight
    is_animating: bool,
    min_scale: f32,
    max_scale: f32,
    smoothing: f32,
    revision: u64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0, &ViewportConfig::default())
    }
}

impl Viewport {
    /// Create a viewport for a screen of the given size
    pub fn new(width: f32, height: f32, config: &ViewportConfig) -> Self {
        Self {
            width,
            height,
            offset: Vec2::ZERO,
            scale: 1.0,
            velocity: Vec2::ZERO,
            target_offset: Vec2::ZERO,
            target_scale: 1.0,
            is_animating: false,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            smoothing: config.smoothing,
            revision: 0,
        }
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Offset an in-flight eased transition is heading to
    pub fn target_offset(&self) -> Vec2 {
        self.target_offset
    }

    /// Scale an in-flight eased transition is heading to
    pub fn target_scale(&self) -> f32 {
        self.target_scale
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Screen-space anchor the plane origin is drawn at
    pub fn screen_center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Project a point laid out in container space onto the screen.
    ///
    /// The container is translated by the offset and scaled about the
    /// screen center.
    pub fn container_to_screen(&self, point: Vec2) -> Vec2 {
        let center = self.screen_center();
        center + self.offset + (point - center) * self.scale
    }

    pub fn is_animating(&self) -> bool {
        self.is_animating
    }

    /// Re-layout signal: changes whenever offset or scale change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Translate the viewport by `delta`.
    ///
    /// `immediate` applies the delta this frame and cancels any pending eased
    /// offset. Otherwise the delta is added to the eased target and the
    /// viewport approaches it in [`update_animation`](Self::update_animation).
    pub fn set_offset(&mut self, delta: Vec2, immediate: bool) {
        if !delta.is_finite() {
            return;
        }
        if immediate {
            self.offset += delta;
            // Also update target to prevent animation fighting
            self.target_offset = self.offset;
        } else {
            self.target_offset += delta;
            self.is_animating = true;
        }
        self.touch();
    }

    /// Multiply the zoom by `factor`, clamped to the configured limits.
    ///
    /// Non-positive or non-finite factors are ignored. Eased zoom steps
    /// compose on the pending target, so two 0.9 steps always land on 0.81.
    pub fn set_scale(&mut self, factor: f32, immediate: bool) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        if immediate {
            self.scale = self.clamp_scale(self.scale * factor);
            self.target_scale = self.scale;
        } else {
            self.target_scale = self.clamp_scale(self.target_scale * factor);
            self.is_animating = true;
        }
        self.touch();
    }

    /// Place the viewport exactly, dropping any eased transition
    pub fn jump_to(&mut self, offset: Vec2, scale: f32) {
        if offset.is_finite() {
            self.offset = offset;
        }
        if scale.is_finite() && scale > 0.0 {
            self.scale = self.clamp_scale(scale);
        }
        self.target_offset = self.offset;
        self.target_scale = self.scale;
        self.is_animating = false;
        self.touch();
    }

    /// Clamp a scale into the configured zoom range
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Advance an eased transition by one frame.
    /// Returns true if still animating.
    pub fn update_animation(&mut self) -> bool {
        if !self.is_animating {
            return false;
        }

        self.scale += (self.target_scale - self.scale) * self.smoothing;
        self.offset = self.offset.lerp(self.target_offset, self.smoothing);

        let scale_diff = (self.target_scale - self.scale).abs();
        let offset_diff = self.target_offset - self.offset;

        if scale_diff < SCALE_SNAP
            && offset_diff.x.abs() < OFFSET_SNAP
            && offset_diff.y.abs() < OFFSET_SNAP
        {
            // Snap to final values
            self.scale = self.target_scale;
            self.offset = self.target_offset;
            self.is_animating = false;
        }

        self.touch();
        self.is_animating
    }

    /// Drop any eased transition, leaving the viewport where it is
    pub fn stop_animation(&mut self) {
        self.target_offset = self.offset;
        self.target_scale = self.scale;
        self.is_animating = false;
    }

    /// Reset to offset (0, 0), scale 1
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.scale = 1.0;
        self.velocity = Vec2::ZERO;
        self.target_offset = Vec2::ZERO;
        self.target_scale = 1.0;
        self.is_animating = false;
        self.touch();
    }

    /// Resize the screen dimensions
    pub fn resize(&mut self, width: f32, height: f32) {
        if width.is_finite() && height.is_finite() && width >= 0.0 && height >= 0.0 {
            self.width = width;
            self.height = height;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
