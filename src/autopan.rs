//! Edge autopan: drifting the plane while the mouse rests near a screen edge

use crate::config::AutopanConfig;
use crate::geometry::Vec2;
use crate::input::PointerTracker;
use crate::viewport::Viewport;

/// Per-frame edge nudging driven by the shared pointer tracker
#[derive(Debug, Clone)]
pub struct EdgeAutopan {
    config: AutopanConfig,
    tracker: PointerTracker,
}

impl EdgeAutopan {
    pub fn new(config: AutopanConfig, tracker: PointerTracker) -> Self {
        Self { config, tracker }
    }

    /// Nudge for a pointer at `pointer` on a `width` x `height` screen.
    ///
    /// Inside the band along an edge the nudge grows linearly with depth into
    /// the band and points away from that edge's side of the plane: near the
    /// left edge the offset grows, revealing what lies to the left.
    pub fn nudge(&self, pointer: Vec2, width: f32, height: f32) -> Vec2 {
        Vec2::new(
            axis_nudge(pointer.x, width, self.config.band, self.config.gain),
            axis_nudge(pointer.y, height, self.config.band, self.config.gain),
        )
    }

    /// Apply one frame of autopan. Returns true if the viewport moved.
    pub fn step(&self, viewport: &mut Viewport) -> bool {
        if !self.config.enabled {
            return false;
        }
        let Some(pointer) = self.tracker.get() else {
            return false;
        };
        let nudge = self.nudge(pointer, viewport.width(), viewport.height());
        if nudge == Vec2::ZERO {
            return false;
        }
        viewport.set_offset(nudge, true);
        tracing::trace!(dx = nudge.x, dy = nudge.y, "edge autopan");
        true
    }
}

fn axis_nudge(position: f32, extent: f32, band: f32, gain: f32) -> f32 {
    if position < band {
        (band - position) * gain
    } else if position > extent - band {
        -(position - (extent - band)) * gain
    } else {
        0.0
    }
}
