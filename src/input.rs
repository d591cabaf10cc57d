//! Gesture interpretation: single-pointer pan, two-pointer pinch, modifier wheel zoom
//!
//! The interpreter turns raw pointer and wheel events into viewport deltas.
//! It never fails: samples that cannot be interpreted (zero elapsed time,
//! moves for pointers that never went down, degenerate pinches) are dropped.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::InputConfig;
use crate::geometry::Vec2;
use crate::viewport::Viewport;

/// Smallest per-frame pinch factor; larger pinch-ins are clamped to it
const MIN_PINCH_FACTOR: f32 = 0.01;

/// Identifier of an active pointer (mouse button or touch contact)
pub type PointerId = u32;

/// Source of a pointer event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
}

/// A pointer down/move/up sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    #[serde(default)]
    pub id: PointerId,
    #[serde(default)]
    pub kind: PointerKind,
    pub x: f32,
    pub y: f32,
    pub timestamp_ms: f64,
}

impl PointerEvent {
    /// A mouse sample for pointer 0
    pub fn mouse(x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self {
            id: 0,
            kind: PointerKind::Mouse,
            x,
            y,
            timestamp_ms,
        }
    }

    /// A touch sample for contact `id`
    pub fn touch(id: PointerId, x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self {
            id,
            kind: PointerKind::Touch,
            x,
            y,
            timestamp_ms,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A wheel sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelEvent {
    pub delta_y: f32,
    /// Zoom modifier (ctrl, or a trackpad pinch) held
    #[serde(default)]
    pub modifier: bool,
    #[serde(default)]
    pub timestamp_ms: f64,
}

/// Last known hover position of the mouse, shared between the input
/// handlers and the autopan loop.
///
/// Cloning the tracker shares the same slot. Touch-only sessions never set
/// it, which keeps autopan idle.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    slot: Rc<Cell<Option<Vec2>>>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, position: Vec2) {
        if position.is_finite() {
            self.slot.set(Some(position));
        }
    }

    /// Forget the pointer (it left the surface)
    pub fn clear(&self) {
        self.slot.set(None);
    }

    pub fn get(&self) -> Option<Vec2> {
        self.slot.get()
    }
}

/// Gesture state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GesturePhase {
    Idle,
    SinglePan {
        pointer: PointerId,
        last: Vec2,
        last_ms: f64,
        start_ms: f64,
        velocity: Vec2,
    },
    PinchZoom {
        /// Inter-pointer distance at the previous sample
        baseline: f32,
    },
}

/// Lifecycle notifications returned by the interpreter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Nothing changed in the gesture lifecycle
    None,
    /// A single-pointer pan began (fresh, or resumed after a pinch)
    PanStarted,
    /// A second pointer turned the gesture into a pinch
    PinchStarted,
    /// The last pointer of a pan lifted; hand the velocity to momentum
    Released { velocity: Vec2, gesture_start_ms: f64 },
    /// The pinch ended with no pointer left
    Ended,
}

/// Converts raw events into viewport deltas
#[derive(Debug, Clone)]
pub struct InputInterpreter {
    phase: GesturePhase,
    /// Active pointers in arrival order
    pointers: Vec<(PointerId, Vec2)>,
    config: InputConfig,
    tracker: PointerTracker,
}

impl InputInterpreter {
    pub fn new(config: InputConfig, tracker: PointerTracker) -> Self {
        Self {
            phase: GesturePhase::Idle,
            pointers: Vec::new(),
            config,
            tracker,
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    /// A pan or pinch is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, GesturePhase::Idle)
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    /// Mouse moves with no button held still feed the autopan tracker
    pub fn hover(&self, position: Vec2) {
        self.tracker.set(position);
    }

    /// Handle a pointer going down
    pub fn pointer_down(&mut self, event: &PointerEvent, viewport: &mut Viewport) -> GestureEvent {
        let position = event.position();
        if !position.is_finite() {
            return GestureEvent::None;
        }
        self.track(event);

        if let Some(slot) = self.pointers.iter_mut().find(|(id, _)| *id == event.id) {
            slot.1 = position;
            return GestureEvent::None;
        }
        self.pointers.push((event.id, position));

        match self.pointers.len() {
            1 => {
                self.begin_pan(event.id, position, event.timestamp_ms, viewport);
                GestureEvent::PanStarted
            }
            2 => {
                let baseline = self.pinch_distance().unwrap_or(0.0);
                self.phase = GesturePhase::PinchZoom { baseline };
                tracing::debug!(baseline, "pinch started");
                GestureEvent::PinchStarted
            }
            // A third contact does not change the gesture; the pinch keeps
            // tracking the first two.
            _ => GestureEvent::None,
        }
    }

    /// Handle a pointer moving while down
    pub fn pointer_move(&mut self, event: &PointerEvent, viewport: &mut Viewport) -> GestureEvent {
        let position = event.position();
        if !position.is_finite() {
            return GestureEvent::None;
        }
        self.track(event);

        let Some(slot) = self.pointers.iter_mut().find(|(id, _)| *id == event.id) else {
            return GestureEvent::None;
        };
        slot.1 = position;

        if let GesturePhase::SinglePan {
            pointer,
            last,
            last_ms,
            velocity,
            ..
        } = &mut self.phase
        {
            if *pointer != event.id {
                return GestureEvent::None;
            }
            let dt = event.timestamp_ms - *last_ms;
            if dt.is_nan() || dt <= 0.0 {
                return GestureEvent::None;
            }
            let dt = dt as f32;
            let delta = position - *last;
            *velocity = Vec2::new(delta.x / dt, delta.y / dt);
            *last = position;
            *last_ms = event.timestamp_ms;

            viewport.set_velocity(*velocity);
            viewport.set_offset(delta, true);
        } else if matches!(self.phase, GesturePhase::PinchZoom { .. }) {
            self.apply_pinch(viewport);
        }
        GestureEvent::None
    }

    /// Handle a pointer lifting
    pub fn pointer_up(&mut self, event: &PointerEvent, viewport: &mut Viewport) -> GestureEvent {
        let Some(index) = self.pointers.iter().position(|(id, _)| *id == event.id) else {
            return GestureEvent::None;
        };
        self.pointers.remove(index);

        match self.phase {
            GesturePhase::SinglePan {
                velocity, start_ms, ..
            } if self.pointers.is_empty() => {
                self.phase = GesturePhase::Idle;
                tracing::debug!(vx = velocity.x, vy = velocity.y, "pan released");
                GestureEvent::Released {
                    velocity,
                    gesture_start_ms: start_ms,
                }
            }
            GesturePhase::PinchZoom { .. } if self.pointers.len() < 2 => {
                if let Some(&(id, position)) = self.pointers.first() {
                    self.begin_pan(id, position, event.timestamp_ms, viewport);
                    GestureEvent::PanStarted
                } else {
                    self.phase = GesturePhase::Idle;
                    tracing::debug!("pinch ended");
                    GestureEvent::Ended
                }
            }
            // One of the measured pair lifted while another finger remains:
            // measure the new pair from here instead of against the old one
            GesturePhase::PinchZoom { .. } if index < 2 => {
                let baseline = self.pinch_distance().unwrap_or(0.0);
                self.phase = GesturePhase::PinchZoom { baseline };
                tracing::debug!(baseline, "pinch pair changed");
                GestureEvent::None
            }
            _ => GestureEvent::None,
        }
    }

    /// Handle a wheel notch. Returns true if it zoomed.
    pub fn wheel(&mut self, event: &WheelEvent, viewport: &mut Viewport) -> bool {
        if !event.modifier || event.delta_y.is_nan() {
            return false;
        }
        let factor = if event.delta_y > 0.0 {
            self.config.wheel_zoom_out
        } else {
            self.config.wheel_zoom_in
        };
        viewport.set_scale(factor, !self.config.ease_zoom);
        true
    }

    /// Drop every pointer and return to idle without momentum
    pub fn cancel(&mut self) {
        self.pointers.clear();
        self.phase = GesturePhase::Idle;
    }

    fn begin_pan(&mut self, pointer: PointerId, position: Vec2, now_ms: f64, viewport: &mut Viewport) {
        self.phase = GesturePhase::SinglePan {
            pointer,
            last: position,
            last_ms: now_ms,
            start_ms: now_ms,
            velocity: Vec2::ZERO,
        };
        viewport.set_velocity(Vec2::ZERO);
        tracing::debug!(pointer, "pan started");
    }

    fn apply_pinch(&mut self, viewport: &mut Viewport) {
        let Some(current) = self.pinch_distance() else {
            return;
        };
        let GesturePhase::PinchZoom { baseline } = &mut self.phase else {
            return;
        };
        if !(*baseline > 0.0 && baseline.is_finite() && current.is_finite()) {
            *baseline = current;
            return;
        }

        let ratio = current / *baseline;
        let factor = (1.0 + (ratio - 1.0) * self.config.pinch_amplification).max(MIN_PINCH_FACTOR);
        *baseline = current;
        viewport.set_scale(factor, !self.config.ease_zoom);
    }

    fn pinch_distance(&self) -> Option<f32> {
        match self.pointers.as_slice() {
            [(_, a), (_, b), ..] => Some(a.distance(*b)),
            _ => None,
        }
    }

    fn track(&self, event: &PointerEvent) {
        if event.kind == PointerKind::Mouse {
            self.tracker.set(event.position());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewportConfig;

    fn setup() -> (InputInterpreter, Viewport) {
        let config = InputConfig {
            ease_zoom: false,
            ..Default::default()
        };
        (
            InputInterpreter::new(config, PointerTracker::new()),
            Viewport::new(800.0, 600.0, &ViewportConfig::default()),
        )
    }

    // ========== Pan ==========

    #[test]
    fn single_pointer_pans_immediately() {
        let (mut input, mut vp) = setup();
        assert_eq!(
            input.pointer_down(&PointerEvent::mouse(100.0, 100.0, 0.0), &mut vp),
            GestureEvent::PanStarted
        );
        input.pointer_move(&PointerEvent::mouse(130.0, 90.0, 10.0), &mut vp);
        assert_eq!(vp.offset(), Vec2::new(30.0, -10.0));
        assert_eq!(vp.velocity(), Vec2::new(3.0, -1.0));
    }

    #[test]
    fn zero_duration_samples_are_ignored() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::mouse(0.0, 0.0, 5.0), &mut vp);
        input.pointer_move(&PointerEvent::mouse(50.0, 0.0, 5.0), &mut vp);
        assert_eq!(vp.offset(), Vec2::ZERO);

        // The skipped movement is picked up by the next valid sample
        input.pointer_move(&PointerEvent::mouse(60.0, 0.0, 7.0), &mut vp);
        assert_eq!(vp.offset(), Vec2::new(60.0, 0.0));
        assert_eq!(vp.velocity(), Vec2::new(30.0, 0.0));
    }

    #[test]
    fn move_without_down_is_noop() {
        let (mut input, mut vp) = setup();
        assert_eq!(
            input.pointer_move(&PointerEvent::mouse(50.0, 50.0, 10.0), &mut vp),
            GestureEvent::None
        );
        assert_eq!(
            input.pointer_up(&PointerEvent::mouse(50.0, 50.0, 10.0), &mut vp),
            GestureEvent::None
        );
        assert_eq!(vp.offset(), Vec2::ZERO);
        assert_eq!(input.phase(), GesturePhase::Idle);
    }

    #[test]
    fn release_hands_off_last_velocity() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::mouse(0.0, 0.0, 100.0), &mut vp);
        input.pointer_move(&PointerEvent::mouse(20.0, 0.0, 110.0), &mut vp);
        input.pointer_move(&PointerEvent::mouse(25.0, 10.0, 115.0), &mut vp);
        let event = input.pointer_up(&PointerEvent::mouse(25.0, 10.0, 120.0), &mut vp);
        assert_eq!(
            event,
            GestureEvent::Released {
                velocity: Vec2::new(1.0, 2.0),
                gesture_start_ms: 100.0,
            }
        );
        assert!(!input.is_active());
    }

    // ========== Pinch ==========

    #[test]
    fn second_pointer_starts_pinch_and_stops_panning() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::touch(1, 100.0, 100.0, 0.0), &mut vp);
        assert_eq!(
            input.pointer_down(&PointerEvent::touch(2, 200.0, 100.0, 5.0), &mut vp),
            GestureEvent::PinchStarted
        );
        assert_eq!(input.phase(), GesturePhase::PinchZoom { baseline: 100.0 });

        // Moving one finger changes scale, not offset
        input.pointer_move(&PointerEvent::touch(1, 90.0, 100.0, 10.0), &mut vp);
        assert_eq!(vp.offset(), Vec2::ZERO);
    }

    #[test]
    fn pinch_applies_amplified_incremental_ratio() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::touch(1, 0.0, 0.0, 0.0), &mut vp);
        input.pointer_down(&PointerEvent::touch(2, 100.0, 0.0, 0.0), &mut vp);

        // 100 -> 110: ratio 1.1, amplified to 1.2
        input.pointer_move(&PointerEvent::touch(2, 110.0, 0.0, 16.0), &mut vp);
        assert!((vp.scale() - 1.2).abs() < 1e-5);

        // Baseline is now 110, so 110 -> 121 is again ratio 1.1
        input.pointer_move(&PointerEvent::touch(2, 121.0, 0.0, 32.0), &mut vp);
        assert!((vp.scale() - 1.44).abs() < 1e-4);
    }

    #[test]
    fn pinch_spreading_strictly_increases_scale() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::touch(1, 0.0, 0.0, 0.0), &mut vp);
        input.pointer_down(&PointerEvent::touch(2, 50.0, 0.0, 0.0), &mut vp);

        let mut previous = vp.scale();
        for step in 1..=5 {
            let x = 50.0 + step as f32 * 3.0;
            input.pointer_move(&PointerEvent::touch(2, x, 0.0, step as f64 * 16.0), &mut vp);
            assert!(vp.scale() > previous);
            previous = vp.scale();
        }
    }

    #[test]
    fn extreme_pinch_in_clamps_to_min_scale() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::touch(1, 0.0, 0.0, 0.0), &mut vp);
        input.pointer_down(&PointerEvent::touch(2, 400.0, 0.0, 0.0), &mut vp);
        input.pointer_move(&PointerEvent::touch(2, 10.0, 0.0, 16.0), &mut vp);
        assert_eq!(vp.scale(), 0.1);
    }

    #[test]
    fn coincident_pinch_pointers_do_not_produce_nan() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::touch(1, 10.0, 10.0, 0.0), &mut vp);
        input.pointer_down(&PointerEvent::touch(2, 10.0, 10.0, 0.0), &mut vp);
        input.pointer_move(&PointerEvent::touch(2, 20.0, 10.0, 16.0), &mut vp);
        assert_eq!(vp.scale(), 1.0);
        assert!(vp.scale().is_finite());

        // The baseline recovered, so the next sample zooms normally
        input.pointer_move(&PointerEvent::touch(2, 30.0, 10.0, 32.0), &mut vp);
        assert!(vp.scale() > 1.0);
    }

    #[test]
    fn lifting_one_pinch_finger_resumes_pan() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::touch(1, 0.0, 0.0, 0.0), &mut vp);
        input.pointer_down(&PointerEvent::touch(2, 100.0, 0.0, 0.0), &mut vp);
        input.pointer_move(&PointerEvent::touch(1, 5.0, 5.0, 10.0), &mut vp);

        assert_eq!(
            input.pointer_up(&PointerEvent::touch(2, 100.0, 0.0, 20.0), &mut vp),
            GestureEvent::PanStarted
        );
        assert!(matches!(
            input.phase(),
            GesturePhase::SinglePan { pointer: 1, last, .. } if last == Vec2::new(5.0, 5.0)
        ));

        // Panning continues from the remaining finger's position, no jump
        input.pointer_move(&PointerEvent::touch(1, 15.0, 5.0, 30.0), &mut vp);
        assert_eq!(vp.offset(), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn lifting_pinch_fingers_one_by_one_releases_pan() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::touch(1, 0.0, 0.0, 0.0), &mut vp);
        input.pointer_down(&PointerEvent::touch(2, 100.0, 0.0, 0.0), &mut vp);
        input.pointer_up(&PointerEvent::touch(1, 0.0, 0.0, 10.0), &mut vp);
        let last = input.pointer_up(&PointerEvent::touch(2, 100.0, 0.0, 20.0), &mut vp);
        // One finger remained after the first lift, so this is a pan release
        // with zero velocity rather than a pinch end.
        assert_eq!(
            last,
            GestureEvent::Released {
                velocity: Vec2::ZERO,
                gesture_start_ms: 10.0,
            }
        );
        assert_eq!(input.active_pointers(), 0);
    }

    #[test]
    fn lifting_a_pinch_finger_with_a_third_down_keeps_scale() {
        let (mut input, mut vp) = setup();
        input.pointer_down(&PointerEvent::touch(1, 0.0, 0.0, 0.0), &mut vp);
        input.pointer_down(&PointerEvent::touch(2, 100.0, 0.0, 0.0), &mut vp);
        input.pointer_down(&PointerEvent::touch(3, 400.0, 0.0, 0.0), &mut vp);

        assert_eq!(
            input.pointer_up(&PointerEvent::touch(2, 100.0, 0.0, 10.0), &mut vp),
            GestureEvent::None
        );
        assert_eq!(input.phase(), GesturePhase::PinchZoom { baseline: 400.0 });

        // Finger 3 has not moved, so the pair 1-3 has not changed distance
        input.pointer_move(&PointerEvent::touch(3, 400.0, 0.0, 20.0), &mut vp);
        assert_eq!(vp.scale(), 1.0);

        // Spreading the new pair zooms relative to its own distance
        input.pointer_move(&PointerEvent::touch(3, 440.0, 0.0, 30.0), &mut vp);
        assert!((vp.scale() - 1.2).abs() < 1e-5);
    }

    // ========== Wheel ==========

    #[test]
    fn wheel_zoom_composes_multiplicatively() {
        let (mut input, mut vp) = setup();
        let out = WheelEvent {
            delta_y: 120.0,
            modifier: true,
            timestamp_ms: 0.0,
        };
        assert!(input.wheel(&out, &mut vp));
        assert!(input.wheel(&out, &mut vp));
        assert!((vp.scale() - 0.81).abs() < 1e-6);
    }

    #[test]
    fn wheel_without_modifier_is_ignored() {
        let (mut input, mut vp) = setup();
        let plain = WheelEvent {
            delta_y: -120.0,
            modifier: false,
            timestamp_ms: 0.0,
        };
        assert!(!input.wheel(&plain, &mut vp));
        assert_eq!(vp.scale(), 1.0);
    }

    #[test]
    fn wheel_up_zooms_in() {
        let (mut input, mut vp) = setup();
        let zoom_in = WheelEvent {
            delta_y: -3.0,
            modifier: true,
            timestamp_ms: 0.0,
        };
        input.wheel(&zoom_in, &mut vp);
        assert!((vp.scale() - 1.1).abs() < 1e-6);
    }

    #[test]
    fn eased_wheel_zoom_moves_target_first() {
        let mut input = InputInterpreter::new(InputConfig::default(), PointerTracker::new());
        let mut vp = Viewport::default();
        let out = WheelEvent {
            delta_y: 1.0,
            modifier: true,
            timestamp_ms: 0.0,
        };
        input.wheel(&out, &mut vp);
        assert_eq!(vp.scale(), 1.0);
        assert!((vp.target_scale() - 0.9).abs() < 1e-6);
    }

    // ========== Tracker ==========

    #[test]
    fn mouse_moves_feed_tracker_but_touches_do_not() {
        let tracker = PointerTracker::new();
        let mut input = InputInterpreter::new(InputConfig::default(), tracker.clone());
        let mut vp = Viewport::default();

        input.pointer_down(&PointerEvent::touch(7, 10.0, 10.0, 0.0), &mut vp);
        assert_eq!(tracker.get(), None);

        input.hover(Vec2::new(3.0, 4.0));
        assert_eq!(tracker.get(), Some(Vec2::new(3.0, 4.0)));

        input.pointer_move(&PointerEvent::mouse(8.0, 9.0, 1.0), &mut vp);
        assert_eq!(tracker.get(), Some(Vec2::new(8.0, 9.0)));

        tracker.clear();
        assert_eq!(tracker.get(), None);
    }
}
