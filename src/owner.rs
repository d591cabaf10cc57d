//! Which component currently drives the viewport
//!
//! Gestures, momentum and centering never write the viewport at the same
//! time. The owner is a single tagged value; every hand-over goes through
//! one of the transition methods here so preemption rules live in one place:
//!
//! - a new pan or pinch preempts momentum and centering
//! - centering preempts momentum but is refused while a gesture is active
//! - releasing a pan hands the viewport to momentum
//! - momentum and centering fall back to idle when they finish

use crate::centering::CenteringAnimator;
use crate::config::MomentumConfig;
use crate::input::GestureEvent;
use crate::momentum::MomentumSimulator;
use crate::viewport::Viewport;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewportOwner {
    #[default]
    Idle,
    Panning,
    PinchZooming,
    Momentum(MomentumSimulator),
    Centering(CenteringAnimator),
}

impl ViewportOwner {
    /// Short name used in logs and render frames
    pub fn name(&self) -> &'static str {
        match self {
            ViewportOwner::Idle => "idle",
            ViewportOwner::Panning => "panning",
            ViewportOwner::PinchZooming => "pinch_zooming",
            ViewportOwner::Momentum(_) => "momentum",
            ViewportOwner::Centering(_) => "centering",
        }
    }

    /// A pointer gesture holds the viewport
    pub fn is_gesture(&self) -> bool {
        matches!(self, ViewportOwner::Panning | ViewportOwner::PinchZooming)
    }

    /// Edge autopan only runs while no gesture or centering holds the viewport
    pub fn allows_autopan(&self) -> bool {
        matches!(self, ViewportOwner::Idle | ViewportOwner::Momentum(_))
    }

    /// Apply a gesture lifecycle event from the input interpreter
    pub fn on_gesture(&mut self, event: GestureEvent, momentum: MomentumConfig) {
        let next = match event {
            GestureEvent::None => return,
            GestureEvent::PanStarted => ViewportOwner::Panning,
            GestureEvent::PinchStarted => ViewportOwner::PinchZooming,
            GestureEvent::Released {
                velocity,
                gesture_start_ms,
            } => ViewportOwner::Momentum(MomentumSimulator::new(
                velocity,
                gesture_start_ms,
                momentum,
            )),
            GestureEvent::Ended => ViewportOwner::Idle,
        };
        self.transition(next);
    }

    /// Hand the viewport to a centering tween.
    /// Returns false (and changes nothing) while a gesture is active.
    pub fn begin_centering(&mut self, animator: CenteringAnimator) -> bool {
        if self.is_gesture() {
            tracing::debug!(
                entry = animator.target(),
                owner = self.name(),
                "centering refused during gesture"
            );
            return false;
        }
        tracing::debug!(entry = animator.target(), "centering started");
        self.transition(ViewportOwner::Centering(animator));
        true
    }

    /// Drop whatever holds the viewport
    pub fn release(&mut self) {
        self.transition(ViewportOwner::Idle);
    }

    /// Advance momentum or centering by one frame.
    /// Returns true if the viewport was written.
    pub fn step(&mut self, now_ms: f64, viewport: &mut Viewport) -> bool {
        let running = match self {
            ViewportOwner::Momentum(sim) => sim.step(now_ms, viewport),
            ViewportOwner::Centering(tween) => tween.step(now_ms, viewport),
            _ => return false,
        };
        if !running {
            self.transition(ViewportOwner::Idle);
        }
        true
    }

    fn transition(&mut self, next: ViewportOwner) {
        if self.name() != next.name() {
            tracing::debug!(from = self.name(), to = next.name(), "viewport owner changed");
        }
        *self = next;
    }
}
