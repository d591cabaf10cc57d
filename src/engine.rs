//! Engine façade: one object the input adapter feeds events into and reads
//! render frames out of
//!
//! The engine owns every piece of viewport state and the shared pointer
//! tracker. It is single-threaded and frame-driven: event handlers apply
//! their deltas synchronously, and [`Engine::tick`] advances momentum,
//! centering, autopan and eased zoom by one frame before laying out entries.
//! Entries are only re-laid out when the viewport or layout revision moved
//! since the last frame.

use serde::{Deserialize, Serialize};

use crate::autopan::EdgeAutopan;
use crate::centering::CenteringAnimator;
use crate::config::{AutopanConfig, ConfigResult, EngineConfig};
use crate::feed::{EntryFeed, EntryId};
use crate::geometry::Vec2;
use crate::input::{InputInterpreter, PointerEvent, PointerTracker, WheelEvent};
use crate::layout::{RenderItem, ToroidalLayout};
use crate::owner::ViewportOwner;
use crate::viewport::Viewport;

/// Container transform handed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub offset_x: f32,
    pub offset_y: f32,
    pub scale: f32,
}

impl From<&Viewport> for ViewportTransform {
    fn from(viewport: &Viewport) -> Self {
        Self {
            offset_x: viewport.offset().x,
            offset_y: viewport.offset().y,
            scale: viewport.scale(),
        }
    }
}

/// Everything the presentation layer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub time_ms: f64,
    /// Component driving the viewport this frame
    pub owner: &'static str,
    pub viewport: ViewportTransform,
    pub items: Vec<RenderItem>,
}

/// Render items from the last layout pass, tagged with the revisions they
/// were computed at
#[derive(Debug, Clone)]
struct RenderedItems {
    viewport_revision: u64,
    layout_revision: u64,
    items: Vec<RenderItem>,
}

impl RenderedItems {
    fn is_current(&self, viewport: &Viewport, layout: &ToroidalLayout) -> bool {
        self.viewport_revision == viewport.revision() && self.layout_revision == layout.revision()
    }
}

pub struct Engine {
    config: EngineConfig,
    viewport: Viewport,
    input: InputInterpreter,
    autopan: EdgeAutopan,
    layout: ToroidalLayout,
    owner: ViewportOwner,
    tracker: PointerTracker,
    rendered: Option<RenderedItems>,
}

impl Engine {
    /// Create an engine for a screen of `width` x `height` pixels.
    /// Fails if `config` does not pass [`EngineConfig::validate`].
    pub fn new(config: EngineConfig, width: f32, height: f32) -> ConfigResult<Self> {
        config.validate()?;
        let tracker = PointerTracker::new();
        let autopan = EdgeAutopan::new(
            AutopanConfig {
                enabled: config.autopan_enabled(),
                ..config.autopan
            },
            tracker.clone(),
        );
        let mut layout = ToroidalLayout::new(config.plane, config.layout);
        layout.set_render_cap(config.effective_render_cap());

        tracing::debug!(
            width,
            height,
            device = ?config.device,
            render_cap = ?config.effective_render_cap(),
            "engine created"
        );

        Ok(Self {
            viewport: Viewport::new(width, height, &config.viewport),
            input: InputInterpreter::new(config.input, tracker.clone()),
            autopan,
            layout,
            owner: ViewportOwner::Idle,
            tracker,
            rendered: None,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn layout(&self) -> &ToroidalLayout {
        &self.layout
    }

    pub fn owner(&self) -> &ViewportOwner {
        &self.owner
    }

    /// No owner is driving the viewport and no eased transition is pending.
    /// Edge autopan does not count: it runs for as long as the mouse rests.
    pub fn is_settled(&self) -> bool {
        self.owner == ViewportOwner::Idle && !self.viewport.is_animating()
    }

    /// Handle onto the last known mouse position
    pub fn tracker(&self) -> &PointerTracker {
        &self.tracker
    }

    // ----- input -----

    pub fn pointer_down(&mut self, event: &PointerEvent) {
        let gesture = self.input.pointer_down(event, &mut self.viewport);
        self.owner.on_gesture(gesture, self.config.momentum);
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) {
        let gesture = self.input.pointer_move(event, &mut self.viewport);
        self.owner.on_gesture(gesture, self.config.momentum);
    }

    pub fn pointer_up(&mut self, event: &PointerEvent) {
        let gesture = self.input.pointer_up(event, &mut self.viewport);
        self.owner.on_gesture(gesture, self.config.momentum);
    }

    /// Wheel zoom. Ignored while a centering tween owns the scale.
    pub fn wheel(&mut self, event: &WheelEvent) -> bool {
        if matches!(self.owner, ViewportOwner::Centering(_)) {
            return false;
        }
        self.input.wheel(event, &mut self.viewport)
    }

    /// Mouse movement with no button held
    pub fn hover(&mut self, position: Vec2) {
        if self.config.autopan_enabled() {
            self.input.hover(position);
        }
    }

    /// The mouse left the surface
    pub fn leave(&mut self) {
        self.tracker.clear();
    }

    /// Put the viewport at `offset`, cancelling any gesture, momentum or
    /// centering in flight
    pub fn place(&mut self, offset: Vec2) {
        self.input.cancel();
        self.owner.release();
        self.viewport.jump_to(offset, self.viewport.scale());
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.resize(width, height);
    }

    /// Render cap override, on top of the configured one
    pub fn set_render_cap(&mut self, cap: Option<usize>) {
        self.layout.set_render_cap(cap);
    }

    // ----- entries -----

    /// Hand the engine the current entry feed.
    ///
    /// A newly registered newest entry is centered automatically. Returns
    /// true if placements changed.
    pub fn sync(&mut self, feed: &EntryFeed) -> bool {
        let previous_newest = self.layout.newest();
        let changed = self.layout.sync(&feed.entries, feed.newest);
        if let Some(newest) = feed.newest {
            if previous_newest != Some(newest) {
                self.center_on(newest, self.config.centering.newest_scale);
            }
        }
        changed
    }

    // ----- centering -----

    /// Start centering on `id` at `target_scale`.
    ///
    /// Unknown ids are a no-op. Returns true if the viewport was handed to
    /// the centering animator (or jumped, under reduced motion).
    pub fn center_on(&mut self, id: EntryId, target_scale: f32) -> bool {
        let Some(placement) = self.layout.placement(id) else {
            tracing::debug!(entry = id, "centering requested for unplaced entry");
            return false;
        };
        let duration = if self.config.centering.reduced_motion {
            0.0
        } else {
            self.config.centering.duration_ms
        };
        let animator = CenteringAnimator::new(
            id,
            placement.position,
            target_scale,
            duration,
            &self.viewport,
        );
        if !self.owner.begin_centering(animator) {
            return false;
        }
        self.viewport.stop_animation();
        if self.config.centering.reduced_motion {
            // A zero-length tween finishes on its first step
            self.owner.step(0.0, &mut self.viewport);
        }
        true
    }

    /// Entry whose card covers `point`, top-most first
    pub fn entry_at(&self, point: Vec2) -> Option<EntryId> {
        if !point.is_finite() {
            return None;
        }
        let scale = self.viewport.scale();
        let half = Vec2::new(
            self.config.centering.card_width * scale / 2.0,
            self.config.centering.card_height * scale / 2.0,
        );
        self.items()
            .into_iter()
            .filter(|item| {
                let card = self
                    .viewport
                    .container_to_screen(Vec2::new(item.screen_x, item.screen_y));
                (point.x - card.x).abs() <= half.x && (point.y - card.y).abs() <= half.y
            })
            .max_by_key(|item| item.depth)
            .map(|item| item.id)
    }

    /// Explicit selection: center on the card under `point`
    pub fn select_at(&mut self, point: Vec2) -> Option<EntryId> {
        let id = self.entry_at(point)?;
        self.center_on(id, self.config.centering.select_scale);
        Some(id)
    }

    // ----- frames -----

    /// Advance every per-frame driver and lay out the entries
    pub fn tick(&mut self, now_ms: f64) -> Frame {
        self.owner.step(now_ms, &mut self.viewport);
        if self.owner.allows_autopan() {
            self.autopan.step(&mut self.viewport);
        }
        self.viewport.update_animation();
        self.refresh_items();
        self.frame(now_ms)
    }

    /// Lay out the entries for the current viewport without advancing time
    pub fn frame(&self, now_ms: f64) -> Frame {
        Frame {
            time_ms: now_ms,
            owner: self.owner.name(),
            viewport: ViewportTransform::from(&self.viewport),
            items: self.items(),
        }
    }

    fn items(&self) -> Vec<RenderItem> {
        match &self.rendered {
            Some(rendered) if rendered.is_current(&self.viewport, &self.layout) => {
                rendered.items.clone()
            }
            _ => self.layout.layout(&self.viewport),
        }
    }

    fn refresh_items(&mut self) {
        if self
            .rendered
            .as_ref()
            .is_some_and(|rendered| rendered.is_current(&self.viewport, &self.layout))
        {
            return;
        }
        let items = self.layout.layout(&self.viewport);
        tracing::trace!(
            viewport_revision = self.viewport.revision(),
            layout_revision = self.layout.revision(),
            items = items.len(),
            "entries laid out"
        );
        self.rendered = Some(RenderedItems {
            viewport_revision: self.viewport.revision(),
            layout_revision: self.layout.revision(),
            items,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CenteringConfig, ConfigError, DeviceProfile, MomentumConfig};
    use crate::feed::Entry;

    fn feed(ids: impl IntoIterator<Item = EntryId>, newest: Option<EntryId>) -> EntryFeed {
        EntryFeed::new(
            ids.into_iter()
                .map(|id| Entry::new(id, format!("guest {id}"), "congrats"))
                .collect(),
            newest,
        )
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), 1000.0, 800.0).unwrap()
    }

    fn settle(engine: &mut Engine, mut now: f64) -> f64 {
        for _ in 0..1000 {
            engine.tick(now);
            now += 16.0;
            if *engine.owner() == ViewportOwner::Idle {
                return now;
            }
        }
        panic!("engine did not settle");
    }

    // ========== Construction ==========

    #[test]
    fn new_rejects_invalid_config() {
        let config = EngineConfig {
            momentum: MomentumConfig {
                damping: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            Engine::new(config, 1000.0, 800.0),
            Err(ConfigError::Invalid(_))
        ));

        let config = EngineConfig {
            momentum: MomentumConfig {
                gain: f32::NAN,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(Engine::new(config, 1000.0, 800.0).is_err());
    }

    // ========== Gestures ==========

    #[test]
    fn drag_pans_and_release_starts_momentum() {
        let mut engine = engine();
        engine.pointer_down(&PointerEvent::mouse(500.0, 400.0, 0.0));
        assert_eq!(*engine.owner(), ViewportOwner::Panning);

        engine.pointer_move(&PointerEvent::mouse(520.0, 400.0, 16.0));
        assert_eq!(engine.viewport().offset(), Vec2::new(20.0, 0.0));

        engine.pointer_up(&PointerEvent::mouse(520.0, 400.0, 32.0));
        assert_eq!(engine.owner().name(), "momentum");

        settle(&mut engine, 48.0);
        assert!(engine.viewport().offset().x > 20.0);
    }

    #[test]
    fn new_gesture_stops_momentum_deltas() {
        let mut engine = engine();
        engine.pointer_down(&PointerEvent::mouse(500.0, 400.0, 0.0));
        engine.pointer_move(&PointerEvent::mouse(540.0, 400.0, 16.0));
        engine.pointer_up(&PointerEvent::mouse(540.0, 400.0, 32.0));
        engine.tick(200.0);

        engine.pointer_down(&PointerEvent::mouse(500.0, 400.0, 216.0));
        let held = engine.viewport().offset();
        for frame in 0..30 {
            engine.tick(232.0 + frame as f64 * 16.0);
        }
        assert_eq!(engine.viewport().offset(), held);
        assert_eq!(*engine.owner(), ViewportOwner::Panning);
    }

    #[test]
    fn two_wheel_zoom_outs_reach_081() {
        let mut engine = engine();
        let notch = WheelEvent {
            delta_y: 100.0,
            modifier: true,
            timestamp_ms: 0.0,
        };
        assert!(engine.wheel(&notch));
        assert!(engine.wheel(&notch));
        settle(&mut engine, 0.0);
        for frame in 0..200 {
            engine.tick(frame as f64 * 16.0);
        }
        assert!((engine.viewport().scale() - 0.81).abs() < 1e-6);
    }

    // ========== Autopan ==========

    #[test]
    fn hover_near_edge_autopans_until_gesture() {
        let mut engine = engine();
        engine.hover(Vec2::new(10.0, 400.0));
        engine.tick(0.0);
        let after_one = engine.viewport().offset();
        assert!(after_one.x > 0.0);

        engine.pointer_down(&PointerEvent::mouse(10.0, 400.0, 16.0));
        engine.tick(32.0);
        assert_eq!(engine.viewport().offset(), after_one);
    }

    #[test]
    fn touch_profile_never_autopans() {
        let mut engine =
            Engine::new(EngineConfig::for_device(DeviceProfile::Touch), 1000.0, 800.0).unwrap();
        engine.hover(Vec2::new(10.0, 10.0));
        engine.tick(0.0);
        assert_eq!(engine.viewport().offset(), Vec2::ZERO);
        assert_eq!(engine.tracker().get(), None);
    }

    #[test]
    fn leaving_surface_stops_autopan() {
        let mut engine = engine();
        engine.hover(Vec2::new(990.0, 400.0));
        engine.leave();
        engine.tick(0.0);
        assert_eq!(engine.viewport().offset(), Vec2::ZERO);
    }

    // ========== Centering ==========

    #[test]
    fn newest_entry_is_centered_on_registration() {
        let mut engine = engine();
        engine.sync(&feed(1..=5, None));
        assert_eq!(*engine.owner(), ViewportOwner::Idle);

        let next = feed(1..=5, None).prepend(Entry::new(6, "new guest", "hi"));
        engine.sync(&next);
        assert_eq!(engine.owner().name(), "centering");

        settle(&mut engine, 0.0);
        assert_eq!(engine.viewport().offset(), Vec2::ZERO);
        assert_eq!(engine.viewport().scale(), 1.5);
    }

    #[test]
    fn center_on_unknown_id_is_noop() {
        let mut engine = engine();
        engine.sync(&feed(1..=3, None));
        assert!(!engine.center_on(99, 1.5));
        assert_eq!(*engine.owner(), ViewportOwner::Idle);
    }

    #[test]
    fn center_on_preempts_momentum() {
        let mut engine = engine();
        engine.sync(&feed(1..=3, None));
        engine.pointer_down(&PointerEvent::mouse(500.0, 400.0, 0.0));
        engine.pointer_move(&PointerEvent::mouse(540.0, 400.0, 16.0));
        engine.pointer_up(&PointerEvent::mouse(540.0, 400.0, 32.0));
        assert!(engine.center_on(2, 1.5));

        let target = -engine.layout().placement(2).unwrap().position;
        settle(&mut engine, 48.0);
        assert_eq!(engine.viewport().offset(), target);
    }

    #[test]
    fn reduced_motion_jumps_immediately() {
        let config = EngineConfig {
            centering: CenteringConfig {
                reduced_motion: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut engine = Engine::new(config, 1000.0, 800.0).unwrap();
        engine.sync(&feed(1..=3, None));
        let target = -engine.layout().placement(3).unwrap().position;

        assert!(engine.center_on(3, 2.0));
        assert_eq!(*engine.owner(), ViewportOwner::Idle);
        assert_eq!(engine.viewport().offset(), target);
        assert_eq!(engine.viewport().scale(), 2.0);
    }

    #[test]
    fn select_at_hits_the_pinned_card() {
        let mut engine = engine();
        engine.sync(&feed([2], Some(2)));
        settle(&mut engine, 0.0);

        // Pinned newest entry sits on the screen center after centering
        assert_eq!(engine.entry_at(Vec2::new(500.0, 400.0)), Some(2));
        assert_eq!(engine.select_at(Vec2::new(510.0, 395.0)), Some(2));
        assert_eq!(engine.owner().name(), "centering");
    }

    #[test]
    fn select_at_empty_space_does_nothing() {
        let mut engine = engine();
        assert_eq!(engine.select_at(Vec2::new(500.0, 400.0)), None);
        assert_eq!(engine.select_at(Vec2::new(f32::NAN, 0.0)), None);
    }

    #[test]
    fn place_overrides_pending_centering() {
        let mut engine = engine();
        engine.sync(&feed(1..=3, Some(1)));
        assert_eq!(engine.owner().name(), "centering");

        engine.place(Vec2::new(250.0, -40.0));
        assert!(engine.is_settled());
        engine.tick(16.0);
        assert_eq!(engine.viewport().offset(), Vec2::new(250.0, -40.0));
    }

    // ========== Frames ==========

    #[test]
    fn unchanged_revisions_reuse_laid_out_items() {
        let mut engine = engine();
        engine.sync(&feed(1..=3, None));
        let first = engine.tick(0.0);
        assert_eq!(first.items.len(), 3);

        // Tamper with the cache: a tick with nothing moved must hand it back
        if let Some(rendered) = engine.rendered.as_mut() {
            rendered.items.clear();
        }
        assert!(engine.tick(16.0).items.is_empty());
        assert!(engine.frame(20.0).items.is_empty());

        // Any viewport mutation invalidates it
        engine.place(Vec2::new(40.0, 0.0));
        let moved = engine.tick(32.0);
        assert_eq!(moved.items.len(), 3);
        assert_ne!(moved.items, first.items);

        // So does a layout change
        if let Some(rendered) = engine.rendered.as_mut() {
            rendered.items.clear();
        }
        engine.set_render_cap(Some(1));
        assert_eq!(engine.tick(48.0).items.len(), 1);
    }

    #[test]
    fn frame_serializes_render_contract() {
        let mut engine = engine();
        engine.sync(&feed([7], Some(7)));
        engine.center_on(7, 1.0);
        settle(&mut engine, 0.0);

        let frame = engine.frame(1000.0);
        let hue = frame.items[0].hue;
        assert!(hue < 360);
        let json = serde_json::to_string(&frame)
            .unwrap()
            .replace(&format!("\"hue\":{hue}"), "\"hue\":0");
        insta::assert_snapshot!(json, @r#"{"time_ms":1000.0,"owner":"idle","viewport":{"offset_x":0.0,"offset_y":0.0,"scale":1.0},"items":[{"id":7,"screen_x":500.0,"screen_y":400.0,"speed_factor":1.0,"hue":0,"depth":10}]}"#);
    }
}
