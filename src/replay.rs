//! Recorded input traces and the frame loop that replays them
//!
//! A trace is a list of timestamped input events. Replaying it drives an
//! [`Engine`] the way a browser would: frames tick at a fixed interval, and
//! every event is delivered between the frames that surround its timestamp.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{Engine, Frame};
use crate::feed::{Entry, EntryFeed, EntryId};
use crate::geometry::Vec2;
use crate::input::{PointerEvent, WheelEvent};
use crate::io::{IoError, read_document};

/// Default frame interval, in milliseconds
pub const DEFAULT_FRAME_MS: f64 = 16.0;

/// Upper bound on frames ticked between two events or while settling
const MAX_FRAMES_PER_GAP: u32 = 100_000;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error("invalid trace: {0}")]
    InvalidTrace(String),
}

pub type ReplayResult<T> = Result<T, ReplayError>;

/// One recorded input event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    Wheel(WheelEvent),
    Hover { x: f32, y: f32, at_ms: f64 },
    Leave { at_ms: f64 },
    Resize { width: f32, height: f32, at_ms: f64 },
    /// Explicit selection by click position
    Select { x: f32, y: f32, at_ms: f64 },
    CenterOn {
        id: EntryId,
        #[serde(default)]
        scale: Option<f32>,
        at_ms: f64,
    },
    /// The entry store reports a fresh submission
    Submit {
        id: EntryId,
        author: String,
        text: String,
        at_ms: f64,
    },
}

impl TraceEvent {
    /// When the event happened
    pub fn time_ms(&self) -> f64 {
        match self {
            TraceEvent::PointerDown(e) | TraceEvent::PointerMove(e) | TraceEvent::PointerUp(e) => {
                e.timestamp_ms
            }
            TraceEvent::Wheel(e) => e.timestamp_ms,
            TraceEvent::Hover { at_ms, .. }
            | TraceEvent::Leave { at_ms }
            | TraceEvent::Resize { at_ms, .. }
            | TraceEvent::Select { at_ms, .. }
            | TraceEvent::CenterOn { at_ms, .. }
            | TraceEvent::Submit { at_ms, .. } => *at_ms,
        }
    }
}

/// A recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    pub events: Vec<TraceEvent>,
}

fn default_frame_ms() -> f64 {
    DEFAULT_FRAME_MS
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TraceDocument {
    Events(Vec<TraceEvent>),
    Trace(Trace),
}

impl Trace {
    pub fn new(events: Vec<TraceEvent>) -> Self {
        Self {
            frame_ms: DEFAULT_FRAME_MS,
            events,
        }
    }

    /// Load a trace from a YAML or JSON file: either a bare event list or an
    /// object with `frame_ms` and `events`
    pub fn load(path: &Path) -> ReplayResult<Self> {
        let trace = match read_document(path)? {
            TraceDocument::Events(events) => Self::new(events),
            TraceDocument::Trace(trace) => trace,
        };
        trace.validate()?;
        tracing::debug!(
            path = %path.display(),
            events = trace.events.len(),
            frame_ms = trace.frame_ms,
            "loaded input trace"
        );
        Ok(trace)
    }

    pub fn validate(&self) -> ReplayResult<()> {
        if !(self.frame_ms.is_finite() && self.frame_ms > 0.0) {
            return Err(ReplayError::InvalidTrace(format!(
                "frame_ms must be positive and finite, got {}",
                self.frame_ms
            )));
        }
        if let Some(event) = self.events.iter().find(|e| !e.time_ms().is_finite()) {
            return Err(ReplayError::InvalidTrace(format!(
                "event timestamp must be finite: {event:?}"
            )));
        }
        Ok(())
    }
}

/// Drives an engine through a trace frame by frame
pub struct Replayer<'a> {
    engine: &'a mut Engine,
    feed: EntryFeed,
    frame_ms: f64,
    clock_ms: f64,
    frames: u64,
}

impl<'a> Replayer<'a> {
    /// Hand `feed` to the engine and start the clock at `start_ms`
    pub fn new(engine: &'a mut Engine, feed: EntryFeed, frame_ms: f64, start_ms: f64) -> Self {
        engine.sync(&feed);
        Self {
            engine,
            feed,
            frame_ms,
            clock_ms: start_ms,
            frames: 0,
        }
    }

    /// Frames ticked so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Tick frames up to `time_ms`, calling `on_frame` for each
    pub fn advance_to(&mut self, time_ms: f64, on_frame: &mut impl FnMut(&Frame)) {
        let mut ticked = 0;
        while self.clock_ms + self.frame_ms <= time_ms {
            if ticked == MAX_FRAMES_PER_GAP {
                tracing::warn!(
                    from = self.clock_ms,
                    to = time_ms,
                    "trace gap too long, skipping ahead"
                );
                self.clock_ms = time_ms;
                break;
            }
            self.tick(on_frame);
            ticked += 1;
        }
    }

    /// Deliver one event to the engine
    pub fn apply(&mut self, event: &TraceEvent) {
        tracing::trace!(?event, "replaying event");
        match event {
            TraceEvent::PointerDown(e) => self.engine.pointer_down(e),
            TraceEvent::PointerMove(e) => self.engine.pointer_move(e),
            TraceEvent::PointerUp(e) => self.engine.pointer_up(e),
            TraceEvent::Wheel(e) => {
                self.engine.wheel(e);
            }
            TraceEvent::Hover { x, y, .. } => self.engine.hover(Vec2::new(*x, *y)),
            TraceEvent::Leave { .. } => self.engine.leave(),
            TraceEvent::Resize { width, height, .. } => self.engine.resize(*width, *height),
            TraceEvent::Select { x, y, .. } => {
                self.engine.select_at(Vec2::new(*x, *y));
            }
            TraceEvent::CenterOn { id, scale, .. } => {
                let scale = scale.unwrap_or(self.engine.config().centering.select_scale);
                self.engine.center_on(*id, scale);
            }
            TraceEvent::Submit {
                id, author, text, ..
            } => {
                self.feed = self.feed.prepend(Entry::new(*id, author.as_str(), text.as_str()));
                self.engine.sync(&self.feed);
            }
        }
    }

    /// Tick until momentum, centering and eased zoom have all finished
    pub fn settle(&mut self, on_frame: &mut impl FnMut(&Frame)) {
        for _ in 0..MAX_FRAMES_PER_GAP {
            if self.engine.is_settled() {
                return;
            }
            self.tick(on_frame);
        }
        tracing::warn!(frames = self.frames, "engine did not settle");
    }

    /// Current frame without advancing time
    pub fn frame(&self) -> Frame {
        self.engine.frame(self.clock_ms)
    }

    fn tick(&mut self, on_frame: &mut impl FnMut(&Frame)) {
        self.clock_ms += self.frame_ms;
        self.frames += 1;
        let frame = self.engine.tick(self.clock_ms);
        on_frame(&frame);
    }
}

/// Replay `trace` against `engine` from `feed` and return the settled frame
pub fn replay(
    engine: &mut Engine,
    feed: EntryFeed,
    trace: &Trace,
    mut on_frame: impl FnMut(&Frame),
) -> Frame {
    let start = trace.events.first().map_or(0.0, TraceEvent::time_ms);
    let mut replayer = Replayer::new(engine, feed, trace.frame_ms, start);
    for event in &trace.events {
        replayer.advance_to(event.time_ms(), &mut on_frame);
        replayer.apply(event);
    }
    replayer.settle(&mut on_frame);
    tracing::info!(
        events = trace.events.len(),
        frames = replayer.frames(),
        "replay finished"
    );
    replayer.frame()
}
