//! driftwall - a pannable, zoomable wall of entries on a wrap-around plane.
//!
//! This crate provides the spatial viewport and infinite-wrap layout engine:
//! viewport state, gesture interpretation, momentum, edge autopan, toroidal
//! layout with parallax, and centering. Platform wiring is left to a thin
//! adapter; the bundled binary replays recorded input traces.

pub mod autopan;
pub mod centering;
pub mod config;
pub mod engine;
pub mod feed;
pub mod geometry;
pub mod input;
pub mod io;
pub mod layout;
pub mod momentum;
pub mod owner;
pub mod replay;
pub mod viewport;

pub use config::EngineConfig;
pub use engine::{Engine, Frame};
pub use feed::{Entry, EntryFeed, EntryId};
pub use geometry::Vec2;
