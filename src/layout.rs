//! Toroidal layout: fixed plane placements, parallax and wrap-around
//!
//! Every entry gets a position on a bounded plane, a parallax speed factor
//! and a hue the first time it is seen. Placements are keyed by entry id and
//! survive collection refreshes (unless the reshuffle policy says otherwise),
//! so cards never jump when the store hands over a new list.
//!
//! For a viewport offset `o` and an entry at `p` with speed `s`:
//!
//! ```text
//! adjusted = o * s
//! wrapped  = wrap(p + adjusted, plane)
//! delta    = wrapped - adjusted
//! ```
//!
//! `delta` is the entry's position relative to the screen center. Entries
//! with `s != 1` slide faster or slower than the plane as it pans, and every
//! entry re-enters from the opposite side once it leaves the plane.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{LayoutConfig, PlaneConfig, ReshufflePolicy};
use crate::feed::{Entry, EntryId};
use crate::geometry::Vec2;
use crate::viewport::Viewport;

/// Wrap `value` into `[-extent / 2, extent / 2)`.
///
/// Non-finite input (or a non-positive extent) maps to 0 so a runaway
/// offset can never poison the render output.
pub fn wrap(value: f32, extent: f32) -> f32 {
    if !(value.is_finite() && extent.is_finite() && extent > 0.0) {
        return 0.0;
    }
    let half = extent / 2.0;
    let wrapped = (value + half).rem_euclid(extent) - half;
    // rem_euclid may round up to `extent` itself for tiny negative input
    if wrapped >= half {
        wrapped - extent
    } else {
        wrapped
    }
}

/// Fixed placement of one entry on the plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vec2,
    pub speed_factor: f32,
    /// Display hue in [0, 360)
    pub hue: u16,
}

impl Placement {
    /// Stacking order: faster (closer) entries draw on top
    pub fn depth(&self) -> i32 {
        (self.speed_factor * 10.0).floor() as i32
    }

    /// Position relative to the screen center for the given viewport offset
    pub fn screen_delta(&self, offset: Vec2, plane: &PlaneConfig) -> Vec2 {
        let adjusted = offset * self.speed_factor;
        let raw = self.position + adjusted;
        let wrapped = Vec2::new(wrap(raw.x, plane.width), wrap(raw.y, plane.height));
        wrapped - adjusted
    }
}

/// Per-entry output handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderItem {
    pub id: EntryId,
    pub screen_x: f32,
    pub screen_y: f32,
    pub speed_factor: f32,
    pub hue: u16,
    pub depth: i32,
}

/// Owner of the id -> placement map
#[derive(Debug, Clone)]
pub struct ToroidalLayout {
    plane: PlaneConfig,
    config: LayoutConfig,
    render_cap: Option<usize>,
    placements: HashMap<EntryId, Placement>,
    /// Identity of the collection placements were last synced against
    collection: Option<Arc<[Entry]>>,
    newest: Option<EntryId>,
    /// Entry currently pinned to the origin
    pinned: Option<EntryId>,
    generation: u64,
    /// Bumped whenever placements or the visible set change
    revision: u64,
}

impl ToroidalLayout {
    pub fn new(plane: PlaneConfig, config: LayoutConfig) -> Self {
        Self {
            plane,
            config,
            render_cap: config.render_cap,
            placements: HashMap::new(),
            collection: None,
            newest: None,
            pinned: None,
            generation: 0,
            revision: 0,
        }
    }

    pub fn plane(&self) -> &PlaneConfig {
        &self.plane
    }

    pub fn placement(&self, id: EntryId) -> Option<&Placement> {
        self.placements.get(&id)
    }

    /// Number of assigned placements
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Number of collection refreshes seen so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Changes whenever [`ToroidalLayout::layout`] could return something new
    /// for the same viewport
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn newest(&self) -> Option<EntryId> {
        self.newest
    }

    pub fn render_cap(&self) -> Option<usize> {
        self.render_cap
    }

    /// Entries that are positioned and rendered, in collection order
    pub fn visible_entries(&self) -> &[Entry] {
        match &self.collection {
            Some(entries) => {
                let cap = self.render_cap.unwrap_or(entries.len()).min(entries.len());
                &entries[..cap]
            }
            None => &[],
        }
    }

    /// Bring placements in line with an entry collection.
    ///
    /// Passing the same `Arc` again with the same newest marker is a no-op,
    /// which keeps placements stable across re-renders. Returns true if
    /// anything was (re)assigned.
    pub fn sync(&mut self, entries: &Arc<[Entry]>, newest: Option<EntryId>) -> bool {
        let same_collection = self
            .collection
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, entries));
        if same_collection && newest == self.newest {
            return false;
        }

        if !same_collection {
            self.generation += 1;
            if self.config.reshuffle == ReshufflePolicy::Regenerate {
                self.placements.clear();
                self.pinned = None;
            }
            self.collection = Some(Arc::clone(entries));
        }
        self.newest = newest;
        self.assign();

        tracing::debug!(
            generation = self.generation,
            entries = entries.len(),
            placed = self.placements.len(),
            newest = ?newest,
            "layout synced"
        );
        true
    }

    /// Change how many entries are positioned.
    ///
    /// Raising or lifting the cap assigns fresh placements to newly visible
    /// entries; entries that already had one keep it.
    pub fn set_render_cap(&mut self, cap: Option<usize>) {
        if self.render_cap != cap {
            self.render_cap = cap;
            self.assign();
        }
    }

    /// Screen positions for every visible entry
    pub fn layout(&self, viewport: &Viewport) -> Vec<RenderItem> {
        let center = viewport.screen_center();
        let offset = viewport.offset();
        self.visible_entries()
            .iter()
            .filter_map(|entry| {
                let placement = self.placements.get(&entry.id)?;
                let screen = center + placement.screen_delta(offset, &self.plane);
                Some(RenderItem {
                    id: entry.id,
                    screen_x: screen.x,
                    screen_y: screen.y,
                    speed_factor: placement.speed_factor,
                    hue: placement.hue,
                    depth: placement.depth(),
                })
            })
            .collect()
    }

    fn assign(&mut self) {
        let Some(entries) = self.collection.clone() else {
            return;
        };
        self.revision = self.revision.wrapping_add(1);

        let present: HashSet<EntryId> = entries.iter().map(|e| e.id).collect();
        self.placements.retain(|id, _| present.contains(id));

        // The previous newest entry goes back to an ordinary placement
        if let Some(previous) = self.pinned.take() {
            if Some(previous) != self.newest && present.contains(&previous) {
                let fresh = self.fresh_placement(previous);
                self.placements.insert(previous, fresh);
            }
        }

        let cap = self.render_cap.unwrap_or(entries.len()).min(entries.len());
        for entry in &entries[..cap] {
            if !self.placements.contains_key(&entry.id) {
                let fresh = self.fresh_placement(entry.id);
                self.placements.insert(entry.id, fresh);
            }
        }

        if let Some(newest) = self.newest.filter(|id| present.contains(id)) {
            let hue = match self.placements.get(&newest) {
                Some(existing) => existing.hue,
                None => self.fresh_placement(newest).hue,
            };
            self.placements.insert(
                newest,
                Placement {
                    position: Vec2::ZERO,
                    speed_factor: 1.0,
                    hue,
                },
            );
            self.pinned = Some(newest);
        }
    }

    /// Deterministic draw for `id`: the same seed, id and (under the
    /// regenerate policy) generation always give the same placement.
    fn fresh_placement(&self, id: EntryId) -> Placement {
        let salt = match self.config.reshuffle {
            ReshufflePolicy::Preserve => 0,
            ReshufflePolicy::Regenerate => self.generation,
        };
        let mut rng = StdRng::seed_from_u64(placement_seed(self.config.seed, id, salt));

        let half_w = self.plane.width / 2.0;
        let half_h = self.plane.height / 2.0;
        Placement {
            position: Vec2::new(
                rng.gen_range(-half_w..half_w),
                rng.gen_range(-half_h..half_h),
            ),
            speed_factor: rng.gen_range(self.config.speed_min..self.config.speed_max),
            hue: rng.gen_range(0..360),
        }
    }
}

fn splitmix64(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Stable across builds and platforms, unlike the std hashers
fn placement_seed(seed: u64, id: EntryId, salt: u64) -> u64 {
    splitmix64(splitmix64(splitmix64(seed) ^ id) ^ salt)
}
