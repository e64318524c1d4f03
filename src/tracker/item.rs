//! Tracked items owned by the inventory reconciler.

use std::fmt;

use serde::Serialize;

use crate::tracker::bbox::BoundingBox;

/// Stable identifier of a tracked item.
///
/// Keys are handed out by a single reconciler in increasing order and never
/// reused after the item is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackKey(u64);

impl TrackKey {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Track state enumeration for the item lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    /// Seen, but not yet stable enough to count as in the cart
    #[default]
    Candidate,
    /// Part of the inventory; the ledger has been asked to add it
    Confirmed,
    /// Removed from tracking
    Evicted,
}

/// An object the reconciler believes may be, or is, in the cart.
///
/// `label` and `sku` are fixed at creation. Everything else is updated through
/// [`TrackedItem::observe`] and [`TrackedItem::confirm`], which keep the
/// monotonic fields monotonic.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedItem {
    track_key: TrackKey,
    label: String,
    sku: String,
    bbox: BoundingBox,
    confidence: f32,
    last_seen: f64,
    detection_count: u32,
    state: TrackState,
    quantity: u32,
}

impl TrackedItem {
    /// Create an unconfirmed candidate from its first detection.
    pub fn new(
        track_key: TrackKey,
        label: impl Into<String>,
        sku: impl Into<String>,
        bbox: BoundingBox,
        confidence: f32,
        seen_at: f64,
    ) -> Self {
        Self {
            track_key,
            label: label.into(),
            sku: sku.into(),
            bbox,
            confidence,
            last_seen: seen_at,
            detection_count: 1,
            state: TrackState::Candidate,
            quantity: 1,
        }
    }

    pub fn track_key(&self) -> TrackKey {
        self.track_key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    /// Box from the most recent matching detection.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Highest confidence observed so far.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn last_seen(&self) -> f64 {
        self.last_seen
    }

    pub fn detection_count(&self) -> u32 {
        self.detection_count
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    /// Units this item stands for.
    ///
    /// Always 1: every tracked instance is one unit. Grouping identical SKUs
    /// into a single entry with a larger quantity would hook in here.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Seconds since the last matching detection, as of `now`.
    pub fn idle_for(&self, now: f64) -> f64 {
        now - self.last_seen
    }

    /// Fold a matching detection into the item.
    pub fn observe(&mut self, bbox: BoundingBox, confidence: f32, seen_at: f64) {
        self.bbox = bbox;
        self.confidence = self.confidence.max(confidence);
        self.last_seen = self.last_seen.max(seen_at);
        self.detection_count = self.detection_count.saturating_add(1);
    }

    /// Promote a candidate to the inventory.
    ///
    /// Returns `true` only on the candidate-to-confirmed transition.
    pub fn confirm(&mut self) -> bool {
        if self.state != TrackState::Candidate {
            return false;
        }
        self.state = TrackState::Confirmed;
        true
    }

    pub(crate) fn mark_evicted(&mut self) {
        self.state = TrackState::Evicted;
    }
}
