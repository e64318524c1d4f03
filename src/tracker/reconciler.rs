//! Per-cart inventory reconciliation.

use std::collections::HashMap;
use std::mem;

use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::integration::Catalog;
use crate::sync::{SyncJob, SyncSink};
use crate::tracker::evidence::EvidenceBuffer;
use crate::tracker::item::{TrackKey, TrackState, TrackedItem};
use crate::tracker::matching::{self, Association, Detection};
use crate::tracker::summary::{InventorySummary, unix_timestamp};

/// What one call to [`InventoryReconciler::process_frame`] changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame_time: f64,
    /// Detections that passed the confidence and catalog filters
    pub accepted: usize,
    /// Existing items updated by a detection
    pub matched: Vec<TrackKey>,
    /// New candidates
    pub created: Vec<TrackKey>,
    /// Candidates promoted to the inventory (an add was submitted for each)
    pub confirmed: Vec<TrackKey>,
    /// Items dropped after the removal timeout
    pub evicted: Vec<TrackKey>,
}

/// Owns the tracked items of one cart and turns per-frame detections into
/// debounced add/remove requests.
///
/// Local state always commits first; ledger requests go to the sync sink and
/// their outcome never feeds back into tracking.
pub struct InventoryReconciler<C, S> {
    cart_id: String,
    config: TrackerConfig,
    catalog: C,
    sync: S,
    /// Insertion order; association scans items in this order.
    items: Vec<TrackedItem>,
    /// Present only for candidates.
    evidence: HashMap<TrackKey, EvidenceBuffer>,
    next_key: u64,
}

impl<C: Catalog, S: SyncSink> InventoryReconciler<C, S> {
    pub fn new(cart_id: impl Into<String>, config: TrackerConfig, catalog: C, sync: S) -> Self {
        Self {
            cart_id: cart_id.into(),
            config,
            catalog,
            sync,
            items: Vec::new(),
            evidence: HashMap::new(),
            next_key: 0,
        }
    }

    pub fn cart_id(&self) -> &str {
        &self.cart_id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Candidates and confirmed items, in creation order.
    pub fn tracked_items(&self) -> &[TrackedItem] {
        &self.items
    }

    pub fn item(&self, key: TrackKey) -> Option<&TrackedItem> {
        self.items.iter().find(|t| t.track_key() == key)
    }

    /// Evidence gathered so far for a candidate.
    pub fn evidence(&self, key: TrackKey) -> Option<&EvidenceBuffer> {
        self.evidence.get(&key)
    }

    pub fn confirmed_items(&self) -> impl Iterator<Item = &TrackedItem> {
        self.items.iter().filter(|t| t.is_confirmed())
    }

    pub fn sync_sink(&self) -> &S {
        &self.sync
    }

    pub fn sync_sink_mut(&mut self) -> &mut S {
        &mut self.sync
    }

    /// Forget every tracked item without telling the ledger.
    ///
    /// Keys handed out before the reset are still never reused.
    pub fn reset(&mut self) {
        self.items.clear();
        self.evidence.clear();
    }

    fn allocate_key(&mut self) -> TrackKey {
        self.next_key += 1;
        TrackKey::new(self.next_key)
    }

    fn accepts(&self, det: &Detection) -> bool {
        det.confidence >= self.config.confidence_threshold && self.catalog.contains(&det.label)
    }

    /// Fold one frame of detections into the tracked state.
    pub fn process_frame(&mut self, detections: &[Detection], frame_time: f64) -> FrameReport {
        let mut report = FrameReport {
            frame_time,
            ..Default::default()
        };

        // Step 1: Filter and associate
        let accepted: Vec<Detection> = detections
            .iter()
            .filter(|d| self.accepts(d))
            .cloned()
            .collect();
        report.accepted = accepted.len();
        if accepted.len() < detections.len() {
            debug!(
                cart_id = %self.cart_id,
                dropped = detections.len() - accepted.len(),
                "ignored low-confidence or uncatalogued detections"
            );
        }

        let Association {
            matches,
            unmatched_items,
            new_detections,
        } = matching::associate(
            &self.items,
            &accepted,
            self.config.iou_threshold,
            self.config.association,
        );

        // Step 2: Update matched items
        for (item_idx, det_idx) in matches {
            let det = &accepted[det_idx];
            let item = &mut self.items[item_idx];
            item.observe(det.bbox, det.confidence, frame_time);
            if let Some(buffer) = self.evidence.get_mut(&item.track_key()) {
                buffer.push(frame_time);
            }
            report.matched.push(item.track_key());
        }

        // Step 3: Seed candidates
        for det_idx in new_detections {
            let det = &accepted[det_idx];
            let Some(sku) = self.catalog.lookup_sku(&det.label).map(str::to_owned) else {
                continue;
            };
            let key = self.allocate_key();
            let item = TrackedItem::new(key, det.label.clone(), sku, det.bbox, det.confidence, frame_time);

            let mut buffer = EvidenceBuffer::new(self.config.stabilization_frames);
            buffer.push(frame_time);
            self.evidence.insert(key, buffer);

            debug!(
                cart_id = %self.cart_id,
                track_key = %key,
                label = %item.label(),
                confidence = item.confidence(),
                "new candidate"
            );
            self.items.push(item);
            report.created.push(key);
        }

        // Step 4: Confirm stable candidates
        for item in self.items.iter_mut() {
            let key = item.track_key();
            let stable = self.evidence.get(&key).is_some_and(EvidenceBuffer::is_full);
            if !stable || !item.confirm() {
                continue;
            }
            self.evidence.remove(&key);

            info!(
                cart_id = %self.cart_id,
                track_key = %key,
                label = %item.label(),
                sku = %item.sku(),
                confidence = item.confidence(),
                "[+] item confirmed"
            );
            self.sync.submit(SyncJob::add(&self.cart_id, item, frame_time));
            report.confirmed.push(key);
        }

        // Step 5: Evict stale items
        let timeout = self.config.removal_timeout_secs;
        let mut stale = vec![false; self.items.len()];
        for idx in unmatched_items {
            if self.items[idx].idle_for(frame_time) > timeout {
                stale[idx] = true;
            }
        }

        if stale.contains(&true) {
            let items = mem::take(&mut self.items);
            for (idx, item) in items.into_iter().enumerate() {
                if stale[idx] {
                    report.evicted.push(item.track_key());
                    self.evict(item, frame_time);
                } else {
                    self.items.push(item);
                }
            }
        }

        report
    }

    fn evict(&mut self, mut item: TrackedItem, frame_time: f64) {
        let key = item.track_key();
        let was = item.state();
        item.mark_evicted();
        self.evidence.remove(&key);

        match was {
            TrackState::Confirmed => {
                info!(
                    cart_id = %self.cart_id,
                    track_key = %key,
                    label = %item.label(),
                    sku = %item.sku(),
                    idle_secs = item.idle_for(frame_time),
                    "[-] item removed"
                );
                self.sync.submit(SyncJob::remove(&self.cart_id, &item, frame_time));
            }
            TrackState::Candidate | TrackState::Evicted => {
                debug!(
                    cart_id = %self.cart_id,
                    track_key = %key,
                    label = %item.label(),
                    "candidate expired"
                );
            }
        }
    }

    /// Confirmed inventory as of now.
    pub fn inventory_summary(&self) -> InventorySummary {
        self.inventory_summary_at(unix_timestamp())
    }

    pub fn inventory_summary_at(&self, timestamp: f64) -> InventorySummary {
        InventorySummary::from_items(&self.cart_id, timestamp, self.confirmed_items())
    }
}
