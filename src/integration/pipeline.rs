//! FrameDriver for combining detection with inventory reconciliation.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::error::Error;
use crate::integration::catalog::Catalog;
use crate::integration::detector::{DetectionSource, Frame, FrameSource};
use crate::sync::SyncSink;
use crate::tracker::{FrameReport, InventoryReconciler};

/// Counters for one driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub frames_read: u64,
    pub frames_processed: u64,
    pub confirmed: u64,
    pub evicted: u64,
}

/// Runs the sensor → detector → reconciler path for one cart.
///
/// Only every `frame_skip`-th frame is run through the detector; the others are
/// read and discarded to bound compute cost.
pub struct FrameDriver<D, C, S> {
    detector: D,
    reconciler: InventoryReconciler<C, S>,
    frame_skip: u64,
    stats: DriverStats,
}

impl<D, C, S> FrameDriver<D, C, S>
where
    D: DetectionSource,
    C: Catalog,
    S: SyncSink,
{
    /// Create a driver; the sampling rate comes from the reconciler's config.
    pub fn new(detector: D, reconciler: InventoryReconciler<C, S>) -> Self {
        let frame_skip = u64::from(reconciler.config().frame_skip.max(1));
        Self {
            detector,
            reconciler,
            frame_skip,
            stats: DriverStats::default(),
        }
    }

    /// Feed a single frame.
    ///
    /// Returns `Ok(None)` when the frame was skipped by sampling.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<Option<FrameReport>, D::Error> {
        self.stats.frames_read += 1;
        if self.stats.frames_read % self.frame_skip != 0 {
            return Ok(None);
        }

        let detections = self.detector.detect(frame)?;
        let report = self.reconciler.process_frame(&detections, frame.timestamp);

        self.stats.frames_processed += 1;
        self.stats.confirmed += report.confirmed.len() as u64;
        self.stats.evicted += report.evicted.len() as u64;
        debug!(
            cart_id = %self.reconciler.cart_id(),
            frame = self.stats.frames_read,
            timestamp = frame.timestamp,
            detections = detections.len(),
            accepted = report.accepted,
            tracked = self.reconciler.tracked_items().len(),
            "frame processed"
        );
        Ok(Some(report))
    }

    /// Pull frames until the source ends or `stop` is set.
    ///
    /// `stop` is checked before every frame, so a frame in progress always
    /// completes.
    pub fn run<F>(&mut self, source: &mut F, stop: &AtomicBool) -> Result<DriverStats, Error>
    where
        F: FrameSource,
        F::Error: std::error::Error + Send + Sync + 'static,
        D::Error: std::error::Error + Send + Sync + 'static,
    {
        info!(cart_id = %self.reconciler.cart_id(), frame_skip = self.frame_skip, "starting frame loop");

        while !stop.load(Ordering::Relaxed) {
            let Some(frame) = source
                .next_frame()
                .map_err(|e| Error::Source(Box::new(e)))?
            else {
                info!(cart_id = %self.reconciler.cart_id(), "frame source exhausted");
                break;
            };
            self.process_frame(&frame)
                .map_err(|e| Error::Detector(Box::new(e)))?;
        }

        info!(
            cart_id = %self.reconciler.cart_id(),
            frames_read = self.stats.frames_read,
            frames_processed = self.stats.frames_processed,
            "frame loop stopped"
        );
        Ok(self.stats)
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying reconciler.
    pub fn reconciler(&self) -> &InventoryReconciler<C, S> {
        &self.reconciler
    }

    /// Get a mutable reference to the underlying reconciler.
    pub fn reconciler_mut(&mut self) -> &mut InventoryReconciler<C, S> {
        &mut self.reconciler
    }

    pub fn into_reconciler(self) -> InventoryReconciler<C, S> {
        self.reconciler
    }
}
