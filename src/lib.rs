//! Detection-to-inventory reconciliation for camera-equipped shopping carts.
//!
//! Per-frame detections are associated with tracked items by IoU, debounced
//! into a confirmed inventory, and confirmed additions/removals are pushed to a
//! remote ledger with bounded retries.

pub mod config;
pub mod error;
pub mod integration;
pub mod sync;
pub mod tracker;

pub use config::{AppConfig, ConfigError, SyncConfig, TrackerConfig};
pub use error::{Error, Result};
pub use integration::{
    Catalog, DetectionBuilder, DetectionSource, Frame, FrameDriver, FrameSource, SkuCatalog,
};
pub use sync::{Ledger, LedgerClient, SyncHandle, SyncJob, SyncSink, SyncWorker};
pub use tracker::{
    AssociationStrategy, BoundingBox, Detection, FrameReport, InventoryReconciler,
    InventorySummary, TrackKey, TrackState, TrackedItem,
};
