//! Integration module for connecting sensors, detection backends and the
//! product catalog with the inventory reconciler.
//!
//! The camera, the model and the catalog are external collaborators; this
//! module only fixes the narrow traits they are consumed through, plus a
//! recording-backed source/detector pair for offline runs.

mod builder;
mod catalog;
mod detector;
mod pipeline;
mod replay;

pub use builder::DetectionBuilder;
pub use catalog::{Catalog, CatalogError, SkuCatalog};
pub use detector::{DetectionSource, Frame, FrameSource, IntoDetections};
pub use pipeline::{DriverStats, FrameDriver};
pub use replay::{ReplayDetector, ReplayError, ReplaySource};
