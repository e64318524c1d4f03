mod bbox;
mod evidence;
mod item;
mod matching;
mod reconciler;
mod summary;

pub use bbox::{BoundingBox, iou_matrix};
pub use evidence::EvidenceBuffer;
pub use item::{TrackKey, TrackState, TrackedItem};
pub use matching::{
    Association, AssociationStrategy, Detection, associate, association_scores, first_match,
    optimal_assignment,
};
pub use reconciler::{FrameReport, InventoryReconciler};
pub use summary::{InventoryLine, InventorySummary, unix_timestamp};
