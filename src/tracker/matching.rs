//! Association of per-frame detections with tracked items.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tracker::bbox::{BoundingBox, iou_matrix};
use crate::tracker::item::TrackedItem;

/// Detection input for the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detector class name
    pub label: String,
    /// Bounding box in TLBR format (x1, y1, x2, y2)
    pub bbox: BoundingBox,
    /// Detection confidence score in [0, 1]
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32) -> Self {
        Self {
            label: label.into(),
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence,
        }
    }

    pub fn from_box(label: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence,
        }
    }
}

/// How detections are bound to tracked items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationStrategy {
    /// Each detection takes the first free tracked item (insertion order) whose
    /// IoU exceeds the threshold. Reproducible, but can misassociate under dense
    /// same-label clutter.
    #[default]
    FirstMatch,
    /// Globally optimal assignment over the IoU matrix (Jonker-Volgenant).
    Optimal,
}

/// Result of associating one frame's detections.
///
/// Indices refer to the tracked-item slice and the detection slice passed to
/// [`associate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Association {
    /// (item index, detection index) pairs
    pub matches: Vec<(usize, usize)>,
    /// Tracked items that received no detection this frame
    pub unmatched_items: Vec<usize>,
    /// Detections that seed new candidates
    pub new_detections: Vec<usize>,
}

/// IoU between every tracked item and every detection, zeroed where labels differ.
pub fn association_scores(items: &[TrackedItem], detections: &[Detection]) -> Array2<f32> {
    let item_boxes: Vec<BoundingBox> = items.iter().map(|t| t.bbox()).collect();
    let det_boxes: Vec<BoundingBox> = detections.iter().map(|d| d.bbox).collect();
    let mut scores = iou_matrix(&item_boxes, &det_boxes);

    for (i, item) in items.iter().enumerate() {
        for (j, det) in detections.iter().enumerate() {
            if item.label() != det.label {
                scores[[i, j]] = 0.0;
            }
        }
    }
    scores
}

pub fn associate(
    items: &[TrackedItem],
    detections: &[Detection],
    iou_threshold: f32,
    strategy: AssociationStrategy,
) -> Association {
    let scores = association_scores(items, detections);
    match strategy {
        AssociationStrategy::FirstMatch => first_match(&scores, iou_threshold),
        AssociationStrategy::Optimal => optimal_assignment(&scores, iou_threshold),
    }
}

/// Greedy first-match binding over a score matrix of shape (items, detections).
///
/// A pair is eligible only when its score is strictly greater than `iou_threshold`.
pub fn first_match(scores: &Array2<f32>, iou_threshold: f32) -> Association {
    let (num_rows, num_cols) = scores.dim();
    let mut item_taken = vec![false; num_rows];
    let mut matches = vec![];
    let mut new_detections = vec![];

    for col in 0..num_cols {
        let found = (0..num_rows).find(|&row| !item_taken[row] && scores[[row, col]] > iou_threshold);
        match found {
            Some(row) => {
                item_taken[row] = true;
                matches.push((row, col));
            }
            None => new_detections.push(col),
        }
    }

    let unmatched_items = item_taken
        .iter()
        .enumerate()
        .filter_map(|(i, &taken)| if taken { None } else { Some(i) })
        .collect();

    Association {
        matches,
        unmatched_items,
        new_detections,
    }
}

/// Minimum-cost assignment on `1 - score`, keeping pairs whose score exceeds
/// `iou_threshold`.
pub fn optimal_assignment(scores: &Array2<f32>, iou_threshold: f32) -> Association {
    let (num_rows, num_cols) = scores.dim();

    if num_rows == 0 {
        return Association {
            matches: vec![],
            unmatched_items: vec![],
            new_detections: (0..num_cols).collect(),
        };
    }

    if num_cols == 0 {
        return Association {
            matches: vec![],
            unmatched_items: (0..num_rows).collect(),
            new_detections: vec![],
        };
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);

    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = 1.0 - scores[[i, j]] as f64;
        }
    }

    let row_to_col = match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => row_to_col,
        Err(e) => {
            warn!(error = ?e, "linear assignment failed, falling back to first-match");
            return first_match(scores, iou_threshold);
        }
    };

    let mut matches = vec![];
    let mut unmatched_items = vec![];
    let mut unmatched_detections_mask = vec![true; num_cols];

    for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
        if col_idx < num_cols && scores[[row_idx, col_idx]] > iou_threshold {
            matches.push((row_idx, col_idx));
            unmatched_detections_mask[col_idx] = false;
        } else {
            unmatched_items.push(row_idx);
        }
    }
    matches.sort_by_key(|&(_, col)| col);

    let new_detections = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect();

    Association {
        matches,
        unmatched_items,
        new_detections,
    }
}
