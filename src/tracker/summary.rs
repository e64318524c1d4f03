use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::tracker::item::TrackedItem;

/// One inventory entry as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryLine {
    pub label: String,
    pub sku: String,
    pub confidence: f32,
    pub detection_count: u32,
    pub quantity: u32,
}

/// Snapshot of a cart's confirmed inventory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub cart_id: String,
    pub timestamp: f64,
    pub item_count: usize,
    pub items: Vec<InventoryLine>,
}

impl InventorySummary {
    pub fn from_items<'a>(
        cart_id: &str,
        timestamp: f64,
        items: impl IntoIterator<Item = &'a TrackedItem>,
    ) -> Self {
        let items: Vec<InventoryLine> = items
            .into_iter()
            .map(|item| InventoryLine {
                label: item.label().to_string(),
                sku: item.sku().to_string(),
                confidence: item.confidence(),
                detection_count: item.detection_count(),
                quantity: item.quantity(),
            })
            .collect();

        Self {
            cart_id: cart_id.to_string(),
            timestamp,
            item_count: items.len(),
            items,
        }
    }

    /// Units across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

/// Seconds since the Unix epoch; 0 if the clock is before it.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
