//! Ledger wire payloads.

use serde::{Deserialize, Serialize};

use crate::tracker::{TrackKey, TrackedItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Add,
    Remove,
}

impl SyncOperation {
    /// Path of the ledger endpoint, relative to the base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            SyncOperation::Add => "add_item",
            SyncOperation::Remove => "remove_item",
        }
    }
}

/// Body of `POST /add_item`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddItemRequest {
    pub cart_id: String,
    pub sku: String,
    pub label: String,
    pub confidence: f32,
    pub timestamp: f64,
}

/// Body of `POST /remove_item`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoveItemRequest {
    pub cart_id: String,
    pub sku: String,
    pub label: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SyncRequest {
    Add(AddItemRequest),
    Remove(RemoveItemRequest),
}

impl SyncRequest {
    pub fn operation(&self) -> SyncOperation {
        match self {
            SyncRequest::Add(_) => SyncOperation::Add,
            SyncRequest::Remove(_) => SyncOperation::Remove,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        self.operation().endpoint()
    }

    pub fn cart_id(&self) -> &str {
        match self {
            SyncRequest::Add(r) => &r.cart_id,
            SyncRequest::Remove(r) => &r.cart_id,
        }
    }

    pub fn sku(&self) -> &str {
        match self {
            SyncRequest::Add(r) => &r.sku,
            SyncRequest::Remove(r) => &r.sku,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SyncRequest::Add(r) => &r.label,
            SyncRequest::Remove(r) => &r.label,
        }
    }
}

/// A ledger request tagged with the item it concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncJob {
    pub track_key: TrackKey,
    pub request: SyncRequest,
}

impl SyncJob {
    pub fn add(cart_id: &str, item: &TrackedItem, timestamp: f64) -> Self {
        Self {
            track_key: item.track_key(),
            request: SyncRequest::Add(AddItemRequest {
                cart_id: cart_id.to_string(),
                sku: item.sku().to_string(),
                label: item.label().to_string(),
                confidence: item.confidence(),
                timestamp,
            }),
        }
    }

    pub fn remove(cart_id: &str, item: &TrackedItem, timestamp: f64) -> Self {
        Self {
            track_key: item.track_key(),
            request: SyncRequest::Remove(RemoveItemRequest {
                cart_id: cart_id.to_string(),
                sku: item.sku().to_string(),
                label: item.label().to_string(),
                timestamp,
            }),
        }
    }

    pub fn operation(&self) -> SyncOperation {
        self.request.operation()
    }
}

/// Response of `GET /cart/{cart_id}/summary`: the ledger's view of a cart.
///
/// Item entries are kept as raw JSON; their shape is owned by the ledger.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LedgerSummary {
    pub cart_id: String,
    #[serde(default)]
    pub timestamp: f64,
    pub item_count: usize,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}
