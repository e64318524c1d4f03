//! Propagation of confirmed inventory changes to the remote ledger.
//!
//! The reconciler submits [`SyncJob`]s to a [`SyncSink`]. In production the
//! sink is a [`SyncHandle`] feeding the cart's single [`SyncWorker`], which
//! delivers jobs in order through a [`LedgerClient`] with bounded retries.
//! Local state never waits on the ledger; jobs that still fail are handed to a
//! [`DivergenceHandler`].

mod client;
mod payload;
mod worker;

#[cfg(test)]
mod stub;

pub use client::{Ledger, LedgerClient, SyncError, SyncStats};
pub use payload::{
    AddItemRequest, LedgerSummary, RemoveItemRequest, SyncJob, SyncOperation, SyncRequest,
};
pub use worker::{DivergenceHandler, SyncHandle, SyncOutcome, SyncSink, SyncWorker};
