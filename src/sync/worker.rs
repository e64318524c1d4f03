//! Per-cart delivery of ledger requests off the frame path.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::sync::client::Ledger;
use crate::sync::payload::SyncJob;

/// Where the reconciler hands off ledger requests.
///
/// `submit` must not block the frame loop and cannot fail. A sink that can no
/// longer deliver must keep the job for its owner to collect, as
/// [`SyncHandle::take_orphaned`] does, rather than lose it.
pub trait SyncSink {
    fn submit(&mut self, job: SyncJob);
}

/// Collects jobs in submission order without delivering them.
impl SyncSink for Vec<SyncJob> {
    fn submit(&mut self, job: SyncJob) {
        self.push(job);
    }
}

/// Receives every job whose delivery exhausted its retries.
///
/// Each call marks a point where the local inventory and the ledger may
/// disagree. A periodic resync process plugs in here.
pub trait DivergenceHandler: Send {
    fn on_divergence(&mut self, job: SyncJob);
}

impl DivergenceHandler for Vec<SyncJob> {
    fn on_divergence(&mut self, job: SyncJob) {
        self.push(job);
    }
}

/// Sending half of a cart's sync queue.
///
/// Jobs submitted after the worker has stopped are held by the handle until
/// [`take_orphaned`](Self::take_orphaned) hands them to a divergence handler.
#[derive(Debug)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncJob>,
    orphaned: Vec<SyncJob>,
}

impl SyncHandle {
    /// Jobs the worker never received, in submission order.
    pub fn take_orphaned(&mut self) -> Vec<SyncJob> {
        std::mem::take(&mut self.orphaned)
    }

    pub fn orphaned_count(&self) -> usize {
        self.orphaned.len()
    }
}

/// A clone shares the queue but starts with no orphaned jobs.
impl Clone for SyncHandle {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            orphaned: Vec::new(),
        }
    }
}

impl SyncSink for SyncHandle {
    fn submit(&mut self, job: SyncJob) {
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            error!(
                track_key = %job.track_key,
                endpoint = job.request.endpoint(),
                sku = job.request.sku(),
                "sync worker is gone, holding ledger request"
            );
            self.orphaned.push(job);
        }
    }
}

/// What a worker did before its queue closed.
#[derive(Debug)]
pub struct SyncOutcome<H> {
    pub delivered: u64,
    pub failed: u64,
    pub divergence: H,
}

/// Single consumer of one cart's sync queue.
///
/// Jobs are delivered one at a time in submission order, so an item's add is
/// always sent before its remove. The worker stops once every [`SyncHandle`]
/// is dropped and the queue is drained; jobs already queued still get their
/// full retry budget.
pub struct SyncWorker<L, H> {
    ledger: L,
    rx: mpsc::UnboundedReceiver<SyncJob>,
    divergence: H,
}

impl<L, H> SyncWorker<L, H>
where
    L: Ledger + 'static,
    H: DivergenceHandler + 'static,
{
    pub fn new(ledger: L, divergence: H) -> (Self, SyncHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                ledger,
                rx,
                divergence,
            },
            SyncHandle {
                tx,
                orphaned: Vec::new(),
            },
        )
    }

    pub fn spawn(self) -> JoinHandle<SyncOutcome<H>> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> SyncOutcome<H> {
        let mut delivered = 0;
        let mut failed = 0;

        while let Some(job) = self.rx.recv().await {
            if self.ledger.send(&job.request).await {
                delivered += 1;
                info!(
                    track_key = %job.track_key,
                    endpoint = job.request.endpoint(),
                    sku = job.request.sku(),
                    label = job.request.label(),
                    "ledger synced"
                );
            } else {
                failed += 1;
                error!(
                    track_key = %job.track_key,
                    endpoint = job.request.endpoint(),
                    sku = job.request.sku(),
                    "ledger diverged from local inventory"
                );
                self.divergence.on_divergence(job);
            }
        }

        SyncOutcome {
            delivered,
            failed,
            divergence: self.divergence,
        }
    }
}
