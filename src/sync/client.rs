//! HTTP client for the remote ledger.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::SyncConfig;
use crate::error::Error;
use crate::sync::payload::{LedgerSummary, SyncRequest};

/// Path of the ledger liveness check.
const HEALTH_ENDPOINT: &str = "health";

/// Why a single ledger attempt failed. Every variant is retryable.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ledger rejected request with status {0}")]
    Rejected(StatusCode),
}

impl SyncError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SyncError::Transport(e) if e.is_timeout())
    }
}

/// Remote system of record for cart contents.
///
/// Both calls report success as a plain boolean; implementations absorb their
/// own failures.
pub trait Ledger: Send + Sync {
    /// Deliver one add/remove request, retrying within the implementation's
    /// own attempt budget.
    fn send(&self, request: &SyncRequest) -> impl Future<Output = bool> + Send;

    fn health_check(&self) -> impl Future<Output = bool> + Send;
}

/// Counters for ledger traffic.
#[derive(Debug, Default)]
pub struct SyncStats {
    attempts: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl SyncStats {
    /// HTTP attempts made, including retries.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// `send` calls that ended in a 200.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// `send` calls that exhausted every attempt.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Ledger client with bounded, linearly growing retry delays.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    http: Client,
    base_url: String,
    max_attempts: u32,
    retry_base_delay: Duration,
    health_timeout: Duration,
    stats: Arc<SyncStats>,
}

impl LedgerClient {
    /// Build a client for the ledger at `base_url`.
    ///
    /// `config` must already be validated.
    pub fn new(base_url: impl Into<String>, config: &SyncConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts.max(1),
            retry_base_delay: config.retry_base_delay(),
            health_timeout: config.health_timeout(),
            stats: Arc::new(SyncStats::default()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn stats(&self) -> Arc<SyncStats> {
        Arc::clone(&self.stats)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Send `request`, making at most `max_attempts` HTTP attempts.
    ///
    /// After failed attempt `n` the client waits `retry_base_delay * n` before
    /// the next one. Returns `true` on the first 200 response.
    pub async fn send_request(&self, request: &SyncRequest) -> bool {
        let url = self.url(request.endpoint());

        for attempt in 1..=self.max_attempts {
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);

            match self.attempt(&url, request).await {
                Ok(()) => {
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        endpoint = request.endpoint(),
                        sku = request.sku(),
                        attempt,
                        "ledger accepted request"
                    );
                    return true;
                }
                Err(e) => {
                    warn!(
                        endpoint = request.endpoint(),
                        sku = request.sku(),
                        attempt,
                        max_attempts = self.max_attempts,
                        timeout = e.is_timeout(),
                        error = %e,
                        "ledger request failed"
                    );
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_base_delay * attempt).await;
            }
        }

        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        error!(
            endpoint = request.endpoint(),
            cart_id = request.cart_id(),
            sku = request.sku(),
            label = request.label(),
            attempts = self.max_attempts,
            "ledger request exhausted retries"
        );
        false
    }

    async fn attempt(&self, url: &str, request: &SyncRequest) -> Result<(), SyncError> {
        let response = self.http.post(url).json(request).send().await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(SyncError::Rejected(status)),
        }
    }

    /// `GET /cart/{cart_id}/summary`, in a single attempt.
    ///
    /// Returns `None` on any failure, including a body that does not decode.
    pub async fn fetch_summary(&self, cart_id: &str) -> Option<LedgerSummary> {
        let url = self.url(&format!("cart/{cart_id}/summary"));
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(cart_id, error = %e, "failed to fetch ledger summary");
                return None;
            }
        };
        if response.status() != StatusCode::OK {
            error!(cart_id, status = %response.status(), "ledger summary rejected");
            return None;
        }

        match response.json::<LedgerSummary>().await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!(cart_id, error = %e, "ledger summary is malformed");
                None
            }
        }
    }

    /// `GET /health` with a short timeout. Any failure reads as unreachable.
    pub async fn ping(&self) -> bool {
        let result = self
            .http
            .get(self.url(HEALTH_ENDPOINT))
            .timeout(self.health_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                debug!(status = %response.status(), "ledger health check rejected");
                false
            }
            Err(e) => {
                debug!(error = %e, "ledger health check failed");
                false
            }
        }
    }
}

impl Ledger for LedgerClient {
    fn send(&self, request: &SyncRequest) -> impl Future<Output = bool> + Send {
        self.send_request(request)
    }

    fn health_check(&self) -> impl Future<Output = bool> + Send {
        self.ping()
    }
}
