use thiserror::Error;

use crate::config::ConfigError;
use crate::integration::{CatalogError, ReplayError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal errors: bad input at startup or a broken sensor/detector.
///
/// Ledger failures are not represented here; they are retried inside the sync
/// client and only ever reported as a failed delivery.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("frame source failed: {0}")]
    Source(#[source] BoxError),

    #[error("detector failed: {0}")]
    Detector(#[source] BoxError),
}

pub type Result<T> = std::result::Result<T, Error>;
