//! Error taxonomy for the crawl pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Prerequisite authentication material is absent; raised before any
    /// network activity.
    #[error("cookie store not found at {0}")]
    CredentialMissing(String),

    /// Pagination (or the identifier store) never produced a single product.
    #[error("no products discovered")]
    Discovery,

    /// A single card or page request failed. Aborts the run; per-product
    /// isolation with bounded retry is a planned hardening step.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// External interrupt; resources are released and the process exits
    /// through a distinguished path.
    #[error("interrupted by user")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HarvestError {
    /// Process exit code for this outcome: recognized domain failures and
    /// cancellation get distinct codes, everything else is generic.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CredentialMissing(_) | Self::Discovery => 2,
            Self::Cancelled => 130,
            Self::Fetch(_) | Self::Other(_) => 1,
        }
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}
