use crate::storage::StorageError;
use thiserror::Error;

/// Unified error type for the generation service.
///
/// The four arbitration outcomes (`InvalidProvider`, `InsufficientBalance`,
/// `ProviderCallFailed`, `LedgerWriteFailed`) are deliberately distinct
/// variants: callers branch on them. In particular `LedgerWriteFailed` after a
/// successful backend call means generated text exists but was not charged or
/// recorded — the caller decides whether to discard or retry, the core does
/// not run a compensating transaction.
#[derive(Debug, Error)]
pub enum Error {
    /// Unrecognized provider selector. Fatal for the request; never falls
    /// back to another backend and never reaches the network.
    #[error("invalid provider: {0}")]
    InvalidProvider(String),

    /// The account cannot cover the computed cost. Expected and recoverable;
    /// carries both figures so the caller can offer a remedy (e.g. an
    /// ad-view reward flow).
    #[error("insufficient coins: required {required}, current {current}")]
    InsufficientBalance { required: u64, current: u64 },

    /// The third-party generation call failed. The backend's message is
    /// wrapped verbatim and not retried here.
    #[error("provider {provider} call failed: {message}")]
    ProviderCallFailed { provider: String, message: String },

    /// Coin deduction or usage-record persistence failed after a successful
    /// generation.
    #[error("ledger write failed: {0}")]
    LedgerWriteFailed(String),

    /// No caller identity on the request. Session handling itself lives in
    /// the upstream gateway; this only reports its absence.
    #[error("not authenticated")]
    Unauthenticated,

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// The caller does not own the addressed resource.
    #[error("access denied")]
    AccessDenied,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a provider failure wrapping the backend's message verbatim.
    pub fn provider_failure(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ProviderCallFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
