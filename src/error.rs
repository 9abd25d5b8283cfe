use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, WalletError>;

/// Stable error taxonomy exposed at the engine boundary.
///
/// Every variant except `Unexpected` is safe to surface to callers verbatim.
/// `Unexpected` carries internal detail for logging only; callers should see
/// a generic failure.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("account {0} not found")]
    AccountNotFound(String),
    #[error("recipient account {0} not found")]
    RecipientNotFound(String),
    #[error("sender and recipient are the same account")]
    SameAccountTransfer,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("transaction PIN not set")]
    PinNotSet,
    #[error("transaction PIN already set")]
    PinAlreadySet,
    #[error("invalid transaction PIN")]
    InvalidPin,
    #[error("duplicate transaction reference {0}")]
    DuplicateReference(Uuid),
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("transient store failure: {0}")]
    TransientStoreFailure(String),
    #[error("internal error: {0}")]
    Unexpected(String),
}

impl WalletError {
    /// Whether the caller may retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::TransientStoreFailure(_))
    }
}
