#![forbid(unsafe_code)]

use storefront_contracts::cart::ProductId;
use storefront_contracts::ContractViolation;
use storefront_storage::StorageError;

/// Operation-boundary error taxonomy. Every service-call failure is
/// converted here before it reaches the presentation layer; nothing in
/// this crate is fatal to the process.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// No stored credential. Rendered as an unauthenticated/empty cart,
    /// not as an error banner.
    NoSession,
    /// Network/server failure; retryable user-facing message.
    Transport {
        kind: &'static str,
        status: Option<u16>,
        detail: String,
    },
    /// Precondition failure surfaced inline; no network call was made.
    Validation {
        field: &'static str,
        reason: &'static str,
    },
    /// The decompose-quantity re-add failed after the remove succeeded.
    /// The line may now be missing rather than merely unchanged, so this
    /// is never collapsed into a generic transport failure.
    PartialMutation {
        product_id: ProductId,
        detail: String,
    },
    /// Concurrency-guard rejection; the control is disabled while a
    /// mutation is in flight, so this is an ignore, not a user failure.
    MutationInFlight { product_id: ProductId },
    Storage(StorageError),
}

impl ClientError {
    pub fn transport(kind: &'static str, status: Option<u16>, detail: impl Into<String>) -> Self {
        ClientError::Transport {
            kind,
            status,
            detail: detail.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }
}

impl From<StorageError> for ClientError {
    fn from(err: StorageError) -> Self {
        ClientError::Storage(err)
    }
}

impl From<ContractViolation> for ClientError {
    fn from(v: ContractViolation) -> Self {
        let field = match v {
            ContractViolation::InvalidValue { field, .. } => field,
            ContractViolation::ArithmeticOverflow { field } => field,
        };
        ClientError::transport(
            "contract_invalid",
            None,
            format!("service payload violates contract at {field}"),
        )
    }
}
