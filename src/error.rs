//! Failures surfaced by the endpoint facades and the filter manager.
//!
//! These never reach a client verbatim: the dispatcher logs them and
//! answers with a sanitized `-32603` internal error.

use crate::chain::BackendError;
use ethers_core::types::H256;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("filter does not exist")]
    FilterDoesNotExist,
    #[error("incorrect range")]
    IncorrectRange,
    #[error("chain head is not available")]
    HeadNotAvailable,
    #[error("fetching the earliest header is not supported")]
    EarliestHeaderNotSupported,
    #[error("fetching the pending header is not supported")]
    PendingHeaderNotSupported,
    #[error("failed to fetch header for block {0}")]
    HeaderNotFound(u64),
    #[error("block {0} not found")]
    BlockNotFound(u64),
    #[error("unable to get block by hash {0:?}")]
    BlockByHashNotFound(H256),
    #[error("from is empty")]
    MissingSender,
    #[error("both input and data cannot be set")]
    ConflictingCallData,
    #[error("contract creation without data provided")]
    MissingCreationData,
    #[error("failed to decode transaction from RLP")]
    InvalidRawTransaction,
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Backend(#[from] BackendError),
}
