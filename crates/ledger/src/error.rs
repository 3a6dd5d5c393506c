use thiserror::Error;

/// Why a post was rejected.
///
/// Both variants are ordinary outcomes the caller reports back to the end
/// user; neither leaves the ledger modified.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PostError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error("message is {len} characters long, the limit is {max}")]
    MessageTooLong { len: usize, max: usize },
}
