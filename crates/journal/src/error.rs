//! Journal error type

use std::path::PathBuf;
use thiserror::Error;
use tt_core::StoreError;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("watch record codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("malformed tick key of {0} bytes")]
    BadTickKey(usize),

    #[error("no watch registered for {0:?}")]
    UnknownWatch(PathBuf),
}

impl From<sled::transaction::TransactionError<JournalError>> for JournalError {
    fn from(err: sled::transaction::TransactionError<JournalError>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(inner) => inner,
            sled::transaction::TransactionError::Storage(e) => JournalError::Sled(e),
        }
    }
}

impl From<JournalError> for StoreError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::UnknownWatch(dir) => StoreError::UnknownWatch(dir),
            JournalError::BadTickKey(len) => StoreError::Corrupt {
                tree: "ticks",
                reason: format!("tick key has {} bytes, expected 8", len),
            },
            JournalError::Codec(e) => StoreError::Corrupt {
                tree: "watches",
                reason: e.to_string(),
            },
            other => StoreError::Backend(Box::new(other)),
        }
    }
}
