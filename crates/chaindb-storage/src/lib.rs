pub mod sled_store;

pub use sled_store::{Blockchain, ChainIterator};

use chaindb_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be opened, read, or written.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sled::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    /// The chain structurally references data the store does not hold, or
    /// holds in an undecodable shape. Never skipped: skipping would silently
    /// truncate the ledger.
    #[error("corrupt chain: {0}")]
    Corrupt(String),
    #[error("chain iterator exhausted")]
    IteratorExhausted,
}
