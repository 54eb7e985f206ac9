use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub mod constants;
pub mod pow;

pub use constants::{DIFFICULTY_BITS, GENESIS_PAYLOAD, HASH_SIZE};

pub type Hash = [u8; 32];

/// Sentinel predecessor hash of the genesis block.
pub const ZERO_HASH: Hash = [0u8; 32];

#[derive(Debug, Error)]
pub enum CoreError {
    /// The u64 nonce space was exhausted without a hash below target.
    #[error("nonce space exhausted without a proof below target")]
    ProofNotFound,
    #[error("corrupt block record: {0}")]
    CorruptRecord(#[from] bincode::Error),
}

/// One sealed unit of the ledger. Immutable once constructed; the only
/// mutable quantity anywhere in the system is the chain's tip pointer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: i64,
    pub payload: Vec<u8>,
    pub prev_hash: Hash,
    pub hash: Hash,
    pub nonce: u64,
}

impl Block {
    /// Build and seal a block on top of `prev_hash`. Sealing is part of
    /// construction; an unsealed block is never observable outside this
    /// function.
    pub fn new(
        payload: impl Into<Vec<u8>>,
        prev_hash: Hash,
        difficulty_bits: u32,
    ) -> Result<Self, CoreError> {
        let payload = payload.into();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_secs() as i64;
        let (nonce, hash) = pow::seal(&prev_hash, &payload, timestamp, difficulty_bits)?;
        Ok(Self {
            timestamp,
            payload,
            prev_hash,
            hash,
            nonce,
        })
    }

    pub fn genesis(difficulty_bits: u32) -> Result<Self, CoreError> {
        Self::new(GENESIS_PAYLOAD, ZERO_HASH, difficulty_bits)
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash == ZERO_HASH
    }

    /// Canonical on-disk encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low difficulty so tests stay fast.
    const TEST_BITS: u32 = 4;

    #[test]
    fn sealed_block_meets_target() {
        let block = Block::new("hello", ZERO_HASH, TEST_BITS).unwrap();
        assert!(pow::leading_zero_bits(&block.hash) >= TEST_BITS);
        assert!(block.hash < pow::target(TEST_BITS));
        assert!(pow::validate(&block, TEST_BITS));
    }

    #[test]
    fn genesis_block_shape() {
        let genesis = Block::genesis(TEST_BITS).unwrap();
        assert_eq!(genesis.payload, GENESIS_PAYLOAD);
        assert_eq!(genesis.prev_hash, ZERO_HASH);
        assert!(genesis.is_genesis());
        assert!(pow::validate(&genesis, TEST_BITS));
    }

    #[test]
    fn non_genesis_block_links_predecessor() {
        let genesis = Block::genesis(TEST_BITS).unwrap();
        let next = Block::new("second", genesis.hash, TEST_BITS).unwrap();
        assert_eq!(next.prev_hash, genesis.hash);
        assert!(!next.is_genesis());
    }

    #[test]
    fn codec_round_trips_exactly() {
        let block = Block::new("round trip me", [7u8; 32], TEST_BITS).unwrap();
        let bytes = block.to_bytes().unwrap();
        let decoded = Block::from_bytes(&bytes).unwrap();
        assert_eq!(block, decoded);
    }

    #[test]
    fn truncated_record_is_corrupt() {
        let block = Block::new("short", ZERO_HASH, TEST_BITS).unwrap();
        let bytes = block.to_bytes().unwrap();
        let err = Block::from_bytes(&bytes[..5]).unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord(_)));
    }

    #[test]
    fn payload_tamper_invalidates_proof() {
        let mut block = Block::new("pay Alice 10", ZERO_HASH, TEST_BITS).unwrap();
        assert!(pow::validate(&block, TEST_BITS));
        block.payload[0] ^= 0x01;
        assert!(!pow::validate(&block, TEST_BITS));
    }

    #[test]
    fn nonce_tamper_invalidates_proof() {
        let mut block = Block::new("pay Bob 5", ZERO_HASH, TEST_BITS).unwrap();
        block.nonce = block.nonce.wrapping_add(1);
        assert!(!pow::validate(&block, TEST_BITS));
    }
}
