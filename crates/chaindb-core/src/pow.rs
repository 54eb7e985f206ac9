use crate::{Block, CoreError, Hash};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::debug;

/// `1 << (256 - difficulty_bits)` as a 32-byte big-endian integer. A hash is
/// a valid proof iff it compares strictly below this, which for byte arrays
/// is plain lexicographic order. Valid for `difficulty_bits` in 1..=255.
pub fn target(difficulty_bits: u32) -> Hash {
    debug_assert!((1..=255).contains(&difficulty_bits));
    let mut target = [0u8; 32];
    let bit = (difficulty_bits - 1) as usize;
    target[bit / 8] = 0x80 >> (bit % 8);
    target
}

/// Canonical hash input: `prev_hash ‖ BE64(len(payload)) ‖ payload ‖
/// BE64(timestamp) ‖ BE64(difficulty_bits) ‖ BE64(nonce)`. The payload is
/// length-prefixed so no two distinct field tuples encode to the same bytes.
pub fn pow_input(
    prev_hash: &Hash,
    payload: &[u8],
    timestamp: i64,
    difficulty_bits: u32,
    nonce: u64,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(32 + 8 + payload.len() + 8 + 8 + 8);
    bytes.extend_from_slice(prev_hash);
    bytes.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&timestamp.to_be_bytes());
    bytes.extend_from_slice(&u64::from(difficulty_bits).to_be_bytes());
    bytes.extend_from_slice(&nonce.to_be_bytes());
    bytes
}

fn attempt(
    prev_hash: &Hash,
    payload: &[u8],
    timestamp: i64,
    difficulty_bits: u32,
    nonce: u64,
) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(pow_input(prev_hash, payload, timestamp, difficulty_bits, nonce));
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Search the nonce space for a hash below target. `find_first` keeps the
/// result identical to a sequential scan from nonce 0 while letting rayon
/// spread the attempts across threads.
pub fn seal(
    prev_hash: &Hash,
    payload: &[u8],
    timestamp: i64,
    difficulty_bits: u32,
) -> Result<(u64, Hash), CoreError> {
    let target = target(difficulty_bits);
    let nonce = (0u64..u64::MAX)
        .into_par_iter()
        .find_first(|&nonce| attempt(prev_hash, payload, timestamp, difficulty_bits, nonce) < target)
        .ok_or(CoreError::ProofNotFound)?;
    let hash = attempt(prev_hash, payload, timestamp, difficulty_bits, nonce);
    debug!(nonce, hash = %hex::encode(hash), "sealed block");
    Ok((nonce, hash))
}

/// Recompute the hash with the block's stored nonce and check the proof.
/// Pure and read-only; safe to call repeatedly on the same block.
pub fn validate(block: &Block, difficulty_bits: u32) -> bool {
    let hash = attempt(
        &block.prev_hash,
        &block.payload,
        block.timestamp,
        difficulty_bits,
        block.nonce,
    );
    hash == block.hash && hash < target(difficulty_bits)
}

pub fn leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}
