pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Leading zero bits a block hash must carry to be accepted.
pub const DIFFICULTY_BITS: u32 = 16;

pub const GENESIS_PAYLOAD: &[u8] = b"Genesis Block";
