use crate::StoreError;
use chaindb_core::{pow, Block, Hash, DIFFICULTY_BITS, HASH_SIZE};
use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";
/// Key of the tip entry inside the blocks tree ("l" for last).
const KEY_TIP: &[u8] = b"l";

/// Persistent append-only chain: a sled tree mapping block hash to encoded
/// block, plus the single mutable tip entry. Single-writer by design; the
/// tip is cached in memory and only moves through [`Blockchain::append`].
pub struct Blockchain {
    db: Db,
    blocks: Tree,
    tip: Hash,
    difficulty_bits: u32,
}

impl Blockchain {
    /// Open (creating if absent) the chain at `path`, bootstrapping a genesis
    /// block on first use.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_difficulty(path, DIFFICULTY_BITS)
    }

    /// Same as [`open`](Self::open) with a tunable difficulty, so tests can
    /// run with a cheap target.
    pub fn open_with_difficulty<P: AsRef<Path>>(
        path: P,
        difficulty_bits: u32,
    ) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let blocks = db.open_tree(TREE_BLOCKS)?;

        let tip = match blocks.get(KEY_TIP)? {
            Some(stored) => decode_hash(&stored)?,
            None => {
                info!("no existing chain found, creating genesis block");
                let genesis = Block::genesis(difficulty_bits)?;
                write_block_and_tip(&blocks, &genesis)?;
                db.flush()?;
                genesis.hash
            }
        };
        debug!(tip = %hex::encode(tip), "chain opened");

        Ok(Self {
            db,
            blocks,
            tip,
            difficulty_bits,
        })
    }

    /// Seal a new block on the current tip, persist it, and advance the tip.
    /// Block write and tip move happen in one sled transaction so a crash can
    /// never leave the tip pointing at a block that was not durably written.
    pub fn append(&mut self, payload: impl Into<Vec<u8>>) -> Result<Block, StoreError> {
        let block = Block::new(payload, self.tip, self.difficulty_bits)?;
        write_block_and_tip(&self.blocks, &block)?;
        self.db.flush()?;
        self.tip = block.hash;
        Ok(block)
    }

    /// Point lookup by content address. Absence is not an error.
    pub fn get(&self, hash: &Hash) -> Result<Option<Block>, StoreError> {
        match self.blocks.get(hash)? {
            Some(stored) => Ok(Some(Block::from_bytes(&stored)?)),
            None => Ok(None),
        }
    }

    pub fn tip(&self) -> Hash {
        self.tip
    }

    pub fn difficulty_bits(&self) -> u32 {
        self.difficulty_bits
    }

    /// Walk the chain from tip back to genesis without loading it whole.
    pub fn iter(&self) -> ChainIterator<'_> {
        ChainIterator {
            blocks: &self.blocks,
            cursor: Some(self.tip),
        }
    }

    /// Re-validate every stored block's proof-of-work, tip to genesis.
    pub fn verify(&self) -> Result<bool, StoreError> {
        for block in self.iter() {
            if !pow::validate(&block?, self.difficulty_bits) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn write_block_and_tip(blocks: &Tree, block: &Block) -> Result<(), StoreError> {
    let bytes = block.to_bytes()?;
    blocks
        .transaction(|tx| {
            tx.insert(&block.hash[..], bytes.as_slice())?;
            tx.insert(KEY_TIP, &block.hash[..])?;
            Ok(())
        })
        .map_err(|err| match err {
            TransactionError::Storage(err) => StoreError::Unavailable(err),
            TransactionError::Abort(()) => StoreError::Corrupt("append aborted".into()),
        })
}

fn decode_hash(bytes: &[u8]) -> Result<Hash, StoreError> {
    if bytes.len() != HASH_SIZE {
        return Err(StoreError::Corrupt(format!(
            "tip entry is {} bytes, expected {HASH_SIZE}",
            bytes.len()
        )));
    }
    let mut hash = [0u8; HASH_SIZE];
    hash.copy_from_slice(bytes);
    Ok(hash)
}

/// Lazy tip-to-genesis cursor over a [`Blockchain`]. One pass only: after the
/// genesis block has been yielded the iterator is done and a fresh one must
/// be created for another traversal. Read-only over the store.
pub struct ChainIterator<'a> {
    blocks: &'a Tree,
    cursor: Option<Hash>,
}

impl ChainIterator<'_> {
    /// Like [`Iterator::next`], but exhaustion is an explicit error instead
    /// of `None`.
    pub fn next_block(&mut self) -> Result<Block, StoreError> {
        match self.next() {
            Some(block) => block,
            None => Err(StoreError::IteratorExhausted),
        }
    }

    fn read(&self, hash: &Hash) -> Result<Block, StoreError> {
        let stored = self.blocks.get(hash)?.ok_or_else(|| {
            StoreError::Corrupt(format!(
                "chain references missing block {}",
                hex::encode(hash)
            ))
        })?;
        Ok(Block::from_bytes(&stored)?)
    }
}

impl Iterator for ChainIterator<'_> {
    type Item = Result<Block, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.take()?;
        match self.read(&cursor) {
            Ok(block) => {
                if !block.is_genesis() {
                    self.cursor = Some(block.prev_hash);
                }
                Some(Ok(block))
            }
            // Cursor already cleared: a corrupt chain ends the traversal.
            Err(err) => Some(Err(err)),
        }
    }
}
