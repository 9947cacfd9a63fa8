use std::collections::BTreeSet;

use thiserror::Error;

/// The block number to access ranging from 0 (the first block) to n - 1 (the
/// last block) where n is the number of blocks on the device.
pub type BlockIndex = usize;

/// Violations of the allocator's free/allocated partition. A caller that
/// checks `free_count` before allocating and only releases blocks it owns
/// never sees either variant.
#[derive(Error, Debug, PartialEq)]
pub enum AllocError {
    #[error("no free blocks available")]
    Exhausted,
    #[error("block {0} is already free")]
    DoubleFree(BlockIndex),
    #[error("block {0} is reserved and never allocated")]
    Reserved(BlockIndex),
}

/// Tracks which blocks of the device are free and which are allocated. Knows
/// nothing about files or directories and performs no I/O.
///
/// Block 0 is permanently reserved: it is never part of the free set, never
/// handed out, and never accepted back.
pub struct BlockAllocator {
    free: BTreeSet<BlockIndex>,
}

impl BlockAllocator {
    pub fn new(total_blocks: usize) -> Self {
        Self {
            free: (1..total_blocks).collect(),
        }
    }

    /// Removes and returns the lowest free block index. Allocating lowest
    /// first keeps allocation order reproducible across runs.
    pub fn allocate(&mut self) -> Result<BlockIndex, AllocError> {
        let block = *self.free.iter().next().ok_or(AllocError::Exhausted)?;
        self.free.remove(&block);
        Ok(block)
    }

    /// Returns a block to the free set. Releasing a block that is already
    /// free, or the reserved block 0, indicates a bookkeeping bug in the
    /// caller and is rejected without changing the free set.
    pub fn release(&mut self, block: BlockIndex) -> Result<(), AllocError> {
        if block == 0 {
            return Err(AllocError::Reserved(block));
        }
        if !self.free.insert(block) {
            return Err(AllocError::DoubleFree(block));
        }
        Ok(())
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
