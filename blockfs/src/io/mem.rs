use std::io::ErrorKind;

use crate::io::block::{BlockNumber, BlockStorage};

/// An in-memory block device for tests that do not need a real image file.
pub struct MemBlockDevice {
    bytes: Vec<u8>,
    block_size: usize,
    block_count: usize,
}

impl MemBlockDevice {
    pub fn new(block_size: usize, block_count: usize) -> Self {
        Self {
            bytes: vec![0u8; block_size * block_count],
            block_size,
            block_count,
        }
    }

    /// The raw device contents, for inspecting block layout in tests.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl BlockStorage for MemBlockDevice {
    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()> {
        if blocknr >= self.block_count {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block out of range",
            ));
        }
        if buf.len() < self.block_size {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "buffer does not contain enough space to read block",
            ));
        }
        let start = blocknr * self.block_size;
        buf[..self.block_size].copy_from_slice(&self.bytes[start..start + self.block_size]);
        Ok(())
    }

    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()> {
        if blocknr >= self.block_count {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block out of range",
            ));
        }
        let max = self.block_size.min(buf.len());
        let start = blocknr * self.block_size;
        self.bytes[start..start + max].copy_from_slice(&buf[..max]);
        Ok(())
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> usize {
        self.block_count
    }
}
