/// The block number to access ranging from 0 (the first block) to n - 1 (the
/// last block) where n is the number of blocks available.
pub type BlockNumber = usize;

/// Block-aligned access to a device image. Callers address whole blocks only;
/// byte offsets are always `blocknr * block_size()` and never cross a block
/// boundary.
pub trait BlockStorage {
    /// Reads one device block into the provided buffer.
    ///
    /// # Errors
    ///
    /// Reading a block out of range, or into a buffer smaller than one
    /// block, returns an error.
    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()>;

    /// Writes the provided buffer into the specified block. Writes longer
    /// than one block are truncated to the block boundary.
    ///
    /// # Errors
    ///
    /// Writing a block out of range returns an error.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()>;

    /// Flushes any buffered I/O. Useful when the written bytes must be
    /// observable outside this handle, for instance by reopening the image.
    fn sync_disk(&mut self) -> std::io::Result<()>;

    /// Size of one block in bytes.
    fn block_size(&self) -> usize;

    /// Total number of blocks on the device.
    fn block_count(&self) -> usize;
}
