use std::collections::BTreeMap;

use log::info;
use thiserror::Error;

use crate::alloc::{AllocError, BlockAllocator, BlockIndex};
use crate::io::BlockStorage;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("{0} does not exist")]
    DoesNotExist(String),
    #[error("directory {0} is not empty")]
    NotEmpty(String),
    #[error("not enough space: {needed} blocks needed, {available} available")]
    NoSpace { needed: usize, available: usize },
    #[error("block allocator invariant violated: {0}")]
    Alloc(#[from] AllocError),
    #[error("device i/o failed")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Recoverable conditions are reported to the user and leave all state
    /// unchanged. The remaining variants indicate a caller bug or a failing
    /// device and are not worth continuing past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FsError::Alloc(_) | FsError::Io(_))
    }
}

struct FileEntry {
    /// Owned blocks in content order. The last one may be partially used.
    blocks: Vec<BlockIndex>,
    /// Logical size in bytes; at most `blocks.len() * block_size`.
    size: usize,
}

/// Maps file names to their on-device blocks and drives the allocator and the
/// device to implement create/write/read/delete. All device access goes
/// through here so the free/allocated partition is never violated.
///
/// The file namespace is a single flat table: directories organize names for
/// the user but never scope file lookups.
pub struct FileStore<T: BlockStorage> {
    dev: T,
    alloc: BlockAllocator,
    files: BTreeMap<String, FileEntry>,
}

impl<T: BlockStorage> FileStore<T> {
    pub fn new(dev: T) -> Self {
        let alloc = BlockAllocator::new(dev.block_count());
        Self {
            dev,
            alloc,
            files: BTreeMap::new(),
        }
    }

    /// Creates an empty file owning no blocks.
    pub fn create_file(&mut self, name: &str) -> Result<(), FsError> {
        if self.files.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        self.files.insert(
            name.to_string(),
            FileEntry {
                blocks: Vec::new(),
                size: 0,
            },
        );
        Ok(())
    }

    /// Replaces the file's contents with `data`. The old blocks are released
    /// and a fresh run is allocated; on any recoverable failure the file's
    /// previous blocks and size are untouched. A device I/O failure mid-write
    /// is fatal tier, but the table stays consistent: the file survives
    /// truncated to empty and every block returns to the free set.
    pub fn write_to_file(&mut self, name: &str, data: &[u8]) -> Result<(), FsError> {
        let block_size = self.dev.block_size();
        let mut entry = self
            .files
            .remove(name)
            .ok_or_else(|| FsError::DoesNotExist(name.to_string()))?;

        // The blocks this file already owns come back to the free set before
        // anything is allocated, so they count toward availability.
        let needed = (data.len() + block_size - 1) / block_size;
        let available = self.alloc.free_count() + entry.blocks.len();
        if needed > available {
            self.files.insert(name.to_string(), entry);
            return Err(FsError::NoSpace { needed, available });
        }

        for block in entry.blocks.drain(..) {
            self.alloc.release(block)?;
        }

        // Cannot exhaust the allocator: the check above already counted the
        // blocks just released.
        let mut buf = vec![0u8; block_size];
        let mut failure = None;
        for chunk in data.chunks(block_size) {
            let block = match self.alloc.allocate() {
                Ok(block) => block,
                Err(err) => {
                    failure = Some(FsError::Alloc(err));
                    break;
                }
            };
            buf[..chunk.len()].copy_from_slice(chunk);
            for byte in buf[chunk.len()..].iter_mut() {
                *byte = 0;
            }
            entry.blocks.push(block);
            if let Err(err) = self.dev.write_block(block, &buf) {
                failure = Some(FsError::Io(err));
                break;
            }
        }

        if let Some(err) = failure {
            for block in entry.blocks.drain(..) {
                self.alloc.release(block)?;
            }
            entry.size = 0;
            self.files.insert(name.to_string(), entry);
            return Err(err);
        }

        entry.size = data.len();
        info!(
            "wrote {} bytes to {} across {} blocks",
            entry.size,
            name,
            entry.blocks.len()
        );
        self.files.insert(name.to_string(), entry);
        Ok(())
    }

    /// Returns exactly the file's logical size in bytes. The concatenation of
    /// its blocks is truncated to the stored size, so contents containing or
    /// ending in zero bytes read back intact.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>, FsError> {
        let block_size = self.dev.block_size();
        let entry = match self.files.get(name) {
            Some(entry) => entry,
            None => return Err(FsError::DoesNotExist(name.to_string())),
        };

        let mut content = vec![0u8; entry.blocks.len() * block_size];
        for (i, &block) in entry.blocks.iter().enumerate() {
            let start = i * block_size;
            self.dev
                .read_block(block, &mut content[start..start + block_size])?;
        }
        content.truncate(entry.size);
        Ok(content)
    }

    /// Releases every block the file owns, then forgets the file.
    pub fn delete_file(&mut self, name: &str) -> Result<(), FsError> {
        let entry = self
            .files
            .remove(name)
            .ok_or_else(|| FsError::DoesNotExist(name.to_string()))?;
        for block in entry.blocks {
            self.alloc.release(block)?;
        }
        info!("deleted {}", name);
        Ok(())
    }

    /// Number of blocks currently available for new data.
    pub fn free_blocks(&self) -> usize {
        self.alloc.free_count()
    }

    /// All file names in the store, in stable sorted order.
    pub fn list_files(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    /// Flushes buffered device I/O.
    pub fn sync(&mut self) -> Result<(), FsError> {
        self.dev.sync_disk()?;
        Ok(())
    }

    /// Returns ownership of the underlying device to the caller.
    pub fn into_device(self) -> T {
        self.dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemBlockDevice;

    const BLOCK_SIZE: usize = 512;
    const TOTAL_BLOCKS: usize = 100;

    fn test_store() -> FileStore<MemBlockDevice> {
        FileStore::new(MemBlockDevice::new(BLOCK_SIZE, TOTAL_BLOCKS))
    }

    #[test]
    fn create_write_read_delete_roundtrip() {
        let mut fs = test_store();
        let baseline = fs.free_blocks();

        fs.create_file("a").unwrap();
        assert_eq!(fs.free_blocks(), baseline);

        fs.write_to_file("a", b"hello").unwrap();
        // "hello" fits in one block.
        assert_eq!(fs.free_blocks(), baseline - 1);
        assert_eq!(fs.read_file("a").unwrap(), b"hello");

        fs.delete_file("a").unwrap();
        assert_eq!(fs.free_blocks(), baseline);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let mut fs = test_store();
        fs.create_file("a").unwrap();

        match fs.create_file("a") {
            Err(FsError::AlreadyExists(name)) => assert_eq!(name, "a"),
            other => panic!("expected AlreadyExists, got {:?}", other),
        }
    }

    #[test]
    fn operations_on_missing_files_are_rejected() {
        let mut fs = test_store();

        assert!(matches!(
            fs.write_to_file("ghost", b"data"),
            Err(FsError::DoesNotExist(_))
        ));
        assert!(matches!(
            fs.read_file("ghost"),
            Err(FsError::DoesNotExist(_))
        ));
        assert!(matches!(
            fs.delete_file("ghost"),
            Err(FsError::DoesNotExist(_))
        ));
    }

    #[test]
    fn multi_block_contents_read_back_intact() {
        let mut fs = test_store();
        fs.create_file("big").unwrap();

        let data: Vec<u8> = (0..BLOCK_SIZE * 2 + 100).map(|i| (i % 251) as u8).collect();
        fs.write_to_file("big", &data).unwrap();

        assert_eq!(fs.read_file("big").unwrap(), data);
    }

    #[test]
    fn contents_with_embedded_and_trailing_zero_bytes_survive() {
        let mut fs = test_store();
        fs.create_file("zeros").unwrap();

        let data = [1u8, 0, 0, 2, 0, 0, 0];
        fs.write_to_file("zeros", &data).unwrap();

        assert_eq!(fs.read_file("zeros").unwrap(), data);
    }

    #[test]
    fn rewriting_with_smaller_data_releases_surplus_blocks() {
        let mut fs = test_store();
        let baseline = fs.free_blocks();
        fs.create_file("a").unwrap();

        fs.write_to_file("a", &vec![7u8; BLOCK_SIZE * 3]).unwrap();
        assert_eq!(fs.free_blocks(), baseline - 3);

        fs.write_to_file("a", b"tiny").unwrap();
        assert_eq!(fs.free_blocks(), baseline - 1);
        assert_eq!(fs.read_file("a").unwrap(), b"tiny");
    }

    #[test]
    fn rewrite_counts_the_files_own_blocks_as_available() {
        // 4 blocks total, block 0 reserved: exactly 3 usable.
        let mut fs = FileStore::new(MemBlockDevice::new(16, 4));
        fs.create_file("a").unwrap();

        fs.write_to_file("a", &[1u8; 48]).unwrap();
        assert_eq!(fs.free_blocks(), 0);

        // Needs 3 blocks with none free, but owns all 3.
        fs.write_to_file("a", &[2u8; 40]).unwrap();
        assert_eq!(fs.read_file("a").unwrap(), [2u8; 40]);
        assert_eq!(fs.free_blocks(), 0);
    }

    #[test]
    fn oversized_write_is_rejected_and_old_content_survives() {
        let mut fs = FileStore::new(MemBlockDevice::new(16, 4));
        fs.create_file("a").unwrap();
        fs.write_to_file("a", b"keep me").unwrap();
        let free_before = fs.free_blocks();

        // 4 blocks needed, 2 free + 1 owned available.
        match fs.write_to_file("a", &[9u8; 64]) {
            Err(FsError::NoSpace { needed, available }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 3);
            }
            other => panic!("expected NoSpace, got {:?}", other),
        }

        assert_eq!(fs.free_blocks(), free_before);
        assert_eq!(fs.read_file("a").unwrap(), b"keep me");
    }

    #[test]
    fn empty_write_owns_no_blocks() {
        let mut fs = test_store();
        let baseline = fs.free_blocks();
        fs.create_file("empty").unwrap();

        fs.write_to_file("empty", b"").unwrap();

        assert_eq!(fs.free_blocks(), baseline);
        assert_eq!(fs.read_file("empty").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn list_files_is_sorted_and_tracks_deletes() {
        let mut fs = test_store();
        fs.create_file("b").unwrap();
        fs.create_file("a").unwrap();
        assert_eq!(fs.list_files(), vec!["a", "b"]);

        fs.delete_file("a").unwrap();
        assert_eq!(fs.list_files(), vec!["b"]);
    }

    /// A device that fails every write after an initial budget is spent.
    struct FailingWrites {
        inner: MemBlockDevice,
        writes_left: usize,
    }

    impl BlockStorage for FailingWrites {
        fn read_block(&mut self, blocknr: usize, buf: &mut [u8]) -> std::io::Result<()> {
            self.inner.read_block(blocknr, buf)
        }

        fn write_block(&mut self, blocknr: usize, buf: &[u8]) -> std::io::Result<()> {
            if self.writes_left == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "device gave out",
                ));
            }
            self.writes_left -= 1;
            self.inner.write_block(blocknr, buf)
        }

        fn sync_disk(&mut self) -> std::io::Result<()> {
            Ok(())
        }

        fn block_size(&self) -> usize {
            self.inner.block_size()
        }

        fn block_count(&self) -> usize {
            self.inner.block_count()
        }
    }

    #[test]
    fn device_failure_mid_write_leaves_the_table_consistent() {
        let mut fs = FileStore::new(FailingWrites {
            inner: MemBlockDevice::new(16, 8),
            writes_left: 1,
        });
        let baseline = fs.free_blocks();
        fs.create_file("a").unwrap();

        // Three blocks needed; the second write fails.
        let err = fs.write_to_file("a", &[7u8; 40]).unwrap_err();
        assert!(err.is_fatal());

        // The file survives truncated and no block is leaked.
        assert_eq!(fs.list_files(), vec!["a"]);
        assert_eq!(fs.free_blocks(), baseline);
        assert_eq!(fs.read_file("a").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn blocks_are_allocated_lowest_first_from_block_one() {
        let mut fs = test_store();
        fs.create_file("a").unwrap();
        fs.write_to_file("a", b"first").unwrap();

        // Block 0 is reserved, so the first write lands at block 1.
        let dev = fs.into_device();
        assert_eq!(&dev.as_bytes()[BLOCK_SIZE..BLOCK_SIZE + 5], b"first");
        assert!(dev.as_bytes()[..BLOCK_SIZE].iter().all(|&b| b == 0));
    }
}
