mod alloc;
mod dir;
mod fs;
pub mod io;

pub use crate::alloc::{AllocError, BlockAllocator, BlockIndex};
pub use crate::dir::DirectoryTree;
pub use crate::fs::{FileStore, FsError};
pub use crate::io::{open_or_create, BlockStorage, DiskConfig};

/// Default block size of the virtual device in bytes.
pub const BLOCK_SIZE: usize = 512;
/// Default number of blocks on the virtual device. Block 0 is reserved, so
/// `TOTAL_BLOCKS - 1` blocks are available for file data.
pub const TOTAL_BLOCKS: usize = 100;
