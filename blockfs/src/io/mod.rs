mod block;
mod diskemu;
mod mem;

pub use block::{BlockNumber, BlockStorage};
pub use diskemu::{open_or_create, DiskConfig, FileBlockEmulator};
pub use mem::MemBlockDevice;
