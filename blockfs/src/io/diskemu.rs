use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{BufWriter, ErrorKind, SeekFrom};
use std::path::PathBuf;

use crate::io::block::{BlockNumber, BlockStorage};

/// Location and geometry of a device image.
#[derive(Debug, Clone)]
pub struct DiskConfig {
    pub path: PathBuf,
    pub block_size: usize,
    pub total_blocks: usize,
}

impl DiskConfig {
    fn image_len(&self) -> u64 {
        (self.block_size * self.total_blocks) as u64
    }
}

/// Opens the device image described by `config`, creating and zero-filling it
/// only if no file exists at that path. An existing image is opened as-is so
/// its block contents survive across runs; its length must match the
/// configured geometry exactly.
pub fn open_or_create(config: &DiskConfig) -> std::io::Result<FileBlockEmulator> {
    match OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&config.path)
    {
        Ok(file) => {
            let mut emu = FileBlockEmulator {
                fd: file,
                block_size: config.block_size,
                block_count: config.total_blocks,
            };
            emu.zero_fill()?;
            Ok(emu)
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            let file = OpenOptions::new().read(true).write(true).open(&config.path)?;
            if file.metadata()?.len() != config.image_len() {
                return Err(std::io::Error::new(
                    ErrorKind::InvalidData,
                    "existing image length does not match the configured geometry",
                ));
            }
            Ok(FileBlockEmulator {
                fd: file,
                block_size: config.block_size,
                block_count: config.total_blocks,
            })
        }
        Err(err) => Err(err),
    }
}

/// Emulates block disk storage in userspace using a flat file as the medium.
/// The file is a fixed size, an exact multiple of the block size.
#[derive(Debug)]
pub struct FileBlockEmulator {
    fd: File,
    block_size: usize,
    block_count: usize,
}

impl FileBlockEmulator {
    /// Returns ownership of the underlying file descriptor to the caller.
    pub fn into_file(self) -> File {
        self.fd
    }

    fn zero_fill(&mut self) -> std::io::Result<()> {
        let zeros = vec![0u8; self.block_size];
        // Zero out the medium block by block, buffering to keep the write
        // count down.
        let mut bfd = BufWriter::new(&self.fd);
        for _ in 0..self.block_count {
            bfd.write_all(&zeros)?;
        }
        bfd.flush()?;
        Ok(())
    }
}

impl BlockStorage for FileBlockEmulator {
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
        self.fd
            .seek(SeekFrom::Start((blocknr * self.block_size) as u64))?;
        self.fd.read_exact(&mut buf[..self.block_size])?;
        Ok(())
    }

    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()> {
        if blocknr >= self.block_count {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block out of range",
            ));
        }
        self.fd
            .seek(SeekFrom::Start((blocknr * self.block_size) as u64))?;

        // Truncate writes that exceed the block size.
        let max = self.block_size.min(buf.len());
        self.fd.write_all(&buf[..max])?;
        Ok(())
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        self.fd.sync_all()?;
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> usize {
        self.block_count
    }
}
