use fat32_volume::device::{BlockDevice, DeviceError};

use spin::RwLock;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

pub struct BlockFile {
    file: RwLock<File>,
    sector_size: usize,
}

impl BlockFile {
    pub fn new(file: File, sector_size: usize) -> Self {
        Self {
            file: RwLock::new(file),
            sector_size,
        }
    }
}

impl BlockDevice for BlockFile {
    fn read_blocks(&self, buf: &mut [u8], lba: u32, count: usize) -> Result<(), DeviceError> {
        let mut file = self.file.write();
        let offset = lba as u64 * self.sector_size as u64;
        file.seek(SeekFrom::Start(offset)).map_err(|_| DeviceError::ReadError)?;
        let want = count * self.sector_size;
        file.read_exact(&mut buf[..want]).map_err(|_| DeviceError::ReadError)
    }

    fn write_blocks(&self, buf: &[u8], lba: u32, count: usize) -> Result<(), DeviceError> {
        let mut file = self.file.write();
        let offset = lba as u64 * self.sector_size as u64;
        file.seek(SeekFrom::Start(offset)).map_err(|_| DeviceError::WriteError)?;
        let want = count * self.sector_size;
        file.write_all(&buf[..want]).map_err(|_| DeviceError::WriteError)
    }
}
