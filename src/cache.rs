//! Sector cache
//!
//! Every [`crate::volume::Volume`] owns exactly one of these. It holds a
//! single sector's worth of bytes, tagged with the LBA it mirrors, and
//! flushes itself to the device before loading a different sector. There is
//! no LRU manager and no second sector: one volume, one cached sector.

use crate::device::{BlockDevice, DeviceError};
use crate::MAX_SECTOR_SIZE;
use alloc::sync::Arc;

pub trait Cache {
    /// The read-only mapper to the cached sector.
    ///
    /// - `offset`: byte offset within the sector
    /// - `f`: a closure to read
    fn read<T, V>(&mut self, lba: u32, offset: usize, f: impl FnOnce(&T) -> V) -> Result<V, DeviceError>;
    /// The mutable mapper to the cached sector.
    ///
    /// - `offset`: byte offset within the sector
    /// - `f`: a closure to write
    fn modify<T, V>(&mut self, lba: u32, offset: usize, f: impl FnOnce(&mut T) -> V) -> Result<V, DeviceError>;
    /// Tell the cache to write back if dirty.
    fn sync(&mut self) -> Result<(), DeviceError>;
}

pub struct SectorCache {
    sector_size: usize,
    lba: Option<u32>,
    modified: bool,
    buffer: [u8; MAX_SECTOR_SIZE],
    device: Arc<dyn BlockDevice>,
}

impl SectorCache {
    pub fn new(sector_size: usize, device: Arc<dyn BlockDevice>) -> Self {
        assert!(sector_size <= MAX_SECTOR_SIZE);
        Self {
            sector_size,
            lba: None,
            modified: false,
            buffer: [0u8; MAX_SECTOR_SIZE],
            device,
        }
    }

    fn load(&mut self, lba: u32) -> Result<(), DeviceError> {
        if self.lba != Some(lba) {
            self.sync()?;
            self.lba = None;
            self.device.read_blocks(&mut self.buffer[..self.sector_size], lba, 1)?;
            self.lba = Some(lba);
        }
        Ok(())
    }

    fn addr_of_offset(&self, offset: usize) -> usize {
        &self.buffer[offset] as *const _ as usize
    }

    /// Copy `buf.len()` bytes out of the cached sector starting at `offset`.
    /// Used where the read length is only known at runtime (file reads),
    /// unlike [`Cache::read`] which is keyed to a fixed-size `T`.
    pub fn read_bytes(&mut self, lba: u32, offset: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.load(lba)?;
        assert!(offset + buf.len() <= self.sector_size);
        buf.copy_from_slice(&self.buffer[offset..offset + buf.len()]);
        Ok(())
    }
}

impl Cache for SectorCache {
    fn read<T, V>(&mut self, lba: u32, offset: usize, f: impl FnOnce(&T) -> V) -> Result<V, DeviceError> {
        self.load(lba)?;
        let type_size = core::mem::size_of::<T>();
        assert!(offset + type_size <= self.sector_size);
        let addr = self.addr_of_offset(offset);
        Ok(f(unsafe { &*(addr as *const T) }))
    }

    fn modify<T, V>(&mut self, lba: u32, offset: usize, f: impl FnOnce(&mut T) -> V) -> Result<V, DeviceError> {
        self.load(lba)?;
        let type_size = core::mem::size_of::<T>();
        assert!(offset + type_size <= self.sector_size);
        self.modified = true;
        let addr = self.addr_of_offset(offset);
        Ok(f(unsafe { &mut *(addr as *mut T) }))
    }

    fn sync(&mut self) -> Result<(), DeviceError> {
        if self.modified {
            if let Some(lba) = self.lba {
                self.device.write_blocks(&self.buffer[..self.sector_size], lba, 1)?;
            }
            self.modified = false;
        }
        Ok(())
    }
}

impl Drop for SectorCache {
    fn drop(&mut self) {
        let _ = self.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spin::Mutex;

    struct RamDisk {
        sectors: Mutex<alloc::vec::Vec<[u8; 512]>>,
    }

    impl RamDisk {
        fn new(count: usize) -> Self {
            Self {
                sectors: Mutex::new(alloc::vec![[0u8; 512]; count]),
            }
        }
    }

    impl BlockDevice for RamDisk {
        fn read_blocks(&self, buf: &mut [u8], lba: u32, count: usize) -> Result<(), DeviceError> {
            assert_eq!(count, 1);
            buf.copy_from_slice(&self.sectors.lock()[lba as usize][..buf.len()]);
            Ok(())
        }
        fn write_blocks(&self, buf: &[u8], lba: u32, count: usize) -> Result<(), DeviceError> {
            assert_eq!(count, 1);
            self.sectors.lock()[lba as usize][..buf.len()].copy_from_slice(buf);
            Ok(())
        }
    }

    #[test]
    fn flushes_on_sector_switch() {
        let device: Arc<dyn BlockDevice> = Arc::new(RamDisk::new(2));
        let mut cache = SectorCache::new(512, Arc::clone(&device));

        cache.modify::<u32, ()>(0, 0, |v| *v = 0xDEADBEEF).unwrap();
        // Switching to sector 1 must flush sector 0 first.
        cache.read::<u32, ()>(1, 0, |_| ()).unwrap();

        let mut readback = [0u8; 4];
        device.read_blocks(&mut readback, 0, 1).unwrap();
        assert_eq!(u32::from_le_bytes(readback), 0xDEADBEEF);
    }

    #[test]
    fn sync_is_noop_when_clean() {
        let device: Arc<dyn BlockDevice> = Arc::new(RamDisk::new(1));
        let mut cache = SectorCache::new(512, device);
        cache.read::<u32, ()>(0, 0, |_| ()).unwrap();
        cache.sync().unwrap();
    }

    struct FlakyDevice {
        sectors: Mutex<alloc::vec::Vec<[u8; 512]>>,
        fail_next_read: Mutex<bool>,
    }

    impl FlakyDevice {
        fn new(count: usize) -> Self {
            Self {
                sectors: Mutex::new(alloc::vec![[0u8; 512]; count]),
                fail_next_read: Mutex::new(false),
            }
        }
    }

    impl BlockDevice for FlakyDevice {
        fn read_blocks(&self, buf: &mut [u8], lba: u32, count: usize) -> Result<(), DeviceError> {
            assert_eq!(count, 1);
            if core::mem::replace(&mut *self.fail_next_read.lock(), false) {
                return Err(DeviceError::ReadError);
            }
            buf.copy_from_slice(&self.sectors.lock()[lba as usize][..buf.len()]);
            Ok(())
        }
        fn write_blocks(&self, buf: &[u8], lba: u32, count: usize) -> Result<(), DeviceError> {
            assert_eq!(count, 1);
            self.sectors.lock()[lba as usize][..buf.len()].copy_from_slice(buf);
            Ok(())
        }
    }

    #[test]
    fn failed_refetch_does_not_leave_stale_sector_readable() {
        let device = Arc::new(FlakyDevice::new(2));
        device.sectors.lock()[0][..4].copy_from_slice(&0xCAFEBABEu32.to_le_bytes());
        let mut cache = SectorCache::new(512, device.clone());

        // Cache sector 0.
        cache.read::<u32, ()>(0, 0, |_| ()).unwrap();

        // Switching to sector 1 clobbers the buffer, then the read fails.
        *device.fail_next_read.lock() = true;
        assert!(cache.read::<u32, ()>(1, 0, |_| ()).is_err());

        // Going back to sector 0 must not take the stale fast path: the
        // cache's idea of which LBA it holds was invalidated by the failed
        // read, so this has to refetch sector 0 from the device.
        let value = cache.read::<u32, u32>(0, 0, |v| *v).unwrap();
        assert_eq!(value, 0xCAFEBABE);
    }
}
