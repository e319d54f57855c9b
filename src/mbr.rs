//! Master Boot Record parsing
//!
//! Sector 0 of the device carries 446 bytes of boot code, a 64-byte
//! partition table (four 16-byte entries), and the 0x55 0xAA signature at
//! offset 510. Only the partition table is interesting here: the mount
//! manager in [`crate::volume`] walks it looking for a FAT32 partition
//! (system ID 0x0B or 0x0C) to mount.

use crate::device::{BlockDevice, DeviceError};
use crate::{MBR_PARTITION_COUNT, MBR_PARTITION_ENTRY_SIZE, MBR_PARTITION_TABLE_OFFSET};
use crate::{FAT32_PARTITION_TYPE_CHS, FAT32_PARTITION_TYPE_LBA, MBR_SIGNATURE, MBR_SIGNATURE_OFFSET};

use crate::read_le_u32;
use alloc::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbrError {
    ReadError,
    BadSignature,
}

impl From<DeviceError> for MbrError {
    fn from(_: DeviceError) -> Self {
        MbrError::ReadError
    }
}

/// One 16-byte entry of the partition table at 0x1BE.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionEntry {
    pub boot_indicator: u8,
    pub start_chs: [u8; 3],
    pub system_id: u8,
    pub end_chs: [u8; 3],
    /// LBA of the first sector of the partition, relative to the device.
    pub start_lba: u32,
    pub total_sectors: u32,
}

impl PartitionEntry {
    fn from_bytes(buf: &[u8]) -> Self {
        Self {
            boot_indicator: buf[0x00],
            start_chs: [buf[0x01], buf[0x02], buf[0x03]],
            system_id: buf[0x04],
            end_chs: [buf[0x05], buf[0x06], buf[0x07]],
            start_lba: read_le_u32(&buf[0x08..0x0C]),
            total_sectors: read_le_u32(&buf[0x0C..0x10]),
        }
    }

    pub fn is_present(&self) -> bool {
        self.system_id != 0
    }

    pub fn is_fat32(&self) -> bool {
        self.system_id == FAT32_PARTITION_TYPE_LBA || self.system_id == FAT32_PARTITION_TYPE_CHS
    }
}

/// The four partition slots read from sector 0.
pub struct MasterBootRecord {
    pub partitions: [PartitionEntry; MBR_PARTITION_COUNT],
}

impl MasterBootRecord {
    /// Read and validate sector 0 of `device`, returning its partition table.
    pub fn read(device: &Arc<dyn BlockDevice>, sector_size: usize) -> Result<Self, MbrError> {
        let mut sector0 = [0u8; crate::MAX_SECTOR_SIZE];
        let buf = &mut sector0[..sector_size];
        device.read_blocks(buf, 0, 1)?;

        let sig = u16::from_le_bytes([buf[MBR_SIGNATURE_OFFSET], buf[MBR_SIGNATURE_OFFSET + 1]]);
        if sig != MBR_SIGNATURE {
            return Err(MbrError::BadSignature);
        }

        let mut partitions = [PartitionEntry::default(); MBR_PARTITION_COUNT];
        for (i, entry) in partitions.iter_mut().enumerate() {
            let off = MBR_PARTITION_TABLE_OFFSET + i * MBR_PARTITION_ENTRY_SIZE;
            *entry = PartitionEntry::from_bytes(&buf[off..off + MBR_PARTITION_ENTRY_SIZE]);
        }

        Ok(Self { partitions })
    }

    /// First present FAT32-typed partition, if any.
    pub fn first_fat32(&self) -> Option<&PartitionEntry> {
        self.partitions.iter().find(|p| p.is_present() && p.is_fat32())
    }
}
