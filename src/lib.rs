#![no_std]
pub mod api;
pub mod bpb;
pub mod cache;
pub mod device;
pub mod dir;
pub mod entry;
pub mod fat;
pub mod file;
pub mod mbr;
pub mod path;
pub mod volume;

extern crate alloc;

use core::convert::TryInto;

pub const LEAD_SIGNATURE: u32 = 0x41615252;
pub const STRUCT_SIGNATURE: u32 = 0x61417272;
pub const TRAIL_SIGNATURE: u32 = 0xAA550000;

pub const FREE_CLUSTER: u32 = 0x00000000;
pub const END_CLUSTER: u32 = 0x0FFFFFF8;
pub const BAD_CLUSTER: u32 = 0x0FFFFFF7;
/// A FAT32 entry is really a 28-bit value; the top nibble is reserved and must
/// be preserved, never treated as part of the cluster number.
pub const FAT_ENTRY_MASK: u32 = 0x0FFFFFFF;
pub const END_OF_CLUSTER: u32 = 0x0FFFFFFF;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

pub const DIRENT_SIZE: usize = 32;
pub const LONG_NAME_LEN_CAP: usize = 13;

// Charactor
pub const SPACE: u8 = 0x20;
pub const DOT: u8 = 0x2E;

/// Largest sector size a BPB is legally allowed to declare (512/1024/2048/4096).
pub const MAX_SECTOR_SIZE: usize = 4096;

pub const LONG_DIR_ENT_NAME_CAPACITY: usize = 13;
pub const SHORT_DIR_ENT_NAME_CAPACITY: usize = 11;

/// For Short Directory Entry Name[0] and Long Directory Entry Ord
///
/// Deleted
pub const DIR_ENTRY_UNUSED: u8 = 0xE5;
/// For Short Directory Entry Name[0]
pub const DIR_ENTRY_LAST_AND_UNUSED: u8 = 0x00;
/// For Long Directory Entry Ord as the last entry mask
pub const LAST_LONG_ENTRY: u8 = 0x40;

pub const MAX_CLUSTER_FAT12: usize = 4085;
pub const MAX_CLUSTER_FAT16: usize = 65525;
pub const MAX_CLUSTER_FAT32: usize = 268435445;

/// Bit ClnShutBitMask -- If bit is 1, volume is "clean". If bit is 0, volume is "dirty".
pub const CLN_SHUT_BIT_MASK_FAT32: u32 = 0x08000000;
pub const HRD_ERR_BIT_MASK_FAT32: u32 = 0x04000000;

pub const MBR_SIGNATURE_OFFSET: usize = 510;
pub const MBR_SIGNATURE: u16 = 0xAA55;
pub const MBR_PARTITION_TABLE_OFFSET: usize = 446;
pub const MBR_PARTITION_ENTRY_SIZE: usize = 16;
pub const MBR_PARTITION_COUNT: usize = 4;

pub const FAT32_PARTITION_TYPE_LBA: u8 = 0x0C;
pub const FAT32_PARTITION_TYPE_CHS: u8 = 0x0B;

/// Mirrors the reference driver's `fstatus` result taxonomy. Plain enum, no
/// `Display`/`Error` impl, matching how the rest of this crate's error types
/// are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatStatus {
    Ok,
    Eof,
    Error,
    NoVolume,
    PathErr,
    /// The free-cluster allocator scanned the whole FAT and found nothing.
    Full,
}

pub(crate) fn read_le_u32(input: &[u8]) -> u32 {
    let (int_bytes, _) = input.split_at(core::mem::size_of::<u32>());
    u32::from_le_bytes(int_bytes.try_into().unwrap())
}

pub(crate) fn generate_checksum(value: &[u8]) -> u8 {
    let mut checksum: u8 = 0;
    for &i in value {
        checksum = ((checksum & 1) << 7).wrapping_add(checksum >> 1).wrapping_add(i);
    }
    checksum
}
