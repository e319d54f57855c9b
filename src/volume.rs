//! Volume data model, mount manager, and the process-wide volume list.
//!
//! A [`Volume`] owns everything that is specific to one mounted FAT32
//! partition: its geometry (the parsed [`BIOSParameterBlock`]), the absolute
//! LBAs of its FAT/data/root regions, its single [`SectorCache`], and its
//! assigned drive letter. [`mount`] runs the full discovery sequence (MBR,
//! BPB validation, FSInfo) and files the new volume into [`VOLUMES`] under
//! the lowest free letter starting at `C`; [`eject`] flushes and removes it.

use crate::bpb::{BIOSParameterBlock, BasicBPB, FSInfo, BPB32};
use crate::cache::{Cache, SectorCache};
use crate::device::BlockDevice;
use crate::dir::{self, DirEntryInfo};
use crate::entry::ShortDirEntry;
use crate::fat::{Allocator, ClusterChain, FatTable};
use crate::mbr::{MasterBootRecord, MbrError};
use crate::{FatStatus, DIRENT_SIZE};

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem::size_of;
use lazy_static::lazy_static;
use spin::RwLock;

/// Number of drive letters this driver can hand out: `C`..`Z` plus six more
/// slots (32 total), tracked by a bitmask the same way the reference design
/// describes.
const MAX_VOLUMES: usize = 32;

pub struct Volume {
    pub letter: char,
    device: Arc<dyn BlockDevice>,
    bpb: BIOSParameterBlock,
    /// Absolute LBA of the start of the partition (sector 0 of the BPB).
    partition_lba: u32,
    cache: SectorCache,
    label: String,
}

impl Volume {
    pub fn bpb(&self) -> &BIOSParameterBlock {
        &self.bpb
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn fat1_lba(&self) -> u32 {
        self.partition_lba + self.bpb.fat1_sector_id() as u32
    }

    pub fn root_cluster(&self) -> u32 {
        self.bpb.root_cluster() as u32
    }

    fn fsinfo_lba(&self) -> u32 {
        self.partition_lba + self.bpb.fat_info_sector() as u32
    }

    /// Absolute LBA of the first sector of `cluster`.
    pub fn cluster_lba(&self, cluster: u32) -> u32 {
        self.partition_lba + self.bpb.clust_to_sect(cluster) as u32
    }

    pub fn sectors_per_cluster(&self) -> usize {
        self.bpb.sector_per_cluster()
    }

    pub fn bytes_per_sector(&self) -> usize {
        self.bpb.bytes_per_sector()
    }

    pub fn cache_mut(&mut self) -> &mut SectorCache {
        &mut self.cache
    }

    /// Walk the FAT starting at `start_cluster` and collect every cluster
    /// number in the chain, in order.
    pub fn cluster_chain(&mut self, start_cluster: u32) -> Vec<u32> {
        let mut table = FatTable::new(&mut self.cache, self.fat1_lba(), self.bpb.bytes_per_sector());
        ClusterChain::new(&mut table, start_cluster).collect()
    }

    /// Allocate a free cluster using the FSInfo hint, update the hint, and
    /// return the new cluster number.
    pub fn allocate_cluster(&mut self) -> Result<u32, FatStatus> {
        let fat1_lba = self.fat1_lba();
        let bytes_per_sector = self.bpb.bytes_per_sector();
        let data_cluster_cnt = self.bpb.data_cluster_cnt();
        let fsinfo_lba = self.fsinfo_lba();

        let hint = self
            .cache
            .read::<FSInfo, u32>(fsinfo_lba, 0, |info| info.next_free_cluster())
            .map_err(|_| FatStatus::Error)?;

        let mut table = FatTable::new(&mut self.cache, fat1_lba, bytes_per_sector);
        let mut allocator = Allocator::new(&mut table, data_cluster_cnt);
        let cluster = allocator.allocate(hint)?;

        let cluster_limit = data_cluster_cnt as u32 + 2;
        let next_scan = if cluster + 1 >= cluster_limit { 2 } else { cluster + 1 };

        self.cache
            .modify::<FSInfo, ()>(fsinfo_lba, 0, |info| {
                info.set_next_free_cluster(next_scan);
                info.set_free_clusters(info.free_cluster_cnt().saturating_sub(1));
            })
            .map_err(|_| FatStatus::Error)?;

        Ok(cluster)
    }

    /// Read the root directory's volume-label entry, if one is present.
    /// Entries are rejected unless `ATTR_VOLUME_ID` is set and the attribute
    /// byte is NOT exactly `ATTR_LONG_NAME` (0x0F has the volume-id bit set
    /// too, but it marks an LFN fragment, not a label).
    fn read_label(&mut self) -> Option<String> {
        let clusters = self.cluster_chain(self.root_cluster());
        let bytes_per_sector = self.bpb.bytes_per_sector();
        let sectors_per_cluster = self.bpb.sector_per_cluster();
        let entries_per_sector = bytes_per_sector / DIRENT_SIZE;

        for cluster in clusters {
            let base_lba = self.cluster_lba(cluster);
            for sector in 0..sectors_per_cluster as u32 {
                let lba = base_lba + sector;
                for entry in 0..entries_per_sector {
                    let offset = entry * DIRENT_SIZE;
                    let raw = self
                        .cache
                        .read::<[u8; 32], [u8; 32]>(lba, offset, |buf| *buf)
                        .ok()?;
                    if raw[0] == crate::DIR_ENTRY_LAST_AND_UNUSED {
                        return None;
                    }
                    let sde = ShortDirEntry::from_bytes(&raw);
                    if sde.is_volume_label() {
                        return Some(sde.name());
                    }
                }
            }
        }
        None
    }

    pub fn sync(&mut self) -> Result<(), FatStatus> {
        self.cache.sync().map_err(|_| FatStatus::Error)
    }

    /// Overwrite the root directory's existing volume-label entry with
    /// `label` (truncated/space-padded to 11 bytes) and update the
    /// in-memory mirror returned by [`Volume::label`]. Creating a label
    /// entry where none exists is out of scope, the same as any other
    /// directory-entry creation.
    pub fn set_label(&mut self, label: &str) -> Result<(), FatStatus> {
        let clusters = self.cluster_chain(self.root_cluster());
        let bytes_per_sector = self.bpb.bytes_per_sector();
        let sectors_per_cluster = self.bpb.sector_per_cluster();
        let entries_per_sector = bytes_per_sector / DIRENT_SIZE;

        let mut padded = [crate::SPACE; 11];
        for (slot, byte) in padded.iter_mut().zip(label.bytes()) {
            *slot = byte.to_ascii_uppercase();
        }

        for cluster in clusters {
            let base_lba = self.cluster_lba(cluster);
            for sector in 0..sectors_per_cluster as u32 {
                let lba = base_lba + sector;
                for entry in 0..entries_per_sector {
                    let offset = entry * DIRENT_SIZE;
                    let raw = self
                        .cache
                        .read::<[u8; 32], [u8; 32]>(lba, offset, |buf| *buf)
                        .map_err(|_| FatStatus::Error)?;
                    if raw[0] == crate::DIR_ENTRY_LAST_AND_UNUSED {
                        return Err(FatStatus::PathErr);
                    }
                    let sde = ShortDirEntry::from_bytes(&raw);
                    if sde.is_volume_label() {
                        self.cache
                            .modify::<[u8; 11], ()>(lba, offset, |name| *name = padded)
                            .map_err(|_| FatStatus::Error)?;
                        self.cache.sync().map_err(|_| FatStatus::Error)?;
                        self.label = core::str::from_utf8(&padded).unwrap_or_default().trim_end().into();
                        return Ok(());
                    }
                }
            }
        }
        Err(FatStatus::PathErr)
    }

    /// Decode every live entry of the directory rooted at `start_cluster`.
    pub fn list_dir(&mut self, start_cluster: u32) -> Result<Vec<DirEntryInfo>, FatStatus> {
        let clusters = self.cluster_chain(start_cluster);
        let partition_lba = self.partition_lba;
        let bpb = self.bpb;
        let sectors_per_cluster = bpb.sector_per_cluster();
        let bytes_per_sector = bpb.bytes_per_sector();
        dir::read_dir(
            &mut self.cache,
            &clusters,
            move |cluster| partition_lba + bpb.clust_to_sect(cluster) as u32,
            sectors_per_cluster,
            bytes_per_sector,
        )
        .map_err(|_| FatStatus::Error)
    }

    /// Search the directory rooted at `start_cluster` for `name`, leniently
    /// tolerating an LFN checksum mismatch (see [`dir::find_entry`]).
    pub fn find_entry(&mut self, start_cluster: u32, name: &str) -> Result<Option<DirEntryInfo>, FatStatus> {
        let clusters = self.cluster_chain(start_cluster);
        let partition_lba = self.partition_lba;
        let bpb = self.bpb;
        let sectors_per_cluster = bpb.sector_per_cluster();
        let bytes_per_sector = bpb.bytes_per_sector();
        dir::find_entry(
            &mut self.cache,
            &clusters,
            move |cluster| partition_lba + bpb.clust_to_sect(cluster) as u32,
            sectors_per_cluster,
            bytes_per_sector,
            name,
        )
        .map_err(|_| FatStatus::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountError {
    NoPartition,
    NotFat32,
    Device,
    NoFreeLetter,
}

impl From<MbrError> for MountError {
    fn from(_: MbrError) -> Self {
        MountError::Device
    }
}

fn parse_bpb(sector0: &[u8]) -> BIOSParameterBlock {
    assert!(sector0.len() >= size_of::<BasicBPB>() + size_of::<BPB32>());
    unsafe { core::ptr::read_unaligned(sector0.as_ptr() as *const BIOSParameterBlock) }
}

/// Mount manager: discover a FAT32 partition via the MBR, validate its BPB,
/// and register the resulting [`Volume`] under the next free drive letter.
pub fn mount(device: Arc<dyn BlockDevice>, sector_size: usize) -> Result<char, MountError> {
    let mbr = MasterBootRecord::read(&device, sector_size)?;
    let partition = mbr.first_fat32().ok_or(MountError::NoPartition)?;
    let partition_lba = partition.start_lba;

    let mut sector0 = [0u8; crate::MAX_SECTOR_SIZE];
    device
        .read_blocks(&mut sector0[..sector_size], partition_lba, 1)
        .map_err(|_| MountError::Device)?;

    let bpb_sig = u16::from_le_bytes([sector0[crate::MBR_SIGNATURE_OFFSET], sector0[crate::MBR_SIGNATURE_OFFSET + 1]]);
    if bpb_sig != crate::MBR_SIGNATURE {
        return Err(MountError::NotFat32);
    }

    let bpb = parse_bpb(&sector0);

    if !bpb.is_valid() {
        log::warn!("partition at lba {} failed BPB validation", partition_lba);
        return Err(MountError::NotFat32);
    }
    if !matches!(bpb.fat_type(), crate::bpb::FatType::FAT32) {
        log::warn!("partition at lba {} is not FAT32, refusing to mount", partition_lba);
        return Err(MountError::NotFat32);
    }

    let cache = SectorCache::new(bpb.bytes_per_sector(), Arc::clone(&device));
    let mut volume = Volume {
        letter: ' ',
        device,
        bpb,
        partition_lba,
        cache,
        label: String::new(),
    };

    let label = volume.read_label().unwrap_or_default();
    volume.label = label;

    let letter = VOLUMES.write().insert(volume).ok_or(MountError::NoFreeLetter)?;
    log::debug!("mounted FAT32 partition at lba {} as {}:", partition_lba, letter);
    Ok(letter)
}

/// Flush and remove the volume assigned to `letter`.
pub fn eject(letter: char) -> Result<(), FatStatus> {
    let volume = VOLUMES.write().remove(letter).ok_or(FatStatus::NoVolume)?;
    log::debug!("ejecting volume {}:", letter);
    volume.write().sync()
}

/// Fixed-size slot table, one slot per drive letter `C..` through the 32nd
/// letter after it. A 32-bit occupancy mask tracks which slots are taken so
/// the lowest free letter can be found in O(1).
pub struct VolumeTable {
    slots: [Option<Arc<RwLock<Volume>>>; MAX_VOLUMES],
    occupied: u32,
}

impl VolumeTable {
    const fn new() -> Self {
        const EMPTY: Option<Arc<RwLock<Volume>>> = None;
        Self {
            slots: [EMPTY; MAX_VOLUMES],
            occupied: 0,
        }
    }

    fn insert(&mut self, mut volume: Volume) -> Option<char> {
        let index = (0..MAX_VOLUMES).find(|i| self.occupied & (1 << i) == 0)?;
        let letter = (b'C' + index as u8) as char;
        volume.letter = letter;
        self.slots[index] = Some(Arc::new(RwLock::new(volume)));
        self.occupied |= 1 << index;
        Some(letter)
    }

    fn remove(&mut self, letter: char) -> Option<Arc<RwLock<Volume>>> {
        let index = (letter as u8).checked_sub(b'C')? as usize;
        if index >= MAX_VOLUMES || self.occupied & (1 << index) == 0 {
            return None;
        }
        self.occupied &= !(1 << index);
        self.slots[index].take()
    }

    pub fn get(&self, letter: char) -> Option<Arc<RwLock<Volume>>> {
        let index = (letter as u8).checked_sub(b'C')? as usize;
        if index >= MAX_VOLUMES {
            return None;
        }
        self.slots[index].clone()
    }
}

lazy_static! {
    pub static ref VOLUMES: RwLock<VolumeTable> = RwLock::new(VolumeTable::new());
}

pub fn get_volume(letter: char) -> Option<Arc<RwLock<Volume>>> {
    VOLUMES.read().get(letter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::device::DeviceError;
    use crate::LAST_LONG_ENTRY;

    use alloc::collections::BTreeMap;
    use alloc::vec;
    use spin::Mutex;

    /// A sparse, zero-filled disk: only the sectors the test actually cares
    /// about (MBR, BPB, FAT, directory, file data) are stored; every other
    /// LBA reads back as a zeroed sector. This lets the image declare a
    /// `tot_sec32` large enough to pass as FAT32 (`data_cluster_cnt` over
    /// 65525) without allocating hundreds of megabytes of `Vec`.
    struct RamDisk {
        sectors: Mutex<BTreeMap<u32, [u8; 512]>>,
    }

    impl RamDisk {
        fn new() -> Self {
            Self {
                sectors: Mutex::new(BTreeMap::new()),
            }
        }

        fn write_sector(&self, lba: u32, data: &[u8]) {
            let mut sector = [0u8; 512];
            sector[..data.len()].copy_from_slice(data);
            self.sectors.lock().insert(lba, sector);
        }
    }

    impl BlockDevice for RamDisk {
        fn read_blocks(&self, buf: &mut [u8], lba: u32, count: usize) -> Result<(), DeviceError> {
            assert_eq!(count, 1);
            let sectors = self.sectors.lock();
            match sectors.get(&lba) {
                Some(sector) => buf.copy_from_slice(&sector[..buf.len()]),
                None => buf.fill(0),
            }
            Ok(())
        }

        fn write_blocks(&self, buf: &[u8], lba: u32, count: usize) -> Result<(), DeviceError> {
            assert_eq!(count, 1);
            let mut sector = [0u8; 512];
            sector[..buf.len()].copy_from_slice(buf);
            self.sectors.lock().insert(lba, sector);
            Ok(())
        }
    }

    fn mbr_sector(partition_lba: u32, total_sectors: u32) -> [u8; 512] {
        let mut buf = [0u8; 512];
        let off = crate::MBR_PARTITION_TABLE_OFFSET;
        buf[off + 0x04] = crate::FAT32_PARTITION_TYPE_LBA;
        buf[off + 0x08..off + 0x0C].copy_from_slice(&partition_lba.to_le_bytes());
        buf[off + 0x0C..off + 0x10].copy_from_slice(&total_sectors.to_le_bytes());
        buf[510] = 0x55;
        buf[511] = 0xAA;
        buf
    }

    fn bpb_sector(sec_per_clus: u8, rsvd: u16, num_fats: u8, tot_sec32: u32, fat_sz32: u32, root_clus: u32) -> [u8; 512] {
        let mut buf = [0u8; 512];
        buf[11..13].copy_from_slice(&512u16.to_le_bytes());
        buf[13] = sec_per_clus;
        buf[14..16].copy_from_slice(&rsvd.to_le_bytes());
        buf[16] = num_fats;
        buf[21] = 0xF8;
        buf[32..36].copy_from_slice(&tot_sec32.to_le_bytes());
        buf[36..40].copy_from_slice(&fat_sz32.to_le_bytes());
        buf[44..48].copy_from_slice(&root_clus.to_le_bytes());
        buf[48..50].copy_from_slice(&1u16.to_le_bytes());
        buf[82..90].copy_from_slice(b"FAT32   ");
        buf[510] = 0x55;
        buf[511] = 0xAA;
        buf
    }

    fn fat_entry_patch(sector: &mut [u8; 512], cluster: u32, value: u32) {
        let offset = (cluster as usize * 4) % 512;
        sector[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn sfn_bytes(name: &[u8; 8], ext: &[u8; 3], attr: u8, first_cluster: u32, size: u32) -> [u8; 32] {
        let mut buf = [0u8; 32];
        buf[0..8].copy_from_slice(name);
        buf[8..11].copy_from_slice(ext);
        buf[11] = attr;
        buf[20..22].copy_from_slice(&((first_cluster >> 16) as u16).to_le_bytes());
        buf[26..28].copy_from_slice(&((first_cluster & 0xFFFF) as u16).to_le_bytes());
        buf[28..32].copy_from_slice(&size.to_le_bytes());
        buf
    }

    fn lfn_bytes(seq: u8, last: bool, checksum: u8, chars: &str) -> [u8; 32] {
        let mut units = [0xFFFFu16; 13];
        let chars: alloc::vec::Vec<u16> = chars.encode_utf16().collect();
        for (i, slot) in units.iter_mut().enumerate() {
            if i < chars.len() {
                *slot = chars[i];
            } else if i == chars.len() {
                *slot = 0x0000;
            }
        }

        let mut buf = [0u8; 32];
        buf[0] = seq | if last { LAST_LONG_ENTRY } else { 0 };
        for (i, &u) in units[0..5].iter().enumerate() {
            buf[1 + i * 2..3 + i * 2].copy_from_slice(&u.to_le_bytes());
        }
        buf[11] = crate::ATTR_LONG_NAME;
        buf[13] = checksum;
        for (i, &u) in units[5..11].iter().enumerate() {
            buf[14 + i * 2..16 + i * 2].copy_from_slice(&u.to_le_bytes());
        }
        for (i, &u) in units[11..13].iter().enumerate() {
            buf[28 + i * 2..30 + i * 2].copy_from_slice(&u.to_le_bytes());
        }
        buf
    }

    /// Builds a small-but-legally-FAT32-shaped image (partition at LBA 2048,
    /// 8 sectors/cluster, 32 reserved sectors, two 1024-sector FATs, root at
    /// cluster 2) and drives it through [`mount`] and the public
    /// [`crate::api`] surface end to end: geometry, a plain short-name
    /// entry, a reconstructed long name, an LFN checksum mismatch reported
    /// mid-scan, and a file read that crosses a cluster boundary.
    #[test]
    fn mount_and_walk_a_full_disk_image() {
        const PARTITION_LBA: u32 = 2048;
        const RSVD: u16 = 32;
        const NUM_FATS: u8 = 2;
        const FAT_SZ32: u32 = 1024;
        const SEC_PER_CLUS: u8 = 8;
        const TOT_SEC32: u32 = 600_000;

        let fat1_lba = PARTITION_LBA + RSVD as u32;
        let root_lba = fat1_lba + NUM_FATS as u32 * FAT_SZ32;
        let cluster_lba = |cluster: u32| root_lba + (cluster - 2) * SEC_PER_CLUS as u32;

        let disk = RamDisk::new();
        disk.write_sector(0, &mbr_sector(PARTITION_LBA, TOT_SEC32));
        disk.write_sector(PARTITION_LBA, &bpb_sector(SEC_PER_CLUS, RSVD, NUM_FATS, TOT_SEC32, FAT_SZ32, 2));

        let mut fat_sector = [0u8; 512];
        fat_entry_patch(&mut fat_sector, 2, crate::END_CLUSTER);
        fat_entry_patch(&mut fat_sector, 3, 7);
        fat_entry_patch(&mut fat_sector, 7, crate::END_CLUSTER);
        disk.write_sector(fat1_lba, &fat_sector);

        // Root directory, cluster 2: a plain short-name file, a long-name
        // file whose fragments reassemble correctly, a long-name file whose
        // fragments carry the wrong checksum, and the end-of-directory
        // terminator.
        let mut root = alloc::vec::Vec::new();
        root.extend_from_slice(&sfn_bytes(b"README  ", b"TXT", crate::ATTR_ARCHIVE, 3, 4196));

        let long_name = "longfilename.txt";
        let anchor_name = *b"LONGFI~1";
        let anchor_ext = *b"TXT";
        let mut anchor_name11 = [0u8; 11];
        anchor_name11[..8].copy_from_slice(&anchor_name);
        anchor_name11[8..].copy_from_slice(&anchor_ext);
        let checksum = crate::generate_checksum(&anchor_name11);
        root.extend_from_slice(&lfn_bytes(2, true, checksum, &long_name[13..]));
        root.extend_from_slice(&lfn_bytes(1, false, checksum, &long_name[..13]));
        root.extend_from_slice(&sfn_bytes(&anchor_name, &anchor_ext, crate::ATTR_ARCHIVE, 0, 0));

        root.extend_from_slice(&lfn_bytes(1, true, 0xFF, "badname.txt"));
        root.extend_from_slice(&sfn_bytes(b"BADNAME ", b"TXT", crate::ATTR_ARCHIVE, 0, 0));

        root.extend_from_slice(&[0u8; 32]); // end-of-directory terminator
        disk.write_sector(cluster_lba(2), &root);

        // File data: cluster 3 (4096 bytes of 0xAA) chains to cluster 7
        // (100 bytes of 0xBB used, rest don't-care), matching the
        // 3 -> 7 -> EOC FAT chain above.
        for sector in 0..SEC_PER_CLUS as u32 {
            disk.write_sector(cluster_lba(3) + sector, &[0xAAu8; 512]);
        }
        disk.write_sector(cluster_lba(7), &[0xBBu8; 512]);

        let device: Arc<dyn BlockDevice> = Arc::new(disk);
        let letter = mount(device, 512).expect("mount succeeds on a well-formed image");

        {
            let volume = get_volume(letter).expect("just-mounted volume is registered");
            let guard = volume.read();
            assert_eq!(guard.root_cluster(), 2);
            assert_eq!(guard.bytes_per_sector(), 512);
            assert_eq!(guard.sectors_per_cluster(), SEC_PER_CLUS as usize);
        }

        let root_path = alloc::format!("{}:/", letter);
        let mut dir = api::dir_open(&root_path).expect("root directory opens");

        let first = api::dir_read(&mut dir).expect("plain short-name entry");
        assert_eq!(first.name, "README.TXT");
        assert_eq!(first.first_cluster, 3);
        assert_eq!(first.file_size, 4196);

        let second = api::dir_read(&mut dir).expect("long name reconstructs");
        assert_eq!(second.name, long_name);

        match api::dir_read(&mut dir) {
            Err(FatStatus::Error) => {}
            other => panic!("expected a checksum mismatch, got {:?}", other),
        }
        match api::dir_read(&mut dir) {
            Err(FatStatus::Eof) => {}
            other => panic!("expected end of directory, got {:?}", other),
        }
        api::dir_close(dir);

        let file_path = alloc::format!("{}:/README.TXT", letter);
        let mut file = api::file_open(&file_path).expect("file resolves under the root");
        let mut contents = vec![0u8; 4196];
        let read = api::file_read(&mut file, &mut contents).expect("full read succeeds");
        assert_eq!(read, 4196);
        assert!(contents[..4096].iter().all(|&b| b == 0xAA));
        assert!(contents[4096..].iter().all(|&b| b == 0xBB));

        api::file_seek(&mut file, 4090).expect("seek across the cluster boundary");
        let mut straddling = [0u8; 20];
        let read = api::file_read(&mut file, &mut straddling).expect("read straddles the boundary");
        assert_eq!(read, 20);
        assert!(straddling[..6].iter().all(|&b| b == 0xAA));
        assert!(straddling[6..].iter().all(|&b| b == 0xBB));
        api::file_close(file);

        eject(letter).expect("eject releases the slot");
    }

    /// Mirrors the reference scenario: FSInfo says next-free = 5, free-count
    /// = 100; FAT entries 5 and 6 read free, entry 7 is already end-of-chain.
    /// `allocate_cluster` must land on 5, advance the hint to 6 (the
    /// following scan position, not the cluster just allocated), and drop
    /// the free count to 99.
    #[test]
    fn allocate_cluster_updates_fsinfo_hint_and_free_count() {
        const PARTITION_LBA: u32 = 2048;
        const RSVD: u16 = 32;
        const NUM_FATS: u8 = 2;
        const FAT_SZ32: u32 = 1024;
        const SEC_PER_CLUS: u8 = 8;
        const TOT_SEC32: u32 = 600_000;

        let fat1_lba = PARTITION_LBA + RSVD as u32;

        let disk = RamDisk::new();
        disk.write_sector(0, &mbr_sector(PARTITION_LBA, TOT_SEC32));
        disk.write_sector(PARTITION_LBA, &bpb_sector(SEC_PER_CLUS, RSVD, NUM_FATS, TOT_SEC32, FAT_SZ32, 2));

        let mut fat_sector = [0u8; 512];
        fat_entry_patch(&mut fat_sector, 7, crate::END_CLUSTER);
        disk.write_sector(fat1_lba, &fat_sector);

        let mut fsinfo_sector = [0u8; 512];
        fsinfo_sector[488..492].copy_from_slice(&100u32.to_le_bytes());
        fsinfo_sector[492..496].copy_from_slice(&5u32.to_le_bytes());
        disk.write_sector(PARTITION_LBA + 1, &fsinfo_sector);

        let device: Arc<dyn BlockDevice> = Arc::new(disk);
        let letter = mount(device, 512).expect("mount succeeds on a well-formed image");

        let volume = get_volume(letter).expect("just-mounted volume is registered");
        let cluster = volume.write().allocate_cluster().expect("a free cluster is available");
        assert_eq!(cluster, 5);

        let mut guard = volume.write();
        assert_eq!(guard.cluster_chain(5), alloc::vec![5]);
        let fsinfo_lba = guard.fsinfo_lba();
        let (free_count, next_free) = guard
            .cache
            .read::<FSInfo, (u32, u32)>(fsinfo_lba, 0, |info| (info.free_cluster_cnt(), info.next_free_cluster()))
            .expect("fsinfo sector reads back");
        assert_eq!(free_count, 99);
        assert_eq!(next_free, 6);
        drop(guard);

        eject(letter).expect("eject releases the slot");
    }
}
