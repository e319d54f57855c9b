//! Directory decoding, name reconstruction, search, and enumeration.
//!
//! Directory entries are read out of a cluster chain's data sectors 32
//! bytes at a time. A run of [`LongDirEntry`] fragments immediately
//! preceding a [`ShortDirEntry`] is reassembled into the long name if, and
//! only if, every fragment's checksum matches the short entry's computed
//! checksum (see [`ShortDirEntry::gen_check_sum`]); a mismatch is reported
//! rather than silently falling back to the short name, since it means the
//! long entries are orphaned and the directory is not in the shape this
//! driver expects.

use crate::cache::{Cache, SectorCache};
use crate::entry::{LongDirEntry, ShortDirEntry};
use crate::volume::get_volume;
use crate::{ATTR_DIRECTORY, ATTR_LONG_NAME, DIRENT_SIZE, DIR_ENTRY_LAST_AND_UNUSED, DIR_ENTRY_UNUSED};
use crate::FatStatus;

use alloc::string::String;
use alloc::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirError {
    ReadError,
    ChecksumMismatch,
}

/// The directory-listing record exposed to callers: enough to open the
/// entry as a file or descend into it as a directory without re-reading its
/// short entry.
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub attr: u8,
    pub first_cluster: u32,
    pub file_size: u32,
}

impl DirEntryInfo {
    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0 && self.attr != ATTR_LONG_NAME
    }
}

/// Read every live entry out of the directory occupying `clusters`,
/// stopping at the first `DIR_ENTRY_LAST_AND_UNUSED` marker.
pub fn read_dir(
    cache: &mut SectorCache,
    clusters: &[u32],
    cluster_lba: impl Fn(u32) -> u32,
    sectors_per_cluster: usize,
    bytes_per_sector: usize,
) -> Result<Vec<DirEntryInfo>, DirError> {
    let mut entries = Vec::new();
    let mut pending_lfn: Vec<LongDirEntry> = Vec::new();
    let entries_per_sector = bytes_per_sector / DIRENT_SIZE;

    for &cluster in clusters {
        let base_lba = cluster_lba(cluster);
        for sector in 0..sectors_per_cluster as u32 {
            let lba = base_lba + sector;
            for entry_idx in 0..entries_per_sector {
                let offset = entry_idx * DIRENT_SIZE;
                let raw = cache
                    .read::<[u8; 32], [u8; 32]>(lba, offset, |buf| *buf)
                    .map_err(|_| DirError::ReadError)?;

                if raw[0] == DIR_ENTRY_LAST_AND_UNUSED {
                    return Ok(entries);
                }
                if raw[0] == DIR_ENTRY_UNUSED {
                    pending_lfn.clear();
                    continue;
                }

                let attr = raw[11];
                if attr == ATTR_LONG_NAME {
                    pending_lfn.push(LongDirEntry::from_bytes(&raw));
                    continue;
                }

                let sde = ShortDirEntry::from_bytes(&raw);
                if sde.is_volume_label() {
                    pending_lfn.clear();
                    continue;
                }

                let name = reconstruct_name(&sde, &mut pending_lfn)?;
                entries.push(DirEntryInfo {
                    name,
                    attr: sde.attr(),
                    first_cluster: sde.first_cluster(),
                    file_size: sde.file_size(),
                });
            }
        }
    }
    Ok(entries)
}

/// Reassemble a name from `sde` and any pending long-name fragments that
/// immediately preceded it, validating the checksum. `pending` is always
/// cleared before returning.
fn reconstruct_name(sde: &ShortDirEntry, pending: &mut Vec<LongDirEntry>) -> Result<String, DirError> {
    if pending.is_empty() {
        return Ok(sde.name());
    }

    let checksum = sde.gen_check_sum();
    let mut ordered = core::mem::take(pending);
    ordered.sort_by_key(|e| e.sequence_number());

    let well_formed = ordered.last().map(|e| e.is_last_in_set()).unwrap_or(false)
        && ordered.iter().all(|e| e.check_sum() == checksum);
    if !well_formed {
        return Err(DirError::ChecksumMismatch);
    }

    let mut name = String::new();
    for fragment in ordered.iter() {
        name.push_str(&fragment.name_fragment());
    }
    Ok(name)
}

/// Case-insensitive directory search, matching against either the long name
/// or the short 8.3 name (directory listings only ever carry the
/// reconstructed long name when one exists, so a short-name-style query
/// still matches an LFN entry whose short alias equals it).
pub fn search_dir(entries: &[DirEntryInfo], name: &str) -> Option<DirEntryInfo> {
    entries.iter().find(|e| e.name.eq_ignore_ascii_case(name)).cloned()
}

/// Scan the directory occupying `clusters` for `query`, used by path
/// resolution. Unlike [`read_dir`], a checksum mismatch on an LFN chain is
/// forgiving here: the entry is compared by its short name instead of
/// failing the whole scan, matching the lookup-time leniency a malformed
/// chain shouldn't block. Returns `Ok(None)` once the end-of-directory
/// marker is reached without a match.
pub fn find_entry(
    cache: &mut SectorCache,
    clusters: &[u32],
    cluster_lba: impl Fn(u32) -> u32,
    sectors_per_cluster: usize,
    bytes_per_sector: usize,
    query: &str,
) -> Result<Option<DirEntryInfo>, DirError> {
    let mut pending_lfn: Vec<LongDirEntry> = Vec::new();
    let entries_per_sector = bytes_per_sector / DIRENT_SIZE;

    for &cluster in clusters {
        let base_lba = cluster_lba(cluster);
        for sector in 0..sectors_per_cluster as u32 {
            let lba = base_lba + sector;
            for entry_idx in 0..entries_per_sector {
                let offset = entry_idx * DIRENT_SIZE;
                let raw = cache
                    .read::<[u8; 32], [u8; 32]>(lba, offset, |buf| *buf)
                    .map_err(|_| DirError::ReadError)?;

                if raw[0] == DIR_ENTRY_LAST_AND_UNUSED {
                    return Ok(None);
                }
                if raw[0] == DIR_ENTRY_UNUSED {
                    pending_lfn.clear();
                    continue;
                }

                let attr = raw[11];
                if attr == ATTR_LONG_NAME {
                    pending_lfn.push(LongDirEntry::from_bytes(&raw));
                    continue;
                }

                let sde = ShortDirEntry::from_bytes(&raw);
                if sde.is_volume_label() {
                    pending_lfn.clear();
                    continue;
                }

                let long_name = reconstruct_name(&sde, &mut pending_lfn).ok();
                let matched = match &long_name {
                    Some(name) => name.eq_ignore_ascii_case(query),
                    None => sde.name().eq_ignore_ascii_case(query),
                };
                if matched {
                    return Ok(Some(DirEntryInfo {
                        name: long_name.unwrap_or_else(|| sde.name()),
                        attr: sde.attr(),
                        first_cluster: sde.first_cluster(),
                        file_size: sde.file_size(),
                    }));
                }
            }
        }
    }
    Ok(None)
}

/// Directory cursor: the public `dir_open`/`dir_read`/`dir_close` handle.
///
/// Unlike [`read_dir`], which materializes the whole listing eagerly,
/// `DirHandle` decodes one logical entry per [`DirHandle::read`] call,
/// walking the cluster chain it snapshotted at [`DirHandle::open`] time via
/// `(cluster index, sector within cluster, byte offset within sector)` —
/// the same triple [`crate::file::FileHandle`] tracks for file data, per the
/// chain-walker design shared by both handle kinds.
pub struct DirHandle {
    letter: char,
    clusters: Vec<u32>,
    cluster_idx: usize,
    sector_in_cluster: u32,
    byte_offset: usize,
    bytes_per_sector: usize,
    sectors_per_cluster: u32,
    pending_lfn: Vec<LongDirEntry>,
    done: bool,
}

impl DirHandle {
    /// Open the directory whose chain starts at `start_cluster` on the
    /// volume assigned to `letter`.
    pub fn open(letter: char, start_cluster: u32) -> Result<Self, FatStatus> {
        let volume = get_volume(letter).ok_or(FatStatus::NoVolume)?;
        let mut guard = volume.write();
        let clusters = guard.cluster_chain(start_cluster);
        let bytes_per_sector = guard.bytes_per_sector();
        let sectors_per_cluster = guard.sectors_per_cluster() as u32;
        Ok(Self {
            letter,
            done: clusters.is_empty(),
            clusters,
            cluster_idx: 0,
            sector_in_cluster: 0,
            byte_offset: 0,
            bytes_per_sector,
            sectors_per_cluster,
            pending_lfn: Vec::new(),
        })
    }

    fn advance_entry(&mut self) {
        self.byte_offset += DIRENT_SIZE;
        if self.byte_offset < self.bytes_per_sector {
            return;
        }
        self.byte_offset = 0;
        self.sector_in_cluster += 1;
        if self.sector_in_cluster < self.sectors_per_cluster {
            return;
        }
        self.sector_in_cluster = 0;
        self.cluster_idx += 1;
        if self.cluster_idx >= self.clusters.len() {
            self.done = true;
        }
    }

    /// Decode the next logical entry. Returns `FatStatus::Eof` once the
    /// `0x00` terminator (or the snapshotted chain's own end) is reached,
    /// and `FatStatus::Error` if an LFN chain's checksum doesn't match the
    /// anchor short entry it precedes — the entry is still consumed so a
    /// subsequent call makes progress instead of looping on the same error.
    pub fn read(&mut self) -> Result<DirEntryInfo, FatStatus> {
        loop {
            if self.done {
                return Err(FatStatus::Eof);
            }
            let volume = get_volume(self.letter).ok_or(FatStatus::NoVolume)?;
            let mut guard = volume.write();
            let cluster = self.clusters[self.cluster_idx];
            let lba = guard.cluster_lba(cluster) + self.sector_in_cluster;
            let raw = guard
                .cache_mut()
                .read::<[u8; 32], [u8; 32]>(lba, self.byte_offset, |buf| *buf)
                .map_err(|_| FatStatus::Error)?;
            drop(guard);

            if raw[0] == DIR_ENTRY_LAST_AND_UNUSED {
                self.done = true;
                return Err(FatStatus::Eof);
            }
            if raw[0] == DIR_ENTRY_UNUSED {
                self.pending_lfn.clear();
                self.advance_entry();
                continue;
            }

            let attr = raw[11];
            if attr == ATTR_LONG_NAME {
                self.pending_lfn.push(LongDirEntry::from_bytes(&raw));
                self.advance_entry();
                continue;
            }

            let sde = ShortDirEntry::from_bytes(&raw);
            if sde.is_volume_label() {
                self.pending_lfn.clear();
                self.advance_entry();
                continue;
            }

            let name = reconstruct_name(&sde, &mut self.pending_lfn);
            self.advance_entry();
            return match name {
                Ok(name) => Ok(DirEntryInfo {
                    name,
                    attr: sde.attr(),
                    first_cluster: sde.first_cluster(),
                    file_size: sde.file_size(),
                }),
                Err(_) => {
                    log::warn!("LFN checksum mismatch on entry with short name {}", sde.name());
                    Err(FatStatus::Error)
                }
            };
        }
    }

    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BlockDevice, DeviceError};
    use alloc::sync::Arc;
    use spin::Mutex;

    struct RamDisk {
        sectors: Mutex<Vec<[u8; 512]>>,
    }

    impl RamDisk {
        fn new(count: usize) -> Self {
            Self {
                sectors: Mutex::new(alloc::vec![[0u8; 512]; count]),
            }
        }
        fn write_sector(&self, lba: u32, data: &[u8]) {
            self.sectors.lock()[lba as usize][..data.len()].copy_from_slice(data);
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

    fn sfn_entry(name: &[u8; 8], ext: &[u8; 3], attr: u8, first_cluster: u32, size: u32) -> [u8; 32] {
        let mut buf = [0u8; 32];
        buf[0..8].copy_from_slice(name);
        buf[8..11].copy_from_slice(ext);
        buf[11] = attr;
        buf[20..22].copy_from_slice(&((first_cluster >> 16) as u16).to_le_bytes());
        buf[26..28].copy_from_slice(&((first_cluster & 0xFFFF) as u16).to_le_bytes());
        buf[28..32].copy_from_slice(&size.to_le_bytes());
        buf
    }

    /// Build one 13-UTF-16-code-unit LFN fragment, `0x0000`/`0xFFFF` padded.
    fn lfn_entry_bytes(seq: u8, last: bool, checksum: u8, chars: &str) -> [u8; 32] {
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
        buf[0] = seq | if last { crate::LAST_LONG_ENTRY } else { 0 };
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

    #[test]
    fn reads_short_name_entries_until_terminator() {
        let disk = Arc::new(RamDisk::new(1));
        let entry_a = sfn_entry(b"README  ", b"TXT", crate::ATTR_ARCHIVE, 5, 1234);
        disk.write_sector(0, &entry_a);
        let device: Arc<dyn BlockDevice> = disk;
        let mut cache = SectorCache::new(512, device);

        let entries = read_dir(&mut cache, &[2], |_| 0, 1, 512).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "README.TXT");
        assert_eq!(entries[0].first_cluster, 5);
        assert_eq!(entries[0].file_size, 1234);
    }

    #[test]
    fn search_is_case_insensitive() {
        let entries = alloc::vec![DirEntryInfo {
            name: String::from("Cargo.toml"),
            attr: 0,
            first_cluster: 10,
            file_size: 42,
        }];
        assert!(search_dir(&entries, "CARGO.TOML").is_some());
        assert!(search_dir(&entries, "missing.txt").is_none());
    }
}
