//! File read and seek.
//!
//! A [`FileHandle`] is opened against an already-resolved directory entry.
//! It snapshots the entry's full cluster chain up front (via
//! [`crate::volume::Volume::cluster_chain`]) so that read and seek never
//! need to walk the FAT themselves; position is translated into a
//! `(cluster, sector, offset)` triple against that fixed chain.

use crate::dir::DirEntryInfo;
use crate::volume::get_volume;
use crate::FatStatus;

use alloc::vec::Vec;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u32),
    Current(i32),
    End(i32),
}

pub struct FileHandle {
    letter: char,
    clusters: Vec<u32>,
    file_size: u32,
    position: u32,
    bytes_per_sector: usize,
    sectors_per_cluster: usize,
}

impl FileHandle {
    /// Open `entry` for reading on the volume assigned to `letter`.
    pub fn open(letter: char, entry: &DirEntryInfo) -> Result<Self, FatStatus> {
        let volume = get_volume(letter).ok_or(FatStatus::NoVolume)?;
        let mut guard = volume.write();
        let clusters = guard.cluster_chain(entry.first_cluster);
        let bytes_per_sector = guard.bytes_per_sector();
        let sectors_per_cluster = guard.sectors_per_cluster();
        Ok(Self {
            letter,
            clusters,
            file_size: entry.file_size,
            position: 0,
            bytes_per_sector,
            sectors_per_cluster,
        })
    }

    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn seek(&mut self, from: SeekFrom) -> Result<u32, FatStatus> {
        let new_position = match from {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => self.position as i64 + delta as i64,
            SeekFrom::End(delta) => self.file_size as i64 + delta as i64,
        };
        if new_position < 0 || new_position > self.file_size as i64 {
            return Err(FatStatus::PathErr);
        }
        self.position = new_position as u32;
        Ok(self.position)
    }

    /// Read up to `buf.len()` bytes starting at the current position,
    /// advancing it. Returns the number of bytes actually read; `0` means
    /// end of file.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FatStatus> {
        let remaining = self.file_size.saturating_sub(self.position) as usize;
        let to_read = buf.len().min(remaining);
        if to_read == 0 {
            return Ok(0);
        }

        let volume = get_volume(self.letter).ok_or(FatStatus::NoVolume)?;
        let mut guard = volume.write();

        let mut done = 0usize;
        while done < to_read {
            let file_pos = self.position as usize + done;
            let (cluster_index, sector_in_cluster, offset_in_sector) =
                locate(file_pos, self.bytes_per_sector, self.sectors_per_cluster);

            let cluster = *self.clusters.get(cluster_index).ok_or(FatStatus::Eof)?;
            let lba = guard.cluster_lba(cluster) + sector_in_cluster as u32;

            let chunk = (self.bytes_per_sector - offset_in_sector).min(to_read - done);
            guard
                .cache_mut()
                .read_bytes(lba, offset_in_sector, &mut buf[done..done + chunk])
                .map_err(|_| FatStatus::Error)?;
            done += chunk;
        }

        self.position += done as u32;
        Ok(done)
    }

    pub fn close(self) {}
}

/// Translate a byte position within a file into a `(cluster index into the
/// chain, sector within that cluster, byte offset within that sector)`
/// triple.
fn locate(position: usize, bytes_per_sector: usize, sectors_per_cluster: usize) -> (usize, usize, usize) {
    let cluster_size = bytes_per_sector * sectors_per_cluster;
    let cluster_index = position / cluster_size;
    let within_cluster = position % cluster_size;
    let sector_in_cluster = within_cluster / bytes_per_sector;
    let offset_in_sector = within_cluster % bytes_per_sector;
    (cluster_index, sector_in_cluster, offset_in_sector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_rejects_out_of_range_offsets() {
        // A handle with no backing volume registration still exercises the
        // pure seek arithmetic since it never touches the device.
        let mut handle = FileHandle {
            letter: 'Z',
            clusters: alloc::vec![2, 3],
            file_size: 100,
            position: 10,
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
        };
        assert_eq!(handle.seek(SeekFrom::Start(50)), Ok(50));
        assert_eq!(handle.seek(SeekFrom::Current(-60)), Err(FatStatus::PathErr));
        assert_eq!(handle.seek(SeekFrom::End(0)), Ok(100));
        assert_eq!(handle.seek(SeekFrom::End(1)), Err(FatStatus::PathErr));
    }

    #[test]
    fn locate_crosses_cluster_boundary_at_the_right_byte() {
        // 512-byte sectors, 1 sector per cluster: byte 511 is the last byte
        // of cluster index 0, byte 512 is the first byte of cluster index 1.
        assert_eq!(locate(511, 512, 1), (0, 0, 511));
        assert_eq!(locate(512, 512, 1), (1, 0, 0));
    }

    #[test]
    fn locate_within_a_multi_sector_cluster() {
        // 512-byte sectors, 2 sectors per cluster: byte 512 is sector 1 of
        // cluster index 0, not the start of the next cluster.
        assert_eq!(locate(512, 512, 2), (0, 1, 0));
        assert_eq!(locate(1024, 512, 2), (1, 0, 0));
    }
}
