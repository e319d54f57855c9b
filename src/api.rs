//! Public operations: directory open/read/close, file open/seek/read/close,
//! and volume label get/set, composed from [`crate::path`], [`crate::dir`],
//! and [`crate::file`].
//!
//! Every entry point here takes a full `L:/a/b/c` path and does the
//! drive-letter selection itself (see [`split_drive`]), matching the path
//! grammar `fat_follow_path` is specified against: the first character picks
//! the volume, the next two must be `:` and `/`.

use crate::dir::{DirEntryInfo, DirHandle};
use crate::file::{FileHandle, SeekFrom};
use crate::path;
use crate::volume::get_volume;
use crate::FatStatus;

use alloc::string::String;

/// Split `path` into `(drive letter, sub-path starting with '/')`.
fn split_drive(path: &str) -> Result<(char, &str), FatStatus> {
    let mut chars = path.char_indices();
    let letter = chars.next().map(|(_, c)| c).ok_or(FatStatus::PathErr)?;
    match (chars.next(), chars.next()) {
        (Some((_, ':')), Some((i, '/'))) => Ok((letter, &path[i..])),
        _ => Err(FatStatus::PathErr),
    }
}

/// Resolve `path` and open its directory chain for enumeration.
pub fn dir_open(path: &str) -> Result<DirHandle, FatStatus> {
    let (letter, rest) = split_drive(path)?;
    let volume = get_volume(letter).ok_or(FatStatus::NoVolume)?;
    let entry = {
        let mut guard = volume.write();
        path::resolve(&mut guard, rest)?
    };
    if !entry.is_dir() {
        return Err(FatStatus::PathErr);
    }
    DirHandle::open(letter, entry.first_cluster)
}

/// Decode the next entry from `handle`. `Ok(info)` mirrors a spec `OK`
/// status with `info` filled in; `Err(FatStatus::Eof)` and
/// `Err(FatStatus::Error)` mirror the other two outcomes `dir_read` can
/// report.
pub fn dir_read(handle: &mut DirHandle) -> Result<DirEntryInfo, FatStatus> {
    handle.read()
}

pub fn dir_close(handle: DirHandle) {
    handle.close();
}

/// Resolve `path` and open the file it names for reading.
pub fn file_open(path: &str) -> Result<FileHandle, FatStatus> {
    let (letter, rest) = split_drive(path)?;
    let volume = get_volume(letter).ok_or(FatStatus::NoVolume)?;
    let entry = {
        let mut guard = volume.write();
        path::resolve(&mut guard, rest)?
    };
    if entry.is_dir() {
        return Err(FatStatus::PathErr);
    }
    FileHandle::open(letter, &entry)
}

pub fn file_read(handle: &mut FileHandle, buf: &mut [u8]) -> Result<usize, FatStatus> {
    handle.read(buf)
}

/// Seek to an absolute byte offset from the start of the file, per §4.11:
/// seeking past end-of-chain is an error.
pub fn file_seek(handle: &mut FileHandle, offset: u32) -> Result<u32, FatStatus> {
    handle.seek(SeekFrom::Start(offset))
}

pub fn file_close(handle: FileHandle) {
    handle.close();
}

pub fn volume_get_label(letter: char) -> Result<String, FatStatus> {
    let volume = get_volume(letter).ok_or(FatStatus::NoVolume)?;
    Ok(String::from(volume.read().label()))
}

pub fn volume_set_label(letter: char, label: &str) -> Result<(), FatStatus> {
    let volume = get_volume(letter).ok_or(FatStatus::NoVolume)?;
    volume.write().set_label(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drive_requires_colon_then_slash() {
        assert_eq!(split_drive("C:/a/b"), Ok(('C', "/a/b")));
        assert_eq!(split_drive("C:/"), Ok(('C', "/")));
        assert_eq!(split_drive("C/a"), Err(FatStatus::PathErr));
        assert_eq!(split_drive("C:a"), Err(FatStatus::PathErr));
        assert_eq!(split_drive(""), Err(FatStatus::PathErr));
    }
}
