//! Path resolution: walk a `/`-separated path from a volume's root directory
//! down to the entry it names.
//!
//! The cursor always starts at [`crate::volume::Volume::root_cluster`], which
//! reads the cluster number straight out of the BPB's `BPB_RootClus` field.
//! It must never be derived by translating the root directory's LBA back
//! into a cluster number through [`crate::bpb::BIOSParameterBlock::sect_to_clust`]:
//! on a FAT32 volume the root directory is an ordinary cluster chain and the
//! two quantities only coincide by accident of layout.

use crate::dir::DirEntryInfo;
use crate::volume::Volume;
use crate::FatStatus;

use alloc::string::ToString;
use alloc::vec::Vec;

/// Split `path` into its non-empty, `.`/`..`-free components. A bare `/` or
/// empty string resolves to zero components, meaning "the root itself".
fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

/// Resolve `path` against `volume`, returning the directory entry it names.
/// An empty path (or `/`) resolves to a synthetic root entry.
pub fn resolve(volume: &mut Volume, path: &str) -> Result<DirEntryInfo, FatStatus> {
    let root_cluster = volume.root_cluster();
    let parts = components(path);
    if parts.is_empty() {
        return Ok(DirEntryInfo {
            name: "/".to_string(),
            attr: crate::ATTR_DIRECTORY,
            first_cluster: root_cluster,
            file_size: 0,
        });
    }

    let mut current_cluster = root_cluster;
    let mut current = None;
    for (i, name) in parts.iter().enumerate() {
        let found = volume.find_entry(current_cluster, name)?.ok_or(FatStatus::PathErr)?;
        let is_last = i == parts.len() - 1;
        if !is_last && !found.is_dir() {
            return Err(FatStatus::PathErr);
        }
        current_cluster = found.first_cluster;
        current = Some(found);
    }
    current.ok_or(FatStatus::PathErr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_resolves_without_touching_the_device() {
        assert_eq!(components("/"), Vec::<&str>::new());
        assert_eq!(components(""), Vec::<&str>::new());
        assert_eq!(components("/a/b/"), alloc::vec!["a", "b"]);
    }
}
