//! FAT32 directory entry structures: Short Directory Entries (SFN, 8.3
//! names) and Long Directory Entries (LFN, UTF-16 name fragments).
//!
//! Short Directory Entries
//!
//! DIR_Name[0] carries special values: 0xE5 means the entry is free, 0x00
//! means free *and* every entry after it in this directory is also free
//! (scanning can stop), and 0x05 is a KANJI escape for a real leading 0xE5
//! byte. [`crate::dir`] checks the raw byte before decoding a
//! [`ShortDirEntry`], since a freed entry's remaining bytes aren't meaningful.
//!
//! Long Directory Entries
//!
//! A set of long entries always immediately precedes, and is associated
//! with, the short entry it describes. Each long entry is numbered
//! (`LDIR_Ord`) from 1, the last one OR'd with [`crate::LAST_LONG_ENTRY`]
//! (0x40). All long entries in a set carry an 8-bit checksum of the short
//! entry's 11-byte name; if the checksum doesn't match, the long entries are
//! orphans and the short name alone is authoritative. See
//! [`ShortDirEntry::gen_check_sum`].

use super::{
    ATTR_ARCHIVE, ATTR_DIRECTORY, ATTR_LONG_NAME, ATTR_VOLUME_ID, LAST_LONG_ENTRY,
    LONG_NAME_LEN_CAP, SPACE,
};

use alloc::string::String;

/// FAT 32-byte directory entry structure, short-name form.
// 8 + 3 + 1 + 1 + 1 + 2 + 2 + 2 + 2 + 2 + 2 + 2 + 4 = 32 bytes
#[derive(Clone, Copy, Debug)]
#[repr(packed)]
pub struct ShortDirEntry {
    name: [u8; 8],
    extension: [u8; 3],
    attr: u8,
    nt_res: u8,
    crt_time_tenth: u8,
    crt_time: u16,
    crt_date: u16,
    lst_acc_date: u16,
    fst_clus_hi: u16,
    wrt_time: u16,
    wrt_date: u16,
    fst_clus_lo: u16,
    file_size: u32,
}

impl Default for ShortDirEntry {
    fn default() -> Self {
        Self::empty()
    }
}

impl ShortDirEntry {
    pub fn empty() -> Self {
        Self {
            name: [0; 8],
            extension: [0; 3],
            attr: ATTR_ARCHIVE,
            nt_res: 0,
            crt_time_tenth: 0,
            crt_time: 0,
            crt_date: 0,
            lst_acc_date: 0,
            fst_clus_hi: 0,
            wrt_time: 0,
            wrt_date: 0,
            fst_clus_lo: 0,
            file_size: 0,
        }
    }

    pub fn gen_check_sum(&self) -> u8 {
        let mut name_: [u8; 11] = [0u8; 11];
        name_[..8].copy_from_slice(&self.name);
        name_[8..].copy_from_slice(&self.extension);

        let mut sum: u8 = 0;
        for &byte in name_.iter() {
            sum = ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(byte);
        }
        sum
    }

    /// Short name as `NAME.EXT`, trailing spaces stripped.
    pub fn name(&self) -> String {
        let name_len = self.name.iter().position(|&x| x == SPACE).unwrap_or(8);
        let ext_len = self.extension.iter().position(|&x| x == SPACE).unwrap_or(3);
        let name_str = core::str::from_utf8(&self.name[..name_len]).unwrap_or("");
        let ext_str = core::str::from_utf8(&self.extension[..ext_len]).unwrap_or("");
        if ext_len != 0 {
            [name_str, ".", ext_str].concat()
        } else {
            name_str.to_string()
        }
    }

    pub fn first_cluster(&self) -> u32 {
        ((self.fst_clus_hi as u32) << 16) | (self.fst_clus_lo as u32)
    }

    /// A volume-label candidate: `ATTR_VOLUME_ID` is set, but the LFN
    /// attribute mask (0x0F) happens to have that same bit set, so an LFN
    /// continuation entry must be excluded explicitly rather than matched by
    /// the volume-id bit alone.
    pub fn is_volume_label(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0 && self.attr != ATTR_LONG_NAME
    }

    pub fn attr(&self) -> u8 {
        self.attr
    }

    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn from_bytes(buf: &[u8]) -> Self {
        assert!(buf.len() >= 32);
        unsafe { core::ptr::read_unaligned(buf.as_ptr() as *const Self) }
    }
}

/// FAT long directory entry, carrying up to 13 UTF-16 code units of one
/// fragment of a long file name.
#[derive(Debug, Clone, Copy)]
#[repr(packed)]
pub struct LongDirEntry {
    ord: u8,
    name1: [u16; 5],
    attr: u8,
    ldir_type: u8,
    chk_sum: u8,
    name2: [u16; 6],
    fst_clus_lo: u16,
    name3: [u16; 2],
}

impl LongDirEntry {
    pub fn empty() -> Self {
        Self {
            ord: 0,
            name1: [0; 5],
            attr: ATTR_LONG_NAME,
            ldir_type: 0,
            chk_sum: 0,
            name2: [0; 6],
            fst_clus_lo: 0,
            name3: [0; 2],
        }
    }

    pub fn from_bytes(buf: &[u8]) -> Self {
        assert!(buf.len() >= 32);
        unsafe { core::ptr::read_unaligned(buf.as_ptr() as *const Self) }
    }

    pub fn check_sum(&self) -> u8 {
        self.chk_sum
    }

    /// The 1-based position of this fragment within its set, with the
    /// "last entry" flag masked off.
    pub fn sequence_number(&self) -> usize {
        (self.ord & (LAST_LONG_ENTRY - 1)) as usize
    }

    pub fn is_last_in_set(&self) -> bool {
        self.ord & LAST_LONG_ENTRY == LAST_LONG_ENTRY
    }

    pub fn name_utf16(&self) -> [u16; LONG_NAME_LEN_CAP] {
        let mut name_all = [0u16; LONG_NAME_LEN_CAP];
        name_all[..5].copy_from_slice(&unsafe { core::ptr::addr_of!(self.name1).read_unaligned() });
        name_all[5..11].copy_from_slice(&unsafe { core::ptr::addr_of!(self.name2).read_unaligned() });
        name_all[11..].copy_from_slice(&unsafe { core::ptr::addr_of!(self.name3).read_unaligned() });
        name_all
    }

    /// This fragment's characters, NUL/0xFFFF padding stripped.
    pub fn name_fragment(&self) -> String {
        let raw = self.name_utf16();
        let len = raw
            .iter()
            .position(|&c| c == 0 || c == 0xFFFF)
            .unwrap_or(raw.len());
        String::from_utf16_lossy(&raw[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_the_spec_formula_over_all_11_name_bytes() {
        let mut sde = ShortDirEntry::empty();
        sde.name = *b"HELLOWOR";
        sde.extension = *b"LD~";
        let mut expected: u8 = 0;
        for &b in sde.name.iter().chain(sde.extension.iter()) {
            expected = ((expected & 1) << 7).wrapping_add(expected >> 1).wrapping_add(b);
        }
        assert_eq!(sde.gen_check_sum(), expected);
    }

    #[test]
    fn short_name_strips_trailing_spaces_and_joins_with_a_dot() {
        let mut sde = ShortDirEntry::empty();
        sde.name = *b"README  ";
        sde.extension = *b"TXT";
        assert_eq!(sde.name(), "README.TXT");
    }

    #[test]
    fn long_entry_sequence_number_masks_off_the_last_entry_flag() {
        let mut lde = LongDirEntry::empty();
        lde.ord = 3 | LAST_LONG_ENTRY;
        assert_eq!(lde.sequence_number(), 3);
        assert!(lde.is_last_in_set());
    }
}
