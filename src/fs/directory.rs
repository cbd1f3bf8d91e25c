use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use super::decode_oem_string;

pub const DIR_ENTRY_SIZE: usize = 32;

const DELETED_MARKER: u8 = 0xE5;
const DELETED_MARKER_ALT: u8 = 0x05;
const LFN_LAST_ENTRY: u8 = 0x40;

/// Directory entry attribute bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(pub u8);

impl Attributes {
    pub const READ_ONLY: u8 = 0x01;
    pub const HIDDEN: u8 = 0x02;
    pub const SYSTEM: u8 = 0x04;
    pub const VOLUME_ID: u8 = 0x08;
    pub const DIRECTORY: u8 = 0x10;
    pub const ARCHIVE: u8 = 0x20;
    pub const LONG_NAME: u8 = Self::READ_ONLY | Self::HIDDEN | Self::SYSTEM | Self::VOLUME_ID;

    pub fn contains(&self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn is_long_name(&self) -> bool {
        self.0 & 0x3F == Self::LONG_NAME
    }

    pub fn is_directory(&self) -> bool {
        self.contains(Self::DIRECTORY)
    }

    pub fn is_volume_id(&self) -> bool {
        self.contains(Self::VOLUME_ID)
    }
}

impl fmt::Display for Attributes {
    /// Renders as `RHSVDA`, with `-` for each clear bit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const FLAGS: [(u8, char); 6] = [
            (Attributes::READ_ONLY, 'R'),
            (Attributes::HIDDEN, 'H'),
            (Attributes::SYSTEM, 'S'),
            (Attributes::VOLUME_ID, 'V'),
            (Attributes::DIRECTORY, 'D'),
            (Attributes::ARCHIVE, 'A'),
        ];
        for (bit, c) in FLAGS {
            write!(f, "{}", if self.contains(bit) { c } else { '-' })?;
        }
        Ok(())
    }
}

/// Packed FAT date (bits 0-4 day, 5-8 month, 9-15 years since 1980).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatDate(pub u16);

impl FatDate {
    pub fn to_date(self) -> Option<NaiveDate> {
        if self.0 == 0 {
            return None;
        }
        let day = (self.0 & 0x1F) as u32;
        let month = ((self.0 >> 5) & 0x0F) as u32;
        let year = ((self.0 >> 9) & 0x7F) as i32 + 1980;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

impl Serialize for FatDate {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_date().serialize(s)
    }
}

/// Packed FAT date and time. `tenths` is the creation-time refinement in
/// 10 ms units (0-199) and is zero for modification times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatTimestamp {
    pub date: FatDate,
    pub time: u16,
    pub tenths: u8,
}

impl FatTimestamp {
    pub fn to_datetime(self) -> Option<NaiveDateTime> {
        let date = self.date.to_date()?;
        let hour = (self.time >> 11) as u32;
        let minute = ((self.time >> 5) & 0x3F) as u32;
        let second = (self.time & 0x1F) as u32 * 2 + self.tenths as u32 / 100;
        let milli = (self.tenths as u32 % 100) * 10;
        date.and_hms_milli_opt(hour, minute, second, milli)
    }
}

impl fmt::Display for FatTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None if self.date.0 == 0 => Ok(()),
            None => write!(f, "invalid ({:#06x} {:#06x})", self.date.0, self.time),
        }
    }
}

impl Serialize for FatTimestamp {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_datetime().serialize(s)
    }
}

/// One short (8.3) directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Slot index within the directory.
    pub slot: usize,
    /// Reconstructed `NAME.EXT` (or `NAME` when the extension is blank).
    pub name: String,
    /// Long name assembled from the LFN records that precede this entry.
    pub long_name: Option<String>,
    #[serde(skip)]
    pub raw_name: [u8; 11],
    pub attributes: Attributes,
    pub deleted: bool,
    pub created: FatTimestamp,
    pub accessed: FatDate,
    pub modified: FatTimestamp,
    pub cluster_high: u16,
    pub cluster_low: u16,
    pub size: u32,
}

impl DirectoryEntry {
    fn parse(slot: usize, data: &[u8]) -> Self {
        let u16_at = |off: usize| LittleEndian::read_u16(&data[off..off + 2]);

        let mut raw_name = [0u8; 11];
        raw_name.copy_from_slice(&data[0..11]);
        let deleted = matches!(raw_name[0], DELETED_MARKER | DELETED_MARKER_ALT);

        let mut name = build_short_name(&raw_name[0..8], &raw_name[8..11]);
        if deleted {
            name.replace_range(..name.chars().next().map_or(0, char::len_utf8), "?");
        }

        Self {
            slot,
            name,
            long_name: None,
            raw_name,
            attributes: Attributes(data[11]),
            deleted,
            created: FatTimestamp {
                date: FatDate(u16_at(16)),
                time: u16_at(14),
                tenths: data[13],
            },
            accessed: FatDate(u16_at(18)),
            modified: FatTimestamp {
                date: FatDate(u16_at(24)),
                time: u16_at(22),
                tenths: 0,
            },
            cluster_high: u16_at(20),
            cluster_low: u16_at(26),
            size: LittleEndian::read_u32(&data[28..32]),
        }
    }

    pub fn first_cluster(&self) -> u32 {
        ((self.cluster_high as u32) << 16) | self.cluster_low as u32
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.is_directory()
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes.is_volume_id() && !self.attributes.is_directory()
    }

    /// Long name when one was recorded, otherwise the 8.3 name.
    pub fn display_name(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.name)
    }

    /// Live regular files are the only entries whose cluster chain is
    /// followed.
    pub fn should_walk_chain(&self) -> bool {
        !self.deleted && !self.is_directory() && !self.is_volume_label()
    }

    /// Checksum of the 11-byte short name, stored in each LFN record that
    /// belongs to this entry.
    pub fn short_name_checksum(&self) -> u8 {
        self.raw_name
            .iter()
            .fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b))
    }
}

/// Decode directory slots until an all-zero name, or until `data` is
/// exhausted. LFN records never produce an entry; their text is attached to
/// the short entry that follows them when the checksum matches.
pub fn parse_directory(data: &[u8]) -> Vec<DirectoryEntry> {
    let mut entries = Vec::new();
    let mut lfn_parts: Vec<(u8, String)> = Vec::new();
    let mut lfn_checksum = None;

    for (slot, entry_bytes) in data.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
        if entry_bytes[0..11].iter().all(|&b| b == 0) {
            break;
        }

        let attr = Attributes(entry_bytes[11]);
        if attr.is_long_name() {
            if entry_bytes[0] == DELETED_MARKER {
                lfn_parts.clear();
                continue;
            }
            if entry_bytes[0] & LFN_LAST_ENTRY != 0 {
                lfn_parts.clear();
            }
            lfn_parts.push((entry_bytes[0] & 0x3F, lfn_text(entry_bytes)));
            lfn_checksum = Some(entry_bytes[13]);
            continue;
        }

        let mut entry = DirectoryEntry::parse(slot, entry_bytes);
        if !lfn_parts.is_empty()
            && !entry.deleted
            && lfn_checksum == Some(entry.short_name_checksum())
        {
            lfn_parts.sort_by_key(|&(seq, _)| seq);
            entry.long_name = Some(lfn_parts.iter().map(|(_, s)| s.as_str()).collect());
        }
        lfn_parts.clear();
        lfn_checksum = None;
        entries.push(entry);
    }

    entries
}

/// The 13 UTF-16LE characters of one LFN record, without padding.
///
/// Layout: bytes 1-10 hold characters 1-5, bytes 14-25 characters 6-11 and
/// bytes 28-31 characters 12-13. Bytes 26-27 are the (always zero) cluster.
fn lfn_text(entry_bytes: &[u8]) -> String {
    let units: Vec<u16> = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30]
        .iter()
        .map(|&off| LittleEndian::read_u16(&entry_bytes[off..off + 2]))
        .take_while(|&c| c != 0x0000 && c != 0xFFFF)
        .collect();
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Build a DOS 8.3 short filename from the name and extension bytes.
fn build_short_name(name: &[u8], ext: &[u8]) -> String {
    let name_str = decode_oem_string(name);
    let name_trimmed = name_str.trim_end_matches(' ');
    let ext_str = decode_oem_string(ext);
    let ext_trimmed = ext_str.trim_end_matches(' ');

    if ext_trimmed.is_empty() {
        name_trimmed.to_string()
    } else {
        format!("{name_trimmed}.{ext_trimmed}")
    }
}
