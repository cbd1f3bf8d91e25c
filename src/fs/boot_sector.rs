use byteorder::{ByteOrder, LittleEndian};
use serde::{Serialize, Serializer};

use super::decode_oem_string;
use crate::error::{Anomaly, Unsupported};
use crate::image::{Sector, SECTOR_SIZE};

const BOOT_SIGNATURE: u16 = 0xAA55;

/// FAT32 boot sector (BIOS Parameter Block plus the FAT32 extension).
///
/// Every field is decoded from its fixed offset; derived geometry is exposed
/// through accessors so callers never recompute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootSector {
    pub jump: [u8; 3],
    #[serde(serialize_with = "as_text")]
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sector_count: u16,
    pub fat_count: u8,
    pub root_entry_count: u16,
    pub total_sectors_16: u16,
    pub media: u8,
    /// FAT12/16 sectors-per-FAT. Zero on FAT32.
    pub sectors_per_fat_16: u16,
    pub sectors_per_track: u16,
    pub heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,
    pub sectors_per_fat: u32,
    pub ext_flags: u16,
    pub fs_version: u16,
    pub root_cluster: u32,
    pub fs_info_sector: u16,
    pub backup_boot_sector: u16,
    pub drive_number: u8,
    pub ext_boot_signature: u8,
    pub volume_id: u32,
    #[serde(serialize_with = "as_text")]
    pub volume_label: [u8; 11],
    #[serde(serialize_with = "as_text")]
    pub fs_type: [u8; 8],
    pub signature: u16,
}

fn as_text<S: Serializer, const N: usize>(bytes: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(decode_oem_string(bytes).trim_end())
}

fn array<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..offset + N]);
    out
}

impl BootSector {
    pub fn parse(data: &Sector) -> Self {
        let u16_at = |off: usize| LittleEndian::read_u16(&data[off..off + 2]);
        let u32_at = |off: usize| LittleEndian::read_u32(&data[off..off + 4]);

        Self {
            jump: array(data, 0),
            oem_name: array(data, 3),
            bytes_per_sector: u16_at(11),
            sectors_per_cluster: data[13],
            reserved_sector_count: u16_at(14),
            fat_count: data[16],
            root_entry_count: u16_at(17),
            total_sectors_16: u16_at(19),
            media: data[21],
            sectors_per_fat_16: u16_at(22),
            sectors_per_track: u16_at(24),
            heads: u16_at(26),
            hidden_sectors: u32_at(28),
            total_sectors_32: u32_at(32),
            sectors_per_fat: u32_at(36),
            ext_flags: u16_at(40),
            fs_version: u16_at(42),
            root_cluster: u32_at(44),
            fs_info_sector: u16_at(48),
            backup_boot_sector: u16_at(50),
            drive_number: data[64],
            ext_boot_signature: data[66],
            volume_id: u32_at(67),
            volume_label: array(data, 71),
            fs_type: array(data, 82),
            signature: u16_at(510),
        }
    }

    /// Write every decoded field back to its offset in `data`. Bytes that are
    /// not part of the record (boot code, reserved areas) are left alone.
    pub fn encode_into(&self, data: &mut Sector) {
        data[0..3].copy_from_slice(&self.jump);
        data[3..11].copy_from_slice(&self.oem_name);
        LittleEndian::write_u16(&mut data[11..13], self.bytes_per_sector);
        data[13] = self.sectors_per_cluster;
        LittleEndian::write_u16(&mut data[14..16], self.reserved_sector_count);
        data[16] = self.fat_count;
        LittleEndian::write_u16(&mut data[17..19], self.root_entry_count);
        LittleEndian::write_u16(&mut data[19..21], self.total_sectors_16);
        data[21] = self.media;
        LittleEndian::write_u16(&mut data[22..24], self.sectors_per_fat_16);
        LittleEndian::write_u16(&mut data[24..26], self.sectors_per_track);
        LittleEndian::write_u16(&mut data[26..28], self.heads);
        LittleEndian::write_u32(&mut data[28..32], self.hidden_sectors);
        LittleEndian::write_u32(&mut data[32..36], self.total_sectors_32);
        LittleEndian::write_u32(&mut data[36..40], self.sectors_per_fat);
        LittleEndian::write_u16(&mut data[40..42], self.ext_flags);
        LittleEndian::write_u16(&mut data[42..44], self.fs_version);
        LittleEndian::write_u32(&mut data[44..48], self.root_cluster);
        LittleEndian::write_u16(&mut data[48..50], self.fs_info_sector);
        LittleEndian::write_u16(&mut data[50..52], self.backup_boot_sector);
        data[64] = self.drive_number;
        data[66] = self.ext_boot_signature;
        LittleEndian::write_u32(&mut data[67..71], self.volume_id);
        data[71..82].copy_from_slice(&self.volume_label);
        data[82..90].copy_from_slice(&self.fs_type);
        LittleEndian::write_u16(&mut data[510..512], self.signature);
    }

    pub fn oem_name(&self) -> String {
        decode_oem_string(&self.oem_name).trim_end().to_string()
    }

    pub fn volume_label(&self) -> String {
        decode_oem_string(&self.volume_label).trim_end().to_string()
    }

    pub fn fs_type(&self) -> String {
        decode_oem_string(&self.fs_type).trim_end().to_string()
    }

    pub fn total_sectors(&self) -> u64 {
        if self.total_sectors_16 != 0 {
            self.total_sectors_16 as u64
        } else {
            self.total_sectors_32 as u64
        }
    }

    /// Reject layouts whose FAT geometry cannot be derived.
    pub fn check(&self) -> Result<(), Unsupported> {
        if self.fat_count == 0 {
            return Err(Unsupported::NoFats);
        }
        if self.sectors_per_fat == 0 {
            if self.sectors_per_fat_16 != 0 {
                return Err(Unsupported::LegacyFatLayout {
                    legacy_sectors_per_fat: self.sectors_per_fat_16,
                });
            }
            return Err(Unsupported::EmptyFat);
        }
        if self.sectors_per_cluster == 0 {
            return Err(Unsupported::NoClusterSize);
        }
        Ok(())
    }

    /// Structural warnings that do not prevent decoding.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut found = Vec::new();
        if self.signature != BOOT_SIGNATURE {
            found.push(Anomaly::BootSignature {
                found: self.signature,
            });
        }
        if let Err(reason) = self.check() {
            found.push(Anomaly::UnsupportedVariant { reason });
        }
        if self.bytes_per_sector as usize != SECTOR_SIZE {
            found.push(Anomaly::NonStandardSectorSize {
                bytes_per_sector: self.bytes_per_sector,
            });
        }
        found
    }

    /// A volume with no reserved sectors has no FS-Info sector to read.
    pub fn has_fs_info(&self) -> bool {
        self.reserved_sector_count != 0
    }

    /// Partition-relative sector of the first FAT.
    pub fn first_fat_sector(&self) -> u64 {
        self.reserved_sector_count as u64
    }

    /// Partition-relative sector of FAT copy `index`.
    pub fn fat_sector(&self, index: u8) -> u64 {
        self.first_fat_sector() + self.sectors_per_fat as u64 * index as u64
    }

    /// Partition-relative sectors of every FAT copy, in order.
    pub fn fat_sectors(&self) -> Vec<u64> {
        (0..self.fat_count).map(|i| self.fat_sector(i)).collect()
    }

    /// Partition-relative sector immediately after the last FAT, where the
    /// root directory starts.
    pub fn root_dir_sector(&self) -> u64 {
        self.fat_sector(self.fat_count)
    }

    pub fn fat_size_bytes(&self) -> u64 {
        self.sectors_per_fat as u64 * SECTOR_SIZE as u64
    }

    pub fn cluster_size_bytes(&self) -> u64 {
        self.sectors_per_cluster as u64 * SECTOR_SIZE as u64
    }

    /// Data clusters on the volume, counted from the first sector after the
    /// last FAT.
    pub fn cluster_count(&self) -> u64 {
        match self.sectors_per_cluster {
            0 => 0,
            spc => self.total_sectors().saturating_sub(self.root_dir_sector()) / spc as u64,
        }
    }

    /// Number of 32-bit entries held by one FAT copy.
    pub fn fat_entry_count(&self) -> u64 {
        self.fat_size_bytes() / 4
    }
}
