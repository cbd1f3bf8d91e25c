use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::Anomaly;
use crate::image::Sector;

const MBR_SIGNATURE: u16 = 0xAA55;
const DISK_SIGNATURE_OFFSET: usize = 440;
const PARTITION_TABLE_OFFSET: usize = 446;
const PARTITION_ENTRY_SIZE: usize = 16;
const BOOT_SIGNATURE_OFFSET: usize = 510;

/// Raw CHS (Cylinder-Head-Sector) triple as stored in a partition entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChsAddress {
    pub head: u8,
    /// Sector in bits 0-5, cylinder bits 8-9 in bits 6-7.
    pub sector: u8,
    /// Low 8 bits of the cylinder.
    pub cylinder: u8,
}

impl ChsAddress {
    fn parse(bytes: &[u8]) -> Self {
        Self {
            head: bytes[0],
            sector: bytes[1],
            cylinder: bytes[2],
        }
    }

    /// 6-bit sector number.
    pub fn sector_number(&self) -> u8 {
        self.sector & 0x3F
    }

    /// Full 10-bit cylinder number.
    pub fn cylinder_number(&self) -> u16 {
        ((self.sector as u16 & 0xC0) << 2) | self.cylinder as u16
    }
}

/// A single MBR partition table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartitionEntry {
    pub status: u8,
    pub start_chs: ChsAddress,
    pub partition_type: u8,
    pub end_chs: ChsAddress,
    pub start_lba: u32,
    pub size_lba: u32,
}

impl PartitionEntry {
    fn parse(data: &[u8]) -> Self {
        Self {
            status: data[0],
            start_chs: ChsAddress::parse(&data[1..4]),
            partition_type: data[4],
            end_chs: ChsAddress::parse(&data[5..8]),
            start_lba: LittleEndian::read_u32(&data[8..12]),
            size_lba: LittleEndian::read_u32(&data[12..16]),
        }
    }

    /// A slot with a zero start LBA is unused and never decoded further.
    pub fn is_unused(&self) -> bool {
        self.start_lba == 0
    }

    pub fn is_bootable(&self) -> bool {
        self.status == 0x80
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_lba as u64 * 512
    }

    pub fn is_fat32(&self) -> bool {
        matches!(self.partition_type, 0x0B | 0x0C | 0x1B | 0x1C)
    }

    pub fn partition_type_name(&self) -> &'static str {
        match self.partition_type {
            0x00 => "Empty",
            0x01 => "FAT12",
            0x04 => "FAT16 (<32MB)",
            0x05 => "Extended",
            0x06 => "FAT16 (>32MB)",
            0x07 => "NTFS/HPFS/exFAT",
            0x0B => "FAT32 (CHS)",
            0x0C => "FAT32 (LBA)",
            0x0E => "FAT16 (LBA)",
            0x0F => "Extended (LBA)",
            0x11 => "Hidden FAT12",
            0x14 => "Hidden FAT16 (<32MB)",
            0x16 => "Hidden FAT16 (>32MB)",
            0x1B => "Hidden FAT32 (CHS)",
            0x1C => "Hidden FAT32 (LBA)",
            0x1E => "Hidden FAT16 (LBA)",
            0x27 => "Windows RE",
            0x82 => "Linux swap",
            0x83 => "Linux",
            0x8E => "Linux LVM",
            0xEE => "GPT Protective",
            0xEF => "EFI System",
            _ => "Unknown",
        }
    }
}

/// Parsed MBR (Master Boot Record).
#[derive(Debug, Clone, Serialize)]
pub struct Mbr {
    pub disk_signature: u32,
    pub entries: [PartitionEntry; 4],
    pub boot_signature: u16,
}

impl Mbr {
    /// Decode the first sector of a disk. Never fails: a bad boot signature
    /// is surfaced through [`Mbr::anomalies`] so damaged media can still be
    /// inspected.
    pub fn parse(data: &Sector) -> Self {
        let entries = std::array::from_fn(|i| {
            let offset = PARTITION_TABLE_OFFSET + i * PARTITION_ENTRY_SIZE;
            PartitionEntry::parse(&data[offset..offset + PARTITION_ENTRY_SIZE])
        });

        Self {
            disk_signature: LittleEndian::read_u32(
                &data[DISK_SIGNATURE_OFFSET..DISK_SIGNATURE_OFFSET + 4],
            ),
            entries,
            boot_signature: LittleEndian::read_u16(
                &data[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2],
            ),
        }
    }

    pub fn has_valid_signature(&self) -> bool {
        self.boot_signature == MBR_SIGNATURE
    }

    pub fn anomalies(&self) -> Vec<Anomaly> {
        if self.has_valid_signature() {
            Vec::new()
        } else {
            vec![Anomaly::MbrSignature {
                found: self.boot_signature,
            }]
        }
    }

    /// Slots in use, in table order, paired with their slot index.
    pub fn used_entries(&self) -> impl Iterator<Item = (usize, &PartitionEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_unused())
    }

    /// Non-zero start LBAs in table order.
    pub fn partition_starts(&self) -> Vec<u32> {
        self.used_entries().map(|(_, e)| e.start_lba).collect()
    }
}
