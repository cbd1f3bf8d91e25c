use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The region of the image a mapping was made for. Carried by every I/O
/// failure so the report can name the operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapTarget {
    Mbr,
    BootSector { partition: usize },
    FsInfo { partition: usize },
    FatRegion { partition: usize, index: u8 },
    RootDirectory { partition: usize },
}

impl fmt::Display for MapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapTarget::Mbr => write!(f, "MBR"),
            MapTarget::BootSector { partition } => {
                write!(f, "boot sector of partition {partition}")
            }
            MapTarget::FsInfo { partition } => {
                write!(f, "FS-Info sector of partition {partition}")
            }
            MapTarget::FatRegion { partition, index } => {
                write!(f, "FAT #{index} of partition {partition}")
            }
            MapTarget::RootDirectory { partition } => {
                write!(f, "root directory of partition {partition}")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("failed to map {target} ({len} bytes at offset {offset:#x}): {source}")]
    Io {
        target: MapTarget,
        offset: u64,
        len: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open image {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Decoded-but-suspicious data. Never fatal: the anomaly is attached to the
/// report next to whatever could still be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    #[error("MBR boot signature is {found:#06X}, expected 0xAA55")]
    MbrSignature { found: u16 },

    #[error("MBR partition type is {partition_type:#04X}, not a FAT32 type")]
    PartitionType { partition_type: u8 },

    #[error("boot sector signature is {found:#06X}, expected 0xAA55")]
    BootSignature { found: u16 },

    #[error("unsupported boot sector: {reason}")]
    UnsupportedVariant { reason: Unsupported },

    #[error("boot sector declares {bytes_per_sector} bytes per sector; offsets assume 512")]
    NonStandardSectorSize { bytes_per_sector: u16 },

    #[error("FS-Info signatures are {lead:#010X}/{structure:#010X}, expected 0x41615252/0x61417272")]
    FsInfoSignature { lead: u32, structure: u32 },

    #[error("FS-Info trail signature is {found:#010X}, expected 0xAA550000")]
    FsInfoTrailSignature { found: u32 },

    #[error("FS-Info reports {fs_info} free clusters but the FAT has {counted}")]
    FreeCountMismatch { fs_info: u32, counted: u32 },

    #[error("FAT #{copy} differs from FAT #0 in {differing_entries} entries")]
    FatCopyMismatch { copy: u8, differing_entries: usize },
}

/// Why a boot sector cannot be walked as FAT32.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unsupported {
    #[error("FAT count is zero")]
    NoFats,
    #[error("32-bit sectors-per-FAT is zero (FAT12/16 layout, 16-bit value {legacy_sectors_per_fat})")]
    LegacyFatLayout { legacy_sectors_per_fat: u16 },
    #[error("sectors-per-FAT is zero")]
    EmptyFat,
    #[error("sectors-per-cluster is zero")]
    NoClusterSize,
}
