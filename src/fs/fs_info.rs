use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::Anomaly;
use crate::image::Sector;

pub const LEAD_SIGNATURE: u32 = 0x4161_5252;
pub const STRUCT_SIGNATURE: u32 = 0x6141_7272;
pub const TRAIL_SIGNATURE: u32 = 0xAA55_0000;

/// Value used by both hint fields when the count is not known.
pub const UNKNOWN: u32 = 0xFFFF_FFFF;

/// FAT32 FS-Info sector. Both counters are advisory hints cached by the
/// last driver that mounted the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FsInfo {
    pub lead_signature: u32,
    pub struct_signature: u32,
    pub free_clusters: u32,
    pub next_free_cluster: u32,
    pub trail_signature: u32,
}

impl FsInfo {
    pub fn parse(data: &Sector) -> Self {
        Self {
            lead_signature: LittleEndian::read_u32(&data[0..4]),
            struct_signature: LittleEndian::read_u32(&data[484..488]),
            free_clusters: LittleEndian::read_u32(&data[488..492]),
            next_free_cluster: LittleEndian::read_u32(&data[492..496]),
            trail_signature: LittleEndian::read_u32(&data[508..512]),
        }
    }

    /// Validity depends only on the two leading signatures.
    pub fn is_valid(&self) -> bool {
        self.lead_signature == LEAD_SIGNATURE && self.struct_signature == STRUCT_SIGNATURE
    }

    pub fn free_clusters_known(&self) -> Option<u32> {
        (self.free_clusters != UNKNOWN).then_some(self.free_clusters)
    }

    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut found = Vec::new();
        if !self.is_valid() {
            found.push(Anomaly::FsInfoSignature {
                lead: self.lead_signature,
                structure: self.struct_signature,
            });
        }
        if self.trail_signature != TRAIL_SIGNATURE {
            found.push(Anomaly::FsInfoTrailSignature {
                found: self.trail_signature,
            });
        }
        found
    }
}
