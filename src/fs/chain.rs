use std::collections::HashSet;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

/// Low 28 bits of a FAT32 entry carry the cluster number.
pub const ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const END_OF_CHAIN: u32 = 0x0FFF_FFFF;
pub const BAD_CLUSTER: u32 = 0x0FFF_FFF7;

/// Entries 0 and 1 hold the media descriptor and volume flags.
pub const FIRST_DATA_CLUSTER: u32 = 2;

const END_OF_CHAIN_MIN: u32 = 0x0FFF_FFF8;
const RESERVED_MIN: u32 = 0x0FFF_FFF0;

/// How a chain walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainStatus {
    /// Reached an end-of-chain marker.
    Complete,
    /// Reached the bad-cluster marker.
    Broken,
    /// Revisited a cluster or exceeded the step bound.
    Cycle,
    /// The next pointer is free, reserved, or outside the FAT.
    Invalid { value: u32 },
    /// The start cluster does not reference data (zero-length file).
    Empty,
}

impl ChainStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ChainStatus::Complete => "complete",
            ChainStatus::Broken => "BROKEN (bad cluster)",
            ChainStatus::Cycle => "CYCLE",
            ChainStatus::Invalid { .. } => "INVALID",
            ChainStatus::Empty => "empty",
        }
    }
}

/// Ordered clusters of one file, recomputed on every walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterChain {
    pub clusters: Vec<u32>,
    #[serde(flatten)]
    pub status: ChainStatus,
}

impl ClusterChain {
    pub fn is_complete(&self) -> bool {
        self.status == ChainStatus::Complete
    }

    pub fn is_broken(&self) -> bool {
        self.status == ChainStatus::Broken
    }

    /// Collapse consecutive clusters into inclusive `(first, last)` runs.
    pub fn runs(&self) -> Vec<(u32, u32)> {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for &c in &self.clusters {
            match runs.last_mut() {
                Some((_, last)) if last.checked_add(1) == Some(c) => *last = c,
                _ => runs.push((c, c)),
            }
        }
        runs
    }
}

/// One FAT copy, held as raw bytes of 32-bit little-endian entries.
pub struct FatTable<'a> {
    data: &'a [u8],
}

impl<'a> FatTable<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Number of whole entries in the table.
    pub fn len(&self) -> u32 {
        u32::try_from(self.data.len() / 4).unwrap_or(u32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Masked entry for `cluster`, or `None` past the end of the table.
    pub fn entry(&self, cluster: u32) -> Option<u32> {
        let off = (cluster as usize).checked_mul(4)?;
        let bytes = self.data.get(off..off.checked_add(4)?)?;
        Some(LittleEndian::read_u32(bytes) & ENTRY_MASK)
    }

    /// Follow the chain starting at `start`. The walk stops after
    /// `max_steps` clusters (clamped to the table size) even if the FAT
    /// loops.
    pub fn walk(&self, start: u32, max_steps: Option<u32>) -> ClusterChain {
        let bound = max_steps.map_or(self.len(), |m| m.min(self.len())) as usize;
        let mut clusters = Vec::new();
        let mut visited = HashSet::new();

        if start < FIRST_DATA_CLUSTER {
            return ClusterChain {
                clusters,
                status: ChainStatus::Empty,
            };
        }

        let mut current = start;
        let status = loop {
            if clusters.len() >= bound || !visited.insert(current) {
                break ChainStatus::Cycle;
            }
            let next = match self.entry(current) {
                Some(next) => next,
                None => break ChainStatus::Invalid { value: current },
            };
            clusters.push(current);

            match next {
                END_OF_CHAIN_MIN..=END_OF_CHAIN => break ChainStatus::Complete,
                BAD_CLUSTER => break ChainStatus::Broken,
                n if n < FIRST_DATA_CLUSTER || n >= self.len() || n >= RESERVED_MIN => {
                    break ChainStatus::Invalid { value: n }
                }
                n => current = n,
            }
        };

        ClusterChain { clusters, status }
    }

    /// Count entries marked free among clusters `2..end`. Entries past the
    /// end of the table are not counted.
    pub fn free_cluster_count(&self, end: u32) -> u32 {
        (FIRST_DATA_CLUSTER..end.min(self.len()))
            .filter(|&c| self.entry(c) == Some(0))
            .count() as u32
    }

    /// Number of entries that differ from `other`, compared over the
    /// shorter table.
    pub fn count_differences(&self, other: &FatTable<'_>) -> usize {
        (0..self.len().min(other.len()))
            .filter(|&c| self.entry(c) != other.entry(c))
            .count()
    }
}
